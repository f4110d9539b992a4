//! 类型定义
//! 相关节点定义: ComfyUI/comfy/comfy_types/node_typing.py

pub const NODE_INT: &str = "INT";
pub const NODE_FLOAT: &str = "FLOAT";
pub const NODE_STRING: &str = "STRING";
pub const NODE_CLIP: &str = "CLIP";
pub const NODE_CONDITIONING: &str = "CONDITIONING";
pub const NODE_LATENT: &str = "LATENT";
pub const NODE_VAE: &str = "VAE";
pub const NODE_IMAGE: &str = "IMAGE";
pub const NODE_CONTROL_NET: &str = "CONTROL_NET";

/// ComfyUI 最大分辨率, 对应 nodes.MAX_RESOLUTION
pub const MAX_RESOLUTION: u32 = 16384;
