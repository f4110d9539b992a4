//! 节点分类

/// 加载器
pub const CATEGORY_ADVANCED_LOADERS: &str = "advanced/loaders";
/// SD3 潜空间
pub const CATEGORY_LATENT_SD3: &str = "latent/sd3";
/// 条件
pub const CATEGORY_ADVANCED_CONDITIONING: &str = "advanced/conditioning";
/// ControlNet 条件
pub const CATEGORY_CONDITIONING_CONTROLNET: &str = "conditioning/controlnet";
