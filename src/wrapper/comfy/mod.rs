//! comfy 宿主模块包装

pub mod clip;
pub mod folder_paths;
pub mod sd;
