//! Conditioning

use pyo3::{
    types::{PyModule, PyModuleMethods},
    Bound, PyResult, Python,
};

use crate::core::node::NodeRegister;

pub mod token_aligner;

mod clip_text_encode_sd3;
pub use clip_text_encode_sd3::ClipTextEncodeSd3;

mod controlnet_apply_sd3;
pub use controlnet_apply_sd3::ControlNetApplySd3;

/// 条件模块
pub fn submodule(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let submodule = PyModule::new(py, "conditioning")?;
    submodule.add_class::<ClipTextEncodeSd3>()?;
    submodule.add_class::<ControlNetApplySd3>()?;
    Ok(submodule)
}

/// Conditioning node register
pub fn node_register(py: Python<'_>) -> PyResult<Vec<NodeRegister<'_>>> {
    let nodes: Vec<NodeRegister> = vec![
        NodeRegister(
            "CLIPTextEncodeSD3",
            py.get_type::<ClipTextEncodeSd3>(),
            "CLIP Text Encode SD3",
        ),
        NodeRegister(
            "ControlNetApplySD3",
            py.get_type::<ControlNetApplySd3>(),
            "Apply ControlNet SD3",
        ),
    ];
    Ok(nodes)
}
