//! Latent

use pyo3::{
    types::{PyModule, PyModuleMethods},
    Bound, PyResult, Python,
};

use crate::core::node::NodeRegister;

mod empty_sd3_latent_image;
pub use empty_sd3_latent_image::EmptySd3LatentImage;

/// 潜空间模块
pub fn submodule(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let submodule = PyModule::new(py, "latent")?;
    submodule.add_class::<EmptySd3LatentImage>()?;
    Ok(submodule)
}

/// Latent node register
pub fn node_register(py: Python<'_>) -> PyResult<Vec<NodeRegister<'_>>> {
    let nodes: Vec<NodeRegister> = vec![NodeRegister(
        "EmptySD3LatentImage",
        py.get_type::<EmptySd3LatentImage>(),
        "Empty SD3 Latent Image",
    )];
    Ok(nodes)
}
