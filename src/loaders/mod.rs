//! Loaders

use pyo3::{
    types::{PyModule, PyModuleMethods},
    Bound, PyResult, Python,
};

use crate::core::node::NodeRegister;

mod triple_clip_loader;
pub use triple_clip_loader::TripleClipLoader;

/// 加载器模块
pub fn submodule(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let submodule = PyModule::new(py, "loaders")?;
    submodule.add_class::<TripleClipLoader>()?;
    Ok(submodule)
}

/// Loader node register
pub fn node_register(py: Python<'_>) -> PyResult<Vec<NodeRegister<'_>>> {
    let nodes: Vec<NodeRegister> = vec![NodeRegister(
        "TripleCLIPLoader",
        py.get_type::<TripleClipLoader>(),
        "Triple CLIP Loader",
    )];
    Ok(nodes)
}
