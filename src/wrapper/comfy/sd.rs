//! comfy.sd

use pyo3::{
    types::{PyAnyMethods, PyDict, PyDictMethods},
    Bound, PyAny, Python,
};

use crate::error::Error;

/// 加载文本编码器
///
/// ```python,ignore
/// clip = comfy.sd.load_clip(ckpt_paths=[...], embedding_directory=[...])
/// ```
pub fn load_clip<'py>(
    py: Python<'py>,
    ckpt_paths: Vec<String>,
    embedding_directory: Vec<String>,
) -> Result<Bound<'py, PyAny>, Error> {
    let sd = py.import("comfy")?.getattr("sd")?;

    // 准备参数
    let kwargs = PyDict::new(py);
    kwargs.set_item("ckpt_paths", ckpt_paths)?;
    kwargs.set_item("embedding_directory", embedding_directory)?;

    let clip = sd.call_method("load_clip", (), Some(&kwargs))?;
    Ok(clip)
}
