//! Triple CLIP Loader
//!
//! 加载 SD3 的三个文本编码器 (clip_l / clip_g / t5xxl)

use log::error;
use pyo3::{
    exceptions::PyRuntimeError,
    pyclass, pymethods,
    types::{PyDict, PyDictMethods, PyType},
    Bound, Py, PyAny, PyErr, PyResult, Python,
};

use crate::{
    core::category::CATEGORY_ADVANCED_LOADERS,
    error::Error,
    wrapper::{
        comfy::{folder_paths::FolderPaths, sd},
        comfyui::{types::NODE_CLIP, PromptServer},
    },
};

/// Triple CLIP Loader
#[pyclass(subclass)]
pub struct TripleClipLoader {}

impl PromptServer for TripleClipLoader {}

#[pymethods]
impl TripleClipLoader {
    #[new]
    fn new() -> Self {
        Self {}
    }

    #[classattr]
    #[pyo3(name = "RETURN_TYPES")]
    fn return_types() -> (&'static str,) {
        (NODE_CLIP,)
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_ADVANCED_LOADERS;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        "Load the three SD3 text encoder checkpoints as one CLIP object."
    }

    #[classattr]
    #[pyo3(name = "FUNCTION")]
    const FUNCTION: &'static str = "load_clip";

    #[classmethod]
    #[pyo3(name = "INPUT_TYPES")]
    fn input_types(_cls: &Bound<'_, PyType>) -> PyResult<Py<PyDict>> {
        Python::with_gil(|py| {
            let filename_list = FolderPaths::default().get_filename_list("clip");

            let dict = PyDict::new(py);
            dict.set_item("required", {
                let required = PyDict::new(py);
                required.set_item("clip_name1", (filename_list.clone(),))?;
                required.set_item("clip_name2", (filename_list.clone(),))?;
                required.set_item("clip_name3", (filename_list,))?;
                required
            })?;
            Ok(dict.into())
        })
    }

    #[pyo3(name = "load_clip")]
    fn load_clip<'py>(
        &mut self,
        py: Python<'py>,
        clip_name1: &str,
        clip_name2: &str,
        clip_name3: &str,
    ) -> PyResult<(Bound<'py, PyAny>,)> {
        let result = self.load_inner(py, clip_name1, clip_name2, clip_name3);

        match result {
            Ok(v) => Ok((v,)),
            Err(e) => {
                error!("TripleClipLoader error, {e}");
                if let Err(e) = self.send_error(py, "TripleClipLoader".to_string(), e.to_string()) {
                    error!("send error failed, {e}");
                    return Err(PyErr::new::<PyRuntimeError, _>(e.to_string()));
                };
                Err(PyErr::new::<PyRuntimeError, _>(e.to_string()))
            }
        }
    }
}

impl TripleClipLoader {
    /// 解析三个检查点路径后委托 comfy.sd.load_clip
    fn load_inner<'py>(
        &self,
        py: Python<'py>,
        clip_name1: &str,
        clip_name2: &str,
        clip_name3: &str,
    ) -> Result<Bound<'py, PyAny>, Error> {
        let folder_paths = FolderPaths::default();

        let mut ckpt_paths = Vec::with_capacity(3);
        for clip_name in [clip_name1, clip_name2, clip_name3] {
            let path = folder_paths.get_full_path_or_raise("clip", clip_name)?;
            ckpt_paths.push(path.to_string_lossy().to_string());
        }

        let embedding_directory = folder_paths
            .get_folder_paths("embeddings")?
            .into_iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();

        let clip = sd::load_clip(py, ckpt_paths, embedding_directory)?;
        Ok(clip)
    }
}
