//! CLIP Text Encode SD3
//!

use std::str::FromStr;

use log::error;
use pyo3::{
    exceptions::PyRuntimeError,
    pyclass, pymethods,
    types::{PyAnyMethods, PyDict, PyList, PyType},
    Bound, Py, PyAny, PyErr, PyResult, Python,
};

use crate::{
    conditioning::token_aligner::{align, EmptyPadding, FillerEntries, TokenBundle, TokenStream},
    core::category::CATEGORY_ADVANCED_CONDITIONING,
    error::Error,
    wrapper::{
        comfy::clip::Clip,
        comfyui::{
            types::{NODE_CLIP, NODE_CONDITIONING, NODE_STRING},
            PromptServer,
        },
    },
};

/// CLIP Text Encode SD3
///
/// 三通道文本编码, 编码前对齐 l/g 两个流的分块数
#[pyclass(subclass)]
pub struct ClipTextEncodeSd3 {}

impl PromptServer for ClipTextEncodeSd3 {}

#[pymethods]
impl ClipTextEncodeSd3 {
    #[new]
    fn new() -> Self {
        Self {}
    }

    #[classattr]
    #[pyo3(name = "RETURN_TYPES")]
    fn return_types() -> (&'static str,) {
        (NODE_CONDITIONING,)
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_ADVANCED_CONDITIONING;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        "Encode clip_l/clip_g/t5xxl prompts for SD3, padding the two CLIP token streams to equal chunk counts."
    }

    #[classattr]
    #[pyo3(name = "FUNCTION")]
    const FUNCTION: &'static str = "encode";

    #[classmethod]
    #[pyo3(name = "INPUT_TYPES")]
    fn input_types(_cls: &Bound<'_, PyType>) -> PyResult<Py<PyDict>> {
        Python::with_gil(|py| {
            let dict = PyDict::new(py);
            dict.set_item("required", {
                let required = PyDict::new(py);
                required.set_item(
                    "clip",
                    (NODE_CLIP, {
                        let clip = PyDict::new(py);
                        clip
                    }),
                )?;
                for name in ["clip_l", "clip_g", "t5xxl"] {
                    required.set_item(
                        name,
                        (NODE_STRING, {
                            let text = PyDict::new(py);
                            text.set_item("multiline", true)?;
                            text.set_item("dynamicPrompts", true)?;
                            text
                        }),
                    )?;
                }
                required.set_item("empty_padding", (vec!["none", "empty_prompt"],))?;
                required
            })?;
            Ok(dict.into())
        })
    }

    #[pyo3(name = "encode")]
    fn encode<'py>(
        &mut self,
        py: Python<'py>,
        clip: Bound<'py, PyAny>,
        clip_l: &str,
        clip_g: &str,
        t5xxl: &str,
        empty_padding: &str,
    ) -> PyResult<(Bound<'py, PyAny>,)> {
        let result = self.encode_inner(py, clip, clip_l, clip_g, t5xxl, empty_padding);

        match result {
            Ok(v) => Ok((v,)),
            Err(e) => {
                error!("ClipTextEncodeSd3 error, {e}");
                if let Err(e) = self.send_error(py, "ClipTextEncodeSd3".to_string(), e.to_string())
                {
                    error!("send error failed, {e}");
                    return Err(PyErr::new::<PyRuntimeError, _>(e.to_string()));
                };
                Err(PyErr::new::<PyRuntimeError, _>(e.to_string()))
            }
        }
    }
}

impl ClipTextEncodeSd3 {
    /// 分词 + 对齐 + 编码
    fn encode_inner<'py>(
        &self,
        py: Python<'py>,
        clip: Bound<'py, PyAny>,
        clip_l: &str,
        clip_g: &str,
        t5xxl: &str,
        empty_padding: &str,
    ) -> Result<Bound<'py, PyAny>, Error> {
        let padding = EmptyPadding::from_str(empty_padding)
            .map_err(|e| Error::ParseEnumString(e.to_string()))?;
        let no_padding = padding == EmptyPadding::None;
        let clip = Clip::new(clip);

        // g 通道总是先分词, 空文本 + none 模式时再清空
        let g = clip.tokenize(clip_g)?.g.resolve(clip_g.is_empty(), padding);

        // l/t5xxl 通道空文本 + none 模式时直接跳过分词
        let l = if clip_l.is_empty() && no_padding {
            TokenStream::empty()
        } else {
            clip.tokenize(clip_l)?.l
        };
        let t5 = if t5xxl.is_empty() && no_padding {
            TokenStream::empty()
        } else {
            clip.tokenize(t5xxl)?.t5xxl
        };

        // 块数不一致时只触发一次空串分词
        let bundle = align(TokenBundle::new(l, g, t5), || {
            let empty = clip.tokenize("")?;
            Ok::<FillerEntries<Py<PyAny>>, Error>(FillerEntries {
                l: Self::first_entry(empty.l, "l")?,
                g: Self::first_entry(empty.g, "g")?,
            })
        })?;

        let (cond, pooled) = clip.encode_from_tokens(py, &bundle, true)?;

        // [[cond, {"pooled_output": pooled}]]
        let ext = PyDict::new(py);
        ext.set_item("pooled_output", pooled)?;
        let entry = PyList::new(py, [cond, ext.into_any()])?;
        let conditioning = PyList::new(py, [entry])?;
        Ok(conditioning.into_any())
    }

    fn first_entry(
        stream: TokenStream<Py<PyAny>>,
        name: &str,
    ) -> Result<Py<PyAny>, Error> {
        stream
            .into_entries()
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmptyFiller(name.to_string()))
    }
}
