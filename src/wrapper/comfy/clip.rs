//! CLIP Object for comfyui
//!

use pyo3::{
    types::{PyAnyMethods, PyDict, PyDictMethods, PyList, PyListMethods},
    Bound, Py, PyAny, Python,
};

use crate::{
    conditioning::token_aligner::{TokenBundle, TokenStream},
    error::Error,
};

/// CLIP
///
/// SD3 的 CLIP 对象同时携带 l/g/t5xxl 三个分词器,
/// tokenize 一次返回三个通道的分块
#[derive(Debug)]
pub struct Clip<'py> {
    clip: Bound<'py, PyAny>,
}

impl<'py> Clip<'py> {
    pub fn new(clip: Bound<'py, PyAny>) -> Self {
        Self { clip }
    }

    /// Tokenize
    ///
    /// 分块保持为宿主侧不透明对象
    pub fn tokenize(&self, text: &str) -> Result<TokenBundle<Py<PyAny>>, Error> {
        let py_tokens = self.clip.call_method1("tokenize", (text,))?;
        let dict = py_tokens
            .downcast::<PyDict>()
            .map_err(|e| Error::PyDowncastError(e.to_string()))?;

        Ok(TokenBundle::new(
            Self::stream(dict, "l")?,
            Self::stream(dict, "g")?,
            Self::stream(dict, "t5xxl")?,
        ))
    }

    /// 提取单个通道的分块列表
    fn stream(dict: &Bound<'py, PyDict>, name: &str) -> Result<TokenStream<Py<PyAny>>, Error> {
        let entries = dict
            .get_item(name)?
            .ok_or_else(|| Error::MissingTokenStream(name.to_string()))?;
        let list = entries
            .downcast::<PyList>()
            .map_err(|e| Error::PyDowncastError(e.to_string()))?;

        let mut chunks = Vec::with_capacity(list.len());
        for entry in list.iter() {
            chunks.push(entry.unbind());
        }
        Ok(TokenStream::from_entries(chunks))
    }

    /// Encode
    ///
    /// ```python,ignore
    /// cond, pooled = clip.encode_from_tokens(tokens, return_pooled=True)
    /// ```
    pub fn encode_from_tokens(
        &self,
        py: Python<'py>,
        bundle: &TokenBundle<Py<PyAny>>,
        return_pooled: bool,
    ) -> Result<(Bound<'py, PyAny>, Bound<'py, PyAny>), Error> {
        let tokens = PyDict::new(py);
        tokens.set_item("l", PyList::new(py, bundle.l.entries())?)?;
        tokens.set_item("g", PyList::new(py, bundle.g.entries())?)?;
        tokens.set_item("t5xxl", PyList::new(py, bundle.t5xxl.entries())?)?;

        let kwargs = PyDict::new(py);
        kwargs.set_item("return_pooled", return_pooled)?;

        let result = self
            .clip
            .call_method("encode_from_tokens", (tokens,), Some(&kwargs))?;
        let cond = result.get_item(0)?;
        let pooled = result.get_item(1)?;
        Ok((cond, pooled))
    }
}
