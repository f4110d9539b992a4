//! Empty SD3 Latent Image
//!

use candle_core::{Device, Tensor};
use log::error;
use pyo3::{
    exceptions::PyRuntimeError,
    pyclass, pymethods,
    types::{PyDict, PyDictMethods, PyType},
    Bound, Py, PyAny, PyErr, PyResult, Python,
};

use crate::{
    core::category::CATEGORY_LATENT_SD3,
    error::Error,
    wrapper::{
        comfyui::{
            types::{MAX_RESOLUTION, NODE_INT, NODE_LATENT},
            PromptServer,
        },
        torch::tensor::TensorWrapper,
    },
};

/// SD3 空潜空间图像的均值
const SD3_LATENT_MEAN: f32 = 0.0609;
/// SD3 潜空间通道数
const SD3_LATENT_CHANNELS: usize = 16;

/// Empty SD3 Latent Image
#[pyclass(subclass)]
pub struct EmptySd3LatentImage {}

impl PromptServer for EmptySd3LatentImage {}

#[pymethods]
impl EmptySd3LatentImage {
    #[new]
    fn new() -> Self {
        Self {}
    }

    #[classattr]
    #[pyo3(name = "RETURN_TYPES")]
    fn return_types() -> (&'static str,) {
        (NODE_LATENT,)
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_LATENT_SD3;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        "Create a batch of empty SD3 latent images."
    }

    #[classattr]
    #[pyo3(name = "FUNCTION")]
    const FUNCTION: &'static str = "generate";

    #[classmethod]
    #[pyo3(name = "INPUT_TYPES")]
    fn input_types(_cls: &Bound<'_, PyType>) -> PyResult<Py<PyDict>> {
        Python::with_gil(|py| {
            let dict = PyDict::new(py);
            dict.set_item("required", {
                let required = PyDict::new(py);
                for name in ["width", "height"] {
                    required.set_item(
                        name,
                        (NODE_INT, {
                            let size = PyDict::new(py);
                            size.set_item("default", 1024)?;
                            size.set_item("min", 16)?;
                            size.set_item("max", MAX_RESOLUTION)?;
                            size.set_item("step", 8)?;
                            size
                        }),
                    )?;
                }
                required.set_item(
                    "batch_size",
                    (NODE_INT, {
                        let batch_size = PyDict::new(py);
                        batch_size.set_item("default", 1)?;
                        batch_size.set_item("min", 1)?;
                        batch_size.set_item("max", 4096)?;
                        batch_size
                    }),
                )?;
                required
            })?;
            Ok(dict.into())
        })
    }

    #[pyo3(name = "generate")]
    fn generate<'py>(
        &mut self,
        py: Python<'py>,
        width: usize,
        height: usize,
        batch_size: usize,
    ) -> PyResult<(Bound<'py, PyDict>,)> {
        let result = self.generate_inner(py, width, height, batch_size);

        match result {
            Ok(v) => Ok((v,)),
            Err(e) => {
                error!("EmptySd3LatentImage error, {e}");
                if let Err(e) = self.send_error(py, "EmptySd3LatentImage".to_string(), e.to_string())
                {
                    error!("send error failed, {e}");
                    return Err(PyErr::new::<PyRuntimeError, _>(e.to_string()));
                };
                Err(PyErr::new::<PyRuntimeError, _>(e.to_string()))
            }
        }
    }
}

impl EmptySd3LatentImage {
    /// 生成 {"samples": tensor} 潜空间字典
    fn generate_inner<'py>(
        &self,
        py: Python<'py>,
        width: usize,
        height: usize,
        batch_size: usize,
    ) -> Result<Bound<'py, PyDict>, Error> {
        let dims = latent_dims(width, height, batch_size);
        let samples = Tensor::full(SD3_LATENT_MEAN, dims, &Device::Cpu)?;
        let py_samples: Bound<'py, PyAny> =
            TensorWrapper::<f32>::from_tensor(samples).to_py_tensor(py)?;

        let latent = PyDict::new(py);
        latent.set_item("samples", py_samples)?;
        Ok(latent)
    }
}

/// 潜空间张量形状, 宽高各缩小 8 倍
fn latent_dims(width: usize, height: usize, batch_size: usize) -> (usize, usize, usize, usize) {
    (batch_size, SD3_LATENT_CHANNELS, height / 8, width / 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latent_dims() {
        assert_eq!(latent_dims(1024, 1024, 1), (1, 16, 128, 128));
        assert_eq!(latent_dims(512, 768, 4), (4, 16, 96, 64));
        // 宽高向下取整
        assert_eq!(latent_dims(17, 16, 1), (1, 16, 2, 2));
    }

    #[test]
    fn test_latent_tensor_fill_value() -> anyhow::Result<()> {
        let samples = Tensor::full(SD3_LATENT_MEAN, latent_dims(64, 64, 2), &Device::Cpu)?;
        assert_eq!(samples.dims(), [2, 16, 8, 8]);

        let values = samples.flatten_all()?.to_vec1::<f32>()?;
        assert!(values.iter().all(|v| *v == SD3_LATENT_MEAN));
        Ok(())
    }
}
