//! ControlNet Apply SD3
//!
//! 输入面板与 SD3 对齐, 执行委托给宿主的 ControlNetApplyAdvanced

use log::error;
use pyo3::{
    exceptions::PyRuntimeError,
    pyclass, pymethods,
    types::{PyAnyMethods, PyDict, PyType},
    Bound, Py, PyAny, PyErr, PyResult, Python,
};

use crate::{
    core::category::CATEGORY_CONDITIONING_CONTROLNET,
    error::Error,
    wrapper::comfyui::{
        types::{NODE_CONDITIONING, NODE_CONTROL_NET, NODE_FLOAT, NODE_IMAGE, NODE_VAE},
        PromptServer,
    },
};

/// ControlNet Apply SD3
#[pyclass(subclass)]
pub struct ControlNetApplySd3 {}

impl PromptServer for ControlNetApplySd3 {}

#[pymethods]
impl ControlNetApplySd3 {
    #[new]
    fn new() -> Self {
        Self {}
    }

    #[classattr]
    #[pyo3(name = "RETURN_TYPES")]
    fn return_types() -> (&'static str, &'static str) {
        (NODE_CONDITIONING, NODE_CONDITIONING)
    }

    #[classattr]
    #[pyo3(name = "RETURN_NAMES")]
    fn return_names() -> (&'static str, &'static str) {
        ("positive", "negative")
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_CONDITIONING_CONTROLNET;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        "Apply a ControlNet to positive and negative conditioning, with the VAE input SD3 controlnets require."
    }

    #[classattr]
    #[pyo3(name = "FUNCTION")]
    const FUNCTION: &'static str = "apply_controlnet";

    #[classmethod]
    #[pyo3(name = "INPUT_TYPES")]
    fn input_types(_cls: &Bound<'_, PyType>) -> PyResult<Py<PyDict>> {
        Python::with_gil(|py| {
            let dict = PyDict::new(py);
            dict.set_item("required", {
                let required = PyDict::new(py);
                required.set_item(
                    "positive",
                    (NODE_CONDITIONING, {
                        let positive = PyDict::new(py);
                        positive
                    }),
                )?;
                required.set_item(
                    "negative",
                    (NODE_CONDITIONING, {
                        let negative = PyDict::new(py);
                        negative
                    }),
                )?;
                required.set_item(
                    "control_net",
                    (NODE_CONTROL_NET, {
                        let control_net = PyDict::new(py);
                        control_net
                    }),
                )?;
                required.set_item(
                    "vae",
                    (NODE_VAE, {
                        let vae = PyDict::new(py);
                        vae
                    }),
                )?;
                required.set_item(
                    "image",
                    (NODE_IMAGE, {
                        let image = PyDict::new(py);
                        image
                    }),
                )?;
                required.set_item(
                    "strength",
                    (NODE_FLOAT, {
                        let strength = PyDict::new(py);
                        strength.set_item("default", 1.0)?;
                        strength.set_item("min", 0.0)?;
                        strength.set_item("max", 10.0)?;
                        strength.set_item("step", 0.01)?;
                        strength
                    }),
                )?;
                required.set_item(
                    "start_percent",
                    (NODE_FLOAT, {
                        let start_percent = PyDict::new(py);
                        start_percent.set_item("default", 0.0)?;
                        start_percent.set_item("min", 0.0)?;
                        start_percent.set_item("max", 1.0)?;
                        start_percent.set_item("step", 0.001)?;
                        start_percent
                    }),
                )?;
                required.set_item(
                    "end_percent",
                    (NODE_FLOAT, {
                        let end_percent = PyDict::new(py);
                        end_percent.set_item("default", 1.0)?;
                        end_percent.set_item("min", 0.0)?;
                        end_percent.set_item("max", 1.0)?;
                        end_percent.set_item("step", 0.001)?;
                        end_percent
                    }),
                )?;
                required
            })?;
            Ok(dict.into())
        })
    }

    #[pyo3(name = "apply_controlnet")]
    #[allow(clippy::too_many_arguments)]
    fn apply_controlnet<'py>(
        &mut self,
        py: Python<'py>,
        positive: Bound<'py, PyAny>,
        negative: Bound<'py, PyAny>,
        control_net: Bound<'py, PyAny>,
        vae: Bound<'py, PyAny>,
        image: Bound<'py, PyAny>,
        strength: f64,
        start_percent: f64,
        end_percent: f64,
    ) -> PyResult<(Bound<'py, PyAny>, Bound<'py, PyAny>)> {
        let result = self.apply_inner(
            py,
            positive,
            negative,
            control_net,
            vae,
            image,
            strength,
            start_percent,
            end_percent,
        );

        match result {
            Ok(v) => Ok(v),
            Err(e) => {
                error!("ControlNetApplySd3 error, {e}");
                if let Err(e) = self.send_error(py, "ControlNetApplySd3".to_string(), e.to_string())
                {
                    error!("send error failed, {e}");
                    return Err(PyErr::new::<PyRuntimeError, _>(e.to_string()));
                };
                Err(PyErr::new::<PyRuntimeError, _>(e.to_string()))
            }
        }
    }
}

impl ControlNetApplySd3 {
    /// 委托给宿主基础节点
    #[allow(clippy::too_many_arguments)]
    fn apply_inner<'py>(
        &self,
        py: Python<'py>,
        positive: Bound<'py, PyAny>,
        negative: Bound<'py, PyAny>,
        control_net: Bound<'py, PyAny>,
        vae: Bound<'py, PyAny>,
        image: Bound<'py, PyAny>,
        strength: f64,
        start_percent: f64,
        end_percent: f64,
    ) -> Result<(Bound<'py, PyAny>, Bound<'py, PyAny>), Error> {
        let base = py
            .import("nodes")?
            .getattr("ControlNetApplyAdvanced")?
            .call0()?;

        let kwargs = PyDict::new(py);
        kwargs.set_item("vae", vae)?;

        let result = base.call_method(
            "apply_controlnet",
            (
                positive,
                negative,
                control_net,
                image,
                strength,
                start_percent,
                end_percent,
            ),
            Some(&kwargs),
        )?;

        let positive = result.get_item(0)?;
        let negative = result.get_item(1)?;
        Ok((positive, negative))
    }
}
