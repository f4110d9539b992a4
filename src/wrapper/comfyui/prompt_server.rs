//! Prompt Server
//!
//! SD3 节点执行失败时的前端上报通道

use pyo3::{
    types::{PyAnyMethods, PyDict, PyModule},
    PyResult, PyTypeInfo, Python,
};

/// comfyui PromptServer wrapper
///
/// 节点 execute 内部出错时, 先把错误推送到前端 toast,
/// 再转换为 PyRuntimeError 抛给执行引擎
pub trait PromptServer: PyTypeInfo {
    /// 向前端推送一条错误消息
    fn send_error(&self, py: Python, error_type: String, message: String) -> PyResult<()> {
        // 错误数据: 类型 + 出错节点 class 名称 + 消息
        let error_data = PyDict::new(py);
        error_data.set_item("type", &error_type)?;
        error_data.set_item("node", self.get_class_name(py)?)?;
        error_data.set_item("message", message)?;

        // PromptServer 是宿主持有的单例
        PyModule::import(py, "server")?
            .getattr("PromptServer")?
            .getattr("instance")?
            .getattr("send_sync")?
            .call1(("sd3kit", error_data))?;

        Ok(())
    }

    /// Class 名称
    fn get_class_name(&self, py: Python) -> PyResult<String> {
        Self::type_object(py)
            .getattr("__name__")?
            .extract::<String>()
    }
}
