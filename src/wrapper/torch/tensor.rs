//! Convert to Python object wrapper
//! 依赖:
//! - python: torch

use std::marker::PhantomData;

use candle_core::{Tensor, WithDType};
use numpy::{Element, PyArray, PyArrayDyn, PyArrayMethods};
use pyo3::{
    exceptions::PyRuntimeError, types::PyAnyMethods, Bound, IntoPyObject, PyErr, PyResult, Python,
};

pub struct TensorWrapper<T>
where
    T: Element + WithDType,
{
    tensor: Tensor,
    _marker: PhantomData<T>,
}

impl<T> TensorWrapper<T>
where
    T: Element + WithDType,
{
    pub fn from_tensor(tensor: Tensor) -> Self {
        Self {
            tensor,
            _marker: PhantomData,
        }
    }

    pub fn into_tensor(self) -> Tensor {
        self.tensor
    }

    /// 转换为python对象
    ///
    /// 将数组转换为 python 的 tensor
    /// ```python,ignore
    /// import torch
    /// tensor = torch.tensor(data)
    /// ```
    pub fn to_py_tensor(self, py: Python<'_>) -> PyResult<Bound<'_, pyo3::PyAny>> {
        let data = self.into_pyobject(py)?;

        let torch = py.import("torch")?;
        torch.getattr("tensor")?.call1((data,))
    }
}

impl<T> From<Tensor> for TensorWrapper<T>
where
    T: Element + WithDType,
{
    fn from(value: Tensor) -> Self {
        TensorWrapper::from_tensor(value)
    }
}

impl<'py, T> IntoPyObject<'py> for TensorWrapper<T>
where
    T: Element + WithDType,
{
    type Target = PyArrayDyn<T>; // the Python type
    type Output = Bound<'py, Self::Target>; // in most cases this will be `Bound`
    type Error = PyErr; // the conversion error type, has to be convertable to `PyErr`

    fn into_pyobject(self, py: Python<'py>) -> Result<Self::Output, Self::Error> {
        let tensor = self.into_tensor();
        let shape = tensor.dims();

        // 直接访问底层数据指针
        let data = tensor
            .flatten_all()
            .map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))?
            .to_vec1::<T>()
            .map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))?;

        // 创建数组并重新排列维度
        let array = PyArray::from_iter(py, data)
            .reshape(shape)
            .map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))?;

        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    #[test]
    fn test_from_tensor_roundtrip() -> anyhow::Result<()> {
        let tensor = Tensor::full(0.0609f32, (1, 16, 4, 4), &Device::Cpu)?;
        let wrapper = TensorWrapper::<f32>::from_tensor(tensor);
        let tensor = wrapper.into_tensor();

        assert_eq!(tensor.dims(), [1, 16, 4, 4]);
        assert_eq!(tensor.flatten_all()?.to_vec1::<f32>()?[0], 0.0609);
        Ok(())
    }

    #[test]
    #[ignore]
    fn test_to_py_tensor() -> anyhow::Result<()> {
        Python::with_gil(|py| {
            let tensor = Tensor::full(0.0609f32, (1, 16, 4, 4), &Device::Cpu)?;
            let py_tensor = TensorWrapper::<f32>::from_tensor(tensor).to_py_tensor(py)?;
            println!("py_tensor: {:?}", py_tensor);
            Ok(())
        })
    }
}
