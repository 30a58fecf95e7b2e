use super::tensor::Tensor;

/// 运行时确定元素类型的张量，覆盖算子支持的四种类型：f32、f64、i32、i64
#[derive(Clone, Debug, PartialEq)]
pub enum DynTensor {
    F32(Tensor<f32>),
    F64(Tensor<f64>),
    I32(Tensor<i32>),
    I64(Tensor<i64>),
}

impl DynTensor {
    pub fn shape(&self) -> &[usize] {
        match self {
            DynTensor::F32(t) => t.shape(),
            DynTensor::F64(t) => t.shape(),
            DynTensor::I32(t) => t.shape(),
            DynTensor::I64(t) => t.shape(),
        }
    }

    pub fn dtype_name(&self) -> &'static str {
        match self {
            DynTensor::F32(_) => "f32",
            DynTensor::F64(_) => "f64",
            DynTensor::I32(_) => "i32",
            DynTensor::I64(_) => "i64",
        }
    }
}

impl From<Tensor<f32>> for DynTensor {
    fn from(t: Tensor<f32>) -> Self {
        DynTensor::F32(t)
    }
}

impl From<Tensor<f64>> for DynTensor {
    fn from(t: Tensor<f64>) -> Self {
        DynTensor::F64(t)
    }
}

impl From<Tensor<i32>> for DynTensor {
    fn from(t: Tensor<i32>) -> Self {
        DynTensor::I32(t)
    }
}

impl From<Tensor<i64>> for DynTensor {
    fn from(t: Tensor<i64>) -> Self {
        DynTensor::I64(t)
    }
}
