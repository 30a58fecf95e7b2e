use crate::error::{PackError, Result};

/// 元素类型约束：可复制、可跨线程共享，`Default::default()` 即为填充用的零值
pub trait Element: Copy + Default + Send + Sync + 'static {}

impl<F: Copy + Default + Send + Sync + 'static> Element for F {}

/// 行主序（row-major）稠密张量，拥有自己的连续内存
///
/// * 扁平布局 (flat)：形状 (M, *D)
/// * 填充布局 (padded)：形状 (T, N, *D)
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor<F> {
    shape: Vec<usize>,
    data: Vec<F>,
}

impl<F: Element> Tensor<F> {
    /// 用已有数据构造张量，数据长度必须等于形状各维的乘积
    pub fn new(shape: &[usize], data: Vec<F>) -> Result<Self> {
        let expected = numel(shape)?;
        if data.len() != expected {
            return Err(PackError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Tensor {
            shape: shape.to_vec(),
            data,
        })
    }

    /// 全零张量
    pub fn zeros(shape: &[usize]) -> Result<Self> {
        Ok(Tensor {
            shape: shape.to_vec(),
            data: vec![F::default(); numel(shape)?],
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn dim(&self, i: usize) -> usize {
        self.shape[i]
    }

    pub fn data(&self) -> &[F] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [F] {
        &mut self.data
    }

    /// 从第 `dim` 维开始（含）的元素个数，即每个特征块的大小
    pub fn size_from_dim(&self, dim: usize) -> Result<usize> {
        numel(&self.shape[dim.min(self.shape.len())..])
    }
}

/// 形状各维的乘积；含 0 维时为 0，否则溢出即报错
pub(crate) fn numel(shape: &[usize]) -> Result<usize> {
    if shape.contains(&0) {
        return Ok(0);
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| PackError::ShapeOverflow(shape.to_vec()))
}
