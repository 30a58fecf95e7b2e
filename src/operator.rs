//! PackRNNSequence / UnpackRNNSequence 算子
//!
//! 算子负责根据 lengths 校验输入形状、计算输出形状，
//! 实际的数据搬运交给 [`crate::passes`] 中的前向/反向内核。

use tracing::{debug, trace};

use crate::common::dyn_tensor::DynTensor;
use crate::common::tensor::{numel, Element, Tensor};
use crate::config::KernelConfig;
use crate::error::{PackError, Result};
use crate::layout::SeqLayout;
use crate::passes;

pub const PACK_RNN_SEQUENCE: &str = "PackRNNSequence";
pub const UNPACK_RNN_SEQUENCE: &str = "UnpackRNNSequence";
pub const PACK_RNN_SEQUENCE_GRADIENT: &str = "PackRNNSequenceGradient";
pub const UNPACK_RNN_SEQUENCE_GRADIENT: &str = "UnpackRNNSequenceGradient";

// 内核签名：(输入数据, 布局, 特征块大小, 配置) -> 输出数据
type Kernel<F> = fn(&[F], &SeqLayout, usize, &KernelConfig) -> Vec<F>;

/// 把扁平的 (M, *D) 批数据打包成按时间步对齐的 (T, N, *D) 填充张量
pub fn pack<F: Element>(values: &Tensor<F>, lengths: &[i32]) -> Result<Tensor<F>> {
    pack_with_config(values, lengths, &KernelConfig::default())
}

pub fn pack_with_config<F: Element>(
    values: &Tensor<F>,
    lengths: &[i32],
    config: &KernelConfig,
) -> Result<Tensor<F>> {
    flat_to_padded(PACK_RNN_SEQUENCE, values, lengths, config, passes::pack_forward)
}

/// 把 (T, N, *D) 填充张量还原成扁平的 (M, *D)，T 必须等于 max(lengths)
pub fn unpack<F: Element>(values: &Tensor<F>, lengths: &[i32]) -> Result<Tensor<F>> {
    unpack_with_config(values, lengths, &KernelConfig::default())
}

pub fn unpack_with_config<F: Element>(
    values: &Tensor<F>,
    lengths: &[i32],
    config: &KernelConfig,
) -> Result<Tensor<F>> {
    padded_to_flat(UNPACK_RNN_SEQUENCE, values, lengths, config, passes::unpack_forward)
}

/// [`pack`] 对 `values` 的梯度：输入 (T, N, *D) 的输出梯度，返回 (M, *D)
pub fn pack_grad<F: Element>(grad_output: &Tensor<F>, lengths: &[i32]) -> Result<Tensor<F>> {
    pack_grad_with_config(grad_output, lengths, &KernelConfig::default())
}

pub fn pack_grad_with_config<F: Element>(
    grad_output: &Tensor<F>,
    lengths: &[i32],
    config: &KernelConfig,
) -> Result<Tensor<F>> {
    padded_to_flat(
        PACK_RNN_SEQUENCE_GRADIENT,
        grad_output,
        lengths,
        config,
        passes::pack_backward,
    )
}

/// [`unpack`] 对 `values` 的梯度：输入 (M, *D) 的输出梯度，返回 (T, N, *D)，填充位置为 0
pub fn unpack_grad<F: Element>(grad_output: &Tensor<F>, lengths: &[i32]) -> Result<Tensor<F>> {
    unpack_grad_with_config(grad_output, lengths, &KernelConfig::default())
}

pub fn unpack_grad_with_config<F: Element>(
    grad_output: &Tensor<F>,
    lengths: &[i32],
    config: &KernelConfig,
) -> Result<Tensor<F>> {
    flat_to_padded(
        UNPACK_RNN_SEQUENCE_GRADIENT,
        grad_output,
        lengths,
        config,
        passes::unpack_backward,
    )
}

// (M, *D) -> (T, N, *D)
fn flat_to_padded<F: Element>(
    op: &'static str,
    values: &Tensor<F>,
    lengths: &[i32],
    config: &KernelConfig,
    kernel: Kernel<F>,
) -> Result<Tensor<F>> {
    let layout = SeqLayout::new(lengths)?;
    check_flat(op, values, &layout)?;

    let mut shape = vec![layout.max_len(), layout.num_seqs()];
    shape.extend_from_slice(&values.shape()[1..]);
    let block = values.size_from_dim(1)?;
    numel(&shape)?;
    debug!(
        op,
        seqs = layout.num_seqs(),
        max_len = layout.max_len(),
        total_len = layout.total_len(),
        block,
        "flat -> padded"
    );

    Tensor::new(&shape, kernel(values.data(), &layout, block, config))
}

// (T, N, *D) -> (M, *D)
fn padded_to_flat<F: Element>(
    op: &'static str,
    values: &Tensor<F>,
    lengths: &[i32],
    config: &KernelConfig,
    kernel: Kernel<F>,
) -> Result<Tensor<F>> {
    let layout = SeqLayout::new(lengths)?;
    check_padded(op, values, &layout)?;

    let mut shape = vec![layout.total_len()];
    shape.extend_from_slice(&values.shape()[2..]);
    let block = values.size_from_dim(2)?;
    debug!(
        op,
        seqs = layout.num_seqs(),
        max_len = layout.max_len(),
        total_len = layout.total_len(),
        block,
        "padded -> flat"
    );

    Tensor::new(&shape, kernel(values.data(), &layout, block, config))
}

fn check_flat<F: Element>(op: &'static str, values: &Tensor<F>, layout: &SeqLayout) -> Result<()> {
    if values.ndim() < 1 || values.dim(0) != layout.total_len() {
        return Err(PackError::ShapeMismatch {
            op,
            expected: format!("({}, *D) with rows = sum(lengths)", layout.total_len()),
            actual: values.shape().to_vec(),
        });
    }
    Ok(())
}

// T 必须等于 max(lengths)，否则梯度的形状与输入对不上
fn check_padded<F: Element>(
    op: &'static str,
    values: &Tensor<F>,
    layout: &SeqLayout,
) -> Result<()> {
    let ok = values.ndim() >= 2
        && values.dim(0) == layout.max_len()
        && values.dim(1) == layout.num_seqs();
    if !ok {
        return Err(PackError::ShapeMismatch {
            op,
            expected: format!(
                "({}, {}, *D) with T = max(lengths) and N = len(lengths)",
                layout.max_len(),
                layout.num_seqs()
            ),
            actual: values.shape().to_vec(),
        });
    }
    Ok(())
}

/// 可按名字查找的算子
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    PackRnnSequence,
    UnpackRnnSequence,
}

impl OpKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            PACK_RNN_SEQUENCE => Ok(OpKind::PackRnnSequence),
            UNPACK_RNN_SEQUENCE => Ok(OpKind::UnpackRnnSequence),
            _ => Err(PackError::UnknownOperator(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpKind::PackRnnSequence => PACK_RNN_SEQUENCE,
            OpKind::UnpackRnnSequence => UNPACK_RNN_SEQUENCE,
        }
    }

    /// 计算本算子输入梯度的算子，输入为 [grad_output, lengths]
    pub fn gradient(self) -> OpKind {
        match self {
            OpKind::PackRnnSequence => OpKind::UnpackRnnSequence,
            OpKind::UnpackRnnSequence => OpKind::PackRnnSequence,
        }
    }

    pub fn run<F: Element>(
        self,
        values: &Tensor<F>,
        lengths: &[i32],
        config: &KernelConfig,
    ) -> Result<Tensor<F>> {
        match self {
            OpKind::PackRnnSequence => pack_with_config(values, lengths, config),
            OpKind::UnpackRnnSequence => unpack_with_config(values, lengths, config),
        }
    }

    /// 元素类型在运行时才确定时的分发入口
    pub fn run_dyn(
        self,
        values: &DynTensor,
        lengths: &[i32],
        config: &KernelConfig,
    ) -> Result<DynTensor> {
        trace!(op = self.name(), dtype = values.dtype_name(), "dispatch");
        Ok(match values {
            DynTensor::F32(t) => self.run(t, lengths, config)?.into(),
            DynTensor::F64(t) => self.run(t, lengths, config)?.into(),
            DynTensor::I32(t) => self.run(t, lengths, config)?.into(),
            DynTensor::I64(t) => self.run(t, lengths, config)?.into(),
        })
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for OpKind {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self> {
        OpKind::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(rows: &[&[f32]]) -> Tensor<f32> {
        let dim = rows.first().map_or(0, |r| r.len());
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::new(&[rows.len(), dim], data).unwrap()
    }

    fn zeros(shape: &[usize]) -> Tensor<f32> {
        Tensor::zeros(shape).unwrap()
    }

    #[test]
    fn pack_two_sequences() {
        let values = flat(&[&[1.], &[2.], &[3.]]);
        let packed = pack(&values, &[2, 1]).unwrap();
        assert_eq!(packed.shape(), &[2, 2, 1]);
        assert_eq!(packed.data(), &[1., 3., 2., 0.]);

        let unpacked = unpack(&packed, &[2, 1]).unwrap();
        assert_eq!(unpacked, values);
    }

    #[test]
    fn pack_zero_length_sequence() {
        let values = flat(&[&[1., 2.], &[3., 4.], &[5., 6.]]);
        let packed = pack(&values, &[0, 3]).unwrap();
        assert_eq!(packed.shape(), &[3, 2, 2]);
        assert_eq!(
            packed.data(),
            &[0., 0., 1., 2., 0., 0., 3., 4., 0., 0., 5., 6.]
        );
        assert_eq!(unpack(&packed, &[0, 3]).unwrap(), values);
    }

    #[test]
    fn empty_batch() {
        let values = zeros(&[0, 4]);
        let packed = pack(&values, &[]).unwrap();
        assert_eq!(packed.shape(), &[0, 0, 4]);

        let unpacked = unpack(&packed, &[]).unwrap();
        assert_eq!(unpacked.shape(), &[0, 4]);
    }

    #[test]
    fn all_zero_lengths() {
        let values = zeros(&[0, 3]);
        let packed = pack(&values, &[0, 0]).unwrap();
        assert_eq!(packed.shape(), &[0, 2, 3]);
        assert_eq!(unpack(&packed, &[0, 0]).unwrap().shape(), &[0, 3]);
    }

    #[test]
    fn scalar_features() {
        let values = Tensor::new(&[3], vec![1i64, 2, 3]).unwrap();
        let packed = pack(&values, &[1, 2]).unwrap();
        assert_eq!(packed.shape(), &[2, 2]);
        assert_eq!(packed.data(), &[1, 2, 0, 3]);
        assert_eq!(unpack(&packed, &[1, 2]).unwrap(), values);
    }

    #[test]
    fn multi_dim_features() {
        let values = Tensor::new(&[3, 2, 2], (0..12).collect::<Vec<i32>>()).unwrap();
        let packed = pack(&values, &[1, 2]).unwrap();
        assert_eq!(packed.shape(), &[2, 2, 2, 2]);
        assert_eq!(
            packed.data(),
            &[0, 1, 2, 3, 4, 5, 6, 7, 0, 0, 0, 0, 8, 9, 10, 11]
        );
        assert_eq!(unpack(&packed, &[1, 2]).unwrap(), values);
    }

    #[test]
    fn taller_padding_rejected() {
        // T = 3 > max(lengths) = 2
        let padded = Tensor::new(&[3, 1, 1], vec![1f32, 2., 3.]).unwrap();
        assert!(matches!(
            unpack(&padded, &[2]),
            Err(PackError::ShapeMismatch { op: UNPACK_RNN_SEQUENCE, .. })
        ));
        assert!(matches!(
            pack_grad(&padded, &[2]),
            Err(PackError::ShapeMismatch { op: PACK_RNN_SEQUENCE_GRADIENT, .. })
        ));
        // 空批次时 T 也必须为 0
        assert!(unpack(&zeros(&[1, 0, 2]), &[]).is_err());
    }

    #[test]
    fn gradient_shape_matches_input() {
        let padded = Tensor::new(&[2, 2, 1], vec![1f32, 3., 2., 0.]).unwrap();
        let flat_out = unpack(&padded, &[2, 1]).unwrap();
        let grad = unpack_grad(&flat_out, &[2, 1]).unwrap();
        assert_eq!(grad.shape(), padded.shape());

        let values = flat(&[&[1.], &[2.], &[3.]]);
        let packed = pack(&values, &[2, 1]).unwrap();
        assert_eq!(pack_grad(&packed, &[2, 1]).unwrap().shape(), values.shape());
    }

    #[test]
    fn gradients_are_duals() {
        let grad_padded = Tensor::new(&[2, 2, 1], vec![1f32, 3., 2., 9.]).unwrap();
        assert_eq!(
            pack_grad(&grad_padded, &[2, 1]).unwrap(),
            unpack(&grad_padded, &[2, 1]).unwrap()
        );
        assert_eq!(pack_grad(&grad_padded, &[2, 1]).unwrap().data(), &[1., 2., 3.]);

        let grad_flat = flat(&[&[1.], &[2.], &[3.]]);
        assert_eq!(
            unpack_grad(&grad_flat, &[2, 1]).unwrap(),
            pack(&grad_flat, &[2, 1]).unwrap()
        );
    }

    #[test]
    fn negative_length_rejected() {
        let values = flat(&[&[1.], &[2.]]);
        assert_eq!(
            pack(&values, &[3, -1]).unwrap_err(),
            PackError::InvalidLength { index: 1, length: -1 }
        );
        assert!(matches!(
            unpack(&zeros(&[2, 2, 1]), &[-1, 1]),
            Err(PackError::InvalidLength { index: 0, .. })
        ));
    }

    #[test]
    fn pack_row_count_mismatch() {
        let values = flat(&[&[1.], &[2.], &[3.]]);
        let err = pack(&values, &[2, 2]).unwrap_err();
        assert!(matches!(err, PackError::ShapeMismatch { op: PACK_RNN_SEQUENCE, .. }));
        assert!(matches!(
            unpack_grad(&values, &[2, 2]),
            Err(PackError::ShapeMismatch { op: UNPACK_RNN_SEQUENCE_GRADIENT, .. })
        ));

        assert!(pack(&zeros(&[]), &[1]).is_err());
    }

    #[test]
    fn unpack_shape_mismatch() {
        let padded = zeros(&[2, 2, 1]);
        // 序列个数与 N 不一致
        assert!(matches!(
            unpack(&padded, &[1, 1, 1]),
            Err(PackError::ShapeMismatch { .. })
        ));
        // max(lengths) > T
        assert!(matches!(
            unpack(&padded, &[3, 1]),
            Err(PackError::ShapeMismatch { .. })
        ));
        // max(lengths) < T
        assert!(matches!(
            unpack(&padded, &[1, 1]),
            Err(PackError::ShapeMismatch { .. })
        ));
        // 维度不足
        assert!(matches!(
            unpack(&zeros(&[2]), &[1, 1]),
            Err(PackError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn overflowing_feature_block_rejected() {
        let values = Tensor::<f32>::new(&[0, usize::MAX, 2], vec![]).unwrap();
        assert!(matches!(pack(&values, &[]), Err(PackError::ShapeOverflow(_))));
    }

    #[test]
    fn op_kind_by_name() {
        let op = OpKind::from_name("PackRNNSequence").unwrap();
        assert_eq!(op, OpKind::PackRnnSequence);
        assert_eq!(op.gradient(), OpKind::UnpackRnnSequence);
        assert_eq!(op.gradient().gradient(), op);

        let parsed: OpKind = "UnpackRNNSequence".parse().unwrap();
        assert_eq!(parsed.to_string(), UNPACK_RNN_SEQUENCE);
        assert_eq!(
            OpKind::from_name("LengthsSum").unwrap_err(),
            PackError::UnknownOperator("LengthsSum".to_string())
        );
    }

    #[test]
    fn run_dyn_keeps_dtype() {
        let config = KernelConfig::default();
        let values: DynTensor = Tensor::new(&[3, 1], vec![1i32, 2, 3]).unwrap().into();
        let packed = OpKind::PackRnnSequence.run_dyn(&values, &[2, 1], &config).unwrap();
        assert_eq!(packed.dtype_name(), "i32");
        assert_eq!(packed.shape(), &[2, 2, 1]);

        let back = OpKind::PackRnnSequence
            .gradient()
            .run_dyn(&packed, &[2, 1], &config)
            .unwrap();
        assert_eq!(back, values);

        let doubles: DynTensor = Tensor::new(&[2, 1], vec![0.5f64, 1.5]).unwrap().into();
        let packed = OpKind::PackRnnSequence.run_dyn(&doubles, &[1, 1], &config).unwrap();
        assert_eq!(packed, DynTensor::F64(Tensor::new(&[1, 2, 1], vec![0.5, 1.5]).unwrap()));
    }
}
