#![allow(non_snake_case)]

use rayon::prelude::*;

use crate::common::tensor::Element;
use crate::config::KernelConfig;
use crate::layout::SeqLayout;

/// 执行 pack 的前向传播：把按序列拼接的扁平数据搬运成按时间步对齐的填充张量。
/// * out[r][c] = inp[offset(c) + r]，当 r < lengths[c]
/// * out[r][c] = 0，当 r >= lengths[c]（填充）
///
/// # 参数
/// * `inp` (输入): 形状为 (M, C)，M = sum(lengths)。
/// * `layout`: lengths 以及前缀和 offsets。
/// * `C`: 每个时间步的特征块大小，即 product(D)。
///
/// # 输出
/// 形状为 (T, N, C) 的数据，T = max(lengths)，N 为序列个数。
/// 调用方需保证 T * N * C 不溢出。
///
/// # 实现细节
/// - 输出按零值分配，填充位置不再单独写。
/// - 按时间步 r 切分输出，每一行 (N, C) 是一块连续且互不重叠的内存，
///   因此可以用 rayon 直接并行，不需要共享的可变 offset。
pub fn pack_forward<F: Element>(
    inp: &[F],
    layout: &SeqLayout,
    C: usize,
    config: &KernelConfig,
) -> Vec<F> {
    let N = layout.num_seqs();
    let T = layout.max_len();
    debug_assert_eq!(inp.len(), layout.total_len() * C);

    let mut out = vec![F::default(); T * N * C];
    let row = N * C;
    if row == 0 || T == 0 {
        return out;
    }

    let fill_row = |(r, out_r): (usize, &mut [F])| {
        for c in (0..N).filter(|&c| r < layout.len_of(c)) {
            let src = (layout.offset_of(c) + r) * C;
            out_r[c * C..(c + 1) * C].copy_from_slice(&inp[src..src + C]);
        }
    };

    if config.use_parallel(out.len()) {
        out.par_chunks_mut(row).enumerate().for_each(fill_row);
    } else {
        out.chunks_mut(row).enumerate().for_each(fill_row);
    }
    out
}

/// 执行 pack 的反向传播。
/// * dinp[offset(c) + r] = dout[r][c]
/// * 纯数据搬运算子的梯度就是反方向的搬运，因此与 unpack 前向完全相同；lengths 没有梯度
///
/// # 参数
/// * `dout`: 输出梯度，形状为 (T, N, C)，T = max(lengths)。
///
/// # 输出
/// 输入梯度 dinp，形状为 (M, C)。
pub fn pack_backward<F: Element>(
    dout: &[F],
    layout: &SeqLayout,
    C: usize,
    config: &KernelConfig,
) -> Vec<F> {
    unpack_forward(dout, layout, C, config)
}

/// 执行 unpack 的前向传播：把 (T, N, C) 的填充张量还原成扁平的 (M, C)。
/// * out[offset(c) + r] = inp[r][c]，r < lengths[c]
/// * r >= lengths[c] 的填充位置从不读取
///
/// # 参数
/// * `inp` (输入): 形状为 (T, N, C)，T = max(lengths)。
/// * `layout`: lengths 以及前缀和 offsets。
/// * `C`: 特征块大小。
///
/// # 实现细节
/// - 输出的每一行都来自输入，所以直接按顺序收集，不预先填零。
/// - 并行时每个序列是一个 rayon 任务，collect 保证结果按序列顺序拼接。
pub fn unpack_forward<F: Element>(
    inp: &[F],
    layout: &SeqLayout,
    C: usize,
    config: &KernelConfig,
) -> Vec<F> {
    let N = layout.num_seqs();
    let M = layout.total_len();
    debug_assert_eq!(inp.len(), layout.max_len() * N * C);

    if M * C == 0 {
        return Vec::new();
    }

    if config.use_parallel(M * C) {
        (0..N)
            .into_par_iter()
            .flat_map_iter(move |c| {
                (0..layout.len_of(c)).flat_map(move |r| {
                    let src = (r * N + c) * C;
                    inp[src..src + C].iter().copied()
                })
            })
            .collect()
    } else {
        let mut out = Vec::with_capacity(M * C);
        for c in 0..N {
            for r in 0..layout.len_of(c) {
                let src = (r * N + c) * C;
                out.extend_from_slice(&inp[src..src + C]);
            }
        }
        out
    }
}

/// 执行 unpack 的反向传播。
/// * dinp[r][c] = dout[offset(c) + r]，填充位置的梯度为 0
/// * 与 pack 前向完全相同
///
/// # 参数
/// * `dout`: 输出梯度，形状为 (M, C)。
///
/// # 输出
/// 输入梯度 dinp，形状为 (max(lengths), N, C)。
pub fn unpack_backward<F: Element>(
    dout: &[F],
    layout: &SeqLayout,
    C: usize,
    config: &KernelConfig,
) -> Vec<F> {
    pack_forward(dout, layout, C, config)
}
