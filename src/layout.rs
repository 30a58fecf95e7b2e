use crate::error::{PackError, Result};

/// 一批变长序列的布局信息
///
/// 由 lengths 向量一次性计算出前缀和 offsets，之后每个序列的拷贝区间互不重叠，
/// 可以独立（并行）处理：
/// * `offsets[c] = sum(lengths[0..c))`
/// * `offsets[N] = M = sum(lengths)`
/// * `max_len = T`（N == 0 或全部长度为 0 时 T = 0）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeqLayout {
    lengths: Vec<usize>,
    offsets: Vec<usize>,
    max_len: usize,
}

impl SeqLayout {
    /// 校验 lengths 并计算 offsets，任何负数长度都会在拷贝开始之前被拒绝
    pub fn new(lengths: &[i32]) -> Result<Self> {
        let mut lens = Vec::with_capacity(lengths.len());
        let mut offsets = Vec::with_capacity(lengths.len() + 1);
        let mut offset = 0usize;
        let mut max_len = 0usize;
        offsets.push(0);
        for (index, &len) in lengths.iter().enumerate() {
            let len = usize::try_from(len).map_err(|_| PackError::InvalidLength {
                index,
                length: i64::from(len),
            })?;
            offset += len;
            max_len = max_len.max(len);
            lens.push(len);
            offsets.push(offset);
        }
        Ok(SeqLayout {
            lengths: lens,
            offsets,
            max_len,
        })
    }

    /// 序列个数 N
    pub fn num_seqs(&self) -> usize {
        self.lengths.len()
    }

    /// 最长序列长度 T
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// 所有序列的总行数 M
    pub fn total_len(&self) -> usize {
        self.offsets[self.lengths.len()]
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn len_of(&self, c: usize) -> usize {
        self.lengths[c]
    }

    pub fn offset_of(&self, c: usize) -> usize {
        self.offsets[c]
    }
}
