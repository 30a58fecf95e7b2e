//! pack / unpack 的错误类型

use thiserror::Error;

/// pack 或 unpack 过程中可能出现的错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    /// 序列长度为负数
    #[error("Invalid length {length} for sequence {index}")]
    InvalidLength {
        /// 序列（列）下标
        index: usize,
        /// 出错的长度值
        length: i64,
    },

    /// 输入形状与 lengths 不一致
    #[error("Shape mismatch in {op}: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        /// 拒绝该输入的算子
        op: &'static str,
        /// 期望形状的描述
        expected: String,
        /// 输入的实际形状
        actual: Vec<usize>,
    },

    /// 数据长度与形状的元素个数不符
    #[error("Data length mismatch: shape holds {expected} elements, got {actual}")]
    DataLength {
        /// 形状各维的乘积
        expected: usize,
        /// 实际数据长度
        actual: usize,
    },

    /// 形状各维的乘积超出 usize 范围
    #[error("Shape {0:?} overflows the addressable element count")]
    ShapeOverflow(Vec<usize>),

    /// 没有这个名字的算子
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// 配置值非法
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidConfig {
        /// 环境变量名
        key: &'static str,
        /// 原始值
        value: String,
    },
}

/// pack / unpack 的结果类型
pub type Result<T> = std::result::Result<T, PackError>;
