//! 变长序列批数据的打包与解包
//!
//! * `PackRNNSequence`：把沿第 0 维拼接的扁平批数据 (M, *D) 搬运成按时间步对齐、
//!   以 0 填充的 (T, N, *D) 张量
//! * `UnpackRNNSequence`：上面的逆操作
//!
//! 两者互为梯度：一个算子的反向传播就是另一个算子作用在输出梯度上。

pub mod common;
pub mod config;
pub mod error;
pub mod layout;
pub mod operator;
pub mod passes;
pub mod random_sample;

pub use common::dyn_tensor::DynTensor;
pub use common::tensor::{Element, Tensor};
pub use config::{KernelConfig, Parallelism};
pub use error::{PackError, Result};
pub use layout::SeqLayout;
pub use operator::{
    pack, pack_grad, pack_grad_with_config, pack_with_config, unpack, unpack_grad,
    unpack_grad_with_config, unpack_with_config, OpKind,
};
