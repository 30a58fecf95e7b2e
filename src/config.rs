use crate::error::{PackError, Result};

pub const ENV_PARALLELISM: &str = "RNNPACK_PARALLELISM";
pub const ENV_MIN_PARALLEL_LEN: &str = "RNNPACK_MIN_PARALLEL_LEN";

/// 并行化控制
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    /// 单线程顺序拷贝
    None,
    /// 使用 rayon 全局线程池
    Rayon,
}

/// 拷贝内核的运行参数
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelConfig {
    pub parallelism: Parallelism,
    /// 输出元素个数低于该阈值时不启用并行，避免小批量的调度开销
    pub min_parallel_len: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            parallelism: Parallelism::Rayon,
            min_parallel_len: 1 << 14,
        }
    }
}

impl KernelConfig {
    pub fn sequential() -> Self {
        KernelConfig {
            parallelism: Parallelism::None,
            ..Default::default()
        }
    }

    /// 从环境变量读取配置，未设置的项使用默认值
    ///
    /// * `RNNPACK_PARALLELISM`: `none` | `rayon`
    /// * `RNNPACK_MIN_PARALLEL_LEN`: 非负整数
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = KernelConfig::default();
        if let Some(value) = lookup(ENV_PARALLELISM) {
            config.parallelism = match value.trim().to_ascii_lowercase().as_str() {
                "none" | "off" | "0" => Parallelism::None,
                "rayon" | "on" | "1" => Parallelism::Rayon,
                _ => {
                    return Err(PackError::InvalidConfig {
                        key: ENV_PARALLELISM,
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup(ENV_MIN_PARALLEL_LEN) {
            config.min_parallel_len =
                value
                    .trim()
                    .parse()
                    .map_err(|_| PackError::InvalidConfig {
                        key: ENV_MIN_PARALLEL_LEN,
                        value: value.clone(),
                    })?;
        }
        Ok(config)
    }

    /// 对给定的输出大小是否走并行路径
    pub fn use_parallel(&self, len: usize) -> bool {
        self.parallelism == Parallelism::Rayon && len >= self.min_parallel_len
    }
}
