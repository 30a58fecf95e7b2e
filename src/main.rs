#![allow(non_snake_case)]

use std::time::Instant;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rnnpack::random_sample::*;
use rnnpack::{KernelConfig, OpKind, Result, Tensor};

// ----------------------------------------------------------------------------
// 演示循环：随机生成一批变长序列，pack 之后再 unpack，检查往返是否无损

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = KernelConfig::from_env()?;
    info!(?config, "kernel config");

    let pack_op = OpKind::from_name("PackRNNSequence")?;
    let unpack_op = pack_op.gradient();

    // 随机种子
    let mut rng_state: u64 = 1337;
    let steps = 20;
    let mut failures = 0;

    for step in 0..steps {
        let N = random_below(&mut rng_state, 11) as usize; // 批量大小 [0, 10]
        let k = random_below(&mut rng_state, 5) + 1; // 最大序列长度 [1, 5]
        let dim = random_below(&mut rng_state, 5) as usize + 1; // 特征维度 [1, 5]

        let lengths = random_lengths(&mut rng_state, N, k);
        let M: usize = lengths.iter().map(|&l| l as usize).sum();
        let values = Tensor::new(&[M, dim], random_values(&mut rng_state, M * dim))?;

        let start = Instant::now();
        let packed = pack_op.run(&values, &lengths, &config)?; // (T, N, dim)
        let unpacked = unpack_op.run(&packed, &lengths, &config)?; // (M, dim)
        let duration = start.elapsed();

        if unpacked != values {
            failures += 1;
            warn!(step, ?lengths, "round trip mismatch");
        }
        info!(
            step,
            N,
            dim,
            packed = ?packed.shape(),
            "round trip (took {:.3} ms)",
            duration.as_secs_f64() * 1000.0
        );
    }

    info!(steps, failures, "done");
    Ok(())
}
