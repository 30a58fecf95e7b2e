pub fn random_u32(state: &mut u64) -> u32 {
    // xorshift算法: https://en.wikipedia.org/wiki/Xorshift#xorshift.2A
    let mut x = *state;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    *state = x;
    (x.wrapping_mul(0x2545F4914F6CDD1D) >> 32) as u32
}

pub fn random_f32(state: &mut u64) -> f32 {
    // random float32 in [0,1)
    (random_u32(state) >> 8) as f32 / 16777216.0
}

/// [0, n) 中的随机整数，n 必须大于 0
pub fn random_below(state: &mut u64, n: u32) -> u32 {
    random_u32(state) % n
}

/// 生成 n 个取值在 [1, k] 的序列长度
pub fn random_lengths(state: &mut u64, n: usize, k: u32) -> Vec<i32> {
    (0..n)
        .map(|_| random_below(state, k) as i32 + 1)
        .collect()
}

/// 生成 len 个 [0,1) 的随机数
pub fn random_values(state: &mut u64, len: usize) -> Vec<f32> {
    (0..len).map(|_| random_f32(state)).collect()
}
