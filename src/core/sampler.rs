use std::f64::consts::PI;

/// Source of normally distributed variates, injected into the simulator so
/// tests can substitute a deterministic stub.
pub trait Sampler {
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64;
}

pub fn derive_seed(base_seed: u64, strategy_index: u32, run_id: u32) -> u64 {
    let mixed = base_seed ^ ((strategy_index as u64) << 32) ^ run_id as u64;
    splitmix64(mixed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Xorshift64* uniform source feeding a Box-Muller transform. Statistical
/// quality only; not suitable for anything cryptographic.
pub struct SeededSampler {
    state: u64,
}

impl SeededSampler {
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }

    // Exact zero would hit the logarithm singularity.
    fn next_f64_nonzero(&mut self) -> f64 {
        loop {
            let u = self.next_f64();
            if u > 0.0 {
                return u;
            }
        }
    }
}

impl Sampler for SeededSampler {
    // Every call consumes two fresh uniforms; the sine branch is discarded so
    // no state beyond the uniform stream persists between calls.
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64_nonzero();
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + std_dev * z
    }
}
