use rand::rngs::ThreadRng;
use rand::Rng;

/// Two-word 32-bit multiply-add-shift generator. Given the same seed it
/// replays the same sequence, which is what makes seeded mazes reproducible.
#[derive(Clone, Debug)]
pub struct Mwc32 {
    z: u32,
    w: u32,
}

impl Mwc32 {
    pub fn new(seed: u32) -> Self {
        Self {
            z: 987_654_321u32.wrapping_sub(seed),
            w: 123_456_789u32.wrapping_add(seed),
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.z = 36_969u32.wrapping_mul(self.z & 0xffff).wrapping_add(self.z >> 16);
        self.w = 18_000u32.wrapping_mul(self.w & 0xffff).wrapping_add(self.w >> 16);
        (self.z << 16).wrapping_add(self.w & 0xffff)
    }

    fn next_unit(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }
}

/// Uniform source over `[0, 1)`. Seeded for reproducible generation,
/// ambient otherwise.
pub enum RandomSource {
    Seeded(Mwc32),
    Ambient(ThreadRng),
}

impl RandomSource {
    pub fn from_seed(seed: Option<u32>) -> Self {
        match seed {
            Some(s) => RandomSource::Seeded(Mwc32::new(s)),
            None => RandomSource::Ambient(rand::thread_rng()),
        }
    }

    pub fn next_unit(&mut self) -> f64 {
        match self {
            RandomSource::Seeded(mwc) => mwc.next_unit(),
            RandomSource::Ambient(rng) => rng.gen::<f64>(),
        }
    }

    /// Uniform index in `0..n`. `n` must be non-zero.
    pub fn below(&mut self, n: usize) -> usize {
        (self.next_unit() * n as f64) as usize
    }

    /// Uniform value in `lo..=lo + width - 1`.
    pub fn in_band(&mut self, lo: usize, width: usize) -> usize {
        lo + self.below(width)
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }
}
