use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seedable random source for spawn positions and explosion splits.
#[derive(Clone, Debug)]
pub struct ArenaRng {
    inner: StdRng,
}

impl ArenaRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_os_rng(),
        }
    }

    /// Uniform integer in `[min, max]`; collapses to `min` on an empty range.
    pub fn int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.inner.random_range(min..=max)
    }

    /// Uniform coordinate in `[0, limit)`.
    pub fn below(&mut self, limit: i32) -> i32 {
        self.int(0, limit - 1)
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.inner.random_range(0..len)
    }
}
