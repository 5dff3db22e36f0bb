pub trait RandomSource {
    fn next_u32(&mut self) -> u32;

    /// Uniform draw in `[0, bound)`; `bound` of zero yields zero.
    fn next_bounded(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        let threshold = (u64::from(u32::MAX) + 1) / u64::from(bound) * u64::from(bound);
        let mut candidate = self.next_u32();
        while u64::from(candidate) >= threshold {
            candidate = self.next_u32();
        }
        candidate % bound
    }
}

/// mulberry32
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRandom {
    state: u32,
}

impl SeededRandom {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RandomSource for SeededRandom {
    fn next_u32(&mut self) -> u32 {
        let mut next = self.state.wrapping_add(0x6d2b79f5);
        self.state = next;
        next = (next ^ (next >> 15)).wrapping_mul(next | 1);
        next ^= next.wrapping_add((next ^ (next >> 7)).wrapping_mul(next | 61));
        next ^ (next >> 14)
    }
}
