//! ChaCha8-backed RNG
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::{Mode, ZRng};

pub struct ChaChaRng {
    mode: Mode,
    predictable_range: u16,
    predictable_next: u16,
    rng: ChaCha8Rng,
}

impl Default for ChaChaRng {
    fn default() -> Self {
        ChaChaRng::new()
    }
}

impl ChaChaRng {
    pub fn new() -> ChaChaRng {
        ChaChaRng {
            mode: Mode::Random,
            predictable_range: 1,
            predictable_next: 1,
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl ZRng for ChaChaRng {
    fn type_name(&self) -> &str {
        "ChaChaRng"
    }

    fn seed(&mut self, seed: u16) {
        if seed == 0 {
            self.rng = ChaCha8Rng::from_entropy();
        } else {
            self.rng = ChaCha8Rng::seed_from_u64(seed as u64)
        }
        self.mode = Mode::Random;
    }

    fn predictable(&mut self, seed: u16) {
        self.predictable_range = seed;
        self.predictable_next = 1;
        self.mode = Mode::Predictable;
    }

    fn random(&mut self, range: u16) -> u16 {
        match self.mode {
            Mode::Predictable => {
                let v = self.predictable_next % range;
                if self.predictable_next == self.predictable_range {
                    self.predictable_next = 1;
                } else {
                    self.predictable_next += 1;
                }
                // The predictable sequence is 1-based
                v + 1
            }
            Mode::Random => self.rng.gen_range(1..=range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_in_range() {
        let mut rng = ChaChaRng::new();
        for _ in 0..1000 {
            let v = rng.random(100);
            assert!((1..=100).contains(&v));
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = ChaChaRng::new();
        let mut b = ChaChaRng::new();
        a.seed(0x1234);
        b.seed(0x1234);
        for _ in 0..100 {
            assert_eq!(a.random(1000), b.random(1000));
        }
    }

    #[test]
    fn test_predictable_cycles() {
        let mut rng = ChaChaRng::new();
        rng.predictable(3);
        let first: Vec<u16> = (0..6).map(|_| rng.random(100)).collect();
        // Sequence 1,2,3 repeating, shifted into 1..=range
        assert_eq!(first, vec![2, 3, 4, 2, 3, 4]);
    }

    #[test]
    fn test_predictable_wraps_range() {
        let mut rng = ChaChaRng::new();
        rng.predictable(5);
        for _ in 0..10 {
            let v = rng.random(2);
            assert!((1..=2).contains(&v));
        }
    }
}
