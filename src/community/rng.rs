//! Deterministic seeded PRNG for label propagation's shuffle and tie-break
//! draws, adapted from the same hand-rolled LCG shape used for sampling
//! elsewhere in this codebase — kept dependency-free so the determinism
//! invariant (spec §8 property 6) never depends on an external crate's
//! version-to-version stability.

pub struct LcgRng {
    state: u64,
}

impl LcgRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.wrapping_add(1) }
    }

    pub fn next(&mut self) -> u64 {
        // LCG constants from Numerical Recipes.
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform-ish index in `0..bound`. `bound` must be non-zero.
    pub fn next_below(&mut self, bound: usize) -> usize {
        (self.next() as usize) % bound
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        if items.len() < 2 {
            return;
        }
        for i in (1..items.len()).rev() {
            let j = self.next_below(i + 1);
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_produces_same_sequence() {
        let mut a = LcgRng::new(13);
        let mut b = LcgRng::new(13);
        let seq_a: Vec<u64> = (0..5).map(|_| a.next()).collect();
        let seq_b: Vec<u64> = (0..5).map(|_| b.next()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = LcgRng::new(1);
        let mut b = LcgRng::new(2);
        assert_ne!(a.next(), b.next());
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = LcgRng::new(42);
        let mut items: Vec<usize> = (0..20).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }
}
