//! Seeded corruption of generated source, used to exercise the repair loop.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

/// Characters that reliably break Python syntax when dropped into code.
const GLYPHS: &[char] = &['(', ')', ':', '[', ']', '{', '}', '@', '$', '?', '`'];
const MAX_CORRUPTIONS: usize = 3;

/// Deterministic single-use noise source.
///
/// The same seed and input always yield the same corruption. An injector fires
/// at most once; later calls are no-ops.
#[derive(Debug)]
pub struct NoiseInjector {
    rng: StdRng,
    spent: bool,
}

impl NoiseInjector {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            spent: false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Corrupt up to three distinct non-whitespace characters of `source`.
    ///
    /// Returns `None` when the injector was already used or the text has
    /// nothing to corrupt. Either way the injector is spent afterwards.
    pub fn inject(&mut self, source: &str) -> Option<String> {
        if self.spent {
            return None;
        }
        self.spent = true;

        let mut chars: Vec<char> = source.chars().collect();
        let positions: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter(|(_, ch)| !ch.is_whitespace())
            .map(|(idx, _)| idx)
            .collect();
        if positions.is_empty() {
            return None;
        }

        let count = self.rng.gen_range(1..=MAX_CORRUPTIONS.min(positions.len()));
        for picked in index::sample(&mut self.rng, positions.len(), count) {
            let pos = positions[picked];
            let original = chars[pos];
            let choices: Vec<char> = GLYPHS.iter().copied().filter(|g| *g != original).collect();
            chars[pos] = choices[self.rng.gen_range(0..choices.len())];
        }
        Some(chars.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "def is_prime(n):\n    return n > 1\n\nassert is_prime(7)\n";

    #[test]
    fn same_seed_gives_same_corruption() {
        let first = NoiseInjector::from_seed(42).inject(SOURCE).expect("noise");
        let second = NoiseInjector::from_seed(42).inject(SOURCE).expect("noise");
        assert_eq!(first, second);
    }

    #[test]
    fn corruption_changes_text_but_not_layout() {
        let noised = NoiseInjector::from_seed(7).inject(SOURCE).expect("noise");
        assert_ne!(noised, SOURCE);
        assert_eq!(noised.chars().count(), SOURCE.chars().count());
        assert_eq!(noised.lines().count(), SOURCE.lines().count());
    }

    #[test]
    fn fires_at_most_once() {
        let mut injector = NoiseInjector::from_seed(1);
        assert!(injector.inject(SOURCE).is_some());
        assert!(injector.is_spent());
        assert_eq!(injector.inject(SOURCE), None);
    }

    #[test]
    fn whitespace_only_input_is_untouched_and_spends_injector() {
        let mut injector = NoiseInjector::from_seed(3);
        assert_eq!(injector.inject(" \n\t"), None);
        assert!(injector.is_spent());
    }
}
