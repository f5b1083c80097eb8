//! Randomness used by tasks to pick among the entities they read.

use rand::Rng;
use rand::rngs::SmallRng;

/// A source of the random choices a task makes.
///
/// Tasks never talk to an RNG directly, so that tests can script the exact choices.
pub trait RandomSource: Send {
    /// Returns a uniformly distributed index in `0..len`.
    ///
    /// `len` must not be zero.
    fn index(&mut self, len: usize) -> usize;

    /// Returns a uniformly distributed number in `0..=max`.
    fn up_to(&mut self, max: usize) -> usize;
}

impl RandomSource for SmallRng {
    fn index(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }

    fn up_to(&mut self, max: usize) -> usize {
        self.random_range(0..=max)
    }
}

/// Picks one element of `items` uniformly, or `None` if `items` is empty.
pub fn choose<'a, T>(random: &mut dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    Some(&items[random.index(items.len())])
}
