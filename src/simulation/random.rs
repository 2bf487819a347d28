//! Injectable randomness.

use rand::{Rng, RngCore};

/// Source of every random decision made while simulating a request.
///
/// Any `rand` RNG implements this, so production code hands in an entropy-seeded
/// `StdRng` and tests hand in one seeded with a constant.
pub trait RandomSource: Send {
    /// Uniform float in `[min, max)`. Returns `min` when the range is empty.
    fn uniform(&mut self, min: f64, max: f64) -> f64;

    /// Uniform integer in `[min, max]`.
    fn int_between(&mut self, min: i64, max: i64) -> i64;

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    /// Fair coin.
    fn flip(&mut self) -> bool;

    /// Raw 64 bits, used for span and trace identifiers.
    fn next_u64(&mut self) -> u64;
}

impl<R: Rng + Send> RandomSource for R {
    fn uniform(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        self.gen_range(min..max)
    }

    fn int_between(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.gen_range(min..=max)
    }

    fn index(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }

    fn flip(&mut self) -> bool {
        self.gen_bool(0.5)
    }

    fn next_u64(&mut self) -> u64 {
        RngCore::next_u64(self)
    }
}

/// Deterministic source for unit tests: every range yields its minimum and
/// choices are read from a script.
#[cfg(test)]
pub(crate) struct ScriptedSource {
    choices: std::collections::VecDeque<usize>,
    flips: std::collections::VecDeque<bool>,
    counter: u64,
}

#[cfg(test)]
impl ScriptedSource {
    pub(crate) fn new(choices: impl IntoIterator<Item = usize>, flips: impl IntoIterator<Item = bool>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
            flips: flips.into_iter().collect(),
            counter: 0,
        }
    }
}

#[cfg(test)]
impl RandomSource for ScriptedSource {
    fn uniform(&mut self, min: f64, _max: f64) -> f64 {
        min
    }

    fn int_between(&mut self, min: i64, _max: i64) -> i64 {
        min
    }

    fn index(&mut self, len: usize) -> usize {
        self.choices.pop_front().unwrap_or(0) % len
    }

    fn flip(&mut self) -> bool {
        self.flips.pop_front().unwrap_or(false)
    }

    fn next_u64(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }
}
