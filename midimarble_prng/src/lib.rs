// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// The generator core is integer-only so the raw `u64` stream is identical on
// every platform; the float helpers are thin, order-preserving conversions
// on top of it.
//
// This crate is the single source of randomness for the layout engine. The
// placement search draws retry perturbations, backtrack rerolls, and
// reflection jitter from a `MarbleRng` that the caller constructs and
// threads through explicitly. There is no global or thread-local generator:
// two runs with the same seed and the same note list produce the same
// layout, which is what the golden-output tests rely on.
//
// **Critical constraint: determinism.** Every method on `MarbleRng` must
// produce identical output given the same prior state. Do not reach for OS
// entropy, the stdlib hasher, or any other hidden state in this module.

use serde::{Deserialize, Serialize};

/// Seed used by the encoder CLI when `--seed` is not given.
pub const DEFAULT_SEED: u64 = 42;

/// Xoshiro256++ PRNG.
///
/// Each layout run owns one `MarbleRng`, seeded deterministically, and hands
/// `&mut` borrows of it down to whichever stage needs a perturbation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarbleRng {
    s: [u64; 4],
}

impl MarbleRng {
    /// Seed a generator. SplitMix64 expands the `u64` into the 256-bit state,
    /// so nearby seeds still start from unrelated states.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform `f64` in `[0, 1)` from the top 53 bits of the next `u64`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random value in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        assert!(low < high, "range_f64: low must be less than high");
        low + self.next_f64() * (high - low)
    }

    /// Uniform angle offset in `[-spread, spread)`.
    ///
    /// Returns 0.0 without consuming any state when `spread <= 0`, so a
    /// config that disables jitter leaves the stream untouched.
    pub fn symmetric(&mut self, spread: f64) -> f64 {
        if spread <= 0.0 {
            return 0.0;
        }
        self.range_f64(-spread, spread)
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }
}

/// SplitMix64, used only for seeding xoshiro256++ from a single `u64`.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_seed_stream_is_pinned() {
        // Golden layouts depend on this exact stream.
        let mut rng = MarbleRng::new(DEFAULT_SEED);
        assert_eq!(rng.next_u64(), 0xd076_4d4f_4476_689f);
        assert_eq!(rng.next_u64(), 0x519e_4174_576f_3791);
        assert_eq!(rng.next_u64(), 0xfbe0_7cfb_0c24_ed8c);
    }

    #[test]
    fn same_seed_replays_stream() {
        let mut a = MarbleRng::new(7);
        let mut b = MarbleRng::new(7);
        for _ in 0..1000 {
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }

    #[test]
    fn seeds_diverge() {
        let mut a = MarbleRng::new(DEFAULT_SEED);
        let mut b = MarbleRng::new(DEFAULT_SEED + 1);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn floats_stay_in_range() {
        let mut rng = MarbleRng::new(12345);
        for _ in 0..10_000 {
            let unit = rng.next_f64();
            assert!((0.0..1.0).contains(&unit), "next_f64 out of range: {unit}");
            let v = rng.range_f64(-1.5, 3.5);
            assert!((-1.5..3.5).contains(&v), "range_f64 out of range: {v}");
        }
    }

    #[test]
    fn symmetric_is_bounded_and_centered() {
        let mut rng = MarbleRng::new(31);
        let mut sum = 0.0;
        let n = 10_000;
        for _ in 0..n {
            let v = rng.symmetric(0.26);
            assert!((-0.26..0.26).contains(&v), "symmetric out of range: {v}");
            sum += v;
        }
        let mean = sum / n as f64;
        assert!(mean.abs() < 0.02, "symmetric mean drifted: {mean}");
    }

    #[test]
    fn symmetric_zero_spread_consumes_nothing() {
        let mut a = MarbleRng::new(9);
        let mut b = MarbleRng::new(9);
        assert_eq!(a.symmetric(0.0), 0.0);
        assert_eq!(a.symmetric(-1.0), 0.0);
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn integer_ranges_stay_in_bounds() {
        let mut rng = MarbleRng::new(999);
        let mut seen = [false; 4];
        for _ in 0..10_000 {
            let v = rng.range_u64(36, 84);
            assert!((36..84).contains(&v), "range_u64 out of range: {v}");
            let k = rng.range_usize(1, 5);
            assert!((1..5).contains(&k), "range_usize out of range: {k}");
            seen[k - 1] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn snapshot_resumes_stream() {
        let mut rng = MarbleRng::new(DEFAULT_SEED);
        for _ in 0..100 {
            rng.symmetric(1.0);
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: MarbleRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
