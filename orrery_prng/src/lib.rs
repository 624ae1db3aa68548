// Deterministic, portable pseudo-random number generator with labeled forking.
//
// Implements xoshiro128++ (Blackman & Vigna) over four 32-bit words, seeded
// through SplitMix32. Hand-rolled with no RNG crate dependency so the output
// is identical on every platform and in every build profile.
//
// This crate is the only source of randomness for `orrery_sim`'s universe
// generator. The generator never shares one stream across unrelated concerns:
// it calls `fork("belt:3")`, `fork("system:7")`, etc. to obtain sub-streams
// keyed by stable labels. Forking is a pure derivation: it reads the
// parent's state but never advances it. Toggling one feature (and thus
// skipping its draws) cannot perturb any other feature's sequence.
//
// Seeds may be numbers or strings (`Seed`). Numbers are truncated to their
// low 32 bits; strings go through `hash_label`, an order-sensitive FNV-1a
// variant with a final avalanche step.
//
// **Critical constraint: determinism.** Every method on `SeededRng` must
// produce identical output given the same prior state, regardless of
// platform, compiler version, or optimization level. Floating point is only
// used to *present* integer output (`next_f64`), never inside the recurrence.

use serde::{Deserialize, Serialize};

/// State used when seeding produces all-zero words, which would lock the
/// xoshiro recurrence at zero forever.
const ZERO_STATE_SENTINEL: [u32; 4] = [0x9e37_79b9, 0x243f_6a88, 0xb7e1_5162, 0x7f4a_7c15];

/// A user-facing seed: either a number or an arbitrary string.
///
/// Serialized untagged, so JSON configs may write `"seed": 42` or
/// `"seed": "andromeda"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
    Number(i64),
    Text(String),
}

impl Seed {
    /// Reduce the seed to the 32-bit value that initializes the generator.
    pub fn to_u32(&self) -> u32 {
        match self {
            // Truncation to the low 32 bits is the documented behavior.
            Seed::Number(n) => *n as u32,
            Seed::Text(s) => hash_label(s),
        }
    }
}

impl From<u32> for Seed {
    fn from(n: u32) -> Self {
        Seed::Number(i64::from(n))
    }
}

impl From<i64> for Seed {
    fn from(n: i64) -> Self {
        Seed::Number(n)
    }
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        Seed::Text(s.to_string())
    }
}

impl From<String> for Seed {
    fn from(s: String) -> Self {
        Seed::Text(s)
    }
}

/// Xoshiro128++ PRNG, the generator's sole source of randomness.
///
/// Cheap to clone (16 bytes). Serializable so a paused generation stream can
/// be stored and resumed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    s: [u32; 4],
}

impl SeededRng {
    /// Create a PRNG from a 32-bit seed.
    ///
    /// SplitMix32 expands the seed into the 128-bit state, so adjacent seeds
    /// (1, 2, 3, ...) start from uncorrelated states.
    pub fn new(seed: u32) -> Self {
        let mut sm = seed;
        Self::from_state([
            splitmix32(&mut sm),
            splitmix32(&mut sm),
            splitmix32(&mut sm),
            splitmix32(&mut sm),
        ])
    }

    /// Create a PRNG from a numeric or string seed.
    pub fn from_seed(seed: &Seed) -> Self {
        Self::new(seed.to_u32())
    }

    fn from_state(s: [u32; 4]) -> Self {
        if s == [0; 4] {
            Self {
                s: ZERO_STATE_SENTINEL,
            }
        } else {
            Self { s }
        }
    }

    /// Generate the next `u32` in the sequence.
    pub fn next_u32(&mut self) -> u32 {
        let result = self.s[0]
            .wrapping_add(self.s[3])
            .rotate_left(7)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 9;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(11);

        result
    }

    /// Generate a uniform `f64` in [0, 1).
    ///
    /// Composes two words: the upper 27 bits of the first and the upper 26
    /// bits of the second fill the 53-bit mantissa.
    pub fn next_f64(&mut self) -> f64 {
        let a = u64::from(self.next_u32() >> 5);
        let b = u64::from(self.next_u32() >> 6);
        ((a << 26) | b) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random value in `[low, high)`.
    ///
    /// Returns `low` when the interval is empty or inverted.
    pub fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        low + self.next_f64() * (high - low)
    }

    /// Generate a uniform random integer in `[min, max]` (inclusive).
    ///
    /// Operands are swapped when `min > max`. Uses rejection sampling: draws
    /// at or above the largest multiple of the range below 2^32 are
    /// discarded, so no residue is favored.
    pub fn int(&mut self, min: i32, max: i32) -> i32 {
        let (lo, hi) = if min > max { (max, min) } else { (min, max) };
        let range = (i64::from(hi) - i64::from(lo) + 1) as u64;
        (i64::from(lo) + self.below(range) as i64) as i32
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Panics if `low >= high` or the span does not fit in 32 bits.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        assert!(low < high, "range_usize: low must be less than high");
        let span = (high - low) as u64;
        assert!(span <= 1 << 32, "range_usize: span must fit in 32 bits");
        low + self.below(span) as usize
    }

    /// Uniform draw in `[0, range)` for `range` in `1..=2^32`.
    fn below(&mut self, range: u64) -> u64 {
        if range == 1 << 32 {
            return u64::from(self.next_u32());
        }
        let limit = ((1u64 << 32) / range) * range;
        loop {
            let r = u64::from(self.next_u32());
            if r < limit {
                return r % range;
            }
        }
    }

    /// Return `true` with probability `p`.
    ///
    /// `p <= 0.0` always returns false, `p >= 1.0` always returns true.
    pub fn bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick a uniformly random element. `None` for an empty slice.
    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.range_usize(0, items.len());
        items.get(idx)
    }

    /// Derive an independent sub-stream keyed by `label`.
    ///
    /// Draws four words from a *copy* of the current state and mixes each
    /// with the label hash through SplitMix32. `self` is not advanced:
    /// forking the same label twice yields identical children, and forks
    /// taken in any order see the same parent.
    pub fn fork(&self, label: &str) -> Self {
        let mut copy = self.clone();
        let h = hash_label(label);
        let mut s = [0u32; 4];
        for (i, word) in s.iter_mut().enumerate() {
            let mut mix = copy.next_u32() ^ h.rotate_left(i as u32 * 8);
            *word = splitmix32(&mut mix);
        }
        Self::from_state(s)
    }
}

/// Order-sensitive, non-cryptographic 32-bit string hash.
///
/// FNV-1a over the UTF-8 bytes followed by the murmur3 finalizer, so short
/// labels that differ in one character still spread across all bits.
pub fn hash_label(label: &str) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for &b in label.as_bytes() {
        h ^= u32::from(b);
        h = h.wrapping_mul(0x0100_0193);
    }
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}

/// SplitMix32, used for seeding and for fork derivation.
fn splitmix32(state: &mut u32) -> u32 {
    *state = state.wrapping_add(0x9e37_79b9);
    let mut z = *state;
    z = (z ^ (z >> 16)).wrapping_mul(0x85eb_ca6b);
    z = (z ^ (z >> 13)).wrapping_mul(0xc2b2_ae35);
    z ^ (z >> 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn different_seeds_different_output() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(43);
        let va: Vec<u32> = (0..4).map(|_| a.next_u32()).collect();
        let vb: Vec<u32> = (0..4).map(|_| b.next_u32()).collect();
        assert_ne!(va, vb);
    }

    #[test]
    fn string_seed_is_order_sensitive() {
        assert_ne!(hash_label("ab"), hash_label("ba"));
        assert_eq!(
            Seed::from("andromeda").to_u32(),
            Seed::Text("andromeda".into()).to_u32()
        );
    }

    #[test]
    fn numeric_seed_truncates_to_32_bits() {
        let wide = Seed::Number((1i64 << 32) + 7);
        assert_eq!(wide.to_u32(), 7);
        assert_eq!(Seed::Number(-1).to_u32(), u32::MAX);
    }

    #[test]
    fn zero_state_is_remapped() {
        let mut rng = SeededRng::from_state([0; 4]);
        // A zero state would emit 0 forever.
        let outputs: Vec<u32> = (0..8).map(|_| rng.next_u32()).collect();
        assert!(outputs.iter().any(|&v| v != 0));
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = SeededRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "f64 out of range: {v}");
        }
    }

    #[test]
    fn range_f64_within_bounds() {
        let mut rng = SeededRng::new(777);
        for _ in 0..10_000 {
            let v = rng.range_f64(1.5, 3.5);
            assert!((1.5..3.5).contains(&v), "range_f64 out of range: {v}");
        }
        assert_eq!(rng.range_f64(2.0, 2.0), 2.0);
    }

    #[test]
    fn int_is_inclusive_and_bounded() {
        let mut rng = SeededRng::new(999);
        let mut saw_min = false;
        let mut saw_max = false;
        for _ in 0..10_000 {
            let v = rng.int(10, 20);
            assert!((10..=20).contains(&v), "int out of range: {v}");
            saw_min |= v == 10;
            saw_max |= v == 20;
        }
        assert!(saw_min && saw_max, "both endpoints should be reachable");
    }

    #[test]
    fn int_swaps_inverted_bounds() {
        let mut rng = SeededRng::new(5);
        for _ in 0..1000 {
            let v = rng.int(3, -3);
            assert!((-3..=3).contains(&v));
        }
    }

    #[test]
    fn int_full_range_does_not_panic() {
        let mut rng = SeededRng::new(5);
        for _ in 0..100 {
            let _ = rng.int(i32::MIN, i32::MAX);
        }
        assert_eq!(rng.int(4, 4), 4);
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = SeededRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn bool_distribution() {
        let mut rng = SeededRng::new(42);
        let n = 10_000;
        let true_count = (0..n).filter(|_| rng.bool(0.5)).count();
        // Should be roughly 50% ± 5%
        let pct = true_count as f64 / n as f64;
        assert!(
            (0.45..0.55).contains(&pct),
            "bool(0.5) should be ~50%, got {:.1}%",
            pct * 100.0
        );
    }

    #[test]
    fn bool_extremes() {
        let mut rng = SeededRng::new(42);
        for _ in 0..100 {
            assert!(!rng.bool(0.0));
            assert!(rng.bool(1.0));
        }
    }

    #[test]
    fn choice_covers_all_items() {
        let mut rng = SeededRng::new(8);
        let items = ["a", "b", "c"];
        let mut seen = [false; 3];
        for _ in 0..300 {
            let pick = rng.choice(&items).unwrap();
            let idx = items.iter().position(|i| i == pick).unwrap();
            seen[idx] = true;
        }
        assert_eq!(seen, [true; 3]);
        let empty: [u8; 0] = [];
        assert!(rng.choice(&empty).is_none());
    }

    #[test]
    fn fork_is_idempotent_and_does_not_advance_parent() {
        let parent = SeededRng::new(2024);
        let before = parent.clone();
        let mut a1 = parent.fork("belt:3");
        let mut a2 = parent.fork("belt:3");
        assert_eq!(parent, before);
        for _ in 0..100 {
            assert_eq!(a1.next_u32(), a2.next_u32());
        }
    }

    #[test]
    fn forks_with_different_labels_decorrelate() {
        let parent = SeededRng::new(2024);
        let mut a = parent.fork("a");
        let mut b = parent.fork("b");
        let va: Vec<u32> = (0..32).map(|_| a.next_u32()).collect();
        let vb: Vec<u32> = (0..32).map(|_| b.next_u32()).collect();
        let equal = va.iter().zip(&vb).filter(|(x, y)| x == y).count();
        assert_eq!(equal, 0);
    }

    #[test]
    fn fork_order_does_not_matter() {
        let parent = SeededRng::new(7);
        let first_a = parent.fork("a");
        let _ = parent.fork("b");
        let second_a = parent.fork("a");
        assert_eq!(first_a, second_a);
    }

    #[test]
    fn fork_differs_from_parent_stream() {
        let parent = SeededRng::new(7);
        let mut child = parent.fork("x");
        let mut p = parent.clone();
        let vp: Vec<u32> = (0..8).map(|_| p.next_u32()).collect();
        let vc: Vec<u32> = (0..8).map(|_| child.next_u32()).collect();
        assert_ne!(vp, vc);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut rng = SeededRng::new(42);
        // Advance state
        for _ in 0..100 {
            rng.next_u32();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: SeededRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u32(), restored.next_u32());
        }
    }

    #[test]
    fn seed_deserializes_from_number_or_string() {
        let n: Seed = serde_json::from_str("42").unwrap();
        let s: Seed = serde_json::from_str("\"andromeda\"").unwrap();
        assert_eq!(n, Seed::Number(42));
        assert_eq!(s, Seed::Text("andromeda".into()));
    }

    #[test]
    fn known_sequence_is_stable() {
        // If this ever breaks, determinism has been violated.
        let mut rng = SeededRng::new(0);
        let vals: Vec<u32> = (0..5).map(|_| rng.next_u32()).collect();
        assert_eq!(vals, [0xfbf0_95fd, 0xe5af_35af, 0x62cd_0a30, 0x7f4f_ad17, 0x61f6_05c3]);

        let mut rng = SeededRng::from_seed(&Seed::Number(42));
        let vals: Vec<u32> = (0..5).map(|_| rng.next_u32()).collect();
        assert_eq!(vals, [0x181d_1f2a, 0xff83_fdba, 0x5ad7_ba3f, 0xc1e6_ba82, 0xc320_fdab]);
    }

    #[test]
    fn known_fork_and_label_hashes_are_stable() {
        assert_eq!(hash_label(""), 0xab3e_7c0b);
        assert_eq!(hash_label("andromeda"), 0xf8cb_cdd7);
        assert_eq!(hash_label("belt:0"), 0x867b_fb54);

        let mut child = SeededRng::new(42).fork("belt:0");
        let vals: Vec<u32> = (0..3).map(|_| child.next_u32()).collect();
        assert_eq!(vals, [0xd25d_5384, 0xdf22_1948, 0x03b5_fe57]);
    }
}
