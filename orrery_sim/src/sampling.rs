// Distribution samplers layered on `SeededRng`.
//
// The PRNG itself only knows uniform draws. The generator needs a few
// continuous and discrete distributions on top of that:
// - `standard_normal`: Box–Muller over two uniform draws.
// - `gaussian` / `log_normal`: scaled and exponentiated normals, used for
//   positions and masses.
// - `geometric`: "how many children" counts, by inversion.
// - `weighted_index`: discrete choice from a probability table (star count).
//
// Every sampler takes the exact sub-stream it should consume; none of them
// fork or hold state.
//
// See also: `generator.rs` (the only caller), `orrery_prng` for the uniform
// source.

use crate::prng::SeededRng;
use std::f64::consts::TAU;

/// One draw from N(0, 1).
///
/// Uses `1 - next_f64()` for the radius term so the logarithm never sees 0.
pub fn standard_normal(rng: &mut SeededRng) -> f64 {
    let u1 = 1.0 - rng.next_f64();
    let u2 = rng.next_f64();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// One draw from N(mean, std_dev²).
pub fn gaussian(rng: &mut SeededRng, mean: f64, std_dev: f64) -> f64 {
    mean + std_dev * standard_normal(rng)
}

/// `exp(mu + sigma·Z)`.
pub fn log_normal(rng: &mut SeededRng, mu: f64, sigma: f64) -> f64 {
    (mu + sigma * standard_normal(rng)).exp()
}

/// Number of failures before the first success, success probability `p`,
/// capped at `cap`. Expected value (uncapped) is `(1 - p) / p`.
///
/// `p >= 1` always yields 0; `p <= 0` yields `cap`.
pub fn geometric(rng: &mut SeededRng, p: f64, cap: usize) -> usize {
    if p >= 1.0 {
        return 0;
    }
    if p <= 0.0 {
        return cap;
    }
    let u = 1.0 - rng.next_f64();
    let k = (u.ln() / (1.0 - p).ln()).floor();
    if k >= cap as f64 { cap } else { k as usize }
}

/// Index into `weights` drawn proportionally to the weights. Non-positive and
/// non-finite weights count as zero. Returns 0 when every weight is zero.
pub fn weighted_index(rng: &mut SeededRng, weights: &[f64]) -> usize {
    let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let total: f64 = weights.iter().copied().map(clean).sum();
    if total <= 0.0 {
        return 0;
    }
    let roll = rng.next_f64() * total;
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        let w = clean(w);
        if w > 0.0 {
            last_positive = i;
        }
        cumulative += w;
        if roll < cumulative {
            return i;
        }
    }
    // Rounding can leave `roll` a hair above the final cumulative sum.
    last_positive
}

/// Uniform draw in [-1, 1).
pub fn signed_unit(rng: &mut SeededRng) -> f64 {
    rng.range_f64(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_and_variance(samples: &[f64]) -> (f64, f64) {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        (mean, var)
    }

    #[test]
    fn standard_normal_moments() {
        let mut rng = SeededRng::new(7);
        let samples: Vec<f64> = (0..50_000).map(|_| standard_normal(&mut rng)).collect();
        let (mean, var) = mean_and_variance(&samples);
        assert!(mean.abs() < 0.02, "mean {mean}");
        assert!((var - 1.0).abs() < 0.03, "variance {var}");
        assert!(samples.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn gaussian_scales_and_shifts() {
        let mut rng = SeededRng::new(8);
        let samples: Vec<f64> = (0..50_000).map(|_| gaussian(&mut rng, 10.0, 2.0)).collect();
        let (mean, var) = mean_and_variance(&samples);
        assert!((mean - 10.0).abs() < 0.05, "mean {mean}");
        assert!((var - 4.0).abs() < 0.15, "variance {var}");
    }

    #[test]
    fn log_normal_is_positive_with_expected_median() {
        let mut rng = SeededRng::new(9);
        let mut samples: Vec<f64> = (0..20_001).map(|_| log_normal(&mut rng, 0.0, 0.5)).collect();
        assert!(samples.iter().all(|&x| x > 0.0));
        samples.sort_by(f64::total_cmp);
        let median = samples[samples.len() / 2];
        assert!((median - 1.0).abs() < 0.03, "median {median}");
    }

    #[test]
    fn geometric_mean_matches_theory() {
        let mut rng = SeededRng::new(10);
        for p in [0.25, 0.5, 0.8] {
            let n = 40_000;
            let total: usize = (0..n).map(|_| geometric(&mut rng, p, 1_000)).sum();
            let mean = total as f64 / n as f64;
            let expected = (1.0 - p) / p;
            assert!(
                (mean - expected).abs() < 0.05 * expected.max(1.0),
                "p={p}: mean {mean}, expected {expected}"
            );
        }
    }

    #[test]
    fn geometric_edges_and_cap() {
        let mut rng = SeededRng::new(11);
        assert_eq!(geometric(&mut rng, 1.0, 10), 0);
        assert_eq!(geometric(&mut rng, 0.0, 10), 10);
        for _ in 0..1000 {
            assert!(geometric(&mut rng, 0.05, 3) <= 3);
        }
    }

    #[test]
    fn weighted_index_follows_weights() {
        let mut rng = SeededRng::new(12);
        let mut counts = [0usize; 3];
        for _ in 0..30_000 {
            counts[weighted_index(&mut rng, &[0.6, 0.3, 0.1])] += 1;
        }
        let freq = |i: usize| counts[i] as f64 / 30_000.0;
        assert!((freq(0) - 0.6).abs() < 0.02);
        assert!((freq(1) - 0.3).abs() < 0.02);
        assert!((freq(2) - 0.1).abs() < 0.02);
    }

    #[test]
    fn weighted_index_skips_zero_and_bad_weights() {
        let mut rng = SeededRng::new(13);
        for _ in 0..1000 {
            assert_eq!(weighted_index(&mut rng, &[0.0, f64::NAN, 2.0, -1.0]), 2);
        }
        assert_eq!(weighted_index(&mut rng, &[0.0, 0.0]), 0);
        assert_eq!(weighted_index(&mut rng, &[]), 0);
    }

    #[test]
    fn signed_unit_range() {
        let mut rng = SeededRng::new(14);
        for _ in 0..10_000 {
            let u = signed_unit(&mut rng);
            assert!((-1.0..1.0).contains(&u));
        }
    }
}
