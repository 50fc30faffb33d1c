//! Random points on the probability simplex.
//!
//! Two interchangeable formulations are supported:
//! - Dirichlet(alpha, ..., alpha) via normalized Gamma(alpha, 1) samples.
//! - "Cut the line": n - 1 uniform cut points on [0, 1], whose segment
//!   lengths are a uniform simplex point. This matches Dirichlet(1, ..., 1)
//!   in distribution, not bit for bit.
//!
//! The conversion from raw samples to a simplex point is pure so it can be
//! tested without any randomness.

use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::constants::MIN_ALPHA;

/// Source of the raw samples the planner needs.
pub trait RandomSource {
    /// One Gamma(shape, 1) sample.
    fn gamma(&mut self, shape: f64) -> f64;
    /// One uniform sample on [0, 1).
    fn unit(&mut self) -> f64;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn gamma(&mut self, shape: f64) -> f64 {
        match Gamma::new(shape.max(MIN_ALPHA), 1.0) {
            Ok(dist) => dist.sample(self),
            Err(_) => 0.0,
        }
    }

    fn unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimplexMethod {
    /// Sorted uniform cut points (alpha = 1 only).
    CutPoints,
    /// Normalized Gamma samples.
    Gamma,
}

impl SimplexMethod {
    pub fn for_alpha(alpha: f64) -> Self {
        if alpha == 1.0 {
            SimplexMethod::CutPoints
        } else {
            SimplexMethod::Gamma
        }
    }
}

/// Normalize Gamma samples onto the simplex. Falls back to the uniform point
/// when the samples carry no mass.
pub fn from_gamma_samples(samples: &[f64]) -> Vec<f64> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }
    let cleaned: Vec<f64> = samples
        .iter()
        .map(|s| if s.is_finite() && *s > 0.0 { *s } else { 0.0 })
        .collect();
    let total: f64 = cleaned.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return vec![1.0 / n as f64; n];
    }
    cleaned.iter().map(|s| s / total).collect()
}

/// Segment lengths of [0, 1] split at the given cut points. Yields
/// `cuts.len() + 1` coordinates.
pub fn from_cut_points(cuts: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = cuts
        .iter()
        .map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 })
        .collect();
    sorted.sort_by(f64::total_cmp);

    let mut parts = Vec::with_capacity(sorted.len() + 1);
    let mut prev = 0.0;
    for cut in sorted {
        parts.push(cut - prev);
        prev = cut;
    }
    parts.push(1.0 - prev);
    parts
}

/// Draw an `n`-coordinate simplex point with concentration `alpha`.
pub fn draw<R: RandomSource + ?Sized>(
    n: usize,
    alpha: f64,
    method: SimplexMethod,
    rng: &mut R,
) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => match method {
            SimplexMethod::CutPoints => {
                let cuts: Vec<f64> = (0..n - 1).map(|_| rng.unit()).collect();
                from_cut_points(&cuts)
            }
            SimplexMethod::Gamma => {
                let samples: Vec<f64> = (0..n).map(|_| rng.gamma(alpha)).collect();
                from_gamma_samples(&samples)
            }
        },
    }
}

/// Split `pool` base units by `weights`, rounding each share down. The
/// rounding remainder goes to index 0; any overshoot from float drift is
/// taken back starting at index 0. The result always sums to `pool`.
pub fn apportion(pool: u64, weights: &[f64]) -> Vec<u64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let pool_f = pool as f64;
    let mut shares: Vec<u64> = weights
        .iter()
        .map(|w| {
            let w = if w.is_finite() { w.max(0.0) } else { 0.0 };
            (pool_f * w).floor().min(pool_f) as u64
        })
        .collect();

    let total: u128 = shares.iter().map(|s| *s as u128).sum();
    let pool_wide = pool as u128;
    if total > pool_wide {
        let mut excess = total - pool_wide;
        for share in shares.iter_mut() {
            if excess == 0 {
                break;
            }
            let take = (*share as u128).min(excess);
            *share -= take as u64;
            excess -= take;
        }
    } else {
        // remainder < pool, so it fits in u64
        shares[0] += (pool_wide - total) as u64;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn gamma_samples_normalize() {
        let point = from_gamma_samples(&[1.0, 3.0]);
        assert_eq!(point, vec![0.25, 0.75]);
    }

    #[test]
    fn zero_mass_falls_back_to_uniform() {
        let point = from_gamma_samples(&[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(point, vec![0.25; 4]);
    }

    #[test]
    fn cut_points_are_sorted_before_splitting() {
        let point = from_cut_points(&[0.75, 0.25]);
        assert_eq!(point, vec![0.25, 0.5, 0.25]);
    }

    #[test]
    fn apportion_gives_remainder_to_first() {
        let shares = apportion(10, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
        assert_eq!(shares, vec![4, 3, 3]);
    }

    #[test]
    fn apportion_never_overshoots() {
        // Weights summing above 1 simulate float drift.
        let shares = apportion(100, &[0.6, 0.6]);
        assert_eq!(shares.iter().sum::<u64>(), 100);
        assert_eq!(shares, vec![40, 60]);
    }

    #[test]
    fn single_coordinate_draw_needs_no_randomness() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        assert_eq!(draw(1, 0.3, SimplexMethod::Gamma, &mut rng), vec![1.0]);
    }

    struct Moments {
        mean: Vec<f64>,
        var: Vec<f64>,
        mean_max: f64,
    }

    fn moments(n: usize, trials: usize, method: SimplexMethod, seed: u64) -> Moments {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut sum = vec![0.0; n];
        let mut sum_sq = vec![0.0; n];
        let mut sum_max = 0.0;
        for _ in 0..trials {
            let point = draw(n, 1.0, method, &mut rng);
            let total: f64 = point.iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
            for (i, x) in point.iter().enumerate() {
                sum[i] += x;
                sum_sq[i] += x * x;
            }
            sum_max += point.iter().cloned().fold(0.0, f64::max);
        }
        let t = trials as f64;
        let mean: Vec<f64> = sum.iter().map(|s| s / t).collect();
        let var = sum_sq
            .iter()
            .zip(&mean)
            .map(|(sq, m)| sq / t - m * m)
            .collect();
        Moments {
            mean,
            var,
            mean_max: sum_max / t,
        }
    }

    #[test]
    fn alpha_one_formulations_are_statistically_equivalent() {
        let n = 4;
        let trials = 20_000;
        let cut = moments(n, trials, SimplexMethod::CutPoints, 11);
        let gamma = moments(n, trials, SimplexMethod::Gamma, 29);

        // Dirichlet(1,1,1,1): mean 1/4, variance (n-1)/(n^2 (n+1)) = 3/80,
        // expected maximum (1/n) * H_n.
        let expected_var = 3.0 / 80.0;
        let expected_max = (1.0 + 0.5 + 1.0 / 3.0 + 0.25) / 4.0;
        for m in [&cut, &gamma] {
            for i in 0..n {
                assert!((m.mean[i] - 0.25).abs() < 0.01, "mean {}", m.mean[i]);
                assert!((m.var[i] - expected_var).abs() < 0.004, "var {}", m.var[i]);
            }
            assert!((m.mean_max - expected_max).abs() < 0.01, "max {}", m.mean_max);
        }
        assert!((cut.mean_max - gamma.mean_max).abs() < 0.015);
    }

    #[test]
    fn low_alpha_concentrates_mass() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let trials = 2_000;
        let mut low = 0.0;
        let mut high = 0.0;
        for _ in 0..trials {
            low += draw(10, 0.1, SimplexMethod::Gamma, &mut rng)
                .iter()
                .cloned()
                .fold(0.0, f64::max);
            high += draw(10, 10.0, SimplexMethod::Gamma, &mut rng)
                .iter()
                .cloned()
                .fold(0.0, f64::max);
        }
        assert!(low / (trials as f64) > 0.5);
        assert!(high / (trials as f64) < 0.25);
    }
}
