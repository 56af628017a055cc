//! Triangular completion-time distribution anchored on the point estimate.
//!
//! The model only yields a single duration. Uncertainty around it is modeled
//! as a triangle with its mode at the estimate and fixed proportional bounds,
//! which gives a closed-form probability of finishing within a deadline.

use serde::{Deserialize, Serialize};

/// Default lower bound as a fraction of the estimate
pub const DEFAULT_LOWER_RATIO: f64 = 0.8;
/// Default upper bound as a fraction of the estimate
pub const DEFAULT_UPPER_RATIO: f64 = 1.2;

/// Proportional spread of the triangle around the estimate
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpreadRatios {
    /// a = lower_ratio * estimate
    #[serde(default = "default_lower_ratio")]
    pub lower_ratio: f64,
    /// c = upper_ratio * estimate
    #[serde(default = "default_upper_ratio")]
    pub upper_ratio: f64,
}

fn default_lower_ratio() -> f64 {
    DEFAULT_LOWER_RATIO
}

fn default_upper_ratio() -> f64 {
    DEFAULT_UPPER_RATIO
}

impl Default for SpreadRatios {
    fn default() -> Self {
        Self {
            lower_ratio: DEFAULT_LOWER_RATIO,
            upper_ratio: DEFAULT_UPPER_RATIO,
        }
    }
}

impl SpreadRatios {
    /// Check that the ratios keep a <= b <= c for every non-negative estimate.
    pub fn validate(&self) -> Result<(), String> {
        if !self.lower_ratio.is_finite() || !self.upper_ratio.is_finite() {
            return Err("spread ratios must be finite".to_string());
        }
        if self.lower_ratio < 0.0 || self.lower_ratio > 1.0 {
            return Err(format!(
                "lower_ratio must lie in [0, 1], got {}",
                self.lower_ratio
            ));
        }
        if self.upper_ratio < 1.0 {
            return Err(format!("upper_ratio must be >= 1, got {}", self.upper_ratio));
        }
        Ok(())
    }

    /// Derive (a, b, c) from an estimate.
    ///
    /// NaN, infinite and negative estimates collapse to 0.
    pub fn derive(&self, estimate: f64) -> TriangularParams {
        let e = sanitize_estimate(estimate);
        TriangularParams {
            a: self.lower_ratio * e,
            b: e,
            c: self.upper_ratio * e,
        }
    }
}

/// Clamp an estimate into the valid domain [0, +inf).
pub fn sanitize_estimate(estimate: f64) -> f64 {
    if estimate.is_finite() && estimate > 0.0 {
        estimate
    } else {
        0.0
    }
}

/// Minimum, mode and maximum of a triangular distribution, a <= b <= c.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriangularParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl TriangularParams {
    /// True when the distribution collapses to a single point.
    pub fn is_degenerate(&self) -> bool {
        self.c <= self.a
    }
}

/// Derive the triangle with the default 0.8 / 1.2 spread.
pub fn derive_params(estimate: f64) -> TriangularParams {
    SpreadRatios::default().derive(estimate)
}

/// Probability that the duration is <= `threshold`.
///
/// Always returns a value in [0, 1]. Zero-width branches are skipped
/// explicitly, a degenerate triangle behaves as a point mass at `a`.
pub fn cdf(params: &TriangularParams, threshold: f64) -> f64 {
    let TriangularParams { a, b, c } = *params;

    if threshold.is_nan() {
        return 0.0;
    }

    if params.is_degenerate() {
        return if threshold >= a { 1.0 } else { 0.0 };
    }

    let p = if threshold <= a {
        0.0
    } else if threshold <= b && b > a {
        (threshold - a).powi(2) / ((b - a) * (c - a))
    } else if threshold <= c {
        if c > b {
            1.0 - (c - threshold).powi(2) / ((c - b) * (c - a))
        } else {
            1.0
        }
    } else {
        1.0
    };

    p.clamp(0.0, 1.0)
}

/// Density at `x`. A degenerate triangle has no density and yields 0.
pub fn pdf(params: &TriangularParams, x: f64) -> f64 {
    let TriangularParams { a, b, c } = *params;

    if params.is_degenerate() || x.is_nan() || x < a || x > c {
        return 0.0;
    }

    if x < b {
        2.0 * (x - a) / ((c - a) * (b - a))
    } else if x == b {
        2.0 / (c - a)
    } else {
        2.0 * (c - x) / ((c - a) * (c - b))
    }
}

/// `n` evenly spaced `(x, pdf(x))` samples over [a, c] for density rendering.
pub fn density_points(params: &TriangularParams, n: usize) -> Vec<(f64, f64)> {
    match n {
        0 => Vec::new(),
        _ if n == 1 || params.is_degenerate() => vec![(params.a, pdf(params, params.a))],
        _ => {
            let step = (params.c - params.a) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    // pin the last sample to c so rounding never drops it off the support
                    let x = if i == n - 1 {
                        params.c
                    } else {
                        params.a + step * i as f64
                    };
                    (x, pdf(params, x))
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_derive_params_default_spread() {
        let p = derive_params(10.0);
        assert!((p.a - 8.0).abs() < EPS);
        assert_eq!(p.b, 10.0);
        assert!((p.c - 12.0).abs() < EPS);
    }

    #[test]
    fn test_derive_params_clamps_invalid_estimates() {
        for e in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let p = derive_params(e);
            assert_eq!((p.a, p.b, p.c), (0.0, 0.0, 0.0), "estimate {e}");
        }
    }

    #[test]
    fn test_cdf_lower_branch() {
        let p = derive_params(10.0);
        assert!((cdf(&p, 9.0) - 0.125).abs() < EPS);
    }

    #[test]
    fn test_cdf_upper_branch() {
        let p = derive_params(10.0);
        assert!((cdf(&p, 11.0) - 0.875).abs() < EPS);
    }

    #[test]
    fn test_cdf_outside_support() {
        let p = derive_params(10.0);
        assert_eq!(cdf(&p, 7.0), 0.0);
        assert_eq!(cdf(&p, 13.0), 1.0);
        assert_eq!(cdf(&p, -5.0), 0.0);
        assert_eq!(cdf(&p, f64::INFINITY), 1.0);
    }

    #[test]
    fn test_cdf_bounds_and_mode() {
        let p = TriangularParams { a: 2.0, b: 3.0, c: 7.0 };
        assert_eq!(cdf(&p, 2.0), 0.0);
        assert!((cdf(&p, 7.0) - 1.0).abs() < EPS);
        assert!((cdf(&p, 3.0) - 0.2).abs() < EPS);
    }

    #[test]
    fn test_cdf_degenerate() {
        let p = derive_params(0.0);
        assert_eq!(cdf(&p, 0.0), 1.0);
        assert_eq!(cdf(&p, 4.0), 1.0);
        assert_eq!(cdf(&p, -0.5), 0.0);
    }

    #[test]
    fn test_cdf_mode_on_lower_bound() {
        let p = TriangularParams { a: 1.0, b: 1.0, c: 3.0 };
        assert_eq!(cdf(&p, 1.0), 0.0);
        assert!((cdf(&p, 2.0) - 0.75).abs() < EPS);
        assert!((cdf(&p, 3.0) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_cdf_mode_on_upper_bound() {
        let p = TriangularParams { a: 1.0, b: 3.0, c: 3.0 };
        assert!((cdf(&p, 2.0) - 0.25).abs() < EPS);
        assert!((cdf(&p, 3.0) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_cdf_nan_threshold() {
        assert_eq!(cdf(&derive_params(10.0), f64::NAN), 0.0);
    }

    #[test]
    fn test_pdf_shape() {
        let p = derive_params(10.0);
        // peak height is 2 / (c - a)
        assert!((pdf(&p, 10.0) - 0.5).abs() < EPS);
        assert!((pdf(&p, 9.0) - 0.25).abs() < EPS);
        assert!((pdf(&p, 11.0) - 0.25).abs() < EPS);
        assert_eq!(pdf(&p, 7.9), 0.0);
        assert_eq!(pdf(&p, 12.1), 0.0);
        assert_eq!(pdf(&derive_params(0.0), 0.0), 0.0);
    }

    #[test]
    fn test_density_points_cover_support() {
        let p = derive_params(10.0);
        let points = density_points(&p, 500);
        assert_eq!(points.len(), 500);
        assert!((points[0].0 - 8.0).abs() < EPS);
        assert_eq!(points[499].0, p.c);

        // trapezoid integral of the density is close to 1
        let area: f64 = points
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum();
        assert!((area - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_density_points_edge_counts() {
        let p = derive_params(10.0);
        assert!(density_points(&p, 0).is_empty());
        assert_eq!(density_points(&p, 1).len(), 1);
        assert_eq!(density_points(&derive_params(0.0), 50), vec![(0.0, 0.0)]);
    }

    #[test]
    fn test_spread_validation() {
        assert!(SpreadRatios::default().validate().is_ok());
        assert!(SpreadRatios { lower_ratio: 1.1, upper_ratio: 1.2 }.validate().is_err());
        assert!(SpreadRatios { lower_ratio: 0.8, upper_ratio: 0.9 }.validate().is_err());
        assert!(SpreadRatios { lower_ratio: -0.1, upper_ratio: 1.2 }.validate().is_err());
        assert!(SpreadRatios { lower_ratio: f64::NAN, upper_ratio: 1.2 }.validate().is_err());
    }

    #[test]
    fn test_custom_spread() {
        let ratios = SpreadRatios { lower_ratio: 0.5, upper_ratio: 2.0 };
        let p = ratios.derive(4.0);
        assert_eq!((p.a, p.b, p.c), (2.0, 4.0, 8.0));
    }
}
