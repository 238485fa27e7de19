//! Beta distribution CDFs used to shape position size.
//!
//! The pipeline only ever evaluates Beta(2,5), through [`beta_2_5_cdf`], which is
//! the exact closed form `1 - (1-x)^5 (5x + 1)`. Other shape parameters go
//! through statrs' regularized incomplete beta. The closed form never calls
//! into it.

use statrs::function::beta::beta_reg;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BetaError {
    #[error("beta shape parameters must be positive and finite (a={a}, b={b})")]
    InvalidShape { a: f64, b: f64 },
    #[error("beta CDF argument {0} outside [0, 1]")]
    OutOfDomain(f64),
}

/// Closed-form CDF of Beta(2, 5) at `x`.
///
/// Callers guarantee `x` is finite and in [0, 1]. The final clamp only absorbs
/// rounding at the ends of the interval.
pub fn beta_2_5_cdf(x: f64) -> f64 {
    let tail = 1.0 - x;
    (1.0 - tail.powi(5) * (5.0 * x + 1.0)).clamp(0.0, 1.0)
}

/// CDF of Beta(a, b) at `x`. Uses the closed form for (2, 5).
pub fn beta_cdf(x: f64, a: f64, b: f64) -> Result<f64, BetaError> {
    if !x.is_finite() || !(0.0..=1.0).contains(&x) {
        return Err(BetaError::OutOfDomain(x));
    }
    if a == 2.0 && b == 5.0 {
        return Ok(beta_2_5_cdf(x));
    }
    regularized_incomplete_beta(x, a, b)
}

/// Regularized incomplete beta function I_x(a, b).
///
/// Arguments are checked here; `beta_reg` panics outside its domain.
pub fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> Result<f64, BetaError> {
    if !(a.is_finite() && b.is_finite() && a > 0.0 && b > 0.0) {
        return Err(BetaError::InvalidShape { a, b });
    }
    if !x.is_finite() || !(0.0..=1.0).contains(&x) {
        return Err(BetaError::OutOfDomain(x));
    }
    if x == 0.0 {
        return Ok(0.0);
    }
    if x == 1.0 {
        return Ok(1.0);
    }
    Ok(beta_reg(a, b, x).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_form_endpoints() {
        assert_eq!(beta_2_5_cdf(0.0), 0.0);
        assert_eq!(beta_2_5_cdf(1.0), 1.0);
    }

    #[test]
    fn closed_form_known_values() {
        // 1 - 0.5^5 * 3.5 = 0.890625
        assert!((beta_2_5_cdf(0.5) - 0.890_625).abs() < 1e-12);
        // 1 - 0.75^5 * 2.25
        let expected = 1.0 - 0.75_f64.powi(5) * 2.25;
        assert!((beta_2_5_cdf(0.25) - expected).abs() < 1e-12);
    }

    #[test]
    fn dispatch_uses_closed_form_for_2_5() {
        for i in 0..=20 {
            let x = i as f64 / 20.0;
            assert_eq!(beta_cdf(x, 2.0, 5.0).unwrap(), beta_2_5_cdf(x));
        }
    }

    #[test]
    fn dispatch_rejects_out_of_domain() {
        assert_eq!(beta_cdf(1.5, 2.0, 5.0), Err(BetaError::OutOfDomain(1.5)));
        assert!(beta_cdf(f64::NAN, 3.0, 3.0).is_err());
    }

    #[test]
    fn generic_agrees_with_closed_form() {
        for i in 1..100 {
            let x = i as f64 / 100.0;
            let generic = regularized_incomplete_beta(x, 2.0, 5.0).unwrap();
            assert!(
                (generic - beta_2_5_cdf(x)).abs() < 1e-10,
                "x={x}: generic {generic} vs closed {}",
                beta_2_5_cdf(x)
            );
        }
    }

    #[test]
    fn uniform_distribution_is_identity() {
        for i in 0..=10 {
            let x = i as f64 / 10.0;
            let v = regularized_incomplete_beta(x, 1.0, 1.0).unwrap();
            assert!((v - x).abs() < 1e-10);
        }
    }

    #[test]
    fn symmetry_relation_holds() {
        let (a, b) = (3.5, 1.25);
        for i in 1..10 {
            let x = i as f64 / 10.0;
            let lhs = regularized_incomplete_beta(x, a, b).unwrap();
            let rhs = 1.0 - regularized_incomplete_beta(1.0 - x, b, a).unwrap();
            assert!((lhs - rhs).abs() < 1e-10);
        }
        assert!((regularized_incomplete_beta(0.5, 4.0, 4.0).unwrap() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn matches_statrs_distribution() {
        use statrs::distribution::{Beta, ContinuousCDF};
        let dist = Beta::new(3.0, 2.0).unwrap();
        for i in 1..20 {
            let x = i as f64 / 20.0;
            let v = regularized_incomplete_beta(x, 3.0, 2.0).unwrap();
            assert!((v - dist.cdf(x)).abs() < 1e-10, "x={x}");
        }
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(
            regularized_incomplete_beta(0.3, 0.0, 2.0),
            Err(BetaError::InvalidShape { .. })
        ));
        assert!(regularized_incomplete_beta(0.3, 2.0, f64::INFINITY).is_err());
        assert_eq!(
            regularized_incomplete_beta(-0.1, 2.0, 3.0),
            Err(BetaError::OutOfDomain(-0.1))
        );
    }
}
