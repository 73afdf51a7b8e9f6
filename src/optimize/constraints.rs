//! # Constraint Validation
//!
//! $$
//! \sum_i l_i \le 1 \le \sum_i u_i, \qquad n \cdot w_{\min} \le 1
//! $$
//!
//! Fail-fast feasibility checks run before any solver is invoked. An
//! infeasible problem must never reach the solver and silently return a
//! constraint-violating vector.

use crate::error::PortfolioError;
use crate::error::Result;
use crate::optimize::types::Bounds;
use crate::optimize::types::WEIGHT_TOLERANCE;

/// Validate bounds against the shared equality/floor constraint set.
pub fn validate(bounds: &Bounds, n_assets: usize, min_weight: f64) -> Result<()> {
  if bounds.len() != n_assets {
    return Err(PortfolioError::ConstraintInfeasible {
      reason: format!(
        "bounds cover {} assets but the universe has {}",
        bounds.len(),
        n_assets
      ),
    });
  }

  for (i, (&lower, &upper)) in bounds.lower().iter().zip(bounds.upper()).enumerate() {
    if !lower.is_finite() || !upper.is_finite() {
      return Err(PortfolioError::ConstraintInfeasible {
        reason: format!("non-finite bound for asset {i}"),
      });
    }
    if lower < 0.0 {
      return Err(PortfolioError::ConstraintInfeasible {
        reason: format!("negative lower bound {lower} for asset {i}"),
      });
    }
    if lower > upper {
      return Err(PortfolioError::ConstraintInfeasible {
        reason: format!("lower bound {lower} above upper bound {upper} for asset {i}"),
      });
    }
  }

  let lower_sum: f64 = bounds.lower().iter().sum();
  if lower_sum > 1.0 + WEIGHT_TOLERANCE {
    return Err(PortfolioError::ConstraintInfeasible {
      reason: format!("lower bounds sum to {lower_sum}, above the full budget"),
    });
  }

  let upper_sum: f64 = bounds.upper().iter().sum();
  if upper_sum < 1.0 - WEIGHT_TOLERANCE {
    return Err(PortfolioError::ConstraintInfeasible {
      reason: format!("upper bounds sum to {upper_sum}, below the full budget"),
    });
  }

  if n_assets as f64 * min_weight > 1.0 + WEIGHT_TOLERANCE {
    return Err(PortfolioError::ConstraintInfeasible {
      reason: format!(
        "minimum-weight floor {min_weight} cannot hold for {n_assets} assets"
      ),
    });
  }

  Ok(())
}

/// Validate that the closed-form `1/n` allocation respects every bound.
pub fn validate_equal_weight(bounds: &Bounds, n_assets: usize) -> Result<()> {
  let share = 1.0 / n_assets as f64;
  for (i, (&lower, &upper)) in bounds.lower().iter().zip(bounds.upper()).enumerate() {
    if share < lower - WEIGHT_TOLERANCE || share > upper + WEIGHT_TOLERANCE {
      return Err(PortfolioError::ConstraintInfeasible {
        reason: format!(
          "equal weight {share} falls outside [{lower}, {upper}] for asset {i}"
        ),
      });
    }
  }
  Ok(())
}
