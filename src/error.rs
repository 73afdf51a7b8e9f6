//! # Errors
//!
//! Typed failure taxonomy for the construction and analytics pipeline.
//! Every error names the stage it surfaced in and, where it applies, the
//! implicated tickers, so callers can adjust the universe or bounds without
//! re-running the whole pipeline blind.

use std::fmt::Display;

use thiserror::Error;

/// Pipeline stage an error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
  /// Price matrix assembly and cleaning.
  Build,
  /// Return and covariance statistics.
  Statistics,
  /// Constrained weight optimization.
  Optimize,
  /// Performance and risk analytics.
  Analytics,
  /// Sector aggregation.
  Aggregate,
}

impl Display for Stage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Stage::Build => write!(f, "build"),
      Stage::Statistics => write!(f, "statistics"),
      Stage::Optimize => write!(f, "optimize"),
      Stage::Analytics => write!(f, "analytics"),
      Stage::Aggregate => write!(f, "aggregate"),
    }
  }
}

/// Errors surfaced by the portfolio pipeline.
///
/// Solver non-convergence is deliberately absent: the optimizer returns its
/// best iterate with convergence metadata instead of failing.
#[derive(Error, Debug, Clone)]
pub enum PortfolioError {
  /// Price data is unusable for the requested computation.
  #[error("[{stage}] unusable data: {reason} (tickers: {tickers:?})")]
  DataQuality {
    stage: Stage,
    reason: String,
    tickers: Vec<String>,
  },

  /// Bounds and the sum/floor constraints cannot all hold at once.
  #[error("[optimize] infeasible constraints: {reason}")]
  ConstraintInfeasible { reason: String },

  /// A matrix inversion required by the computation does not exist.
  #[error("[{stage}] singular matrix while {context}")]
  SingularMatrix { stage: Stage, context: String },

  /// A ticker has no entry in the reference table or weight vector.
  #[error("[{stage}] no entry for ticker {ticker}")]
  UnknownTicker { stage: Stage, ticker: String },

  /// Supplied inputs disagree in shape.
  #[error("[{stage}] dimension mismatch in {context}: expected {expected}, got {actual}")]
  DimensionMismatch {
    stage: Stage,
    context: String,
    expected: usize,
    actual: usize,
  },
}

impl PortfolioError {
  /// Stage the error surfaced in.
  pub fn stage(&self) -> Stage {
    match self {
      PortfolioError::DataQuality { stage, .. } => *stage,
      PortfolioError::ConstraintInfeasible { .. } => Stage::Optimize,
      PortfolioError::SingularMatrix { stage, .. } => *stage,
      PortfolioError::UnknownTicker { stage, .. } => *stage,
      PortfolioError::DimensionMismatch { stage, .. } => *stage,
    }
  }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PortfolioError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn errors_report_their_stage() {
    let err = PortfolioError::DataQuality {
      stage: Stage::Build,
      reason: "no surviving columns".to_string(),
      tickers: vec!["AAA".to_string()],
    };
    assert_eq!(err.stage(), Stage::Build);
    assert!(err.to_string().contains("build"));
    assert!(err.to_string().contains("AAA"));

    let err = PortfolioError::ConstraintInfeasible {
      reason: "upper bounds sum below 1".to_string(),
    };
    assert_eq!(err.stage(), Stage::Optimize);
  }
}
