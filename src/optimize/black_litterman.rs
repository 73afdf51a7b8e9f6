//! # Black-Litterman Views
//!
//! $$
//! \mu' = \mu + \tau\Sigma P^\top (P\tau\Sigma P^\top + \Omega)^{-1} (Q - P\pi)
//! $$
//!
//! Bayesian blend of equilibrium returns with investor views. This is not a
//! constrained allocation in itself: the output is an adjusted expected
//! return vector consumed by the maximum-Sharpe objective.

use ndarray::Array1;
use ndarray::Array2;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::error::Stage;
use crate::market::returns::ReturnStatistics;

/// Default blend scalar `tau`.
pub const DEFAULT_TAU: f64 = 0.025;

/// Investor views: each row of `picks` is a linear combination of assets a
/// view applies to, `outcomes` holds the expected return of each view.
#[derive(Clone, Debug)]
pub struct ViewSet {
  /// View matrix `P`, one row per view, one column per asset.
  pub picks: Array2<f64>,
  /// View outcome vector `Q`, one entry per view.
  pub outcomes: Array1<f64>,
  /// View uncertainty `Omega`; defaults to `diag(P Sigma P^T)` when absent.
  pub uncertainty: Option<Array2<f64>>,
  /// Blend scalar `tau`.
  pub tau: f64,
}

impl ViewSet {
  /// Views with default uncertainty and `tau`.
  pub fn new(picks: Array2<f64>, outcomes: Array1<f64>) -> Self {
    Self {
      picks,
      outcomes,
      uncertainty: None,
      tau: DEFAULT_TAU,
    }
  }

  /// Override the blend scalar.
  pub fn with_tau(mut self, tau: f64) -> Self {
    self.tau = tau;
    self
  }

  /// Supply an explicit uncertainty matrix.
  pub fn with_uncertainty(mut self, uncertainty: Array2<f64>) -> Self {
    self.uncertainty = Some(uncertainty);
    self
  }

  /// Number of views.
  pub fn n_views(&self) -> usize {
    self.picks.nrows()
  }
}

/// Blend views into the historical mean, producing the adjusted vector.
pub fn adjusted_returns(statistics: &ReturnStatistics, views: &ViewSet) -> Result<Array1<f64>> {
  let n = statistics.n_assets();
  let k = views.n_views();

  if views.picks.ncols() != n {
    return Err(PortfolioError::DimensionMismatch {
      stage: Stage::Optimize,
      context: "view matrix columns vs assets".to_string(),
      expected: n,
      actual: views.picks.ncols(),
    });
  }
  if views.outcomes.len() != k {
    return Err(PortfolioError::DimensionMismatch {
      stage: Stage::Optimize,
      context: "view outcomes vs view rows".to_string(),
      expected: k,
      actual: views.outcomes.len(),
    });
  }
  if let Some(omega) = &views.uncertainty {
    if omega.nrows() != k || omega.ncols() != k {
      return Err(PortfolioError::DimensionMismatch {
        stage: Stage::Optimize,
        context: "uncertainty matrix vs view rows".to_string(),
        expected: k,
        actual: omega.nrows().max(omega.ncols()),
      });
    }
  }

  let mu = statistics.mean();
  let cov = statistics.covariance();
  let tau_cov = cov * views.tau;

  // Equilibrium excess returns.
  let pi = tau_cov.dot(mu);

  let omega = match &views.uncertainty {
    Some(omega) => omega.clone(),
    None => Array2::from_diag(&views.picks.dot(cov).dot(&views.picks.t()).diag()),
  };

  // P tau Sigma P^T + Omega, the view-space combination to invert.
  let combination = views.picks.dot(&tau_cov).dot(&views.picks.t()) + &omega;
  let inverse = invert(&combination).ok_or_else(|| PortfolioError::SingularMatrix {
    stage: Stage::Optimize,
    context: "inverting the view uncertainty combination".to_string(),
  })?;

  let surprise = &views.outcomes - &views.picks.dot(&pi);
  let adjustment = tau_cov.dot(&views.picks.t()).dot(&inverse).dot(&surprise);

  Ok(mu + &adjustment)
}

/// Gauss-Jordan inverse with partial pivoting; `None` for singular input.
pub(crate) fn invert(mat: &Array2<f64>) -> Option<Array2<f64>> {
  let n = mat.nrows();
  if mat.ncols() != n {
    return None;
  }
  if n == 0 {
    return Some(Array2::zeros((0, 0)));
  }

  let mut aug = Array2::zeros((n, 2 * n));
  for i in 0..n {
    for j in 0..n {
      aug[[i, j]] = mat[[i, j]];
    }
    aug[[i, n + i]] = 1.0;
  }

  for col in 0..n {
    let mut max_row = col;
    let mut max_val = aug[[col, col]].abs();
    for row in (col + 1)..n {
      if aug[[row, col]].abs() > max_val {
        max_val = aug[[row, col]].abs();
        max_row = row;
      }
    }

    if max_val < 1e-15 {
      return None;
    }

    if max_row != col {
      for j in 0..(2 * n) {
        let tmp = aug[[col, j]];
        aug[[col, j]] = aug[[max_row, j]];
        aug[[max_row, j]] = tmp;
      }
    }

    let pivot = aug[[col, col]];
    for j in 0..(2 * n) {
      aug[[col, j]] /= pivot;
    }

    for row in 0..n {
      if row == col {
        continue;
      }
      let factor = aug[[row, col]];
      for j in 0..(2 * n) {
        aug[[row, j]] -= factor * aug[[col, j]];
      }
    }
  }

  let mut inv = Array2::zeros((n, n));
  for i in 0..n {
    for j in 0..n {
      inv[[i, j]] = aug[[i, n + j]];
    }
  }

  Some(inv)
}
