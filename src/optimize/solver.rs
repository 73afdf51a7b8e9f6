//! # Allocation Solver
//!
//! $$
//! \min_{\mathbf{w}} \mathbf{w}^\top \Sigma \mathbf{w}
//! \quad\text{or}\quad
//! \max_{\mathbf{w}} \frac{\mathbf{w}^\top \mu - r_f}{\sqrt{\mathbf{w}^\top \Sigma \mathbf{w}}}
//! $$
//!
//! Nelder-Mead search over an unconstrained parameter vector mapped through
//! softmax onto the simplex and then projected onto the capped simplex
//! `{sum(w) = 1, l <= w <= u}`. The projection makes the returned vector
//! satisfy the equality and box constraints exactly, so a non-converged
//! best iterate still honors the output contract.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use ndarray::Array1;
use ndarray::Array2;
use tracing::warn;

use crate::error::Result;
use crate::market::returns::ReturnStatistics;
use crate::optimize::constraints;
use crate::optimize::types::Allocation;
use crate::optimize::types::Bounds;
use crate::optimize::types::OptimizeOptions;

/// Iteration cap; bounds wall-clock so one pathological solve cannot hang a caller.
pub const MAX_ITERS: u64 = 5000;

const SD_TOLERANCE: f64 = 1e-8;

/// Volatility floor in the Sharpe denominator; a zero-variance portfolio
/// would otherwise make the objective undefined.
const VOL_FLOOR: f64 = 1e-12;

fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

/// Project onto `{w : sum(w) = 1, l <= w <= u}` by bisection on the shift
/// `lambda` in `w_i = clamp(v_i + lambda, l_i, u_i)`.
///
/// The clamped sum is monotone non-decreasing in `lambda`, so feasible
/// bounds (`sum(l) <= 1 <= sum(u)`, checked before solving) guarantee a
/// root. Bisection to machine precision keeps the map deterministic.
pub(crate) fn project_capped_simplex(v: &[f64], lower: &[f64], upper: &[f64]) -> Vec<f64> {
  let clamped_sum = |shift: f64| -> f64 {
    v.iter()
      .zip(lower.iter().zip(upper))
      .map(|(&vi, (&li, &ui))| (vi + shift).clamp(li, ui))
      .sum()
  };

  let spread = v
    .iter()
    .cloned()
    .fold(0.0_f64, |acc, vi| acc.max(vi.abs()))
    + upper.iter().cloned().fold(0.0_f64, f64::max)
    + 1.0;
  let mut lo = -spread;
  let mut hi = spread;

  for _ in 0..200 {
    let mid = 0.5 * (lo + hi);
    if clamped_sum(mid) < 1.0 {
      lo = mid;
    } else {
      hi = mid;
    }
  }

  let shift = 0.5 * (lo + hi);
  v.iter()
    .zip(lower.iter().zip(upper))
    .map(|(&vi, (&li, &ui))| (vi + shift).clamp(li, ui))
    .collect()
}

#[derive(Clone, Copy, Debug)]
enum Objective {
  MinVariance,
  MaxSharpe,
}

struct AllocationCost {
  objective: Objective,
  mu: Array1<f64>,
  cov: Array2<f64>,
  risk_free: f64,
  lower: Vec<f64>,
  upper: Vec<f64>,
}

impl AllocationCost {
  fn weights_for(&self, x: &[f64]) -> Vec<f64> {
    project_capped_simplex(&softmax(x), &self.lower, &self.upper)
  }
}

impl CostFunction for AllocationCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = Array1::from_vec(self.weights_for(x));
    let variance = w.dot(&self.cov.dot(&w));

    match self.objective {
      Objective::MinVariance => Ok(variance),
      Objective::MaxSharpe => {
        let volatility = variance.max(0.0).sqrt().max(VOL_FLOOR);
        let portfolio_return = w.dot(&self.mu);
        Ok(-((portfolio_return - self.risk_free) / volatility))
      }
    }
  }
}

fn diagnostics(
  weights: Vec<f64>,
  mu: &Array1<f64>,
  cov: &Array2<f64>,
  risk_free: f64,
  converged: bool,
  iterations: u64,
) -> Allocation {
  let w = Array1::from_vec(weights);
  let expected_return = w.dot(mu);
  let volatility = w.dot(&cov.dot(&w)).max(0.0).sqrt();
  let sharpe = if volatility > 1e-15 {
    (expected_return - risk_free) / volatility
  } else {
    0.0
  };

  Allocation {
    weights: w.to_vec(),
    expected_return,
    volatility,
    sharpe,
    converged,
    iterations,
  }
}

fn solve(
  objective: Objective,
  mu: &Array1<f64>,
  cov: &Array2<f64>,
  bounds: &Bounds,
  risk_free: f64,
) -> Allocation {
  let n = mu.len();

  // Fixed initial simplex seeded at the uniform allocation, so repeated
  // runs on identical inputs are reproducible.
  let x0 = vec![0.0; n];
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.clone());
  for i in 0..n {
    let mut point = x0.clone();
    point[i] = 1.0;
    simplex.push(point);
  }

  let cost = AllocationCost {
    objective,
    mu: mu.clone(),
    cov: cov.clone(),
    risk_free,
    lower: bounds.lower().to_vec(),
    upper: bounds.upper().to_vec(),
  };

  let fallback = project_capped_simplex(
    &vec![1.0 / n as f64; n],
    bounds.lower(),
    bounds.upper(),
  );

  match NelderMead::new(simplex).with_sd_tolerance(SD_TOLERANCE) {
    Ok(solver) => {
      match Executor::new(cost, solver)
        .configure(|state| state.max_iters(MAX_ITERS))
        .run()
      {
        Ok(res) => {
          let iterations = res.state.iter;
          let converged = iterations < MAX_ITERS;
          if !converged {
            warn!(iterations, "solver stopped on iteration cap; returning best iterate");
          }
          let best_x = res.state.best_param.unwrap_or(x0);
          let weights =
            project_capped_simplex(&softmax(&best_x), bounds.lower(), bounds.upper());
          diagnostics(weights, mu, cov, risk_free, converged, iterations)
        }
        Err(_) => diagnostics(fallback, mu, cov, risk_free, false, 0),
      }
    }
    Err(_) => diagnostics(fallback, mu, cov, risk_free, false, 0),
  }
}

/// Minimum-variance allocation under the shared constraint set.
pub fn optimize_min_variance(
  statistics: &ReturnStatistics,
  bounds: &Bounds,
  options: &OptimizeOptions,
) -> Result<Allocation> {
  constraints::validate(bounds, statistics.n_assets(), options.min_weight)?;
  Ok(solve(
    Objective::MinVariance,
    statistics.mean(),
    statistics.covariance(),
    bounds,
    options.risk_free,
  ))
}

/// Maximum-Sharpe allocation under the shared constraint set.
pub fn optimize_max_sharpe(
  statistics: &ReturnStatistics,
  bounds: &Bounds,
  options: &OptimizeOptions,
) -> Result<Allocation> {
  constraints::validate(bounds, statistics.n_assets(), options.min_weight)?;
  Ok(solve(
    Objective::MaxSharpe,
    statistics.mean(),
    statistics.covariance(),
    bounds,
    options.risk_free,
  ))
}

/// Maximum-Sharpe allocation against an externally adjusted return vector.
pub fn optimize_max_sharpe_with_returns(
  adjusted_mean: &Array1<f64>,
  statistics: &ReturnStatistics,
  bounds: &Bounds,
  options: &OptimizeOptions,
) -> Result<Allocation> {
  constraints::validate(bounds, statistics.n_assets(), options.min_weight)?;
  Ok(solve(
    Objective::MaxSharpe,
    adjusted_mean,
    statistics.covariance(),
    bounds,
    options.risk_free,
  ))
}

/// Closed-form equal-weight allocation; no solver is invoked.
pub fn optimize_equal_weight(
  statistics: &ReturnStatistics,
  bounds: &Bounds,
  options: &OptimizeOptions,
) -> Result<Allocation> {
  let n = statistics.n_assets();
  constraints::validate(bounds, n, options.min_weight)?;
  constraints::validate_equal_weight(bounds, n)?;

  let weights = vec![1.0 / n as f64; n];
  Ok(diagnostics(
    weights,
    statistics.mean(),
    statistics.covariance(),
    options.risk_free,
    true,
    0,
  ))
}
