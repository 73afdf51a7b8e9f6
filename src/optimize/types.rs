//! # Optimizer Types
//!
//! $$
//! \mathcal{W} = \{\mathbf{w} : \textstyle\sum_i w_i = 1,\ l_i \le w_i \le u_i\}
//! $$
//!
//! Shared enums, constraint inputs and result containers for allocation.

use crate::error::PortfolioError;
use crate::error::Result;
use crate::error::Stage;

/// Numerical tolerance on the weight-sum invariant.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Supported allocation objectives.
///
/// A closed set with exhaustive matching, so adding or removing a strategy
/// is a compile-time-checked change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
  /// Minimize portfolio variance.
  MinimumVariance,
  /// Closed-form `1/n` per asset.
  EqualWeight,
  /// Maximize excess return per unit of volatility.
  MaximumSharpe,
  /// Blend equilibrium returns with investor views, then maximize Sharpe.
  BlackLitterman,
}

impl Strategy {
  /// All strategies, in evaluation order.
  pub fn all() -> [Strategy; 4] {
    [
      Strategy::MinimumVariance,
      Strategy::EqualWeight,
      Strategy::MaximumSharpe,
      Strategy::BlackLitterman,
    ]
  }

  /// Stable display label.
  pub fn label(&self) -> &'static str {
    match self {
      Strategy::MinimumVariance => "minimum-variance",
      Strategy::EqualWeight => "equal-weight",
      Strategy::MaximumSharpe => "maximum-sharpe",
      Strategy::BlackLitterman => "black-litterman",
    }
  }
}

/// Per-asset investment-fraction bounds.
///
/// Fractions in `[0, 1]` are the one convention here; callers holding
/// percentages convert at the boundary via [`Bounds::from_max_percentage`].
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
  lower: Vec<f64>,
  upper: Vec<f64>,
}

impl Bounds {
  /// Explicit per-asset `(lower, upper)` pairs.
  pub fn per_asset(pairs: Vec<(f64, f64)>) -> Self {
    let (lower, upper) = pairs.into_iter().unzip();
    Self { lower, upper }
  }

  /// Uniform `[0, max_fraction]` bounds for `n` assets.
  pub fn uniform(n: usize, max_fraction: f64) -> Self {
    Self {
      lower: vec![0.0; n],
      upper: vec![max_fraction; n],
    }
  }

  /// Uniform bounds from a max single-equity percentage (e.g. `5.0` for 5%).
  pub fn from_max_percentage(n: usize, max_percentage: f64) -> Self {
    Self::uniform(n, max_percentage / 100.0)
  }

  pub fn len(&self) -> usize {
    self.lower.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lower.is_empty()
  }

  /// Lower bounds, in asset order.
  pub fn lower(&self) -> &[f64] {
    &self.lower
  }

  /// Upper bounds, in asset order.
  pub fn upper(&self) -> &[f64] {
    &self.upper
  }
}

/// Ticker-keyed allocation produced by a strategy.
///
/// Invariants for optimizer output: weights sum to 1 within
/// [`WEIGHT_TOLERANCE`], each weight lies within its configured bound, and
/// no ticker outside the working set appears.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightVector {
  tickers: Vec<String>,
  weights: Vec<f64>,
}

impl WeightVector {
  /// Pair tickers with weights; lengths must agree.
  pub fn new(tickers: Vec<String>, weights: Vec<f64>) -> Result<Self> {
    if tickers.len() != weights.len() {
      return Err(PortfolioError::DimensionMismatch {
        stage: Stage::Optimize,
        context: "tickers vs weights".to_string(),
        expected: tickers.len(),
        actual: weights.len(),
      });
    }
    Ok(Self { tickers, weights })
  }

  pub fn len(&self) -> usize {
    self.tickers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tickers.is_empty()
  }

  /// Weight for one ticker, if present.
  pub fn get(&self, ticker: &str) -> Option<f64> {
    self
      .tickers
      .iter()
      .position(|t| t == ticker)
      .map(|i| self.weights[i])
  }

  /// `(ticker, weight)` pairs in asset order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self
      .tickers
      .iter()
      .map(|t| t.as_str())
      .zip(self.weights.iter().copied())
  }

  /// Tickers, in asset order.
  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// Raw weights, in asset order.
  pub fn weights(&self) -> &[f64] {
    &self.weights
  }

  /// Sum of all weights.
  pub fn sum(&self) -> f64 {
    self.weights.iter().sum()
  }
}

/// Strategy-independent optimizer inputs beyond the return statistics.
#[derive(Clone, Debug)]
pub struct OptimizeOptions {
  /// Risk-free rate in the same periodicity as the returns.
  pub risk_free: f64,
  /// Floor for the `sum(w) >= n * min_weight` slack constraint.
  pub min_weight: f64,
}

impl Default for OptimizeOptions {
  fn default() -> Self {
    Self {
      risk_free: 0.01,
      min_weight: 0.0,
    }
  }
}

/// Raw optimizer output, weights in the same asset order as the inputs.
#[derive(Clone, Debug, Default)]
pub struct Allocation {
  /// Final weights, one per asset.
  pub weights: Vec<f64>,
  /// Model expected portfolio return at the input periodicity.
  pub expected_return: f64,
  /// Model portfolio volatility at the input periodicity.
  pub volatility: f64,
  /// `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
  /// Whether the solver stopped on tolerance rather than the iteration cap.
  pub converged: bool,
  /// Solver iterations consumed.
  pub iterations: u64,
}
