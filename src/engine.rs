//! # Portfolio Engine
//!
//! $$
//! \mathbf{w}^\* = \operatorname{Optimize}(\mu, \Sigma, \text{bounds})
//! $$
//!
//! High-level orchestration: clean prices once, derive statistics once,
//! then run strategies and analytics against the immutable session state.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;
use tracing::warn;

use crate::analytics::series;
use crate::analytics::series::AlignedReturns;
use crate::analytics::series::GrowthPaths;
use crate::analytics::series::MonthlyReturn;
use crate::analytics::series::RollingVolatility;
use crate::analytics::summary;
use crate::analytics::summary::AssetContribution;
use crate::analytics::summary::SummaryComparison;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::error::Stage;
use crate::market::matrix::CleaningReport;
use crate::market::matrix::PriceMatrix;
use crate::market::matrix::PriceMatrixBuilder;
use crate::market::returns::ReturnMatrix;
use crate::market::returns::ReturnStatistics;
use crate::market::series::PriceSeries;
use crate::optimize::optimize_strategy;
use crate::optimize::types::Allocation;
use crate::optimize::types::Bounds;
use crate::optimize::types::OptimizeOptions;
use crate::optimize::types::Strategy;
use crate::optimize::types::WeightVector;
use crate::optimize::ViewSet;
use crate::sector::aggregate_by_sector;
use crate::sector::SectorHierarchy;
use crate::universe::ReferenceEntry;

/// Immutable engine configuration, passed in whole at construction.
#[derive(Clone, Debug)]
pub struct PortfolioConfig {
  /// Uniform per-asset maximum investment fraction.
  pub max_position: f64,
  /// Uniform per-asset minimum investment fraction.
  pub min_position: f64,
  /// Floor for the `sum(w) >= n * min_weight` slack constraint.
  pub min_weight: f64,
  /// Risk-free rate at return periodicity.
  pub risk_free: f64,
  /// Optional Black-Litterman views.
  pub views: Option<ViewSet>,
  /// Rolling-volatility window in trading days.
  pub rolling_window: usize,
  /// Trading periods per year.
  pub periods_per_year: f64,
}

impl Default for PortfolioConfig {
  fn default() -> Self {
    Self {
      max_position: 1.0,
      min_position: 0.0,
      min_weight: 0.0,
      risk_free: 0.01,
      views: None,
      rolling_window: 63,
      periods_per_year: 252.0,
    }
  }
}

impl PortfolioConfig {
  /// Config from a max single-equity percentage (e.g. `5.0` for 5%).
  pub fn from_max_percentage(max_percentage: f64) -> Self {
    Self {
      max_position: max_percentage / 100.0,
      ..Self::default()
    }
  }
}

/// Cleaned matrix, derived returns and statistics for one session.
///
/// Built once and treated as read-only; every strategy evaluation and
/// analytics call is a pure function of this state.
#[derive(Clone, Debug)]
pub struct PreparedUniverse {
  matrix: PriceMatrix,
  returns: ReturnMatrix,
  statistics: ReturnStatistics,
  report: CleaningReport,
}

impl PreparedUniverse {
  pub fn matrix(&self) -> &PriceMatrix {
    &self.matrix
  }

  pub fn returns(&self) -> &ReturnMatrix {
    &self.returns
  }

  pub fn statistics(&self) -> &ReturnStatistics {
    &self.statistics
  }

  /// What cleaning dropped, and why.
  pub fn report(&self) -> &CleaningReport {
    &self.report
  }

  /// Surviving ticker universe, in column order.
  pub fn tickers(&self) -> &[String] {
    self.matrix.tickers()
  }

  pub fn n_assets(&self) -> usize {
    self.matrix.n_assets()
  }
}

/// One strategy's result, keyed by ticker.
#[derive(Clone, Debug)]
pub struct OptimizeOutcome {
  pub strategy: Strategy,
  pub weights: WeightVector,
  /// Model expected portfolio return at return periodicity.
  pub expected_return: f64,
  /// Model portfolio volatility at return periodicity.
  pub volatility: f64,
  pub sharpe: f64,
  /// False when the solver stopped on its iteration cap; the weights are
  /// still the best iterate and satisfy the constraints.
  pub converged: bool,
  pub iterations: u64,
}

/// All strategies evaluated side by side.
#[derive(Clone, Debug)]
pub struct AutoOptimizeReport {
  /// Every evaluated outcome, in [`Strategy::all`] order.
  pub outcomes: Vec<OptimizeOutcome>,
  /// Strategy with the highest model Sharpe ratio.
  pub best: Strategy,
}

/// Single entry point for portfolio construction and analytics.
#[derive(Clone, Debug)]
pub struct PortfolioEngine {
  config: PortfolioConfig,
}

impl PortfolioEngine {
  pub fn new(config: PortfolioConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &PortfolioConfig {
    &self.config
  }

  /// Clean the raw series and derive the session statistics.
  ///
  /// Fails when no column survives cleaning or the surviving history is too
  /// short to produce returns.
  pub fn prepare(&self, series: &BTreeMap<String, PriceSeries>) -> Result<PreparedUniverse> {
    let (matrix, report) = PriceMatrixBuilder::new().build(series);

    if matrix.is_empty() {
      return Err(PortfolioError::DataQuality {
        stage: Stage::Build,
        reason: "no tickers survived cleaning".to_string(),
        tickers: report
          .dropped
          .iter()
          .map(|(ticker, _)| ticker.clone())
          .collect(),
      });
    }
    if matrix.n_dates() < 2 {
      return Err(PortfolioError::DataQuality {
        stage: Stage::Statistics,
        reason: "fewer than two shared dates, no returns defined".to_string(),
        tickers: matrix.tickers().to_vec(),
      });
    }

    let returns = ReturnMatrix::from_prices(&matrix);
    let statistics = ReturnStatistics::from_returns(&returns);

    for (i, ticker) in matrix.tickers().iter().enumerate() {
      if statistics.covariance()[[i, i]] <= 0.0 {
        warn!(%ticker, "zero return variance across the window");
      }
    }
    debug!(
      assets = matrix.n_assets(),
      rows = matrix.n_dates(),
      "universe prepared"
    );

    Ok(PreparedUniverse {
      matrix,
      returns,
      statistics,
      report,
    })
  }

  /// Uniform bounds sized for the prepared universe.
  pub fn bounds_for(&self, universe: &PreparedUniverse) -> Bounds {
    Bounds::per_asset(
      (0..universe.n_assets())
        .map(|_| (self.config.min_position, self.config.max_position))
        .collect(),
    )
  }

  /// Run one strategy under the configured constraints.
  pub fn optimize(
    &self,
    universe: &PreparedUniverse,
    strategy: Strategy,
  ) -> Result<OptimizeOutcome> {
    let bounds = self.bounds_for(universe);
    self.optimize_with_bounds(universe, strategy, &bounds)
  }

  /// Run one strategy with explicit per-asset bounds.
  pub fn optimize_with_bounds(
    &self,
    universe: &PreparedUniverse,
    strategy: Strategy,
    bounds: &Bounds,
  ) -> Result<OptimizeOutcome> {
    let options = OptimizeOptions {
      risk_free: self.config.risk_free,
      min_weight: self.config.min_weight,
    };

    let allocation = optimize_strategy(
      strategy,
      universe.statistics(),
      bounds,
      &options,
      self.config.views.as_ref(),
    )?;

    self.outcome(universe, strategy, allocation)
  }

  /// Evaluate every applicable strategy and pick the best model Sharpe.
  ///
  /// Black-Litterman participates only when views are configured.
  pub fn auto_optimize(&self, universe: &PreparedUniverse) -> Result<AutoOptimizeReport> {
    let mut outcomes = Vec::new();
    for strategy in Strategy::all() {
      if strategy == Strategy::BlackLitterman && self.config.views.is_none() {
        continue;
      }
      outcomes.push(self.optimize(universe, strategy)?);
    }

    let best = outcomes
      .iter()
      .max_by(|a, b| {
        a.sharpe
          .partial_cmp(&b.sharpe)
          .unwrap_or(std::cmp::Ordering::Equal)
      })
      .map(|outcome| outcome.strategy)
      .expect("at least three strategies are always evaluated");

    Ok(AutoOptimizeReport { outcomes, best })
  }

  /// Side-by-side summary against a benchmark price series.
  pub fn summary(
    &self,
    universe: &PreparedUniverse,
    weights: &WeightVector,
    benchmark: &PriceSeries,
  ) -> Result<SummaryComparison> {
    let aligned = self.aligned_returns(universe, weights, benchmark)?;
    summary::compare(&aligned, self.config.periods_per_year)
  }

  /// Portfolio and benchmark daily returns inner-joined on date.
  pub fn aligned_returns(
    &self,
    universe: &PreparedUniverse,
    weights: &WeightVector,
    benchmark: &PriceSeries,
  ) -> Result<AlignedReturns> {
    let portfolio = universe.returns().weighted(weights)?;
    let benchmark_returns = benchmark.simple_returns();
    Ok(series::align(&portfolio, &benchmark_returns))
  }

  /// Cumulative growth paths for relative charting.
  pub fn growth_paths(
    &self,
    universe: &PreparedUniverse,
    weights: &WeightVector,
    benchmark: &PriceSeries,
  ) -> Result<GrowthPaths> {
    let aligned = self.aligned_returns(universe, weights, benchmark)?;
    Ok(series::growth_paths(&aligned))
  }

  /// Calendar-month compounded portfolio returns.
  pub fn monthly_returns(
    &self,
    universe: &PreparedUniverse,
    weights: &WeightVector,
  ) -> Result<Vec<MonthlyReturn>> {
    let portfolio = universe.returns().weighted(weights)?;
    let (dates, values): (Vec<NaiveDate>, Vec<f64>) = portfolio.into_iter().unzip();
    Ok(series::monthly_returns(&dates, &values))
  }

  /// Rolling annualized volatility for portfolio and benchmark.
  pub fn rolling_volatility(
    &self,
    universe: &PreparedUniverse,
    weights: &WeightVector,
    benchmark: &PriceSeries,
  ) -> Result<RollingVolatility> {
    let aligned = self.aligned_returns(universe, weights, benchmark)?;
    Ok(series::rolling_volatility(
      &aligned,
      self.config.rolling_window,
      self.config.periods_per_year,
    ))
  }

  /// Per-asset annualized return contributions.
  pub fn return_contributions(
    &self,
    universe: &PreparedUniverse,
    weights: &WeightVector,
  ) -> Result<Vec<AssetContribution>> {
    summary::return_contributions(
      universe.statistics(),
      universe.tickers(),
      weights,
      self.config.periods_per_year,
    )
  }

  /// Sector/asset weight hierarchy from the reference table.
  pub fn sector_hierarchy(
    &self,
    weights: &WeightVector,
    reference: &BTreeMap<String, ReferenceEntry>,
  ) -> Result<SectorHierarchy> {
    aggregate_by_sector(weights, reference)
  }

  fn outcome(
    &self,
    universe: &PreparedUniverse,
    strategy: Strategy,
    allocation: Allocation,
  ) -> Result<OptimizeOutcome> {
    let weights = WeightVector::new(universe.tickers().to_vec(), allocation.weights)?;
    if !allocation.converged {
      warn!(
        strategy = strategy.label(),
        iterations = allocation.iterations,
        "strategy did not fully converge; best iterate returned"
      );
    }

    Ok(OptimizeOutcome {
      strategy,
      weights,
      expected_return: allocation.expected_return,
      volatility: allocation.volatility,
      sharpe: allocation.sharpe,
      converged: allocation.converged,
      iterations: allocation.iterations,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;
  use chrono::NaiveDate;

  use super::*;

  fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
  }

  fn three_ticker_series() -> BTreeMap<String, PriceSeries> {
    let mut input = BTreeMap::new();
    input.insert(
      "AAA".to_string(),
      PriceSeries::from_pairs(vec![
        (d(1), 100.0),
        (d(2), 101.0),
        (d(3), 102.0),
        (d(4), 101.0),
      ])
      .unwrap(),
    );
    input.insert(
      "BBB".to_string(),
      PriceSeries::from_pairs(vec![
        (d(1), 50.0),
        (d(2), 49.0),
        (d(3), 51.0),
        (d(4), 52.0),
      ])
      .unwrap(),
    );
    input.insert(
      "CCC".to_string(),
      PriceSeries::from_pairs(vec![
        (d(1), 10.0),
        (d(2), 10.5),
        (d(3), 10.0),
        (d(4), 9.5),
      ])
      .unwrap(),
    );
    input
  }

  fn benchmark() -> PriceSeries {
    PriceSeries::from_pairs(vec![
      (d(1), 4000.0),
      (d(2), 4010.0),
      (d(3), 3990.0),
      (d(4), 4020.0),
    ])
    .unwrap()
  }

  #[test]
  fn prepare_rejects_empty_input() {
    let engine = PortfolioEngine::new(PortfolioConfig::default());
    let err = engine.prepare(&BTreeMap::new()).unwrap_err();
    assert_eq!(err.stage(), Stage::Build);
  }

  #[test]
  fn min_variance_weights_satisfy_invariants() {
    let engine = PortfolioEngine::new(PortfolioConfig::default());
    let universe = engine.prepare(&three_ticker_series()).unwrap();

    let outcome = engine
      .optimize(&universe, Strategy::MinimumVariance)
      .unwrap();

    assert_abs_diff_eq!(outcome.weights.sum(), 1.0, epsilon = 1e-6);
    for (_, w) in outcome.weights.iter() {
      assert!((0.0..=1.0).contains(&w));
    }
  }

  #[test]
  fn equal_weight_is_exactly_one_third() {
    let engine = PortfolioEngine::new(PortfolioConfig::default());
    let universe = engine.prepare(&three_ticker_series()).unwrap();

    let outcome = engine.optimize(&universe, Strategy::EqualWeight).unwrap();

    for ticker in ["AAA", "BBB", "CCC"] {
      assert_relative_eq!(
        outcome.weights.get(ticker).unwrap(),
        1.0 / 3.0,
        epsilon = 1e-15
      );
    }
  }

  #[test]
  fn auto_optimize_skips_black_litterman_without_views() {
    let engine = PortfolioEngine::new(PortfolioConfig {
      risk_free: 0.0,
      ..PortfolioConfig::default()
    });
    let universe = engine.prepare(&three_ticker_series()).unwrap();

    let report = engine.auto_optimize(&universe).unwrap();

    assert_eq!(report.outcomes.len(), 3);
    let best_sharpe = report
      .outcomes
      .iter()
      .map(|o| o.sharpe)
      .fold(f64::NEG_INFINITY, f64::max);
    let best = report
      .outcomes
      .iter()
      .find(|o| o.strategy == report.best)
      .unwrap();
    assert_eq!(best.sharpe, best_sharpe);
  }

  #[test]
  fn summary_aligns_portfolio_and_benchmark() {
    let engine = PortfolioEngine::new(PortfolioConfig::default());
    let universe = engine.prepare(&three_ticker_series()).unwrap();
    let outcome = engine.optimize(&universe, Strategy::EqualWeight).unwrap();

    let comparison = engine
      .summary(&universe, &outcome.weights, &benchmark())
      .unwrap();

    assert_eq!(comparison.start, d(2));
    assert_eq!(comparison.end, d(4));
    assert!(comparison.portfolio.max_drawdown <= 0.0);
    assert!(comparison.portfolio.max_drawdown >= -1.0);
  }

  #[test]
  fn disjoint_benchmark_dates_are_a_data_quality_error() {
    let engine = PortfolioEngine::new(PortfolioConfig::default());
    let universe = engine.prepare(&three_ticker_series()).unwrap();
    let outcome = engine.optimize(&universe, Strategy::EqualWeight).unwrap();

    let far_benchmark = PriceSeries::from_pairs(vec![
      (NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), 100.0),
      (NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(), 101.0),
    ])
    .unwrap();

    let err = engine
      .summary(&universe, &outcome.weights, &far_benchmark)
      .unwrap_err();
    assert_eq!(err.stage(), Stage::Analytics);
  }
}
