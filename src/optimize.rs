//! # Optimization
//!
//! $$
//! \mathbf{w}^\* = \arg\max_{\mathbf{w} \in \mathcal{W}} f(\mathbf{w})
//! $$
//!
//! Constrained allocation under a closed set of strategies.

pub mod black_litterman;
pub mod constraints;
pub mod solver;
pub mod types;

pub use black_litterman::adjusted_returns;
pub use black_litterman::ViewSet;
pub use black_litterman::DEFAULT_TAU;
pub use solver::optimize_equal_weight;
pub use solver::optimize_max_sharpe;
pub use solver::optimize_max_sharpe_with_returns;
pub use solver::optimize_min_variance;
pub use solver::MAX_ITERS;
pub use types::Allocation;
pub use types::Bounds;
pub use types::OptimizeOptions;
pub use types::Strategy;
pub use types::WeightVector;
pub use types::WEIGHT_TOLERANCE;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::error::Stage;
use crate::market::returns::ReturnStatistics;

/// Run one strategy against shared statistics and constraints.
///
/// Black-Litterman requires a view set; asking for it without views is a
/// caller error surfaced before any solve.
pub fn optimize_strategy(
  strategy: Strategy,
  statistics: &ReturnStatistics,
  bounds: &Bounds,
  options: &OptimizeOptions,
  views: Option<&ViewSet>,
) -> Result<Allocation> {
  if statistics.n_assets() == 0 {
    return Err(PortfolioError::DataQuality {
      stage: Stage::Optimize,
      reason: "no assets to allocate over".to_string(),
      tickers: Vec::new(),
    });
  }

  match strategy {
    Strategy::MinimumVariance => optimize_min_variance(statistics, bounds, options),
    Strategy::EqualWeight => optimize_equal_weight(statistics, bounds, options),
    Strategy::MaximumSharpe => optimize_max_sharpe(statistics, bounds, options),
    Strategy::BlackLitterman => {
      let views = views.ok_or_else(|| PortfolioError::DataQuality {
        stage: Stage::Optimize,
        reason: "black-litterman requested without a view set".to_string(),
        tickers: Vec::new(),
      })?;
      let adjusted = adjusted_returns(statistics, views)?;
      optimize_max_sharpe_with_returns(&adjusted, statistics, bounds, options)
    }
  }
}

#[cfg(test)]
mod tests {
  use ndarray::arr1;
  use ndarray::arr2;
  use ndarray::Array2;

  use super::*;

  fn statistics() -> ReturnStatistics {
    ReturnStatistics::from_parts(
      arr1(&[0.001, 0.0005, 0.0015]),
      arr2(&[
        [0.0004, 0.0001, 0.0],
        [0.0001, 0.0009, 0.0002],
        [0.0, 0.0002, 0.0016],
      ]),
    )
  }

  #[test]
  fn every_strategy_returns_valid_weights() {
    let stats = statistics();
    let bounds = Bounds::uniform(3, 1.0);
    let options = OptimizeOptions::default();
    let views = ViewSet::new(arr2(&[[1.0, 0.0, 0.0]]), arr1(&[0.02]));

    for strategy in Strategy::all() {
      let result =
        optimize_strategy(strategy, &stats, &bounds, &options, Some(&views)).unwrap();
      let sum: f64 = result.weights.iter().sum();
      assert!(
        (sum - 1.0).abs() < WEIGHT_TOLERANCE,
        "{}: weights sum to {sum}",
        strategy.label()
      );
    }
  }

  #[test]
  fn black_litterman_without_views_is_an_error() {
    let stats = statistics();
    let bounds = Bounds::uniform(3, 1.0);

    assert!(optimize_strategy(
      Strategy::BlackLitterman,
      &stats,
      &bounds,
      &OptimizeOptions::default(),
      None,
    )
    .is_err());
  }

  #[test]
  fn empty_universe_is_an_error() {
    let stats = ReturnStatistics::from_parts(arr1(&[]), Array2::zeros((0, 0)));
    let bounds = Bounds::uniform(0, 1.0);

    assert!(optimize_strategy(
      Strategy::MinimumVariance,
      &stats,
      &bounds,
      &OptimizeOptions::default(),
      None,
    )
    .is_err());
  }
}
