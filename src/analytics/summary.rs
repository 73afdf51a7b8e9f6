//! # Summary Statistics
//!
//! $$
//! \mathrm{Sharpe} = \frac{r_y}{\sigma_y}, \qquad
//! \mathrm{Sortino} = \frac{r_y}{\sigma_y^-}
//! $$
//!
//! Standardized performance and risk metrics, computed identically for the
//! portfolio and the benchmark so the two columns are directly comparable.

use chrono::NaiveDate;
use statrs::statistics::Statistics;

use super::drawdown::max_drawdown;
use super::series::AlignedReturns;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::error::Stage;
use crate::market::returns::ReturnStatistics;
use crate::optimize::types::WeightVector;

/// Fixed set of metrics for one return series.
#[derive(Clone, Copy, Debug, Default)]
pub struct SummaryStatistics {
  /// `prod(1 + r) - 1` over the full window.
  pub cumulative_return: f64,
  /// Compound annual growth rate.
  pub cagr: f64,
  /// Arithmetic mean daily return.
  pub expected_daily_return: f64,
  /// Daily mean compounded over 21 trading days.
  pub expected_monthly_return: f64,
  /// Daily mean compounded over 252 trading days.
  pub expected_yearly_return: f64,
  /// Sample standard deviation annualized by `sqrt(252)`.
  pub annualized_volatility: f64,
  /// Annualized RMS of negative daily returns.
  pub downside_deviation: f64,
  /// Yearly return per unit of volatility; 0 when volatility is 0.
  pub sharpe: f64,
  /// Yearly return per unit of downside deviation; 0 when it is 0.
  pub sortino: f64,
  /// Third standardized moment.
  pub skewness: f64,
  /// Fourth standardized moment minus 3.
  pub excess_kurtosis: f64,
  /// Peak-to-trough decline of the cumulative path, in `[-1, 0]`.
  pub max_drawdown: f64,
}

/// Compute the full metric set for one daily return series.
pub fn summarize_returns(returns: &[f64], periods_per_year: f64) -> SummaryStatistics {
  if returns.is_empty() {
    return SummaryStatistics::default();
  }

  let n = returns.len() as f64;
  let cumulative_return = returns.iter().fold(1.0, |acc, &r| acc * (1.0 + r)) - 1.0;
  let daily = returns.iter().mean();
  let monthly = (1.0 + daily).powi(21) - 1.0;
  let yearly = (1.0 + daily).powf(periods_per_year) - 1.0;
  let volatility = if returns.len() < 2 {
    0.0
  } else {
    returns.iter().std_dev() * periods_per_year.sqrt()
  };

  let years = n / periods_per_year;
  let cagr = if years > 0.0 && cumulative_return > -1.0 {
    (1.0 + cumulative_return).powf(1.0 / years) - 1.0
  } else {
    0.0
  };

  let negatives: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
  let downside_deviation = if negatives.is_empty() {
    0.0
  } else {
    let rms = (negatives.iter().map(|r| r * r).sum::<f64>() / negatives.len() as f64).sqrt();
    rms * periods_per_year.sqrt()
  };

  let sharpe = if volatility != 0.0 { yearly / volatility } else { 0.0 };
  let sortino = if downside_deviation != 0.0 {
    yearly / downside_deviation
  } else {
    0.0
  };

  let (skewness, excess_kurtosis) = standardized_moments(returns);

  SummaryStatistics {
    cumulative_return,
    cagr,
    expected_daily_return: daily,
    expected_monthly_return: monthly,
    expected_yearly_return: yearly,
    annualized_volatility: volatility,
    downside_deviation,
    sharpe,
    sortino,
    skewness,
    excess_kurtosis,
    max_drawdown: max_drawdown(returns),
  }
}

/// Third and fourth standardized central moments.
fn standardized_moments(sample: &[f64]) -> (f64, f64) {
  let n = sample.len() as f64;
  if n < 2.0 {
    return (0.0, 0.0);
  }

  let mean = sample.iter().mean();
  let mut m2 = 0.0;
  let mut m3 = 0.0;
  let mut m4 = 0.0;
  for &x in sample {
    let d = x - mean;
    let d2 = d * d;
    m2 += d2;
    m3 += d2 * d;
    m4 += d2 * d2;
  }
  m2 /= n;
  m3 /= n;
  m4 /= n;

  if m2 <= 0.0 || !m2.is_finite() {
    return (0.0, 0.0);
  }

  (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
}

/// Sensitivity of the portfolio to benchmark moves.
///
/// Sample covariance over sample variance, with matching degrees of
/// freedom, so the benchmark's beta against itself is exactly 1.
pub fn beta(portfolio: &[f64], benchmark: &[f64]) -> f64 {
  if portfolio.len() != benchmark.len() || portfolio.len() < 2 {
    return 0.0;
  }

  let market_variance = benchmark.iter().variance();
  if market_variance == 0.0 {
    return 0.0;
  }

  portfolio.iter().covariance(benchmark.iter()) / market_variance
}

/// Side-by-side portfolio/benchmark summary over one aligned window.
#[derive(Clone, Debug)]
pub struct SummaryComparison {
  /// First aligned date.
  pub start: NaiveDate,
  /// Last aligned date.
  pub end: NaiveDate,
  pub portfolio: SummaryStatistics,
  pub benchmark: SummaryStatistics,
  /// Portfolio beta against the benchmark.
  pub beta: f64,
}

/// Compare both aligned series with identical formulas.
pub fn compare(aligned: &AlignedReturns, periods_per_year: f64) -> Result<SummaryComparison> {
  if aligned.is_empty() {
    return Err(PortfolioError::DataQuality {
      stage: Stage::Analytics,
      reason: "no overlapping dates between portfolio and benchmark".to_string(),
      tickers: Vec::new(),
    });
  }

  Ok(SummaryComparison {
    start: aligned.dates[0],
    end: aligned.dates[aligned.len() - 1],
    portfolio: summarize_returns(&aligned.portfolio, periods_per_year),
    benchmark: summarize_returns(&aligned.benchmark, periods_per_year),
    beta: beta(&aligned.portfolio, &aligned.benchmark),
  })
}

/// Per-asset annualized return and its weighted contribution.
#[derive(Clone, Debug)]
pub struct AssetContribution {
  pub ticker: String,
  /// Mean daily return scaled to a year.
  pub annualized_return: f64,
  pub weight: f64,
  /// `weight * annualized_return`.
  pub contribution: f64,
}

/// Weighted per-asset contributions to annualized return, in asset order.
pub fn return_contributions(
  statistics: &ReturnStatistics,
  tickers: &[String],
  weights: &WeightVector,
  periods_per_year: f64,
) -> Result<Vec<AssetContribution>> {
  if tickers.len() != statistics.n_assets() {
    return Err(PortfolioError::DimensionMismatch {
      stage: Stage::Analytics,
      context: "tickers vs return statistics".to_string(),
      expected: statistics.n_assets(),
      actual: tickers.len(),
    });
  }

  tickers
    .iter()
    .enumerate()
    .map(|(i, ticker)| {
      let weight = weights.get(ticker).ok_or_else(|| PortfolioError::UnknownTicker {
        stage: Stage::Analytics,
        ticker: ticker.clone(),
      })?;
      let annualized_return = statistics.mean()[i] * periods_per_year;
      Ok(AssetContribution {
        ticker: ticker.clone(),
        annualized_return,
        weight,
        contribution: weight * annualized_return,
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use ndarray::arr1;
  use ndarray::arr2;

  use super::*;

  #[test]
  fn metrics_match_hand_computation() {
    let returns = vec![0.01, -0.02, 0.03, 0.0];
    let stats = summarize_returns(&returns, 252.0);

    let expected_cum = 1.01 * 0.98 * 1.03 * 1.0 - 1.0;
    assert_relative_eq!(stats.cumulative_return, expected_cum, epsilon = 1e-12);
    assert_relative_eq!(stats.expected_daily_return, 0.005, epsilon = 1e-12);
    assert_relative_eq!(
      stats.expected_monthly_return,
      1.005_f64.powi(21) - 1.0,
      epsilon = 1e-12
    );
    assert_relative_eq!(
      stats.expected_yearly_return,
      1.005_f64.powf(252.0) - 1.0,
      epsilon = 1e-12
    );

    let expected_cagr = (1.0 + expected_cum).powf(252.0 / 4.0) - 1.0;
    assert_relative_eq!(stats.cagr, expected_cagr, epsilon = 1e-12);

    // Only -0.02 is negative, so the downside RMS is 0.02.
    assert_relative_eq!(
      stats.downside_deviation,
      0.02 * 252.0_f64.sqrt(),
      epsilon = 1e-12
    );
  }

  #[test]
  fn zero_volatility_yields_zero_ratios() {
    let stats = summarize_returns(&[0.0, 0.0, 0.0], 252.0);
    assert_eq!(stats.sharpe, 0.0);
    assert_eq!(stats.sortino, 0.0);
    assert_eq!(stats.annualized_volatility, 0.0);
  }

  #[test]
  fn skewness_zero_for_symmetric_sample() {
    let (skew, _) = standardized_moments(&[-0.02, -0.01, 0.0, 0.01, 0.02]);
    assert_relative_eq!(skew, 0.0, epsilon = 1e-12);
  }

  #[test]
  fn beta_of_benchmark_against_itself_is_one() {
    let series = vec![0.01, -0.02, 0.03, 0.005, -0.01];
    assert_relative_eq!(beta(&series, &series), 1.0, epsilon = 1e-12);
  }

  #[test]
  fn beta_zero_when_benchmark_is_flat() {
    let portfolio = vec![0.01, -0.02, 0.03];
    let benchmark = vec![0.0, 0.0, 0.0];
    assert_eq!(beta(&portfolio, &benchmark), 0.0);
  }

  #[test]
  fn leveraged_series_has_proportional_beta() {
    let benchmark = vec![0.01, -0.02, 0.03, 0.005];
    let portfolio: Vec<f64> = benchmark.iter().map(|r| 2.0 * r).collect();
    assert_relative_eq!(beta(&portfolio, &benchmark), 2.0, epsilon = 1e-12);
  }

  #[test]
  fn contributions_scale_with_weight() {
    let statistics = ReturnStatistics::from_parts(
      arr1(&[0.001, 0.002]),
      arr2(&[[0.0001, 0.0], [0.0, 0.0004]]),
    );
    let tickers = vec!["AAA".to_string(), "BBB".to_string()];
    let weights = WeightVector::new(tickers.clone(), vec![0.25, 0.75]).unwrap();

    let contributions =
      return_contributions(&statistics, &tickers, &weights, 252.0).unwrap();

    assert_eq!(contributions.len(), 2);
    assert_relative_eq!(contributions[0].annualized_return, 0.252, epsilon = 1e-12);
    assert_relative_eq!(
      contributions[1].contribution,
      0.75 * 0.504,
      epsilon = 1e-12
    );
  }
}
