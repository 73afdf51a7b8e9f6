//! # Return Statistics
//!
//! $$
//! \mu_i = \mathbb{E}[r_i], \qquad
//! \Sigma_{ij} = \operatorname{Cov}(r_i, r_j)
//! $$
//!
//! Daily simple-return matrix plus the mean vector and sample covariance
//! consumed by every optimizer and analytics call. Both are computed once
//! per session and reused; they are `O(nm)` and `O(m^2)` respectively.

use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;

use super::matrix::PriceMatrix;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::error::Stage;
use crate::optimize::types::WeightVector;

/// Daily simple returns, one row shorter than the price matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnMatrix {
  dates: Vec<NaiveDate>,
  tickers: Vec<String>,
  returns: Array2<f64>,
}

impl ReturnMatrix {
  /// Derive `p_t / p_{t-1} - 1` per column; the first date has no return.
  pub fn from_prices(prices: &PriceMatrix) -> Self {
    let n_rows = prices.n_dates().saturating_sub(1);
    let n_cols = prices.n_assets();
    let mut returns = Array2::zeros((n_rows, n_cols));

    let values = prices.prices();
    for row in 0..n_rows {
      for col in 0..n_cols {
        let prev = values[[row, col]];
        returns[[row, col]] = if prev != 0.0 {
          values[[row + 1, col]] / prev - 1.0
        } else {
          0.0
        };
      }
    }

    Self {
      dates: prices.dates().iter().skip(1).copied().collect(),
      tickers: prices.tickers().to_vec(),
      returns,
    }
  }

  /// Date index, aligned to the rows.
  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  /// Ticker universe, in column order.
  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// Return values, rows indexed by date and columns by ticker.
  pub fn values(&self) -> &Array2<f64> {
    &self.returns
  }

  pub fn n_dates(&self) -> usize {
    self.dates.len()
  }

  pub fn n_assets(&self) -> usize {
    self.tickers.len()
  }

  /// Row-wise dot product with a weight vector: the portfolio return series.
  ///
  /// Weights are matched by ticker; a weight for an unknown ticker or a
  /// missing weight for a column is a caller error.
  pub fn weighted(&self, weights: &WeightVector) -> Result<Vec<(NaiveDate, f64)>> {
    if weights.len() != self.n_assets() {
      return Err(PortfolioError::DimensionMismatch {
        stage: Stage::Analytics,
        context: "weight vector vs return matrix".to_string(),
        expected: self.n_assets(),
        actual: weights.len(),
      });
    }

    let mut ordered = Array1::zeros(self.n_assets());
    for (col, ticker) in self.tickers.iter().enumerate() {
      ordered[col] = weights.get(ticker).ok_or_else(|| PortfolioError::UnknownTicker {
        stage: Stage::Analytics,
        ticker: ticker.clone(),
      })?;
    }

    let series = self.returns.dot(&ordered);
    Ok(self.dates.iter().copied().zip(series).collect())
  }
}

/// Mean return vector and sample covariance matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStatistics {
  mean: Array1<f64>,
  covariance: Array2<f64>,
}

impl ReturnStatistics {
  /// Compute both statistics over the shared date range.
  pub fn from_returns(returns: &ReturnMatrix) -> Self {
    let values = returns.values();
    let n_rows = returns.n_dates();
    let n_cols = returns.n_assets();

    let mean = values
      .mean_axis(Axis(0))
      .unwrap_or_else(|| Array1::zeros(n_cols));

    let covariance = if n_rows < 2 {
      Array2::zeros((n_cols, n_cols))
    } else {
      let centered = values - &mean;
      centered.t().dot(&centered) / (n_rows - 1) as f64
    };

    Self { mean, covariance }
  }

  /// Assemble statistics from precomputed parts.
  ///
  /// Useful for model-implied inputs (e.g. a Black-Litterman adjusted mean
  /// paired with the historical covariance) and for tests.
  pub fn from_parts(mean: Array1<f64>, covariance: Array2<f64>) -> Self {
    Self { mean, covariance }
  }

  /// Arithmetic mean of daily simple returns, per asset.
  pub fn mean(&self) -> &Array1<f64> {
    &self.mean
  }

  /// Sample covariance of daily simple returns.
  pub fn covariance(&self) -> &Array2<f64> {
    &self.covariance
  }

  pub fn n_assets(&self) -> usize {
    self.mean.len()
  }

  /// Per-asset return variances, the covariance diagonal.
  pub fn variances(&self) -> Array1<f64> {
    self.covariance.diag().to_owned()
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use approx::assert_relative_eq;
  use chrono::NaiveDate;

  use super::*;
  use crate::market::matrix::PriceMatrixBuilder;
  use crate::market::series::PriceSeries;

  fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
  }

  fn two_asset_matrix() -> PriceMatrix {
    let mut input = BTreeMap::new();
    input.insert(
      "AAA".to_string(),
      PriceSeries::from_pairs(vec![(d(1), 100.0), (d(2), 110.0), (d(3), 99.0)]).unwrap(),
    );
    input.insert(
      "BBB".to_string(),
      PriceSeries::from_pairs(vec![(d(1), 50.0), (d(2), 50.0), (d(3), 55.0)]).unwrap(),
    );
    PriceMatrixBuilder::new().build(&input).0
  }

  #[test]
  fn returns_are_one_row_shorter() {
    let prices = two_asset_matrix();
    let returns = ReturnMatrix::from_prices(&prices);

    assert_eq!(returns.n_dates(), prices.n_dates() - 1);
    assert_eq!(returns.dates()[0], d(2));
    assert_relative_eq!(returns.values()[[0, 0]], 0.1, epsilon = 1e-12);
    assert_relative_eq!(returns.values()[[1, 1]], 0.1, epsilon = 1e-12);
  }

  #[test]
  fn mean_and_covariance_match_hand_computation() {
    let prices = two_asset_matrix();
    let returns = ReturnMatrix::from_prices(&prices);
    let stats = ReturnStatistics::from_returns(&returns);

    // AAA returns: 0.1, -0.1; BBB returns: 0.0, 0.1.
    assert_relative_eq!(stats.mean()[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(stats.mean()[1], 0.05, epsilon = 1e-12);
    // Sample covariance with n-1 normalization.
    assert_relative_eq!(stats.covariance()[[0, 0]], 0.02, epsilon = 1e-12);
    assert_relative_eq!(stats.covariance()[[1, 1]], 0.005, epsilon = 1e-12);
    assert_relative_eq!(stats.covariance()[[0, 1]], -0.01, epsilon = 1e-12);
    assert_relative_eq!(
      stats.covariance()[[0, 1]],
      stats.covariance()[[1, 0]],
      epsilon = 1e-15
    );
  }

  #[test]
  fn weighted_series_matches_manual_dot_product() {
    let prices = two_asset_matrix();
    let returns = ReturnMatrix::from_prices(&prices);
    let weights = WeightVector::new(
      vec!["AAA".to_string(), "BBB".to_string()],
      vec![0.25, 0.75],
    )
    .unwrap();

    let series = returns.weighted(&weights).unwrap();
    assert_eq!(series.len(), 2);
    assert_relative_eq!(series[0].1, 0.25 * 0.1, epsilon = 1e-12);
    assert_relative_eq!(series[1].1, 0.25 * -0.1 + 0.75 * 0.1, epsilon = 1e-12);
  }

  #[test]
  fn weighted_rejects_mismatched_universe() {
    let prices = two_asset_matrix();
    let returns = ReturnMatrix::from_prices(&prices);
    let weights = WeightVector::new(vec!["AAA".to_string()], vec![1.0]).unwrap();

    assert!(returns.weighted(&weights).is_err());
  }
}
