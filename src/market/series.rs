//! # Price Series
//!
//! $$
//! P = \{(t_1, p_1), \dots, (t_n, p_n)\}, \quad t_1 < t_2 < \dots < t_n
//! $$
//!
//! Per-ticker adjusted-close history as supplied by a market-data provider.

use chrono::NaiveDate;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::error::Stage;

/// One observed adjusted-close price.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricePoint {
  /// Trading date of the observation.
  pub date: NaiveDate,
  /// Adjusted close price.
  pub price: f64,
}

/// Date-ascending price history for a single ticker.
///
/// Providers return one price per trading day they have data for; gaps and
/// short histories are expected and handled by the matrix builder, but the
/// ordering invariant is enforced here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceSeries {
  points: Vec<PricePoint>,
}

impl PriceSeries {
  /// Build a series from observations, validating strict date ordering.
  pub fn new(points: Vec<PricePoint>) -> Result<Self> {
    for pair in points.windows(2) {
      if pair[1].date <= pair[0].date {
        return Err(PortfolioError::DataQuality {
          stage: Stage::Build,
          reason: format!(
            "price series dates not strictly increasing at {}",
            pair[1].date
          ),
          tickers: Vec::new(),
        });
      }
    }
    Ok(Self { points })
  }

  /// Build a series from `(date, price)` pairs.
  pub fn from_pairs<I>(pairs: I) -> Result<Self>
  where
    I: IntoIterator<Item = (NaiveDate, f64)>,
  {
    Self::new(
      pairs
        .into_iter()
        .map(|(date, price)| PricePoint { date, price })
        .collect(),
    )
  }

  /// Empty series, the provider shape for an unknown ticker.
  pub fn empty() -> Self {
    Self { points: Vec::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  /// Observations in date order.
  pub fn points(&self) -> &[PricePoint] {
    &self.points
  }

  /// First observed date, if any.
  pub fn first_date(&self) -> Option<NaiveDate> {
    self.points.first().map(|p| p.date)
  }

  /// Last observed date, if any.
  pub fn last_date(&self) -> Option<NaiveDate> {
    self.points.last().map(|p| p.date)
  }

  /// Price on an exact date.
  pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
    self
      .points
      .binary_search_by_key(&date, |p| p.date)
      .ok()
      .map(|i| self.points[i].price)
  }

  /// Simple daily returns `(date, p_t / p_{t-1} - 1)`; one shorter than the series.
  pub fn simple_returns(&self) -> Vec<(NaiveDate, f64)> {
    self
      .points
      .windows(2)
      .filter(|pair| pair[0].price != 0.0)
      .map(|pair| (pair[1].date, pair[1].price / pair[0].price - 1.0))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
  }

  #[test]
  fn rejects_out_of_order_dates() {
    let result = PriceSeries::from_pairs(vec![(d(2), 10.0), (d(1), 11.0)]);
    assert!(result.is_err());
  }

  #[test]
  fn rejects_duplicate_dates() {
    let result = PriceSeries::from_pairs(vec![(d(1), 10.0), (d(1), 11.0)]);
    assert!(result.is_err());
  }

  #[test]
  fn computes_simple_returns() {
    let series = PriceSeries::from_pairs(vec![(d(1), 100.0), (d(2), 110.0), (d(3), 99.0)]).unwrap();
    let returns = series.simple_returns();

    assert_eq!(returns.len(), 2);
    assert_eq!(returns[0].0, d(2));
    assert!((returns[0].1 - 0.1).abs() < 1e-12);
    assert!((returns[1].1 + 0.1).abs() < 1e-12);
  }

  #[test]
  fn looks_up_price_by_date() {
    let series = PriceSeries::from_pairs(vec![(d(1), 100.0), (d(3), 102.0)]).unwrap();
    assert_eq!(series.price_on(d(3)), Some(102.0));
    assert_eq!(series.price_on(d(2)), None);
  }
}
