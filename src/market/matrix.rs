//! # Price Matrix
//!
//! $$
//! P \in \mathbb{R}^{T \times N}, \quad P_{t,i} = \text{adjusted close}
//! $$
//!
//! Outer-joined, cleaned daily-price matrix and the missing-data policy that
//! produces it. The surviving column set is the authoritative ticker
//! universe for every downstream computation.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView1;
use tracing::debug;
use tracing::warn;

use super::series::PriceSeries;

/// Consecutive-missing-run length at which a column is treated as
/// unreliable data rather than patched by forward-fill.
pub const DEFAULT_GAP_THRESHOLD: usize = 4;

/// Cleaned, fully-populated daily price matrix.
///
/// Invariants: no cell is NaN, all columns share the date index, and the
/// date index is strictly ascending.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceMatrix {
  dates: Vec<NaiveDate>,
  tickers: Vec<String>,
  prices: Array2<f64>,
}

impl PriceMatrix {
  /// Shared, ascending date index.
  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  /// Surviving ticker universe, in column order.
  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// Price values, rows indexed by date and columns by ticker.
  pub fn prices(&self) -> &Array2<f64> {
    &self.prices
  }

  pub fn n_dates(&self) -> usize {
    self.dates.len()
  }

  pub fn n_assets(&self) -> usize {
    self.tickers.len()
  }

  /// True when cleaning dropped every column.
  pub fn is_empty(&self) -> bool {
    self.tickers.is_empty() || self.dates.is_empty()
  }

  /// Price column for one ticker.
  pub fn column(&self, ticker: &str) -> Option<ArrayView1<'_, f64>> {
    let idx = self.tickers.iter().position(|t| t == ticker)?;
    Some(self.prices.column(idx))
  }

  /// Decompose back into per-ticker series, e.g. to re-run cleaning.
  pub fn to_series(&self) -> BTreeMap<String, PriceSeries> {
    self
      .tickers
      .iter()
      .enumerate()
      .map(|(i, ticker)| {
        let series = PriceSeries::from_pairs(
          self
            .dates
            .iter()
            .zip(self.prices.column(i).iter())
            .map(|(&date, &price)| (date, price)),
        )
        .expect("matrix date index is strictly ascending");
        (ticker.clone(), series)
      })
      .collect()
  }
}

/// Why a ticker was removed during cleaning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
  /// The series had no valid observation on any joined date.
  EmptySeries,
  /// The longest consecutive missing run reached the gap threshold.
  LongGap { run: usize },
}

/// Structured account of what cleaning did, surfaced to the caller instead
/// of being swallowed per ticker.
#[derive(Clone, Debug, Default)]
pub struct CleaningReport {
  /// Tickers removed, with the reason each was removed.
  pub dropped: Vec<(String, DropReason)>,
  /// Number of tickers requested.
  pub requested: usize,
  /// Number of tickers surviving in the cleaned matrix.
  pub surviving: usize,
}

impl CleaningReport {
  /// Tickers that were dropped, in request order.
  pub fn dropped_tickers(&self) -> Vec<&str> {
    self.dropped.iter().map(|(t, _)| t.as_str()).collect()
  }
}

/// Assembles a clean [`PriceMatrix`] from raw per-ticker series.
#[derive(Clone, Debug)]
pub struct PriceMatrixBuilder {
  gap_threshold: usize,
}

impl Default for PriceMatrixBuilder {
  fn default() -> Self {
    Self {
      gap_threshold: DEFAULT_GAP_THRESHOLD,
    }
  }
}

impl PriceMatrixBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Override the consecutive-missing-run threshold.
  pub fn with_gap_threshold(mut self, gap_threshold: usize) -> Self {
    self.gap_threshold = gap_threshold.max(1);
    self
  }

  /// Outer-join, gap-check, forward-fill and backfill the given series.
  ///
  /// Columns whose longest missing run (measured on the joined matrix,
  /// before any filling) reaches the threshold are dropped rather than
  /// patched; shorter gaps are forward-filled and a short leading gap is
  /// backfilled from the first valid observation. An empty result is
  /// returned as-is; treating a zero-asset matrix as terminal is the
  /// caller's contract.
  pub fn build(&self, series: &BTreeMap<String, PriceSeries>) -> (PriceMatrix, CleaningReport) {
    let mut report = CleaningReport {
      requested: series.len(),
      ..CleaningReport::default()
    };

    let dates: Vec<NaiveDate> = series
      .values()
      .flat_map(|s| s.points().iter().map(|p| p.date))
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();

    let mut tickers = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for (ticker, history) in series {
      let mut column = vec![f64::NAN; dates.len()];
      let mut cursor = history.points().iter().peekable();
      for (row, date) in dates.iter().enumerate() {
        while let Some(point) = cursor.peek() {
          if point.date < *date {
            cursor.next();
          } else {
            break;
          }
        }
        if let Some(point) = cursor.peek() {
          if point.date == *date {
            column[row] = point.price;
          }
        }
      }

      if column.iter().all(|v| v.is_nan()) {
        warn!(%ticker, "dropped: no valid observation on any joined date");
        report
          .dropped
          .push((ticker.clone(), DropReason::EmptySeries));
        continue;
      }

      let run = longest_missing_run(&column);
      if run >= self.gap_threshold {
        warn!(%ticker, run, "dropped: missing-data run at or above threshold");
        report.dropped.push((ticker.clone(), DropReason::LongGap { run }));
        continue;
      }

      forward_fill(&mut column);
      backfill_leading(&mut column);

      tickers.push(ticker.clone());
      columns.push(column);
    }

    report.surviving = tickers.len();
    debug!(
      requested = report.requested,
      surviving = report.surviving,
      rows = dates.len(),
      "price matrix cleaned"
    );

    let (dates, prices) = if tickers.is_empty() {
      (Vec::new(), Array2::zeros((0, 0)))
    } else {
      let n_rows = dates.len();
      let n_cols = columns.len();
      let mut prices = Array2::zeros((n_rows, n_cols));
      for (col, values) in columns.iter().enumerate() {
        for (row, &value) in values.iter().enumerate() {
          prices[[row, col]] = value;
        }
      }
      (dates, prices)
    };

    (
      PriceMatrix {
        dates,
        tickers,
        prices,
      },
      report,
    )
  }
}

/// Longest consecutive NaN run, leading runs included.
fn longest_missing_run(column: &[f64]) -> usize {
  let mut longest = 0;
  let mut current = 0;
  for &value in column {
    if value.is_nan() {
      current += 1;
      longest = longest.max(current);
    } else {
      current = 0;
    }
  }
  longest
}

/// Carry the last valid value over later missing cells.
fn forward_fill(column: &mut [f64]) {
  let mut last_valid = f64::NAN;
  for value in column.iter_mut() {
    if value.is_nan() {
      *value = last_valid;
    } else {
      last_valid = *value;
    }
  }
}

/// Fill a leading missing run from the first valid observation.
fn backfill_leading(column: &mut [f64]) {
  if let Some(first_valid) = column.iter().position(|v| !v.is_nan()) {
    let fill = column[first_valid];
    for value in &mut column[..first_valid] {
      *value = fill;
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use tracing_test::traced_test;

  use super::*;

  fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
  }

  fn series(pairs: Vec<(NaiveDate, f64)>) -> PriceSeries {
    PriceSeries::from_pairs(pairs).unwrap()
  }

  #[test]
  fn outer_joins_on_all_observed_dates() {
    let mut input = BTreeMap::new();
    input.insert(
      "AAA".to_string(),
      series(vec![(d(1), 10.0), (d(2), 11.0), (d(3), 12.0)]),
    );
    input.insert(
      "BBB".to_string(),
      series(vec![(d(2), 50.0), (d(3), 51.0), (d(4), 52.0)]),
    );

    let (matrix, report) = PriceMatrixBuilder::new().build(&input);

    assert_eq!(matrix.dates(), &[d(1), d(2), d(3), d(4)]);
    assert_eq!(matrix.tickers(), &["AAA".to_string(), "BBB".to_string()]);
    assert!(report.dropped.is_empty());
    // AAA forward-filled on the trailing date, BBB backfilled on the leading one.
    assert_eq!(matrix.prices()[[3, 0]], 12.0);
    assert_eq!(matrix.prices()[[0, 1]], 50.0);
  }

  #[traced_test]
  #[test]
  fn drops_column_with_long_gap_even_though_fill_would_patch_it() {
    let mut input = BTreeMap::new();
    input.insert(
      "AAA".to_string(),
      series((1..=10).map(|day| (d(day), 100.0 + day as f64)).collect()),
    );
    // Valid before and after the hole, so forward-fill alone would patch it.
    input.insert(
      "GAP".to_string(),
      series(vec![(d(1), 20.0), (d(2), 20.5), (d(7), 21.0), (d(8), 21.5)]),
    );

    let (matrix, report) = PriceMatrixBuilder::new().build(&input);

    assert_eq!(matrix.tickers(), &["AAA".to_string()]);
    assert_eq!(
      report.dropped,
      vec![("GAP".to_string(), DropReason::LongGap { run: 4 })]
    );
    assert!(logs_contain("dropped"));
  }

  #[test]
  fn keeps_column_with_gap_below_threshold() {
    let mut input = BTreeMap::new();
    input.insert(
      "AAA".to_string(),
      series((1..=6).map(|day| (d(day), 100.0 + day as f64)).collect()),
    );
    input.insert(
      "HOLE".to_string(),
      series(vec![(d(1), 20.0), (d(2), 21.0), (d(6), 22.0)]),
    );

    let (matrix, report) = PriceMatrixBuilder::new().build(&input);

    assert!(report.dropped.is_empty());
    let column = matrix.column("HOLE").unwrap();
    // Rows 3..5 carried forward from the last valid print.
    assert_eq!(column[2], 21.0);
    assert_eq!(column[3], 21.0);
    assert_eq!(column[4], 21.0);
    assert_eq!(column[5], 22.0);
  }

  #[test]
  fn drops_empty_series_and_reports_it() {
    let mut input = BTreeMap::new();
    input.insert("AAA".to_string(), series(vec![(d(1), 10.0), (d(2), 11.0)]));
    input.insert("NONE".to_string(), PriceSeries::empty());

    let (matrix, report) = PriceMatrixBuilder::new().build(&input);

    assert_eq!(matrix.n_assets(), 1);
    assert_eq!(
      report.dropped,
      vec![("NONE".to_string(), DropReason::EmptySeries)]
    );
  }

  #[test]
  fn all_columns_dropped_yields_empty_matrix() {
    let mut input = BTreeMap::new();
    input.insert("NONE".to_string(), PriceSeries::empty());

    let (matrix, report) = PriceMatrixBuilder::new().build(&input);

    assert!(matrix.is_empty());
    assert_eq!(report.surviving, 0);
    assert_eq!(report.requested, 1);
  }

  #[test]
  fn backfills_short_leading_gap() {
    let mut input = BTreeMap::new();
    input.insert(
      "AAA".to_string(),
      series((1..=6).map(|day| (d(day), 10.0 * day as f64)).collect()),
    );
    input.insert(
      "LATE".to_string(),
      series(vec![(d(4), 7.0), (d(5), 7.5), (d(6), 8.0)]),
    );

    let (matrix, _) = PriceMatrixBuilder::new().build(&input);

    let column = matrix.column("LATE").unwrap();
    assert_eq!(column[0], 7.0);
    assert_eq!(column[1], 7.0);
    assert_eq!(column[2], 7.0);
    assert!(column.iter().all(|v| !v.is_nan()));
  }

  #[test]
  fn cleaning_is_idempotent() {
    let mut input = BTreeMap::new();
    input.insert(
      "AAA".to_string(),
      series(vec![(d(1), 10.0), (d(2), 11.0), (d(4), 12.0)]),
    );
    input.insert(
      "BBB".to_string(),
      series(vec![(d(2), 50.0), (d(3), 51.0), (d(4), 52.0)]),
    );

    let builder = PriceMatrixBuilder::new();
    let (first, _) = builder.build(&input);
    let (second, report) = builder.build(&first.to_series());

    assert_eq!(first, second);
    assert!(report.dropped.is_empty());
  }
}
