//! # Return Series Views
//!
//! $$
//! r^{(M)} = \prod_{t \in M} (1 + r_t) - 1
//! $$
//!
//! Date alignment, calendar-month compounding and rolling volatility for
//! charting layers. Everything here exposes raw floats; formatting belongs
//! to the caller.

use chrono::Datelike;
use chrono::NaiveDate;
use statrs::statistics::Statistics;

use super::drawdown::cumulative_growth;

/// Portfolio and benchmark daily returns inner-joined on date.
///
/// Dates present in only one series are dropped, never imputed.
#[derive(Clone, Debug, Default)]
pub struct AlignedReturns {
  /// Shared date index.
  pub dates: Vec<NaiveDate>,
  /// Portfolio daily returns.
  pub portfolio: Vec<f64>,
  /// Benchmark daily returns.
  pub benchmark: Vec<f64>,
}

impl AlignedReturns {
  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }
}

/// Inner-join two dated return series.
pub fn align(
  portfolio: &[(NaiveDate, f64)],
  benchmark: &[(NaiveDate, f64)],
) -> AlignedReturns {
  let mut aligned = AlignedReturns::default();
  let mut i = 0;
  let mut j = 0;

  while i < portfolio.len() && j < benchmark.len() {
    let (pd, pr) = portfolio[i];
    let (bd, br) = benchmark[j];
    if pd == bd {
      aligned.dates.push(pd);
      aligned.portfolio.push(pr);
      aligned.benchmark.push(br);
      i += 1;
      j += 1;
    } else if pd < bd {
      i += 1;
    } else {
      j += 1;
    }
  }

  aligned
}

/// Compounded return for one calendar month.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonthlyReturn {
  pub year: i32,
  pub month: u32,
  /// Compounded return over the month's trading days.
  pub value: f64,
}

/// Resample daily returns by compounding within each calendar month.
pub fn monthly_returns(dates: &[NaiveDate], returns: &[f64]) -> Vec<MonthlyReturn> {
  let mut out: Vec<MonthlyReturn> = Vec::new();

  for (date, &r) in dates.iter().zip(returns) {
    let (year, month) = (date.year(), date.month());
    match out.last_mut() {
      Some(bucket) if bucket.year == year && bucket.month == month => {
        bucket.value = (1.0 + bucket.value) * (1.0 + r) - 1.0;
      }
      _ => out.push(MonthlyReturn {
        year,
        month,
        value: r,
      }),
    }
  }

  out
}

/// Rolling annualized volatility for both aligned series.
///
/// One point per date from the first full window onward.
#[derive(Clone, Debug, Default)]
pub struct RollingVolatility {
  pub dates: Vec<NaiveDate>,
  pub portfolio: Vec<f64>,
  pub benchmark: Vec<f64>,
}

/// Rolling sample standard deviation annualized by `sqrt(periods_per_year)`.
pub fn rolling_volatility(
  aligned: &AlignedReturns,
  window: usize,
  periods_per_year: f64,
) -> RollingVolatility {
  let mut out = RollingVolatility::default();
  let window = window.max(2);
  if aligned.len() < window {
    return out;
  }

  let factor = periods_per_year.sqrt();
  for end in window..=aligned.len() {
    let start = end - window;
    out.dates.push(aligned.dates[end - 1]);
    out
      .portfolio
      .push(aligned.portfolio[start..end].iter().std_dev() * factor);
    out
      .benchmark
      .push(aligned.benchmark[start..end].iter().std_dev() * factor);
  }

  out
}

/// Cumulative growth paths for both aligned series, for relative charts.
#[derive(Clone, Debug, Default)]
pub struct GrowthPaths {
  pub dates: Vec<NaiveDate>,
  pub portfolio: Vec<f64>,
  pub benchmark: Vec<f64>,
}

/// Compound both series from a common base of 1.
pub fn growth_paths(aligned: &AlignedReturns) -> GrowthPaths {
  GrowthPaths {
    dates: aligned.dates.clone(),
    portfolio: cumulative_growth(&aligned.portfolio),
    benchmark: cumulative_growth(&aligned.benchmark),
  }
}
