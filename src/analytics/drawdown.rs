//! # Drawdown
//!
//! $$
//! \mathrm{MDD} = \min_t \frac{C_t - \max_{s \le t} C_s}{\max_{s \le t} C_s}
//! $$
//!
//! Cumulative growth path and peak-to-trough decline.

/// Cumulative growth path `prod(1 + r)` up to each date.
pub fn cumulative_growth(returns: &[f64]) -> Vec<f64> {
  let mut path = Vec::with_capacity(returns.len());
  let mut level = 1.0;
  for &r in returns {
    level *= 1.0 + r;
    path.push(level);
  }
  path
}

/// Maximum drawdown over the cumulative-return path, in `[-1, 0]`.
///
/// Zero only for a non-decreasing path; an empty series has no drawdown.
pub fn max_drawdown(returns: &[f64]) -> f64 {
  let mut peak = f64::NEG_INFINITY;
  let mut worst = 0.0_f64;
  let mut level = 1.0;

  for &r in returns {
    level *= 1.0 + r;
    peak = peak.max(level);
    if peak > 0.0 {
      worst = worst.min((level - peak) / peak);
    }
  }

  worst.max(-1.0)
}
