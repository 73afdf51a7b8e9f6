//! # Performance Analytics
//!
//! $$
//! r_p(t) = \mathbf{r}_t \cdot \mathbf{w}
//! $$
//!
//! Summary statistics, drawdown and time-series views for a weighted
//! portfolio against a benchmark.

pub mod drawdown;
pub mod series;
pub mod summary;

pub use drawdown::cumulative_growth;
pub use drawdown::max_drawdown;
pub use series::align;
pub use series::growth_paths;
pub use series::monthly_returns;
pub use series::rolling_volatility;
pub use series::AlignedReturns;
pub use series::GrowthPaths;
pub use series::MonthlyReturn;
pub use series::RollingVolatility;
pub use summary::beta;
pub use summary::compare;
pub use summary::return_contributions;
pub use summary::summarize_returns;
pub use summary::AssetContribution;
pub use summary::SummaryComparison;
pub use summary::SummaryStatistics;
