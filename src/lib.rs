//! # portfolio-rs
//!
//! $$
//! \mathbf{w}^\* = \arg\min_{\mathbf{w} \in \mathcal{W}} \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Portfolio construction and analytics from historical price series:
//! cleaning and aligning raw per-ticker prices into a return matrix,
//! constrained weight optimization under a closed set of strategies, and
//! performance/risk diagnostics against a benchmark.

pub mod analytics;
pub mod engine;
pub mod error;
pub mod market;
pub mod optimize;
pub mod sector;
pub mod universe;

pub use analytics::SummaryComparison;
pub use analytics::SummaryStatistics;
pub use engine::AutoOptimizeReport;
pub use engine::OptimizeOutcome;
pub use engine::PortfolioConfig;
pub use engine::PortfolioEngine;
pub use engine::PreparedUniverse;
pub use error::PortfolioError;
pub use error::Result;
pub use error::Stage;
pub use market::CleaningReport;
pub use market::DropReason;
pub use market::PriceMatrix;
pub use market::PriceMatrixBuilder;
pub use market::PricePoint;
pub use market::PriceSeries;
pub use market::ReturnMatrix;
pub use market::ReturnStatistics;
pub use optimize::Bounds;
pub use optimize::Strategy;
pub use optimize::ViewSet;
pub use optimize::WeightVector;
pub use sector::SectorHierarchy;
pub use universe::ReferenceEntry;
pub use universe::UniverseFilter;
