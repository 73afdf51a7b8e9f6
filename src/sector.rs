//! # Sector Aggregation
//!
//! $$
//! W_s = \sum_{t \in s} w_t, \qquad
//! p_t = 100 \cdot \frac{w_t}{W_s}
//! $$
//!
//! Two-level sector/asset weight hierarchy for reporting layers. The
//! materiality filter runs before normalization so tiny residual weights
//! cannot distort the percentages.

use std::collections::BTreeMap;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::error::Stage;
use crate::optimize::types::WeightVector;
use crate::universe::ReferenceEntry;

/// Weights below this fraction (0.01%) are dropped before aggregation.
pub const MATERIALITY_THRESHOLD: f64 = 1e-4;

/// Leaf of the hierarchy: one asset inside its sector.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetNode {
  pub ticker: String,
  /// Portfolio weight of the asset.
  pub weight: f64,
  /// Weight as a percentage of the sector total.
  pub sector_percent: f64,
}

/// One sector with its member assets.
#[derive(Clone, Debug, PartialEq)]
pub struct SectorNode {
  pub name: String,
  /// Sum of member asset weights.
  pub weight: f64,
  pub assets: Vec<AssetNode>,
}

/// Root of the two-level hierarchy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectorHierarchy {
  /// Sectors in name order.
  pub sectors: Vec<SectorNode>,
}

impl SectorHierarchy {
  /// Sum of all surviving sector weights.
  pub fn total_weight(&self) -> f64 {
    self.sectors.iter().map(|s| s.weight).sum()
  }
}

/// Group weights by sector using the reference table.
///
/// Every weighted ticker must have a reference entry; a missing entry means
/// a caller invariant was already broken upstream and is surfaced as a hard
/// failure.
pub fn aggregate_by_sector(
  weights: &WeightVector,
  reference: &BTreeMap<String, ReferenceEntry>,
) -> Result<SectorHierarchy> {
  let mut by_sector: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();

  for (ticker, weight) in weights.iter() {
    let entry = reference
      .get(ticker)
      .ok_or_else(|| PortfolioError::UnknownTicker {
        stage: Stage::Aggregate,
        ticker: ticker.to_string(),
      })?;

    if weight < MATERIALITY_THRESHOLD {
      continue;
    }
    by_sector
      .entry(entry.sector.as_str())
      .or_default()
      .push((ticker, weight));
  }

  let sectors = by_sector
    .into_iter()
    .filter_map(|(name, members)| {
      let sector_weight: f64 = members.iter().map(|(_, w)| w).sum();
      if sector_weight < MATERIALITY_THRESHOLD {
        return None;
      }

      let assets = members
        .into_iter()
        .map(|(ticker, weight)| AssetNode {
          ticker: ticker.to_string(),
          weight,
          sector_percent: 100.0 * weight / sector_weight,
        })
        .collect();

      Some(SectorNode {
        name: name.to_string(),
        weight: sector_weight,
        assets,
      })
    })
    .collect();

  Ok(SectorHierarchy { sectors })
}
