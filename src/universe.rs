//! # Universe Filtering
//!
//! Candidate-ticker selection from a static reference table under an
//! explicit, immutable filter configuration. Preferred tickers bypass the
//! filters; everything else must clear both the sector exclusion and the
//! risk ceiling.

use std::collections::BTreeSet;

use tracing::debug;

/// One row of the ticker reference table.
///
/// Persistence of the table itself is an external concern; the engine only
/// consumes rows.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceEntry {
  pub ticker: String,
  pub sector: String,
  pub industry: String,
  /// Provider risk score, conventionally 1 (low) to 10 (high).
  pub overall_risk: f64,
}

/// Immutable universe filter, replacing a mutable user/session object.
#[derive(Clone, Debug, Default)]
pub struct UniverseFilter {
  /// Sectors excluded from selection.
  pub sectors_to_avoid: BTreeSet<String>,
  /// Maximum tolerated risk score; `None` disables the ceiling.
  pub max_risk: Option<f64>,
  /// Tickers included regardless of the filters.
  pub always_include: BTreeSet<String>,
}

/// Apply the filter to reference rows, preserving input order.
pub fn filter_universe(entries: &[ReferenceEntry], filter: &UniverseFilter) -> Vec<String> {
  let selected: Vec<String> = entries
    .iter()
    .filter(|entry| {
      if filter.always_include.contains(&entry.ticker) {
        return true;
      }
      if filter.sectors_to_avoid.contains(&entry.sector) {
        return false;
      }
      match filter.max_risk {
        Some(ceiling) => entry.overall_risk <= ceiling,
        None => true,
      }
    })
    .map(|entry| entry.ticker.clone())
    .collect();

  debug!(
    candidates = entries.len(),
    selected = selected.len(),
    "universe filtered"
  );
  selected
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entries() -> Vec<ReferenceEntry> {
    vec![
      ReferenceEntry {
        ticker: "AAA".to_string(),
        sector: "Technology".to_string(),
        industry: "Software".to_string(),
        overall_risk: 7.0,
      },
      ReferenceEntry {
        ticker: "BBB".to_string(),
        sector: "Energy".to_string(),
        industry: "Oil & Gas".to_string(),
        overall_risk: 3.0,
      },
      ReferenceEntry {
        ticker: "CCC".to_string(),
        sector: "Utilities".to_string(),
        industry: "Electric".to_string(),
        overall_risk: 2.0,
      },
    ]
  }

  #[test]
  fn excluded_sectors_are_removed() {
    let filter = UniverseFilter {
      sectors_to_avoid: ["Energy".to_string()].into_iter().collect(),
      ..UniverseFilter::default()
    };

    let tickers = filter_universe(&entries(), &filter);
    assert_eq!(tickers, vec!["AAA".to_string(), "CCC".to_string()]);
  }

  #[test]
  fn risk_ceiling_applies_to_non_preferred_tickers() {
    let filter = UniverseFilter {
      max_risk: Some(5.0),
      ..UniverseFilter::default()
    };

    let tickers = filter_universe(&entries(), &filter);
    assert_eq!(tickers, vec!["BBB".to_string(), "CCC".to_string()]);
  }

  #[test]
  fn preferred_tickers_bypass_every_filter() {
    let filter = UniverseFilter {
      sectors_to_avoid: ["Technology".to_string()].into_iter().collect(),
      max_risk: Some(1.0),
      always_include: ["AAA".to_string()].into_iter().collect(),
    };

    let tickers = filter_universe(&entries(), &filter);
    assert_eq!(tickers, vec!["AAA".to_string()]);
  }
}
