use serde::{Deserialize, Serialize};

use super::ContributionRecord;

/// Normalized fund identifier: lowercase with all whitespace stripped, so
/// "Christmas Fund", "christmasfund" and " christmas fund " all address the
/// same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundKey(String);

impl FundKey {
    pub fn new(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(|c| c.to_lowercase())
            .collect();
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FundKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A configured giving campaign: the local cache key, a human label for the
/// UI, and the identifier the provider expects in its `fund` query
/// parameter (these differ: cache key "tech" vs. query id
/// "tech-contributions").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSpec {
    pub key: FundKey,
    pub label: String,
    pub query_id: String,
}

impl FundSpec {
    pub fn new(key: &str, label: &str, query_id: &str) -> Self {
        Self {
            key: FundKey::new(key),
            label: label.to_string(),
            query_id: query_id.to_string(),
        }
    }
}

/// One fund's data as fetched from the provider and as persisted in the
/// cache. Both fields are defaulted so a partial response never produces a
/// snapshot with missing pieces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundSnapshot {
    #[serde(default)]
    pub contributions: Vec<ContributionRecord>,
    #[serde(rename = "goalAmount", default)]
    pub goal_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fund_key_normalization() {
        assert_eq!(FundKey::new("Christmas Fund").as_str(), "christmasfund");
        assert_eq!(FundKey::new("  TECH ").as_str(), "tech");
        assert_eq!(FundKey::new("tech"), FundKey::new("Tech"));
    }

    #[test]
    fn test_snapshot_defaults_missing_fields() {
        let snapshot: FundSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.contributions.is_empty());
        assert_eq!(snapshot.goal_amount, 0.0);
    }

    #[test]
    fn test_snapshot_roundtrip_uses_wire_names() {
        let snapshot = FundSnapshot {
            contributions: vec![],
            goal_amount: 10000.0,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("goalAmount"));
    }
}
