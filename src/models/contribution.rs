use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// A single giving record as emitted by the spreadsheet-backed provider.
///
/// Wire field names are capitalized (`Member`, `Amount`, ...) because the
/// provider serializes sheet headers verbatim. `Amount` arrives as either a
/// JSON number or a numeric string depending on how the cell was formatted,
/// so it gets its own deserializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRecord {
    #[serde(rename = "Member", default)]
    pub member: String,
    #[serde(rename = "Amount", default, deserialize_with = "amount_lenient")]
    pub amount: f64,
    #[serde(rename = "Date", default)]
    pub date: String,
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Notes", default)]
    pub notes: String,
}

impl ContributionRecord {
    /// Member name for display; blank members show as "Anonymous".
    pub fn member_display(&self) -> &str {
        if self.member.trim().is_empty() {
            "Anonymous"
        } else {
            &self.member
        }
    }

    /// Category for aggregation; blank categories group under "Other".
    pub fn category_display(&self) -> &str {
        if self.category.trim().is_empty() {
            "Other"
        } else {
            &self.category
        }
    }

    /// Parse the provider's date string. The sheet script emits full
    /// ISO-8601 timestamps, but hand-entered rows can surface as plain
    /// "YYYY-MM-DD".
    pub fn date_value(&self) -> Option<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.date) {
            return Some(dt);
        }
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc().fixed_offset())
    }

    pub fn formatted_date(&self) -> String {
        match self.date_value() {
            Some(dt) => dt.format("%b %d, %Y").to_string(),
            // Fall back to the raw date string, truncated to the date part
            None => self.date.chars().take(10).collect(),
        }
    }

    /// Month bucket key ("YYYY-MM") for trend aggregation.
    pub fn month_key(&self) -> Option<String> {
        self.date_value()
            .map(|dt| format!("{:04}-{:02}", dt.year(), dt.month()))
    }
}

/// Accept `500`, `"500"`, or junk (which normalizes to 0, matching the
/// provider's own `Number(x) || 0` handling). The sheet scripts never emit
/// non-positive amounts, so anything non-positive also normalizes to 0.
fn amount_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
    };

    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_accepts_number_and_string() {
        let from_number: ContributionRecord =
            serde_json::from_str(r#"{"Member":"Asha","Amount":500,"Date":"2024-01-05"}"#).unwrap();
        assert_eq!(from_number.amount, 500.0);

        let from_string: ContributionRecord =
            serde_json::from_str(r#"{"Member":"Asha","Amount":"500","Date":"2024-01-05"}"#)
                .unwrap();
        assert_eq!(from_string.amount, 500.0);
    }

    #[test]
    fn test_amount_junk_normalizes_to_zero() {
        let record: ContributionRecord =
            serde_json::from_str(r#"{"Member":"X","Amount":"n/a"}"#).unwrap();
        assert_eq!(record.amount, 0.0);

        let negative: ContributionRecord =
            serde_json::from_str(r#"{"Member":"X","Amount":-20}"#).unwrap();
        assert_eq!(negative.amount, 0.0);
    }

    #[test]
    fn test_missing_fields_default() {
        let record: ContributionRecord = serde_json::from_str(r#"{"Member":"Asha"}"#).unwrap();
        assert_eq!(record.amount, 0.0);
        assert_eq!(record.notes, "");
        assert_eq!(record.category, "");
        assert_eq!(record.date, "");
    }

    #[test]
    fn test_member_display_anonymous() {
        let record: ContributionRecord = serde_json::from_str(r#"{"Amount":100}"#).unwrap();
        assert_eq!(record.member_display(), "Anonymous");
    }

    #[test]
    fn test_month_key() {
        let record: ContributionRecord = serde_json::from_str(
            r#"{"Member":"Asha","Amount":100,"Date":"2024-03-15T00:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(record.month_key().as_deref(), Some("2024-03"));

        let undated: ContributionRecord = serde_json::from_str(r#"{"Member":"Asha"}"#).unwrap();
        assert!(undated.month_key().is_none());
    }

    #[test]
    fn test_plain_date_parses() {
        let record: ContributionRecord =
            serde_json::from_str(r#"{"Member":"A","Amount":1,"Date":"2026-01-12"}"#).unwrap();
        assert_eq!(record.month_key().as_deref(), Some("2026-01"));
        assert_eq!(record.formatted_date(), "Jan 12, 2026");
    }

    #[test]
    fn test_formatted_date_fallback() {
        let record: ContributionRecord = serde_json::from_str(
            r#"{"Member":"A","Amount":1,"Date":"2024-01-05 badly formatted"}"#,
        )
        .unwrap();
        assert_eq!(record.formatted_date(), "2024-01-05");
    }
}
