//! HTTP client for the spreadsheet-backed fund endpoint.
//!
//! The provider is a deployed sheet script answering
//! `GET <endpoint>?fund=<query_id>` with `{ goalAmount, contributions }`.
//! Requests carry a `_t` cache-busting parameter and `Cache-Control:
//! no-store` so no intermediary serves a stale body: the freshness decision
//! belongs to the staleness policy alone, never to transport-level caching.

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::debug;

use crate::models::{ContributionRecord, FundSnapshot, FundSpec};

use super::ApiError;

/// HTTP request timeout in seconds.
/// Sheet-script endpoints can be slow on cold starts; 30s covers that while
/// still failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw response body. Separate from `FundSnapshot` because the provider can
/// answer 200 with an `error` field instead of data.
#[derive(Debug, Default, Deserialize)]
struct FundResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    contributions: Vec<ContributionRecord>,
    #[serde(rename = "goalAmount", default)]
    goal_amount: f64,
}

/// Client for the fund endpoint.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct FundClient {
    client: Client,
    endpoint: String,
}

impl FundClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn fund_url(&self, fund: &FundSpec) -> String {
        format!(
            "{}?fund={}&_t={}",
            self.endpoint,
            fund.query_id,
            Utc::now().timestamp_millis()
        )
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    fn parse_snapshot(text: &str) -> Result<FundSnapshot> {
        let raw: FundResponse =
            serde_json::from_str(text).context("Failed to parse fund response")?;

        if let Some(message) = raw.error {
            return Err(ApiError::Provider(message).into());
        }

        Ok(FundSnapshot {
            contributions: raw.contributions,
            goal_amount: raw.goal_amount,
        })
    }

    /// Fetch one fund's snapshot. Missing `contributions`/`goalAmount` in
    /// the body are normalized to empty/zero; network failures, non-2xx
    /// statuses, and provider `error` bodies all surface as errors.
    pub async fn fetch_fund(&self, fund: &FundSpec) -> Result<FundSnapshot> {
        let url = self.fund_url(fund);
        let response = self
            .client
            .get(&url)
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .with_context(|| format!("Failed to fetch fund {}", fund.key))?;

        let response = Self::check_response(response).await?;
        let text = response
            .text()
            .await
            .context("Failed to read fund response body")?;

        let snapshot = Self::parse_snapshot(&text)?;
        debug!(
            fund = %fund.key,
            contributions = snapshot.contributions.len(),
            goal = snapshot.goal_amount,
            "Fund fetched"
        );
        Ok(snapshot)
    }

}
