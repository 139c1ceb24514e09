//! Typed upstream gateway
//!
//! One thin wrapper per vendor endpoint, every call routed through the
//! retry executor. The gateway is constructed per batch: it owns the batch's
//! `RateLimitGuard`, so independent top-level requests never share breaker
//! state. The `reqwest::Client` is cheap to clone and shared process-wide.
//!
//! Decode policy: a malformed body on an otherwise-OK response is an error
//! for critical reads (campaign list) and a degraded empty result for
//! non-critical ones (subsequence analytics).

use std::sync::Arc;

use async_trait::async_trait;
use reach_common::{ReachError, ReachResult};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::retry::{self, RateLimitGuard, RawResponse, RetryPolicy};
use crate::types::{
    normalize_analytics, CampaignAnalytics, CampaignDetail, DateRange, SentEmail, SentEmailList,
    StepAnalytics, SubsequenceDetail, SubsequenceList, SubsequencePatch, SubsequenceSummary,
};

/// Production API base.
pub const DEFAULT_BASE_URL: &str = "https://api.instantly.ai";

/// Page cap for subsequence listings.
const SUBSEQUENCE_PAGE_LIMIT: u32 = 100;

/// Read surface the aggregation core consumes, behind a trait so it can be
/// driven by stubs in tests.
#[async_trait]
pub trait VendorApi: Send + Sync {
    /// List campaign analytics, optionally filtered by explicit campaign ids
    /// and a date range. Critical read: decode failures are errors.
    async fn campaign_analytics(
        &self,
        ids: &[String],
        range: DateRange,
    ) -> ReachResult<Vec<CampaignAnalytics>>;

    /// Analytics overview endpoint (id-keyed map shape), CRM events expanded.
    async fn analytics_overview(
        &self,
        ids: &[String],
        range: DateRange,
    ) -> ReachResult<Vec<CampaignAnalytics>>;

    /// Per-step analytics for one campaign (or the whole workspace).
    async fn step_analytics(
        &self,
        campaign_id: Option<&str>,
        range: DateRange,
    ) -> ReachResult<Vec<StepAnalytics>>;

    /// Subsequences whose `parent_campaign` matches, capped at one page.
    async fn list_subsequences(
        &self,
        parent_campaign: &str,
    ) -> ReachResult<Vec<SubsequenceSummary>>;

    /// Full subsequence detail, nested step/variant tree included.
    async fn subsequence_detail(&self, id: &str) -> ReachResult<SubsequenceDetail>;

    /// Analytics for one subsequence; reuses the campaign-analytics endpoint
    /// keyed by subsequence id. Non-critical read: malformed bodies degrade
    /// to `None`.
    async fn subsequence_analytics(&self, id: &str) -> ReachResult<Option<CampaignAnalytics>>;

    /// Full campaign detail, the template-extraction source.
    async fn campaign_detail(&self, id: &str) -> ReachResult<CampaignDetail>;

    /// Partial replace of a subsequence's name and step/variant structure.
    async fn update_subsequence(
        &self,
        id: &str,
        patch: &SubsequencePatch,
    ) -> ReachResult<SubsequenceDetail>;

    /// Sent emails, the mailbox roll-up source.
    async fn list_sent_emails(&self, limit: u32) -> ReachResult<Vec<SentEmail>>;
}

/// reqwest-backed gateway for one workspace credential.
pub struct VendorGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    policy: RetryPolicy,
    guard: Arc<RateLimitGuard>,
}

impl VendorGateway {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            policy: RetryPolicy::default(),
            guard: Arc::new(RateLimitGuard::default()),
        }
    }

    /// Default client construction for standalone use.
    pub fn http_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Share an existing batch guard instead of this gateway's own, used
    /// when several per-workspace gateways serve one logical batch.
    pub fn with_guard(mut self, guard: Arc<RateLimitGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// The batch circuit-breaker state.
    pub fn guard(&self) -> Arc<RateLimitGuard> {
        self.guard.clone()
    }

    async fn get_raw(&self, path: &str, query: &[(&str, String)]) -> ReachResult<RawResponse> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "upstream GET");
        retry::execute(&self.policy, &self.guard, || {
            let request = self
                .http
                .get(&url)
                .bearer_auth(&self.api_key)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .query(query);
            async move { read_response(request).await }
        })
        .await
    }

    async fn patch_raw(&self, path: &str, body: &serde_json::Value) -> ReachResult<RawResponse> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "upstream PATCH");
        retry::execute(&self.policy, &self.guard, || {
            let request = self
                .http
                .patch(&url)
                .bearer_auth(&self.api_key)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .json(body);
            async move { read_response(request).await }
        })
        .await
    }

    fn analytics_query(ids: &[String], id_param: &'static str, range: DateRange) -> Vec<(&'static str, String)> {
        let mut query: Vec<(&'static str, String)> =
            ids.iter().map(|id| (id_param, id.clone())).collect();
        if let Some(start) = range.start {
            query.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = range.end {
            query.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        query
    }
}

async fn read_response(request: reqwest::RequestBuilder) -> ReachResult<RawResponse> {
    let response = request
        .send()
        .await
        .map_err(|e| ReachError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let body = response
        .text()
        .await
        .map_err(|e| ReachError::Transport(e.to_string()))?;
    Ok(RawResponse {
        status,
        retry_after,
        body,
    })
}

fn decode<T: DeserializeOwned>(body: &str) -> ReachResult<T> {
    serde_json::from_str(body).map_err(|e| ReachError::Decode(e.to_string()))
}

#[async_trait]
impl VendorApi for VendorGateway {
    async fn campaign_analytics(
        &self,
        ids: &[String],
        range: DateRange,
    ) -> ReachResult<Vec<CampaignAnalytics>> {
        let query = Self::analytics_query(ids, "id", range);
        let response = self.get_raw("/api/v2/campaigns/analytics", &query).await?;
        normalize_analytics(decode(&response.body)?)
    }

    async fn analytics_overview(
        &self,
        ids: &[String],
        range: DateRange,
    ) -> ReachResult<Vec<CampaignAnalytics>> {
        let mut query = Self::analytics_query(ids, "ids", range);
        query.push(("expand_crm_events", "true".to_string()));
        let response = self
            .get_raw("/api/v2/campaigns/analytics/overview", &query)
            .await?;
        normalize_analytics(decode(&response.body)?)
    }

    async fn step_analytics(
        &self,
        campaign_id: Option<&str>,
        range: DateRange,
    ) -> ReachResult<Vec<StepAnalytics>> {
        let mut query = Vec::new();
        if let Some(id) = campaign_id {
            query.push(("campaign_id", id.to_string()));
        }
        if let Some(start) = range.start {
            query.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = range.end {
            query.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        let response = self
            .get_raw("/api/v2/campaigns/analytics/steps", &query)
            .await?;
        decode(&response.body)
    }

    async fn list_subsequences(
        &self,
        parent_campaign: &str,
    ) -> ReachResult<Vec<SubsequenceSummary>> {
        let query = vec![
            ("parent_campaign", parent_campaign.to_string()),
            ("limit", SUBSEQUENCE_PAGE_LIMIT.to_string()),
        ];
        let response = self.get_raw("/api/v2/subsequences", &query).await?;
        let list: SubsequenceList = decode(&response.body)?;
        Ok(list.items)
    }

    async fn subsequence_detail(&self, id: &str) -> ReachResult<SubsequenceDetail> {
        let response = self
            .get_raw(&format!("/api/v2/subsequences/{}", id), &[])
            .await?;
        decode(&response.body)
    }

    async fn subsequence_analytics(&self, id: &str) -> ReachResult<Option<CampaignAnalytics>> {
        let query = vec![("id", id.to_string())];
        let response = self.get_raw("/api/v2/campaigns/analytics", &query).await?;
        match decode(&response.body).and_then(normalize_analytics) {
            Ok(mut records) => {
                if records.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(records.swap_remove(0)))
                }
            }
            Err(e) => {
                warn!(subsequence = id, error = %e, "unparseable subsequence analytics; degrading to none");
                Ok(None)
            }
        }
    }

    async fn campaign_detail(&self, id: &str) -> ReachResult<CampaignDetail> {
        let response = self
            .get_raw(&format!("/api/v2/campaigns/{}", id), &[])
            .await?;
        decode(&response.body)
    }

    async fn update_subsequence(
        &self,
        id: &str,
        patch: &SubsequencePatch,
    ) -> ReachResult<SubsequenceDetail> {
        let body = serde_json::to_value(patch).map_err(|e| ReachError::Decode(e.to_string()))?;
        let response = self
            .patch_raw(&format!("/api/v2/subsequences/{}", id), &body)
            .await?;
        decode(&response.body)
    }

    async fn list_sent_emails(&self, limit: u32) -> ReachResult<Vec<SentEmail>> {
        let query = vec![
            ("limit", limit.to_string()),
            ("email_type", "sent".to_string()),
        ];
        let response = self.get_raw("/api/v2/emails", &query).await?;
        let list: SentEmailList = decode(&response.body)?;
        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytics_query_repeats_id_and_appends_range() {
        let range = DateRange::new(
            chrono::NaiveDate::from_ymd_opt(2025, 7, 1),
            chrono::NaiveDate::from_ymd_opt(2025, 7, 31),
        );
        let ids = vec!["c1".to_string(), "c2".to_string()];
        let query = VendorGateway::analytics_query(&ids, "ids", range);
        assert_eq!(
            query,
            vec![
                ("ids", "c1".to_string()),
                ("ids", "c2".to_string()),
                ("start_date", "2025-07-01".to_string()),
                ("end_date", "2025-07-31".to_string()),
            ]
        );
    }

    #[test]
    fn gateways_start_with_independent_guards() {
        let http = reqwest::Client::new();
        let a = VendorGateway::new(http.clone(), "key-a");
        let b = VendorGateway::new(http, "key-b");
        a.guard().record_rate_limited();
        a.guard().record_rate_limited();
        assert!(a.guard().is_tripped());
        assert!(!b.guard().is_tripped());
    }
}
