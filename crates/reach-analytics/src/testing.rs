//! Scriptable vendor stub shared by the aggregation tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use reach_common::{ReachError, ReachResult};
use reach_vendor::types::{
    CampaignAnalytics, CampaignDetail, DateRange, SentEmail, StepAnalytics, SubsequenceDetail,
    SubsequencePatch, SubsequenceSummary,
};
use reach_vendor::VendorApi;

/// Canned responses per endpoint; unset entries answer with empty data.
/// Writes land in `updated` so write-then-read behavior is observable.
#[derive(Default)]
pub struct StubVendor {
    pub campaigns: Option<ReachResult<Vec<CampaignAnalytics>>>,
    pub overview: Option<ReachResult<Vec<CampaignAnalytics>>>,
    pub steps: Option<ReachResult<Vec<StepAnalytics>>>,
    pub subsequences: HashMap<String, ReachResult<Vec<SubsequenceSummary>>>,
    pub subsequence_analytics: HashMap<String, ReachResult<Option<CampaignAnalytics>>>,
    pub campaign_details: HashMap<String, ReachResult<CampaignDetail>>,
    pub subsequence_details: HashMap<String, ReachResult<SubsequenceDetail>>,
    pub sent_emails: Option<ReachResult<Vec<SentEmail>>>,
    pub updated: Mutex<HashMap<String, SubsequencePatch>>,
}

impl StubVendor {
    pub fn with_campaigns(mut self, campaigns: Vec<CampaignAnalytics>) -> Self {
        self.campaigns = Some(Ok(campaigns));
        self
    }

    pub fn with_steps(mut self, steps: Vec<StepAnalytics>) -> Self {
        self.steps = Some(Ok(steps));
        self
    }

    pub fn with_failing_steps(mut self, error: ReachError) -> Self {
        self.steps = Some(Err(error));
        self
    }

    pub fn with_subsequences(
        mut self,
        parent: &str,
        subsequences: Vec<SubsequenceSummary>,
    ) -> Self {
        self.subsequences.insert(parent.to_string(), Ok(subsequences));
        self
    }

    pub fn with_campaign_detail(mut self, id: &str, detail: CampaignDetail) -> Self {
        self.campaign_details.insert(id.to_string(), Ok(detail));
        self
    }

    pub fn with_subsequence_detail(mut self, id: &str, detail: SubsequenceDetail) -> Self {
        self.subsequence_details.insert(id.to_string(), Ok(detail));
        self
    }
}

#[async_trait]
impl VendorApi for StubVendor {
    async fn campaign_analytics(
        &self,
        _ids: &[String],
        _range: DateRange,
    ) -> ReachResult<Vec<CampaignAnalytics>> {
        self.campaigns.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn analytics_overview(
        &self,
        _ids: &[String],
        _range: DateRange,
    ) -> ReachResult<Vec<CampaignAnalytics>> {
        self.overview.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn step_analytics(
        &self,
        _campaign_id: Option<&str>,
        _range: DateRange,
    ) -> ReachResult<Vec<StepAnalytics>> {
        self.steps.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_subsequences(
        &self,
        parent_campaign: &str,
    ) -> ReachResult<Vec<SubsequenceSummary>> {
        self.subsequences
            .get(parent_campaign)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn subsequence_detail(&self, id: &str) -> ReachResult<SubsequenceDetail> {
        if let Some(patch) = self.updated.lock().get(id) {
            return Ok(SubsequenceDetail {
                id: Some(id.to_string()),
                name: Some(patch.name.clone()),
                sequences: patch.sequences.clone(),
                parent_campaign: None,
                status: None,
            });
        }
        self.subsequence_details
            .get(id)
            .cloned()
            .unwrap_or_else(|| Err(ReachError::UpstreamStatus { status: 404 }))
    }

    async fn subsequence_analytics(&self, id: &str) -> ReachResult<Option<CampaignAnalytics>> {
        self.subsequence_analytics
            .get(id)
            .cloned()
            .unwrap_or(Ok(None))
    }

    async fn campaign_detail(&self, id: &str) -> ReachResult<CampaignDetail> {
        self.campaign_details
            .get(id)
            .cloned()
            .unwrap_or_else(|| Err(ReachError::UpstreamStatus { status: 404 }))
    }

    async fn update_subsequence(
        &self,
        id: &str,
        patch: &SubsequencePatch,
    ) -> ReachResult<SubsequenceDetail> {
        self.updated.lock().insert(id.to_string(), patch.clone());
        self.subsequence_detail(id).await
    }

    async fn list_sent_emails(&self, _limit: u32) -> ReachResult<Vec<SentEmail>> {
        self.sent_emails.clone().unwrap_or_else(|| Ok(Vec::new()))
    }
}
