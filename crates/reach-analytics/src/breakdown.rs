//! Fan-out breakdown builder
//!
//! Produces the normalized campaign → steps → subsequences tree for one
//! workspace scope. Campaign and step analytics are fetched concurrently
//! and degrade independently; every campaign's subsequence list, and every
//! subsequence's analytics, are fetched as join-all fan-outs where each
//! settlement stands on its own. The only hard failure path is invalid
//! scope parameters, rejected before any network call.

use futures::future::join_all;
use reach_common::{ReachError, ReachResult};
use reach_vendor::types::DateRange;
use reach_vendor::VendorApi;
use tracing::warn;

use crate::model::{CampaignBreakdown, StepBreakdown, SubsequenceBreakdown};

/// Scope of one breakdown request. The workspace credential has already
/// been resolved into the `VendorApi` handle by the caller.
#[derive(Clone, Debug, Default)]
pub struct BreakdownRequest {
    pub campaign_id: Option<String>,
    pub range: DateRange,
}

/// Fail-fast validation of caller-supplied scope parameters.
///
/// The literal strings "undefined" and "null" are artifacts of broken
/// callers and are rejected like missing values.
pub fn validate_scope(workspace_id: &str, campaign_id: Option<&str>) -> ReachResult<()> {
    if !is_valid_param(workspace_id) {
        return Err(ReachError::InvalidRequest(
            "Invalid workspace ID provided".to_string(),
        ));
    }
    if let Some(id) = campaign_id {
        if !is_valid_param(id) {
            return Err(ReachError::InvalidRequest(
                "Invalid campaign ID provided".to_string(),
            ));
        }
    }
    Ok(())
}

fn is_valid_param(value: &str) -> bool {
    !value.is_empty() && value != "undefined" && value != "null"
}

/// Build the breakdown tree for one scope.
pub async fn build_breakdown(
    api: &dyn VendorApi,
    request: &BreakdownRequest,
) -> ReachResult<Vec<CampaignBreakdown>> {
    let ids: Vec<String> = request.campaign_id.iter().cloned().collect();

    let (campaigns, steps) = tokio::join!(
        api.campaign_analytics(&ids, request.range),
        api.step_analytics(request.campaign_id.as_deref(), request.range),
    );

    // Each side degrades on its own: a failure in steps must not block
    // campaign display, and vice versa.
    let campaigns = campaigns.unwrap_or_else(|e| {
        warn!(error = %e, "campaign analytics fetch failed");
        Vec::new()
    });
    let steps = steps.unwrap_or_else(|e| {
        warn!(error = %e, "step analytics fetch failed");
        Vec::new()
    });

    let unassignable = steps
        .iter()
        .filter(|s| s.campaign_id.as_deref().map_or(true, str::is_empty))
        .count();
    if unassignable > 0 {
        warn!(count = unassignable, "dropping step records without a campaign id");
    }

    let campaign_ids: Vec<&str> = campaigns
        .iter()
        .map(|c| c.campaign_id.as_str())
        .filter(|id| !id.is_empty())
        .collect();

    let subsequences = fetch_subsequences(api, &campaign_ids).await;

    // Campaigns keep their upstream response order; steps re-sort by
    // variant label; subsequences keep list-endpoint order.
    let result = campaigns
        .into_iter()
        .map(|analytics| {
            let mut campaign_steps: Vec<StepBreakdown> = steps
                .iter()
                .filter(|s| s.campaign_id.as_deref() == Some(analytics.campaign_id.as_str()))
                .cloned()
                .map(StepBreakdown::from_wire)
                .collect();
            campaign_steps.sort_by(|a, b| a.variant.cmp(&b.variant));

            let campaign_subsequences = subsequences
                .iter()
                .filter(|s| s.parent_campaign == analytics.campaign_id)
                .cloned()
                .collect();

            CampaignBreakdown {
                analytics,
                steps: campaign_steps,
                subsequences: campaign_subsequences,
            }
        })
        .collect();

    Ok(result)
}

/// Fan out over every campaign's subsequence list, then over every
/// subsequence's analytics. Failures degrade to an empty list or a
/// `None` analytics slot; siblings already in flight are never aborted.
async fn fetch_subsequences(
    api: &dyn VendorApi,
    campaign_ids: &[&str],
) -> Vec<SubsequenceBreakdown> {
    let per_campaign = join_all(campaign_ids.iter().map(|cid| async move {
        match api.list_subsequences(cid).await {
            Ok(items) => {
                join_all(items.into_iter().map(|summary| async move {
                    let analytics = match api.subsequence_analytics(&summary.id).await {
                        Ok(analytics) => analytics,
                        Err(e) => {
                            warn!(subsequence = %summary.id, error = %e, "subsequence analytics fetch failed");
                            None
                        }
                    };
                    SubsequenceBreakdown {
                        id: summary.id,
                        name: summary.name,
                        status: summary.status,
                        parent_campaign: summary.parent_campaign,
                        workspace: summary.workspace,
                        timestamp_created: summary.timestamp_created,
                        analytics,
                    }
                }))
                .await
            }
            Err(e) => {
                warn!(campaign = cid, error = %e, "subsequence list fetch failed");
                Vec::new()
            }
        }
    }))
    .await;

    per_campaign.into_iter().flatten().collect()
}
