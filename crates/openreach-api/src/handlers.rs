//! API Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use reach_analytics::{
    build_breakdown, extract_templates, list_mailboxes, mailboxes::DEFAULT_EMAIL_LIMIT, reconcile,
    BreakdownRequest, CampaignBreakdown, MailboxInfo, MetricSources, ReconciledMetrics,
    TemplateSweep, TemplateWalkOptions,
};
use reach_common::ReachError;
use reach_vendor::types::{CampaignAnalytics, DateRange, SubsequenceDetail, SubsequencePatch};
use reach_vendor::VendorApi;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// How far back the detailed metric window reaches when the caller gave no
/// explicit range.
const DETAILED_WINDOW_DAYS: i64 = 30;

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::from(ReachError::InvalidRequest(format!(
            "Invalid date: {}",
            value
        )))
    })
}

fn parse_range(start: &Option<String>, end: &Option<String>) -> Result<DateRange, ApiError> {
    let start = start.as_deref().map(parse_date).transpose()?;
    let end = end.as_deref().map(parse_date).transpose()?;
    Ok(DateRange::new(start, end))
}

fn validate_scope(workspace_id: Option<&str>, campaign_id: Option<&str>) -> Result<(), ApiError> {
    reach_analytics::validate_scope(workspace_id.unwrap_or_default(), campaign_id)?;
    Ok(())
}

// Breakdown

#[derive(Debug, Deserialize)]
pub struct BreakdownParams {
    pub workspace_id: Option<String>,
    pub campaign_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn campaign_breakdown(
    State(state): State<AppState>,
    Query(params): Query<BreakdownParams>,
) -> Result<Json<Vec<CampaignBreakdown>>, ApiError> {
    validate_scope(params.workspace_id.as_deref(), params.campaign_id.as_deref())?;
    let range = parse_range(&params.start_date, &params.end_date)?;

    let gateway = state.gateway(params.workspace_id.as_deref())?;
    let request = BreakdownRequest {
        campaign_id: params.campaign_id,
        range,
    };
    let campaigns = build_breakdown(&gateway, &request).await?;
    Ok(Json(campaigns))
}

// Analytics overview

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewRequest {
    #[serde(default)]
    pub campaign_ids: Vec<String>,
    pub workspace_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn analytics_overview(
    State(state): State<AppState>,
    Json(request): Json<OverviewRequest>,
) -> Result<Json<Vec<CampaignAnalytics>>, ApiError> {
    if request.campaign_ids.is_empty() {
        return Err(ApiError::bad_request("campaignIds array is required"));
    }
    let range = parse_range(&request.start_date, &request.end_date)?;

    let gateway = state.gateway(request.workspace_id.as_deref())?;
    let records = gateway
        .analytics_overview(&request.campaign_ids, range)
        .await?;
    Ok(Json(records))
}

// Reconciled per-campaign metrics

#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    pub workspace_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn campaign_metrics(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<ReconciledMetrics>, ApiError> {
    validate_scope(params.workspace_id.as_deref(), Some(&campaign_id))?;
    let range = parse_range(&params.start_date, &params.end_date)?;
    let detailed_range = if range.is_empty() {
        let end = chrono::Utc::now().date_naive();
        DateRange::new(Some(end - chrono::Duration::days(DETAILED_WINDOW_DAYS)), Some(end))
    } else {
        range
    };

    let gateway = state.gateway(params.workspace_id.as_deref())?;
    let ids = vec![campaign_id.clone()];

    let (base, overview, detailed) = tokio::join!(
        gateway.campaign_analytics(&ids, DateRange::default()),
        gateway.analytics_overview(&ids, range),
        gateway.campaign_analytics(&ids, detailed_range),
    );

    // the base record is required; overview and detailed only refine it
    let base = base?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Campaign not found"))?;
    let overview = degrade(overview, &campaign_id, "overview analytics");
    let detailed = degrade(detailed, &campaign_id, "detailed analytics");

    let metrics = reconcile(&MetricSources {
        base: &base,
        overview: overview.as_ref(),
        detailed: detailed.as_ref(),
    });
    Ok(Json(metrics))
}

fn degrade(
    result: Result<Vec<CampaignAnalytics>, ReachError>,
    campaign_id: &str,
    source: &str,
) -> Option<CampaignAnalytics> {
    match result {
        Ok(records) => records.into_iter().next(),
        Err(e) => {
            warn!(campaign = campaign_id, source, error = %e, "metric source fetch failed");
            None
        }
    }
}

// Email templates

#[derive(Debug, Deserialize)]
pub struct TemplateParams {
    pub category: Option<String>,
    pub campaign_id: Option<String>,
}

pub async fn email_templates(
    State(state): State<AppState>,
    Query(params): Query<TemplateParams>,
) -> Result<Json<TemplateSweep>, ApiError> {
    let factory = state.batch();
    let options = TemplateWalkOptions {
        category: params.category,
        campaign_id: params.campaign_id,
    };
    let sweep = extract_templates(&factory, &state.catalog, &options).await?;
    Ok(Json(sweep))
}

// Subsequences

#[derive(Debug, Deserialize)]
pub struct WorkspaceParams {
    pub workspace_id: Option<String>,
}

pub async fn get_subsequence(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<WorkspaceParams>,
) -> Result<Json<SubsequenceDetail>, ApiError> {
    let gateway = state.gateway(params.workspace_id.as_deref())?;
    let detail = gateway.subsequence_detail(&id).await?;
    Ok(Json(detail))
}

pub async fn update_subsequence(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<WorkspaceParams>,
    Json(patch): Json<SubsequencePatch>,
) -> Result<Json<SubsequenceDetail>, ApiError> {
    let gateway = state.gateway(params.workspace_id.as_deref())?;
    let updated = gateway.update_subsequence(&id, &patch).await?;
    Ok(Json(updated))
}

// Mailboxes

#[derive(Debug, Deserialize)]
pub struct MailboxParams {
    pub workspace_id: Option<String>,
    pub limit: Option<u32>,
}

pub async fn mailbox_list(
    State(state): State<AppState>,
    Query(params): Query<MailboxParams>,
) -> Result<Json<Vec<MailboxInfo>>, ApiError> {
    let gateway = state.gateway(params.workspace_id.as_deref())?;
    let mailboxes =
        list_mailboxes(&gateway, params.limit.unwrap_or(DEFAULT_EMAIL_LIMIT)).await?;
    Ok(Json(mailboxes))
}

// Preferences

pub async fn get_preferences(
    State(state): State<AppState>,
    Path(scope): Path<String>,
) -> Json<Vec<String>> {
    Json(state.prefs.get(&scope))
}

pub async fn set_preferences(
    State(state): State<AppState>,
    Path(scope): Path<String>,
    Json(ids): Json<Vec<String>>,
) -> Result<StatusCode, ApiError> {
    state.prefs.set(&scope, ids)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reach_analytics::{CampaignCatalog, FilePreferenceStore};
    use reach_vendor::CredentialTable;
    use std::sync::Arc;

    fn state(credentials: CredentialTable) -> AppState {
        AppState {
            http: reqwest::Client::new(),
            credentials,
            base_url: reach_vendor::DEFAULT_BASE_URL.to_string(),
            catalog: Arc::new(CampaignCatalog::default()),
            prefs: Arc::new(FilePreferenceStore::in_memory()),
        }
    }

    #[test]
    fn date_parsing_accepts_iso_and_rejects_garbage() {
        assert!(parse_date("2025-07-01").is_ok());
        assert_eq!(
            parse_date("07/01/2025").unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
        assert!(parse_range(&None, &None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn breakdown_rejects_undefined_workspace_before_any_call() {
        let params = BreakdownParams {
            workspace_id: Some("undefined".into()),
            campaign_id: Some("c1".into()),
            start_date: None,
            end_date: None,
        };
        let err = campaign_breakdown(State(state(CredentialTable::new(None))), Query(params))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn breakdown_without_credentials_is_a_500() {
        let params = BreakdownParams {
            workspace_id: Some("1".into()),
            campaign_id: None,
            start_date: None,
            end_date: None,
        };
        let err = campaign_breakdown(State(state(CredentialTable::new(None))), Query(params))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.body.error,
            "API key not configured for selected workspace"
        );
    }

    #[tokio::test]
    async fn overview_requires_campaign_ids() {
        let request = OverviewRequest {
            campaign_ids: Vec::new(),
            workspace_id: Some("1".into()),
            start_date: None,
            end_date: None,
        };
        let err = analytics_overview(State(state(CredentialTable::new(None))), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.error, "campaignIds array is required");
    }

    #[tokio::test]
    async fn preferences_round_trip_through_handlers() {
        let app_state = state(CredentialTable::new(None));

        let status = set_preferences(
            State(app_state.clone()),
            Path("admin".into()),
            Json(vec!["c1".into(), "c2".into()]),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(ids) = get_preferences(State(app_state), Path("admin".into())).await;
        assert_eq!(ids, vec!["c1", "c2"]);
    }
}
