//! Wire types for the upstream vendor API
//!
//! Field names mirror the vendor's JSON verbatim. Counters the vendor may
//! omit are `Option` where the distinction between "absent" and "zero"
//! matters downstream (the reconciliation table), plain defaults otherwise.

use chrono::NaiveDate;
use reach_common::{ReachError, ReachResult};
use serde::{Deserialize, Serialize};

/// Optional analytics date window (ISO 8601 dates).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// One campaign-shaped analytics record.
///
/// Subsequences are analytics-compatible with campaigns: the same record
/// shape comes back when the analytics endpoint is keyed by a subsequence
/// id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignAnalytics {
    #[serde(default)]
    pub campaign_id: String,
    #[serde(default)]
    pub campaign_name: String,
    #[serde(default)]
    pub campaign_status: i32,
    #[serde(default)]
    pub leads_count: u64,
    #[serde(default)]
    pub contacted_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_leads_contacted_count: Option<u64>,
    #[serde(default)]
    pub emails_sent_count: u64,
    #[serde(default)]
    pub open_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_count_unique: Option<u64>,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count_unique: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count_automatic: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count_automatic_unique: Option<u64>,
    #[serde(default)]
    pub link_click_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_click_count_unique: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounced_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsubscribed_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_opportunities: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_opportunity_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_interested: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_meeting_booked: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_closed: Option<u64>,
}

/// Normalize the two shapes the analytics endpoints return, a plain array
/// or (when queried with explicit ids) an id-keyed map, into an array of
/// records, each tagged with its campaign id. A record's own `campaign_id`
/// wins over the map key when both are present.
pub fn normalize_analytics(value: serde_json::Value) -> ReachResult<Vec<CampaignAnalytics>> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| ReachError::Decode(e.to_string()))
            })
            .collect(),
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(campaign_id, mut metrics)| {
                if let serde_json::Value::Object(obj) = &mut metrics {
                    obj.entry("campaign_id")
                        .or_insert(serde_json::Value::String(campaign_id));
                }
                serde_json::from_value(metrics).map_err(|e| ReachError::Decode(e.to_string()))
            })
            .collect(),
        other => Err(ReachError::Decode(format!(
            "expected analytics array or map, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// One step+variant analytics record. `campaign_id` can be absent on old
/// records; those are dropped at join time with a warning.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepAnalytics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub variant: String,
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub opened: u64,
    #[serde(default)]
    pub unique_opened: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub unique_replies: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub unique_clicks: u64,
}

/// Subsequence as returned by the list endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsequenceSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub parent_campaign: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_created: Option<String>,
}

/// Paginated list envelope.
#[derive(Debug, Default, Deserialize)]
pub struct SubsequenceList {
    #[serde(default)]
    pub items: Vec<SubsequenceSummary>,
}

/// One subject/body alternative at a step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceVariant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub v_disabled: bool,
}

/// One position in a sequence's send order.
///
/// `delay` is the number of days to wait before the NEXT step fires, not
/// before this one; the first step implicitly has delay 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<i64>,
    #[serde(default)]
    pub variants: Vec<SequenceVariant>,
}

/// A sequence of steps. The upstream contract shapes this as an array but
/// guarantees at most one meaningful element: only `sequences[0]` is read.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<SequenceStep>,
}

/// Reference to a subsequence inside a campaign detail.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsequenceRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Legacy flat step carrying ad hoc subject/body content; scanned only
/// when the sequences tree yields nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl LegacyStep {
    pub fn has_content(&self) -> bool {
        self.subject.is_some() || self.body.is_some() || self.content.is_some()
    }
}

/// Full campaign detail, the template-extraction source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub sequences: Vec<SequenceSpec>,
    #[serde(default)]
    pub subsequences: Vec<SubsequenceRef>,
    #[serde(default)]
    pub steps: Vec<LegacyStep>,
}

/// Full subsequence detail, including its own nested step/variant tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsequenceDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub sequences: Vec<SequenceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
}

/// Partial replacement payload for a subsequence: name plus the full
/// step/variant structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubsequencePatch {
    pub name: String,
    pub sequences: Vec<SequenceSpec>,
}

/// One sent email, the mailbox roll-up source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SentEmail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eaccount: Option<String>,
    #[serde(
        default,
        alias = "campaignName",
        skip_serializing_if = "Option::is_none"
    )]
    pub campaign_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

/// Sent-email list envelope.
#[derive(Debug, Default, Deserialize)]
pub struct SentEmailList {
    #[serde(default, alias = "emails")]
    pub items: Vec<SentEmail>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn analytics_array_shape_passes_through() {
        let value = json!([
            {"campaign_id": "c1", "campaign_name": "One", "emails_sent_count": 10},
            {"campaign_id": "c2", "campaign_name": "Two", "emails_sent_count": 20},
        ]);
        let records = normalize_analytics(value).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].campaign_id, "c1");
        assert_eq!(records[1].emails_sent_count, 20);
    }

    #[test]
    fn analytics_map_shape_is_tagged_with_keys() {
        let value = json!({
            "c1": {"emails_sent_count": 10, "reply_count": 2},
            "c2": {"campaign_id": "explicit", "emails_sent_count": 5},
        });
        let mut records = normalize_analytics(value).unwrap();
        records.sort_by(|a, b| a.emails_sent_count.cmp(&b.emails_sent_count));
        // a record's own campaign_id wins over the map key
        assert_eq!(records[0].campaign_id, "explicit");
        assert_eq!(records[1].campaign_id, "c1");
        assert_eq!(records[1].reply_count, 2);
    }

    #[test]
    fn analytics_scalar_shape_is_a_decode_error() {
        assert!(matches!(
            normalize_analytics(json!(42)),
            Err(ReachError::Decode(_))
        ));
    }

    #[test]
    fn absent_counters_stay_distinguishable_from_zero() {
        let record: CampaignAnalytics =
            serde_json::from_value(json!({"campaign_id": "c1", "bounced_count": 0})).unwrap();
        assert_eq!(record.bounced_count, Some(0));
        assert_eq!(record.completed_count, None);
    }

    #[test]
    fn sequence_step_round_trips_delay_and_empty_body() {
        let step = SequenceStep {
            name: Some("Step 1".into()),
            step_type: Some("email".into()),
            delay: Some(3),
            variants: vec![SequenceVariant {
                name: None,
                subject: Some("Hi".into()),
                body: Some(String::new()),
                v_disabled: false,
            }],
        };
        let encoded = serde_json::to_string(&step).unwrap();
        let decoded: SequenceStep = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, step);
        assert_eq!(decoded.variants[0].body.as_deref(), Some(""));
    }

    #[test]
    fn sent_email_accepts_both_campaign_name_spellings() {
        let camel: SentEmail =
            serde_json::from_value(json!({"eaccount": "a@b.co", "campaignName": "X"})).unwrap();
        let snake: SentEmail =
            serde_json::from_value(json!({"eaccount": "a@b.co", "campaign_name": "X"})).unwrap();
        assert_eq!(camel.campaign_name.as_deref(), Some("X"));
        assert_eq!(camel.campaign_name, snake.campaign_name);
    }
}
