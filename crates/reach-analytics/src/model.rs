//! Normalized output shapes
//!
//! These are the records the presentation layer consumes. Field names and
//! the step counter mapping (display `opened`/`replies`/`clicks` carry the
//! unique counters) are load-bearing display rules, not accidents.

use reach_vendor::types::{CampaignAnalytics, StepAnalytics};
use serde::{Deserialize, Serialize};

/// Campaign lifecycle states, classifying the vendor's numeric codes.
/// Subsequences use a superset of the same codes, negative values included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Running,
    Suspended,
    Unhealthy,
    BounceProtection,
}

impl CampaignStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Draft),
            1 => Some(Self::Active),
            2 => Some(Self::Paused),
            3 => Some(Self::Completed),
            4 => Some(Self::Running),
            -99 => Some(Self::Suspended),
            -1 => Some(Self::Unhealthy),
            -2 => Some(Self::BounceProtection),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Draft => 0,
            Self::Active => 1,
            Self::Paused => 2,
            Self::Completed => 3,
            Self::Running => 4,
            Self::Suspended => -99,
            Self::Unhealthy => -1,
            Self::BounceProtection => -2,
        }
    }
}

/// Map a zero-based variant index to its display letter: "0" → "A" …
/// "25" → "Z". Anything else (indices past the alphabet included) passes
/// through verbatim.
pub fn variant_label(raw: &str) -> String {
    match raw.parse::<u32>() {
        Ok(index) if index <= 25 && raw == index.to_string() => {
            char::from(b'A' + index as u8).to_string()
        }
        _ => raw.to_string(),
    }
}

/// One step+variant row of a campaign breakdown.
///
/// `opened`, `replies` and `clicks` are populated from the unique counters;
/// the raw totals stay available under their `unique_`-prefixed upstream
/// names alongside.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepBreakdown {
    pub step: String,
    pub variant: String,
    pub sent: u64,
    pub opened: u64,
    pub unique_opened: u64,
    pub replies: u64,
    pub unique_replies: u64,
    pub clicks: u64,
    pub unique_clicks: u64,
}

impl StepBreakdown {
    pub fn from_wire(record: StepAnalytics) -> Self {
        Self {
            step: record.step,
            variant: variant_label(&record.variant),
            sent: record.sent,
            opened: record.unique_opened,
            unique_opened: record.unique_opened,
            replies: record.unique_replies,
            unique_replies: record.unique_replies,
            clicks: record.unique_clicks,
            unique_clicks: record.unique_clicks,
        }
    }
}

/// One subsequence row, analytics attached when the per-subsequence fetch
/// succeeded. `analytics: null` is normal degraded content, not an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsequenceBreakdown {
    pub id: String,
    pub name: String,
    pub status: i32,
    pub parent_campaign: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_created: Option<String>,
    pub analytics: Option<CampaignAnalytics>,
}

/// One normalized campaign: the analytics record flattened at the top
/// level, plus its step and subsequence children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignBreakdown {
    #[serde(flatten)]
    pub analytics: CampaignAnalytics,
    pub steps: Vec<StepBreakdown>,
    pub subsequences: Vec<SubsequenceBreakdown>,
}

/// One editable template row: a single variant of a single step, in either
/// the main sequence or a subsequence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: String,
    #[serde(rename = "campaignName")]
    pub campaign_name: String,
    #[serde(rename = "campaignId")]
    pub campaign_id: String,
    #[serde(rename = "workspaceName")]
    pub workspace_name: String,
    pub category: String,
    #[serde(rename = "subsequenceId")]
    pub subsequence_id: String,
    #[serde(rename = "subsequenceName")]
    pub subsequence_name: String,
    #[serde(rename = "sequenceIndex")]
    pub sequence_index: u32,
    #[serde(rename = "stepIndex")]
    pub step_index: u32,
    #[serde(rename = "variantIndex")]
    pub variant_index: u32,
    pub subject: String,
    pub body: String,
    pub step_name: String,
    pub variant_name: String,
    /// Days to wait before the NEXT step fires; the first step is 0,
    /// absent when the vendor left it unset on a later step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<i64>,
    pub step_type: String,
}

/// Template-walk response envelope.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateSweep {
    #[serde(rename = "emailTemplates")]
    pub email_templates: Vec<EmailTemplate>,
    pub total: usize,
    pub campaigns: usize,
    pub message: String,
}

/// One sending mailbox with the campaigns it sent for.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MailboxInfo {
    pub email: String,
    pub campaigns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_labels_cover_the_alphabet() {
        assert_eq!(variant_label("0"), "A");
        assert_eq!(variant_label("1"), "B");
        assert_eq!(variant_label("9"), "J");
        assert_eq!(variant_label("25"), "Z");
    }

    #[test]
    fn variant_labels_past_the_alphabet_pass_through() {
        assert_eq!(variant_label("26"), "26");
        assert_eq!(variant_label("100"), "100");
        assert_eq!(variant_label(""), "");
        assert_eq!(variant_label("A"), "A");
        // non-canonical digits don't map
        assert_eq!(variant_label("03"), "03");
    }

    #[test]
    fn status_codes_round_trip() {
        for code in [0, 1, 2, 3, 4, -99, -1, -2] {
            let status = CampaignStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert_eq!(CampaignStatus::from_code(7), None);
    }

    #[test]
    fn step_display_counters_use_the_unique_values() {
        let wire = StepAnalytics {
            campaign_id: Some("c1".into()),
            step: "1".into(),
            variant: "0".into(),
            sent: 100,
            opened: 250,
            unique_opened: 40,
            replies: 12,
            unique_replies: 8,
            clicks: 30,
            unique_clicks: 5,
        };
        let step = StepBreakdown::from_wire(wire);
        assert_eq!(step.variant, "A");
        assert_eq!(step.opened, 40);
        assert_eq!(step.replies, 8);
        assert_eq!(step.clicks, 5);
        assert_eq!(step.sent, 100);
    }

    #[test]
    fn breakdown_serializes_with_flattened_analytics() {
        let breakdown = CampaignBreakdown {
            analytics: CampaignAnalytics {
                campaign_id: "c1".into(),
                campaign_name: "One".into(),
                emails_sent_count: 10,
                ..Default::default()
            },
            steps: Vec::new(),
            subsequences: Vec::new(),
        };
        let value = serde_json::to_value(&breakdown).unwrap();
        assert_eq!(value["campaign_id"], "c1");
        assert_eq!(value["emails_sent_count"], 10);
        assert!(value["steps"].as_array().unwrap().is_empty());
    }

    #[test]
    fn template_serializes_with_wire_field_names() {
        let template = EmailTemplate {
            id: "c1-main-seq-0-0".into(),
            campaign_name: "One".into(),
            campaign_id: "c1".into(),
            workspace_name: "WS".into(),
            category: "north".into(),
            subsequence_id: "main-sequence".into(),
            subsequence_name: "Main Sequence".into(),
            sequence_index: 1,
            step_index: 1,
            variant_index: 1,
            subject: "Hi".into(),
            body: String::new(),
            step_name: "Step 1".into(),
            variant_name: "Variant 1".into(),
            delay: Some(0),
            step_type: "email".into(),
        };
        let value = serde_json::to_value(&template).unwrap();
        assert_eq!(value["campaignName"], "One");
        assert_eq!(value["stepIndex"], 1);
        assert_eq!(value["step_name"], "Step 1");
        assert_eq!(value["body"], "");
    }
}
