//! Metric reconciliation
//!
//! The vendor reports the same campaign through up to three endpoints: the
//! base analytics list, the overview endpoint (CRM events expanded), and a
//! date-windowed detailed fetch. The endpoints disagree, and which one wins
//! differs per metric. The precedence lives in one explicit table so the
//! rule set stays auditable instead of being scattered across ad hoc
//! fallback expressions.
//!
//! Two coalescing modes exist: `FirstNonZero` skips a source reporting
//! zero, `FirstPresent` only skips a source that omitted the field
//! entirely.

use reach_vendor::types::CampaignAnalytics;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Base,
    Overview,
    Detailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coalesce {
    /// Take the first source with a non-zero value.
    FirstNonZero,
    /// Take the first source that reports the field at all, zero included.
    FirstPresent,
}

/// The three metric sources for one campaign. Only `base` is required;
/// the others degrade to absent when their fetch failed.
#[derive(Clone, Copy, Debug)]
pub struct MetricSources<'a> {
    pub base: &'a CampaignAnalytics,
    pub overview: Option<&'a CampaignAnalytics>,
    pub detailed: Option<&'a CampaignAnalytics>,
}

impl<'a> MetricSources<'a> {
    fn record(&self, source: Source) -> Option<&'a CampaignAnalytics> {
        match source {
            Source::Base => Some(self.base),
            Source::Overview => self.overview,
            Source::Detailed => self.detailed,
        }
    }
}

pub struct MetricRule {
    pub metric: &'static str,
    pub order: &'static [Source],
    pub mode: Coalesce,
    get: fn(&CampaignAnalytics) -> Option<u64>,
}

impl MetricRule {
    pub fn resolve(&self, sources: &MetricSources<'_>) -> u64 {
        for &source in self.order {
            let Some(record) = sources.record(source) else {
                continue;
            };
            match ((self.get)(record), self.mode) {
                (Some(value), Coalesce::FirstPresent) => return value,
                (Some(value), Coalesce::FirstNonZero) if value > 0 => return value,
                _ => {}
            }
        }
        0
    }
}

use Coalesce::{FirstNonZero, FirstPresent};
use Source::{Base, Detailed, Overview};

pub const LEADS: MetricRule = MetricRule {
    metric: "leads",
    order: &[Detailed, Base],
    mode: FirstNonZero,
    get: |r| Some(r.leads_count),
};
pub const CONTACTED: MetricRule = MetricRule {
    metric: "contacted",
    order: &[Detailed, Base],
    mode: FirstNonZero,
    get: |r| Some(r.contacted_count),
};
pub const SENT: MetricRule = MetricRule {
    metric: "sent",
    order: &[Base],
    mode: FirstNonZero,
    get: |r| Some(r.emails_sent_count),
};
pub const OPENED: MetricRule = MetricRule {
    metric: "opened",
    order: &[Base],
    mode: FirstNonZero,
    get: |r| Some(r.open_count),
};
pub const UNIQUE_OPENS: MetricRule = MetricRule {
    metric: "unique_opens",
    order: &[Detailed, Base],
    mode: FirstNonZero,
    get: |r| r.open_count_unique,
};
pub const REPLIES: MetricRule = MetricRule {
    metric: "replies",
    order: &[Base],
    mode: FirstNonZero,
    get: |r| Some(r.reply_count),
};
pub const POSITIVE_REPLIES: MetricRule = MetricRule {
    metric: "positive_replies",
    order: &[Overview],
    mode: FirstPresent,
    get: |r| r.reply_count_unique,
};
pub const CLICKS: MetricRule = MetricRule {
    metric: "clicks",
    order: &[Base],
    mode: FirstNonZero,
    get: |r| Some(r.link_click_count),
};
pub const UNIQUE_CLICKS: MetricRule = MetricRule {
    metric: "unique_clicks",
    order: &[Detailed, Base],
    mode: FirstNonZero,
    get: |r| r.link_click_count_unique,
};
pub const BOUNCED: MetricRule = MetricRule {
    metric: "bounced",
    order: &[Base, Detailed],
    mode: FirstPresent,
    get: |r| r.bounced_count,
};
pub const UNSUBSCRIBED: MetricRule = MetricRule {
    metric: "unsubscribed",
    order: &[Base, Detailed],
    mode: FirstPresent,
    get: |r| r.unsubscribed_count,
};
pub const COMPLETED: MetricRule = MetricRule {
    metric: "completed",
    order: &[Detailed, Base],
    mode: FirstPresent,
    get: |r| r.completed_count,
};
pub const OPPORTUNITIES: MetricRule = MetricRule {
    metric: "opportunities",
    order: &[Base, Detailed],
    mode: FirstNonZero,
    get: |r| r.total_opportunities,
};
pub const INTERESTED: MetricRule = MetricRule {
    metric: "interested",
    order: &[Overview],
    mode: FirstPresent,
    get: |r| r.total_interested,
};
pub const MEETINGS_BOOKED: MetricRule = MetricRule {
    metric: "meetings_booked",
    order: &[Overview],
    mode: FirstPresent,
    get: |r| r.total_meeting_booked,
};
pub const CLOSED: MetricRule = MetricRule {
    metric: "closed",
    order: &[Overview],
    mode: FirstPresent,
    get: |r| r.total_closed,
};

/// Every integer rule, for auditing and table-driven tests.
pub fn rules() -> &'static [&'static MetricRule] {
    &[
        &LEADS,
        &CONTACTED,
        &SENT,
        &OPENED,
        &UNIQUE_OPENS,
        &REPLIES,
        &POSITIVE_REPLIES,
        &CLICKS,
        &UNIQUE_CLICKS,
        &BOUNCED,
        &UNSUBSCRIBED,
        &COMPLETED,
        &OPPORTUNITIES,
        &INTERESTED,
        &MEETINGS_BOOKED,
        &CLOSED,
    ]
}

/// Reconciled, validated view of one campaign's metrics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciledMetrics {
    pub leads: u64,
    pub contacted: u64,
    pub sent: u64,
    pub opened: u64,
    pub unique_opens: u64,
    pub replies: u64,
    pub positive_replies: u64,
    pub uninterested_replies: u64,
    pub clicks: u64,
    pub unique_clicks: u64,
    pub bounced: u64,
    pub unsubscribed: u64,
    pub completed: u64,
    pub opportunities: u64,
    pub opportunity_value: f64,
    pub interested: u64,
    pub meetings_booked: u64,
    pub closed: u64,
    /// replies / sent, percent, one decimal
    pub reply_rate: f64,
    /// opened / sent, percent, one decimal
    pub open_rate: f64,
}

/// Percentage with one decimal, zero-safe.
pub fn rate(count: u64, denom: u64) -> f64 {
    if denom == 0 {
        return 0.0;
    }
    (count as f64 / denom as f64 * 1000.0).round() / 10.0
}

/// Resolve every metric through the table, then apply the validation caps:
/// opened/replies/bounced/unsubscribed never exceed sent, clicks never
/// exceed opened, contacted never exceeds leads.
pub fn reconcile(sources: &MetricSources<'_>) -> ReconciledMetrics {
    let leads = LEADS.resolve(sources);
    let sent = SENT.resolve(sources);
    let opened = OPENED.resolve(sources).min(sent);
    let replies = REPLIES.resolve(sources).min(sent);
    let positive_replies = POSITIVE_REPLIES.resolve(sources);

    let opportunity_value = sources
        .base
        .total_opportunity_value
        .or(sources.detailed.and_then(|d| d.total_opportunity_value))
        .unwrap_or(0.0);

    ReconciledMetrics {
        leads,
        contacted: CONTACTED.resolve(sources).min(leads),
        sent,
        opened,
        unique_opens: UNIQUE_OPENS.resolve(sources),
        replies,
        positive_replies,
        uninterested_replies: replies.saturating_sub(positive_replies),
        clicks: CLICKS.resolve(sources).min(opened),
        unique_clicks: UNIQUE_CLICKS.resolve(sources),
        bounced: BOUNCED.resolve(sources).min(sent),
        unsubscribed: UNSUBSCRIBED.resolve(sources).min(sent),
        completed: COMPLETED.resolve(sources),
        opportunities: OPPORTUNITIES.resolve(sources),
        opportunity_value,
        interested: INTERESTED.resolve(sources),
        meetings_booked: MEETINGS_BOOKED.resolve(sources),
        closed: CLOSED.resolve(sources),
        reply_rate: rate(replies, sent),
        open_rate: rate(opened, sent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sent: u64) -> CampaignAnalytics {
        CampaignAnalytics {
            emails_sent_count: sent,
            ..Default::default()
        }
    }

    #[test]
    fn detailed_wins_leads_but_zero_falls_back() {
        let mut base = record(100);
        base.leads_count = 50;
        let mut detailed = record(100);
        detailed.leads_count = 75;

        let sources = MetricSources {
            base: &base,
            overview: None,
            detailed: Some(&detailed),
        };
        assert_eq!(LEADS.resolve(&sources), 75);

        detailed.leads_count = 0;
        let sources = MetricSources {
            base: &base,
            overview: None,
            detailed: Some(&detailed),
        };
        assert_eq!(LEADS.resolve(&sources), 50);
    }

    #[test]
    fn bounced_prefers_base_even_when_zero_is_reported() {
        let mut base = record(100);
        base.bounced_count = Some(0);
        let mut detailed = record(100);
        detailed.bounced_count = Some(9);

        let sources = MetricSources {
            base: &base,
            overview: None,
            detailed: Some(&detailed),
        };
        // first-present: an explicit zero from base wins over detailed
        assert_eq!(BOUNCED.resolve(&sources), 0);

        base.bounced_count = None;
        let sources = MetricSources {
            base: &base,
            overview: None,
            detailed: Some(&detailed),
        };
        assert_eq!(BOUNCED.resolve(&sources), 9);
    }

    #[test]
    fn completed_prefers_detailed_when_present() {
        let mut base = record(100);
        base.completed_count = Some(4);
        let mut detailed = record(100);
        detailed.completed_count = Some(0);

        let sources = MetricSources {
            base: &base,
            overview: None,
            detailed: Some(&detailed),
        };
        assert_eq!(COMPLETED.resolve(&sources), 0);
    }

    #[test]
    fn crm_metrics_come_from_overview_only() {
        let base = record(100);
        let mut overview = record(100);
        overview.total_interested = Some(3);
        overview.reply_count_unique = Some(7);

        let sources = MetricSources {
            base: &base,
            overview: Some(&overview),
            detailed: None,
        };
        assert_eq!(INTERESTED.resolve(&sources), 3);
        assert_eq!(POSITIVE_REPLIES.resolve(&sources), 7);

        let without = MetricSources {
            base: &base,
            overview: None,
            detailed: None,
        };
        assert_eq!(INTERESTED.resolve(&without), 0);
    }

    #[test]
    fn caps_clamp_impossible_counters() {
        let mut base = record(100);
        base.leads_count = 10;
        base.contacted_count = 25; // > leads
        base.open_count = 140; // > sent
        base.reply_count = 200; // > sent
        base.link_click_count = 90; // > opened after clamping
        base.bounced_count = Some(150); // > sent

        let sources = MetricSources {
            base: &base,
            overview: None,
            detailed: None,
        };
        let metrics = reconcile(&sources);
        assert_eq!(metrics.contacted, 10);
        assert_eq!(metrics.opened, 100);
        assert_eq!(metrics.replies, 100);
        assert_eq!(metrics.clicks, 90);
        assert_eq!(metrics.bounced, 100);
    }

    #[test]
    fn uninterested_is_the_reply_remainder() {
        let mut base = record(100);
        base.reply_count = 10;
        let mut overview = record(100);
        overview.reply_count_unique = Some(4);

        let sources = MetricSources {
            base: &base,
            overview: Some(&overview),
            detailed: None,
        };
        let metrics = reconcile(&sources);
        assert_eq!(metrics.positive_replies, 4);
        assert_eq!(metrics.uninterested_replies, 6);
    }

    #[test]
    fn rates_are_one_decimal_and_zero_safe() {
        assert_eq!(rate(1, 3), 33.3);
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(5, 0), 0.0);

        let mut base = record(80);
        base.reply_count = 8;
        let sources = MetricSources {
            base: &base,
            overview: None,
            detailed: None,
        };
        assert_eq!(reconcile(&sources).reply_rate, 10.0);
    }

    #[test]
    fn every_rule_names_at_least_one_source() {
        for rule in rules() {
            assert!(!rule.order.is_empty(), "rule {} has no sources", rule.metric);
        }
    }
}
