//! Sending-mailbox roll-up
//!
//! Groups sent emails by sending account and collects the distinct
//! campaign names each account sent for. The sending address comes from
//! `from_address_email`, with `eaccount` as the fallback spelling older
//! records use.

use std::collections::BTreeMap;

use reach_common::ReachResult;
use reach_vendor::types::SentEmail;
use reach_vendor::VendorApi;

use crate::model::MailboxInfo;

/// Default page size for the sent-email listing.
pub const DEFAULT_EMAIL_LIMIT: u32 = 1000;

/// Group sent emails into per-mailbox campaign lists. Mailboxes come back
/// sorted by address, campaign names sorted and de-duplicated.
pub fn roll_up(emails: Vec<SentEmail>) -> Vec<MailboxInfo> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for email in emails {
        let Some(address) = email.from_address_email.or(email.eaccount) else {
            continue;
        };
        let campaigns = grouped.entry(address).or_default();
        if let Some(name) = email.campaign_name {
            if !campaigns.contains(&name) {
                campaigns.push(name);
            }
        }
    }

    grouped
        .into_iter()
        .map(|(email, mut campaigns)| {
            campaigns.sort();
            MailboxInfo { email, campaigns }
        })
        .collect()
}

/// Fetch and roll up in one call.
pub async fn list_mailboxes(api: &dyn VendorApi, limit: u32) -> ReachResult<Vec<MailboxInfo>> {
    let emails = api.list_sent_emails(limit).await?;
    Ok(roll_up(emails))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(from: Option<&str>, eaccount: Option<&str>, campaign: Option<&str>) -> SentEmail {
        SentEmail {
            from_address_email: from.map(str::to_string),
            eaccount: eaccount.map(str::to_string),
            campaign_name: campaign.map(str::to_string),
            campaign_id: None,
        }
    }

    #[test]
    fn groups_by_address_with_eaccount_fallback() {
        let mailboxes = roll_up(vec![
            email(Some("zoe@acme.co"), None, Some("Launch")),
            email(None, Some("amy@acme.co"), Some("Launch")),
            email(Some("zoe@acme.co"), Some("ignored@acme.co"), Some("Revival")),
            email(None, None, Some("Orphaned")),
        ]);

        assert_eq!(mailboxes.len(), 2);
        assert_eq!(mailboxes[0].email, "amy@acme.co");
        assert_eq!(mailboxes[0].campaigns, vec!["Launch"]);
        assert_eq!(mailboxes[1].email, "zoe@acme.co");
        assert_eq!(mailboxes[1].campaigns, vec!["Launch", "Revival"]);
    }

    #[test]
    fn campaign_names_are_distinct_and_sorted() {
        let mailboxes = roll_up(vec![
            email(Some("a@b.co"), None, Some("Beta")),
            email(Some("a@b.co"), None, Some("Alpha")),
            email(Some("a@b.co"), None, Some("Beta")),
            email(Some("a@b.co"), None, None),
        ]);

        assert_eq!(mailboxes.len(), 1);
        assert_eq!(mailboxes[0].campaigns, vec!["Alpha", "Beta"]);
    }
}
