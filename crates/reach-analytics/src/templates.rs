//! Email-template extraction walk
//!
//! Walks every catalog campaign, pulling one template row per step variant
//! from the campaign's main sequence and from each of its subsequences.
//! The walk is deliberately sequential with growing inter-campaign delays:
//! the vendor rate-limits aggressively and the batch shares one circuit
//! breaker. A tripped breaker ends the walk early with whatever was
//! gathered: a soft shutdown, not an error.

use std::sync::Arc;
use std::time::Duration;

use reach_common::{ReachError, ReachResult};
use reach_vendor::types::{CampaignDetail, SequenceSpec};
use reach_vendor::{RateLimitGuard, VendorApi};
use tracing::{debug, info, warn};

use crate::catalog::{CampaignCatalog, CatalogEntry};
use crate::model::{EmailTemplate, TemplateSweep};

/// Base spacing between successive campaigns.
const CAMPAIGN_DELAY_BASE: Duration = Duration::from_secs(3);

/// Progressive spacing cap.
const CAMPAIGN_DELAY_CAP: Duration = Duration::from_secs(10);

/// Fixed spacing between successive subsequence fetches.
const SUBSEQUENCE_DELAY: Duration = Duration::from_secs(2);

/// Synthetic subsequence id for templates from the main sequence.
const MAIN_SEQUENCE_ID: &str = "main-sequence";

/// Resolves a `VendorApi` handle per workspace. All handles produced by one
/// factory share one batch `RateLimitGuard`.
pub trait VendorApiFactory: Send + Sync {
    fn for_workspace(&self, workspace_id: &str) -> ReachResult<Arc<dyn VendorApi>>;
    fn guard(&self) -> &RateLimitGuard;
}

#[derive(Clone, Debug, Default)]
pub struct TemplateWalkOptions {
    /// Category filter; `None` or "all" keeps every category.
    pub category: Option<String>,
    /// Restrict the walk to one vendor campaign id.
    pub campaign_id: Option<String>,
}

/// Spacing before campaign at position `index`: 3s base plus half a second
/// per processed campaign, capped at +10s.
pub fn inter_campaign_delay(index: usize) -> Duration {
    let progressive = Duration::from_millis((index as u64) * 500).min(CAMPAIGN_DELAY_CAP);
    CAMPAIGN_DELAY_BASE + progressive
}

/// Run the walk over the catalog.
pub async fn extract_templates(
    factory: &dyn VendorApiFactory,
    catalog: &CampaignCatalog,
    options: &TemplateWalkOptions,
) -> ReachResult<TemplateSweep> {
    let category = options.category.as_deref();
    let mut candidates = catalog.filtered(category);

    if catalog.discovers_for(category) {
        if let Some(discovery) = &catalog.discovery {
            match factory.for_workspace(&discovery.workspace_id) {
                Ok(api) => candidates.extend(catalog.discover(api.as_ref()).await),
                Err(e) => {
                    warn!(workspace = %discovery.workspace_id, error = %e, "skipping discovery")
                }
            }
        }
    }

    if let Some(campaign_id) = &options.campaign_id {
        candidates.retain(|entry| &entry.campaign_id == campaign_id);
    }

    info!(campaigns = candidates.len(), "extracting email templates");

    let mut templates: Vec<EmailTemplate> = Vec::new();
    for (index, entry) in candidates.iter().enumerate() {
        let api = match factory.for_workspace(&entry.workspace_id) {
            Ok(api) => api,
            Err(e) => {
                warn!(workspace = %entry.workspace_id, error = %e, "no credential for workspace");
                continue;
            }
        };

        if index > 0 {
            let delay = inter_campaign_delay(index);
            debug!(
                campaign = %entry.name,
                delay_ms = delay.as_millis() as u64,
                "pacing before next campaign"
            );
            tokio::time::sleep(delay).await;
        }

        if factory.guard().is_tripped() {
            warn!("stopping template walk: rate-limit breaker tripped");
            break;
        }

        match process_campaign(api.as_ref(), entry).await {
            Ok(found) => {
                debug!(campaign = %entry.name, templates = found.len(), "campaign processed");
                templates.extend(found);
            }
            Err(e) => {
                // one campaign's failure never aborts the batch
                warn!(campaign = %entry.name, error = %e, "campaign failed; emitting error placeholder");
                templates.push(error_placeholder(entry, &e));
            }
        }
    }

    let total = templates.len();
    let campaigns = candidates.len();
    Ok(TemplateSweep {
        email_templates: templates,
        total,
        campaigns,
        message: format!(
            "Found {} email templates across {} campaigns",
            total, campaigns
        ),
    })
}

/// Extract every template of one campaign: main sequence, then each
/// subsequence, then the legacy fallbacks.
async fn process_campaign(
    api: &dyn VendorApi,
    entry: &CatalogEntry,
) -> ReachResult<Vec<EmailTemplate>> {
    let mut out = Vec::new();
    let detail = api.campaign_detail(&entry.campaign_id).await?;

    if let Some(sequence) = detail.sequences.first() {
        let name = sequence.name.clone().unwrap_or_else(|| "Main Sequence".to_string());
        extract_sequence(
            sequence,
            entry,
            MAIN_SEQUENCE_ID,
            &name,
            &format!("{}-main-seq", entry.campaign_id),
            &mut out,
        );
    }

    for subsequence in &detail.subsequences {
        match api.subsequence_detail(&subsequence.id).await {
            Ok(subseq_detail) => {
                if let Some(sequence) = subseq_detail.sequences.first() {
                    let name = subseq_detail
                        .name
                        .clone()
                        .or_else(|| subsequence.name.clone())
                        .unwrap_or_else(|| format!("Subsequence {}", subsequence.id));
                    extract_sequence(
                        sequence,
                        entry,
                        &subsequence.id,
                        &name,
                        &format!("{}-{}", entry.campaign_id, subsequence.id),
                        &mut out,
                    );
                } else {
                    warn!(subsequence = %subsequence.id, "subsequence has no sequences");
                }
                tokio::time::sleep(SUBSEQUENCE_DELAY).await;
            }
            Err(e) => {
                warn!(subsequence = %subsequence.id, error = %e, "subsequence fetch failed");
            }
        }
    }

    if out.is_empty() {
        scan_legacy_steps(&detail, entry, &mut out);
    }
    if out.is_empty() {
        debug!(campaign = %entry.name, "no email content found, creating placeholder");
        out.push(structure_placeholder(entry));
    }

    Ok(out)
}

/// Emit one template per variant of every step in `sequence`. Steps with
/// zero variants are skipped. `delay` on step N is the wait before step
/// N+1; the first step implicitly carries 0.
fn extract_sequence(
    sequence: &SequenceSpec,
    entry: &CatalogEntry,
    subsequence_id: &str,
    subsequence_name: &str,
    id_prefix: &str,
    out: &mut Vec<EmailTemplate>,
) {
    for (step_index, step) in sequence.steps.iter().enumerate() {
        if step.variants.is_empty() {
            warn!(step = step_index + 1, "step has no variants, skipping");
            continue;
        }
        // all variants are included, disabled ones too
        for (variant_index, variant) in step.variants.iter().enumerate() {
            let delay = match step.delay {
                Some(days) => Some(days),
                None if step_index == 0 => Some(0),
                None => None,
            };
            out.push(EmailTemplate {
                id: format!("{}-{}-{}", id_prefix, step_index, variant_index),
                campaign_name: entry.name.clone(),
                campaign_id: entry.campaign_id.clone(),
                workspace_name: entry.workspace_name.clone(),
                category: entry.category.clone(),
                subsequence_id: subsequence_id.to_string(),
                subsequence_name: subsequence_name.to_string(),
                sequence_index: 1,
                step_index: step_index as u32 + 1,
                variant_index: variant_index as u32 + 1,
                // preserved exactly as returned, empty strings included
                subject: variant.subject.clone().unwrap_or_default(),
                body: variant.body.clone().unwrap_or_default(),
                step_name: step
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Step {}", step_index + 1)),
                variant_name: variant
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Variant {}", variant_index + 1)),
                delay,
                step_type: step.step_type.clone().unwrap_or_else(|| "email".to_string()),
            });
        }
    }
}

/// Legacy flat `steps` scan for campaigns predating the sequences tree.
fn scan_legacy_steps(detail: &CampaignDetail, entry: &CatalogEntry, out: &mut Vec<EmailTemplate>) {
    for (index, step) in detail.steps.iter().enumerate() {
        if !step.has_content() {
            continue;
        }
        out.push(EmailTemplate {
            id: format!("{}-step-{}", entry.campaign_id, index),
            campaign_name: entry.name.clone(),
            campaign_id: entry.campaign_id.clone(),
            workspace_name: entry.workspace_name.clone(),
            category: entry.category.clone(),
            subsequence_id: "main".to_string(),
            subsequence_name: "Main Sequence".to_string(),
            sequence_index: 1,
            step_index: index as u32 + 1,
            variant_index: 1,
            subject: step
                .subject
                .clone()
                .or_else(|| step.title.clone())
                .unwrap_or_else(|| "No Subject".to_string()),
            body: step
                .body
                .clone()
                .or_else(|| step.content.clone())
                .unwrap_or_else(|| "No Content".to_string()),
            step_name: step
                .name
                .clone()
                .unwrap_or_else(|| format!("Step {}", index + 1)),
            variant_name: "Default".to_string(),
            delay: None,
            step_type: "email".to_string(),
        });
    }
}

/// The UI always shows one row per known campaign, even when its structure
/// could not be determined.
fn structure_placeholder(entry: &CatalogEntry) -> EmailTemplate {
    EmailTemplate {
        id: format!("{}-placeholder", entry.campaign_id),
        campaign_name: entry.name.clone(),
        campaign_id: entry.campaign_id.clone(),
        workspace_name: entry.workspace_name.clone(),
        category: entry.category.clone(),
        subsequence_id: "unknown".to_string(),
        subsequence_name: "Unknown Structure".to_string(),
        sequence_index: 1,
        step_index: 1,
        variant_index: 1,
        subject: "Email content structure not found".to_string(),
        body: format!(
            "Campaign: {}\nWorkspace: {}\nCategory: {}\n\nThis campaign exists but its email \
             content structure could not be determined from the available APIs. The campaign may \
             use a different email structure or may not have email sequences configured.",
            entry.name, entry.workspace_name, entry.category
        ),
        step_name: "Unknown".to_string(),
        variant_name: "Unknown".to_string(),
        delay: None,
        step_type: "email".to_string(),
    }
}

fn error_placeholder(entry: &CatalogEntry, error: &ReachError) -> EmailTemplate {
    EmailTemplate {
        id: format!("{}-error", entry.campaign_id),
        campaign_name: entry.name.clone(),
        campaign_id: entry.campaign_id.clone(),
        workspace_name: entry.workspace_name.clone(),
        category: entry.category.clone(),
        subsequence_id: "error".to_string(),
        subsequence_name: "Error Loading".to_string(),
        sequence_index: 1,
        step_index: 1,
        variant_index: 1,
        subject: "Error loading email content".to_string(),
        body: format!(
            "Campaign: {}\nError: {}\n\nThis campaign could not be loaded. This may be due to API \
             permissions, network issues, or campaign configuration.",
            entry.name, error
        ),
        step_name: "Error".to_string(),
        variant_name: "Error".to_string(),
        delay: None,
        step_type: "email".to_string(),
    }
}
