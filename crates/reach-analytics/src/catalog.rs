//! Campaign catalog
//!
//! The template walk operates over a catalog of known campaigns: a static
//! registry loaded from configuration, plus campaigns discovered at request
//! time from one workspace's analytics, filtered by a name allow-list.

use std::path::Path;

use reach_vendor::types::DateRange;
use reach_vendor::VendorApi;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// One known campaign.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable registry id (distinct from the vendor campaign id).
    pub id: String,
    pub name: String,
    pub campaign_id: String,
    pub workspace_id: String,
    pub workspace_name: String,
    pub category: String,
}

/// Dynamic discovery source: one workspace whose campaigns are pulled from
/// the analytics endpoint and kept only when their name is allow-listed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub workspace_id: String,
    pub workspace_name: String,
    pub category: String,
    pub allowed_names: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignCatalog {
    #[serde(default)]
    pub entries: Vec<CatalogEntry>,
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    ReadError(String),

    #[error("Failed to parse catalog: {0}")]
    ParseError(String),
}

impl CampaignCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CatalogError::ReadError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| CatalogError::ParseError(e.to_string()))
    }

    /// Static entries matching the category filter ("all"/absent keeps
    /// everything).
    pub fn filtered(&self, category: Option<&str>) -> Vec<CatalogEntry> {
        self.entries
            .iter()
            .filter(|entry| matches_category(category, &entry.category))
            .cloned()
            .collect()
    }

    /// True when discovery should run for this category filter.
    pub fn discovers_for(&self, category: Option<&str>) -> bool {
        self.discovery
            .as_ref()
            .map(|d| matches_category(category, &d.category))
            .unwrap_or(false)
    }

    /// Pull the discovery workspace's campaigns and keep the allow-listed
    /// ones. Failures degrade to an empty addition; discovery never blocks
    /// the static registry.
    pub async fn discover(&self, api: &dyn VendorApi) -> Vec<CatalogEntry> {
        let Some(discovery) = &self.discovery else {
            return Vec::new();
        };
        match api.campaign_analytics(&[], DateRange::default()).await {
            Ok(records) => records
                .into_iter()
                .filter(|r| discovery.allowed_names.iter().any(|n| n == &r.campaign_name))
                .map(|r| CatalogEntry {
                    id: format!("{}-{}", discovery.category, r.campaign_id),
                    name: r.campaign_name,
                    campaign_id: r.campaign_id,
                    workspace_id: discovery.workspace_id.clone(),
                    workspace_name: discovery.workspace_name.clone(),
                    category: discovery.category.clone(),
                })
                .collect(),
            Err(e) => {
                warn!(workspace = %discovery.workspace_id, error = %e, "campaign discovery failed");
                Vec::new()
            }
        }
    }
}

fn matches_category(filter: Option<&str>, category: &str) -> bool {
    match filter {
        None | Some("all") => true,
        Some(wanted) => wanted == category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubVendor;
    use reach_vendor::types::CampaignAnalytics;

    fn catalog() -> CampaignCatalog {
        CampaignCatalog {
            entries: vec![
                CatalogEntry {
                    id: "north-leads".into(),
                    name: "North Leads".into(),
                    campaign_id: "c-north".into(),
                    workspace_id: "1".into(),
                    workspace_name: "North".into(),
                    category: "north".into(),
                },
                CatalogEntry {
                    id: "south-offices".into(),
                    name: "South Offices".into(),
                    campaign_id: "c-south".into(),
                    workspace_id: "4".into(),
                    workspace_name: "South".into(),
                    category: "south".into(),
                },
            ],
            discovery: Some(DiscoveryConfig {
                workspace_id: "2".into(),
                workspace_name: "Discovered".into(),
                category: "east".into(),
                allowed_names: vec!["East One".into()],
            }),
        }
    }

    #[test]
    fn category_filter_narrows_the_registry() {
        let catalog = catalog();
        assert_eq!(catalog.filtered(None).len(), 2);
        assert_eq!(catalog.filtered(Some("all")).len(), 2);
        let north = catalog.filtered(Some("north"));
        assert_eq!(north.len(), 1);
        assert_eq!(north[0].campaign_id, "c-north");
        assert!(catalog.filtered(Some("west")).is_empty());

        assert!(catalog.discovers_for(None));
        assert!(catalog.discovers_for(Some("east")));
        assert!(!catalog.discovers_for(Some("north")));
    }

    #[tokio::test]
    async fn discovery_keeps_only_allow_listed_names() {
        let stub = StubVendor::default().with_campaigns(vec![
            CampaignAnalytics {
                campaign_id: "e1".into(),
                campaign_name: "East One".into(),
                ..Default::default()
            },
            CampaignAnalytics {
                campaign_id: "e2".into(),
                campaign_name: "East Unlisted".into(),
                ..Default::default()
            },
        ]);

        let found = catalog().discover(&stub).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].campaign_id, "e1");
        assert_eq!(found[0].id, "east-e1");
        assert_eq!(found[0].workspace_id, "2");
    }

    #[tokio::test]
    async fn discovery_failure_degrades_to_nothing() {
        let mut stub = StubVendor::default();
        stub.campaigns = Some(Err(reach_common::ReachError::UpstreamStatus {
            status: 500,
        }));
        assert!(catalog().discover(&stub).await.is_empty());
    }
}
