//! Application state and per-request gateway construction

use std::path::PathBuf;
use std::sync::Arc;

use reach_analytics::templates::VendorApiFactory;
use reach_analytics::{CampaignCatalog, FilePreferenceStore, PreferenceStore};
use reach_common::ReachResult;
use reach_vendor::{CredentialTable, RateLimitGuard, VendorApi, VendorGateway, DEFAULT_BASE_URL};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub credentials: CredentialTable,
    pub base_url: String,
    pub catalog: Arc<CampaignCatalog>,
    pub prefs: Arc<dyn PreferenceStore>,
}

impl AppState {
    /// Build state from the environment: credentials from
    /// `OPENREACH_API_KEY[_n]`, catalog from `OPENREACH_CATALOG`,
    /// preferences at `OPENREACH_PREFS`.
    pub fn from_env() -> Self {
        let credentials = CredentialTable::from_env();
        if credentials.is_empty() {
            warn!("no vendor credentials configured; upstream requests will fail");
        }

        let catalog = match std::env::var("OPENREACH_CATALOG") {
            Ok(path) => match CampaignCatalog::load(std::path::Path::new(&path)) {
                Ok(catalog) => {
                    info!(path, entries = catalog.entries.len(), "campaign catalog loaded");
                    catalog
                }
                Err(e) => {
                    warn!(path, error = %e, "catalog unreadable, starting empty");
                    CampaignCatalog::default()
                }
            },
            Err(_) => CampaignCatalog::default(),
        };

        let prefs_path = std::env::var("OPENREACH_PREFS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/preferences.json"));

        Self {
            http: VendorGateway::http_client(),
            credentials,
            base_url: std::env::var("OPENREACH_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            catalog: Arc::new(catalog),
            prefs: Arc::new(FilePreferenceStore::load(prefs_path)),
        }
    }

    /// One gateway for one request batch. Each call gets a fresh
    /// circuit-breaker guard, so concurrent requests never share breaker
    /// state.
    pub fn gateway(&self, workspace_id: Option<&str>) -> ReachResult<VendorGateway> {
        let key = self.credentials.resolve(workspace_id)?;
        Ok(VendorGateway::new(self.http.clone(), key).with_base_url(self.base_url.clone()))
    }

    /// A per-request factory for multi-workspace batches (the template
    /// walk); every gateway it hands out shares one batch guard.
    pub fn batch(&self) -> GatewayFactory {
        GatewayFactory {
            http: self.http.clone(),
            credentials: self.credentials.clone(),
            base_url: self.base_url.clone(),
            guard: Arc::new(RateLimitGuard::default()),
        }
    }
}

pub struct GatewayFactory {
    http: reqwest::Client,
    credentials: CredentialTable,
    base_url: String,
    guard: Arc<RateLimitGuard>,
}

impl VendorApiFactory for GatewayFactory {
    fn for_workspace(&self, workspace_id: &str) -> ReachResult<Arc<dyn VendorApi>> {
        let key = self.credentials.resolve(Some(workspace_id))?;
        Ok(Arc::new(
            VendorGateway::new(self.http.clone(), key)
                .with_base_url(self.base_url.clone())
                .with_guard(self.guard.clone()),
        ))
    }

    fn guard(&self) -> &RateLimitGuard {
        &self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(credentials: CredentialTable) -> AppState {
        AppState {
            http: reqwest::Client::new(),
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            catalog: Arc::new(CampaignCatalog::default()),
            prefs: Arc::new(FilePreferenceStore::in_memory()),
        }
    }

    #[test]
    fn gateway_requires_a_resolvable_credential() {
        let state = state_with(CredentialTable::new(None));
        assert!(state.gateway(Some("1")).is_err());

        let state = state_with(CredentialTable::new(Some("key".into())));
        assert!(state.gateway(Some("unknown")).is_ok());
    }

    #[test]
    fn batch_factory_shares_one_guard_across_workspaces() {
        let state = state_with(
            CredentialTable::new(Some("default".into())).with_workspace("2", "other"),
        );
        let factory = state.batch();
        let _a = factory.for_workspace("1").unwrap();
        let _b = factory.for_workspace("2").unwrap();

        factory.guard().record_rate_limited();
        factory.guard().record_rate_limited();
        assert!(factory.guard().is_tripped());

        // a new batch starts clean
        assert!(!state.batch().guard().is_tripped());
    }
}
