//! Workspace credential resolution
//!
//! Each upstream workspace is an account partition with its own bearer
//! credential. The table holds a small set of named workspaces plus a
//! default; unknown workspace ids fall back to the default credential.
//! The fallback is intentional, not an error path.

use std::collections::HashMap;

use reach_common::{ReachError, ReachResult};

/// Environment variable carrying the default credential.
pub const ENV_DEFAULT_KEY: &str = "OPENREACH_API_KEY";

/// Number of named workspace slots read from the environment
/// (`OPENREACH_API_KEY_1` .. `OPENREACH_API_KEY_4`).
pub const NAMED_WORKSPACES: u32 = 4;

/// Workspace id -> bearer credential lookup table.
#[derive(Clone, Debug, Default)]
pub struct CredentialTable {
    default: Option<String>,
    named: HashMap<String, String>,
}

impl CredentialTable {
    pub fn new(default: Option<String>) -> Self {
        Self {
            default,
            named: HashMap::new(),
        }
    }

    /// Add or replace a named workspace credential.
    pub fn with_workspace(mut self, workspace_id: impl Into<String>, key: impl Into<String>) -> Self {
        self.named.insert(workspace_id.into(), key.into());
        self
    }

    /// Build the table from the process environment.
    pub fn from_env() -> Self {
        let mut table = Self::new(std::env::var(ENV_DEFAULT_KEY).ok());
        for slot in 1..=NAMED_WORKSPACES {
            if let Ok(key) = std::env::var(format!("{}_{}", ENV_DEFAULT_KEY, slot)) {
                table.named.insert(slot.to_string(), key);
            }
        }
        table
    }

    /// Resolve the credential for a workspace.
    ///
    /// `None` and unknown ids both resolve to the default. Errors only when
    /// nothing at all is configured for the requested scope.
    pub fn resolve(&self, workspace_id: Option<&str>) -> ReachResult<&str> {
        let key = match workspace_id {
            Some(id) => self.named.get(id).or(self.default.as_ref()),
            None => self.default.as_ref(),
        };
        key.map(String::as_str).ok_or_else(|| {
            ReachError::CredentialMissing(workspace_id.unwrap_or("default").to_string())
        })
    }

    /// True when at least one credential is configured.
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.named.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_workspace_wins_over_default() {
        let table = CredentialTable::new(Some("default-key".into()))
            .with_workspace("2", "prusa-key");
        assert_eq!(table.resolve(Some("2")).unwrap(), "prusa-key");
        assert_eq!(table.resolve(Some("1")).unwrap(), "default-key");
        assert_eq!(table.resolve(None).unwrap(), "default-key");
    }

    #[test]
    fn unknown_workspace_falls_back_to_default() {
        let table = CredentialTable::new(Some("default-key".into()));
        assert_eq!(table.resolve(Some("99")).unwrap(), "default-key");
    }

    #[test]
    fn missing_credential_is_an_error() {
        let table = CredentialTable::new(None);
        let err = table.resolve(Some("3")).unwrap_err();
        assert!(matches!(err, ReachError::CredentialMissing(id) if id == "3"));
    }
}
