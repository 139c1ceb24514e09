//! OpenReach vendor client
//!
//! Everything that talks to the upstream email-outreach API: credential
//! resolution per workspace, the retry/backoff executor with its
//! batch-scoped rate-limit circuit breaker, and the typed endpoint gateway.

pub mod credentials;
pub mod gateway;
pub mod retry;
pub mod types;

pub use credentials::CredentialTable;
pub use gateway::{VendorApi, VendorGateway, DEFAULT_BASE_URL};
pub use retry::{RateLimitGuard, RawResponse, RetryPolicy};
pub use types::{
    CampaignAnalytics, CampaignDetail, DateRange, SentEmail, SequenceSpec, SequenceStep,
    SequenceVariant, StepAnalytics, SubsequenceDetail, SubsequencePatch, SubsequenceSummary,
};
