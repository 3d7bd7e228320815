//! Collaborator seams: the platform push API and the subscription backend.
//!
//! Both are injected into the coordinator as trait objects so tests and
//! embedders can supply their own (see [`super::memory`]).

use async_trait::async_trait;
use serde::Serialize;
use superfeed_model::{Permission, PushSubscription, ServerRecord};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The capability exists but cannot be used right now.
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// An active service-worker registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceWorkerRegistration {
    pub scope: String,
}

/// A notification handed to the platform (or shown in-app).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformNotification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Notifications sharing a tag replace each other.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Browser notification and push-manager capabilities.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Whether service workers and a push manager exist at all.
    fn is_supported(&self) -> bool;

    /// Current permission, without prompting.
    async fn permission(&self) -> Permission;

    /// Prompt the user. Resolves to the permission after the prompt.
    async fn request_permission(&self) -> Result<Permission, PlatformError>;

    /// Existing service-worker registration, if any.
    async fn service_worker(&self) -> Option<ServiceWorkerRegistration>;

    async fn register_service_worker(&self) -> Result<ServiceWorkerRegistration, PlatformError>;

    async fn get_subscription(
        &self,
        registration: &ServiceWorkerRegistration,
    ) -> Result<Option<PushSubscription>, PlatformError>;

    /// Create a subscription bound to `application_server_key`.
    async fn subscribe(
        &self,
        registration: &ServiceWorkerRegistration,
        application_server_key: &[u8],
    ) -> Result<PushSubscription, PlatformError>;

    async fn unsubscribe(
        &self,
        registration: &ServiceWorkerRegistration,
        subscription: &PushSubscription,
    ) -> Result<(), PlatformError>;

    /// Whether the tab is in the foreground.
    fn is_visible(&self) -> bool;

    async fn show_notification(&self, notification: PlatformNotification)
    -> Result<(), PlatformError>;
}

/// Server-held subscription state, per user.
#[async_trait]
pub trait SubscriptionBackend: Send + Sync {
    async fn fetch_record(&self, user: &str) -> Result<ServerRecord, BackendError>;

    /// Insert or replace the subscription keyed by its endpoint.
    async fn upsert_subscription(
        &self,
        user: &str,
        subscription: &PushSubscription,
        enabled: bool,
    ) -> Result<(), BackendError>;

    /// Flip one endpoint's enabled flag. Returns `false` if the endpoint is
    /// not in the record.
    async fn set_subscription_enabled(
        &self,
        user: &str,
        endpoint: &str,
        enabled: bool,
    ) -> Result<bool, BackendError>;

    /// Persist the account-level preference flag.
    async fn set_account_preference(&self, user: &str, enabled: bool)
    -> Result<(), BackendError>;
}
