//! In-memory collaborators.
//!
//! Stand-ins for the browser push API and the backend, with switches for
//! injecting failures. Used by the test suites and the `simulate` command.

use super::platform::{
    BackendError, PlatformError, PlatformNotification, PushPlatform, ServiceWorkerRegistration,
    SubscriptionBackend,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use superfeed_model::{Permission, PushSubscription, ServerRecord};
use uuid::Uuid;

#[derive(Debug)]
struct PlatformState {
    supported: bool,
    permission: Permission,
    /// What the permission prompt resolves to.
    prompt_result: Permission,
    registration: Option<ServiceWorkerRegistration>,
    subscription: Option<PushSubscription>,
    visible: bool,
    fail_registration: bool,
    fail_subscribe: bool,
    fail_unsubscribe: bool,
    shown: Vec<PlatformNotification>,
    calls: Vec<String>,
}

/// Browser push API held in memory.
#[derive(Debug)]
pub struct MemoryPushPlatform {
    state: Mutex<PlatformState>,
}

impl Default for MemoryPushPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPushPlatform {
    /// A capable platform: permission not yet asked, prompt grants, tab
    /// visible, no service worker registered.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlatformState {
                supported: true,
                permission: Permission::Default,
                prompt_result: Permission::Granted,
                registration: None,
                subscription: None,
                visible: true,
                fail_registration: false,
                fail_subscribe: false,
                fail_unsubscribe: false,
                shown: Vec::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// A platform without service workers.
    pub fn unsupported() -> Self {
        let platform = Self::new();
        platform.state.lock().supported = false;
        platform
    }

    /// A subscription with a fresh endpoint.
    pub fn new_subscription() -> PushSubscription {
        PushSubscription {
            endpoint: format!("https://push.example/send/{}", Uuid::new_v4()),
            p256dh: Uuid::new_v4().simple().to_string(),
            auth: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn set_permission(&self, permission: Permission) {
        self.state.lock().permission = permission;
    }

    pub fn set_prompt_result(&self, permission: Permission) {
        self.state.lock().prompt_result = permission;
    }

    pub fn set_visible(&self, visible: bool) {
        self.state.lock().visible = visible;
    }

    /// Pretend a service worker and `subscription` already exist.
    pub fn install_subscription(&self, subscription: PushSubscription) {
        let mut state = self.state.lock();
        state.registration.get_or_insert_with(default_registration);
        state.subscription = Some(subscription);
    }

    pub fn fail_registration(&self, fail: bool) {
        self.state.lock().fail_registration = fail;
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.state.lock().fail_subscribe = fail;
    }

    pub fn fail_unsubscribe(&self, fail: bool) {
        self.state.lock().fail_unsubscribe = fail;
    }

    pub fn subscription(&self) -> Option<PushSubscription> {
        self.state.lock().subscription.clone()
    }

    /// Platform notifications shown so far.
    pub fn shown(&self) -> Vec<PlatformNotification> {
        self.state.lock().shown.clone()
    }

    /// Push-manager calls in order, as `op` or `op:endpoint`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }
}

fn default_registration() -> ServiceWorkerRegistration {
    ServiceWorkerRegistration {
        scope: "/".to_string(),
    }
}

#[async_trait]
impl PushPlatform for MemoryPushPlatform {
    fn is_supported(&self) -> bool {
        self.state.lock().supported
    }

    async fn permission(&self) -> Permission {
        self.state.lock().permission
    }

    async fn request_permission(&self) -> Result<Permission, PlatformError> {
        let mut state = self.state.lock();
        state.calls.push("request_permission".to_string());
        // A denied permission is sticky; the prompt is not shown again.
        if state.permission == Permission::Default {
            state.permission = state.prompt_result;
        }
        Ok(state.permission)
    }

    async fn service_worker(&self) -> Option<ServiceWorkerRegistration> {
        self.state.lock().registration.clone()
    }

    async fn register_service_worker(&self) -> Result<ServiceWorkerRegistration, PlatformError> {
        let mut state = self.state.lock();
        state.calls.push("register".to_string());
        if state.fail_registration {
            return Err(PlatformError::Unavailable("service worker script failed to load".into()));
        }
        Ok(state
            .registration
            .get_or_insert_with(default_registration)
            .clone())
    }

    async fn get_subscription(
        &self,
        _registration: &ServiceWorkerRegistration,
    ) -> Result<Option<PushSubscription>, PlatformError> {
        Ok(self.state.lock().subscription.clone())
    }

    async fn subscribe(
        &self,
        _registration: &ServiceWorkerRegistration,
        application_server_key: &[u8],
    ) -> Result<PushSubscription, PlatformError> {
        let mut state = self.state.lock();
        if state.fail_subscribe {
            state.calls.push("subscribe:failed".to_string());
            return Err(PlatformError::Failed("push service unreachable".into()));
        }
        if !state.permission.is_granted() {
            return Err(PlatformError::Failed("permission not granted".into()));
        }
        if application_server_key.is_empty() {
            return Err(PlatformError::Failed("empty application server key".into()));
        }
        // Like the browser: an existing subscription is handed back as is.
        let subscription = state
            .subscription
            .get_or_insert_with(Self::new_subscription)
            .clone();
        state.calls.push(format!("subscribe:{}", subscription.endpoint));
        Ok(subscription)
    }

    async fn unsubscribe(
        &self,
        _registration: &ServiceWorkerRegistration,
        subscription: &PushSubscription,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if state.fail_unsubscribe {
            state.calls.push("unsubscribe:failed".to_string());
            return Err(PlatformError::Failed("unsubscribe rejected".into()));
        }
        state.calls.push(format!("unsubscribe:{}", subscription.endpoint));
        if state
            .subscription
            .as_ref()
            .is_some_and(|s| s.endpoint == subscription.endpoint)
        {
            state.subscription = None;
        }
        Ok(())
    }

    fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    async fn show_notification(
        &self,
        notification: PlatformNotification,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if !state.permission.is_granted() {
            return Err(PlatformError::Failed("permission not granted".into()));
        }
        state.shown.push(notification);
        Ok(())
    }
}

/// Subscription records held in memory, per user.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<String, ServerRecord>>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored record for `user` (empty if none).
    pub fn record(&self, user: &str) -> ServerRecord {
        self.records.lock().get(user).cloned().unwrap_or_default()
    }

    pub fn insert_record(&self, user: &str, record: ServerRecord) {
        self.records.lock().insert(user.to_string(), record);
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    fn check_write(&self) -> Result<(), BackendError> {
        if *self.fail_writes.lock() {
            Err(BackendError::Network("connection reset".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SubscriptionBackend for MemoryBackend {
    async fn fetch_record(&self, user: &str) -> Result<ServerRecord, BackendError> {
        if *self.fail_reads.lock() {
            return Err(BackendError::Network("timed out".into()));
        }
        Ok(self.record(user))
    }

    async fn upsert_subscription(
        &self,
        user: &str,
        subscription: &PushSubscription,
        enabled: bool,
    ) -> Result<(), BackendError> {
        self.check_write()?;
        self.records
            .lock()
            .entry(user.to_string())
            .or_default()
            .upsert(subscription.clone(), enabled, Utc::now());
        Ok(())
    }

    async fn set_subscription_enabled(
        &self,
        user: &str,
        endpoint: &str,
        enabled: bool,
    ) -> Result<bool, BackendError> {
        self.check_write()?;
        Ok(self
            .records
            .lock()
            .get_mut(user)
            .is_some_and(|r| r.set_enabled(endpoint, enabled, Utc::now())))
    }

    async fn set_account_preference(&self, user: &str, enabled: bool) -> Result<(), BackendError> {
        self.check_write()?;
        self.records
            .lock()
            .entry(user.to_string())
            .or_default()
            .enabled = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_returns_existing_subscription() {
        let platform = MemoryPushPlatform::new();
        platform.set_permission(Permission::Granted);
        let reg = platform.register_service_worker().await.unwrap();

        let first = platform.subscribe(&reg, &[4; 65]).await.unwrap();
        let second = platform.subscribe(&reg, &[4; 65]).await.unwrap();
        assert_eq!(first, second);

        platform.unsubscribe(&reg, &first).await.unwrap();
        assert!(platform.subscription().is_none());
        let third = platform.subscribe(&reg, &[4; 65]).await.unwrap();
        assert_ne!(first.endpoint, third.endpoint);
    }

    #[tokio::test]
    async fn denied_permission_is_sticky() {
        let platform = MemoryPushPlatform::new();
        platform.set_permission(Permission::Denied);
        assert_eq!(platform.request_permission().await.unwrap(), Permission::Denied);
    }

    #[tokio::test]
    async fn backend_write_failures() {
        let backend = MemoryBackend::new();
        backend.fail_writes(true);
        assert!(backend.set_account_preference("u", true).await.is_err());
        assert!(!backend.record("u").enabled);

        backend.fail_writes(false);
        backend.set_account_preference("u", true).await.unwrap();
        assert!(backend.record("u").enabled);
        assert!(!backend.set_subscription_enabled("u", "https://missing", false).await.unwrap());
    }
}
