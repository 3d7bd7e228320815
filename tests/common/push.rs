//! Push collaborators and coordinator setup.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use superfeed::config::PushConfig;
use superfeed::push::memory::{MemoryBackend, MemoryPushPlatform};
use superfeed::push::{
    Notice, PlatformError, PlatformNotification, PushCoordinator, PushHandle, PushPlatform,
    ServiceWorkerRegistration,
};
use superfeed_model::{Permission, PushSubscription};
use tokio::sync::{Notify, mpsc};

/// A valid 65-byte P-256 public key, base64url.
pub const SERVER_KEY: &str =
    "BEl62iUYgUivxIkv69yViEuiBIa-Ib9-SkvMeAtA3LFgDzkrxZJjSgSnfckjBJuBkr3qBUYIHBQFLXYp5Nksh8U";

pub fn push_config() -> PushConfig {
    PushConfig {
        application_server_key: Some(SERVER_KEY.to_string()),
        ..PushConfig::default()
    }
}

/// A running coordinator plus the collaborators behind it.
pub struct PushFixture {
    pub platform: Arc<MemoryPushPlatform>,
    pub backend: Arc<MemoryBackend>,
    pub handle: PushHandle,
    pub notices: mpsc::Receiver<Notice>,
}

impl PushFixture {
    /// Spawn with `platform` prepared by the caller and `user` signed in.
    pub fn spawn_with(
        platform: MemoryPushPlatform,
        backend: MemoryBackend,
        user: Option<&str>,
    ) -> Self {
        let platform = Arc::new(platform);
        let backend = Arc::new(backend);
        let (handle, notices) = PushCoordinator::spawn(
            platform.clone(),
            backend.clone(),
            push_config(),
            user.map(str::to_string),
        );
        Self {
            platform,
            backend,
            handle,
            notices,
        }
    }

    pub fn spawn(user: &str) -> Self {
        Self::spawn_with(MemoryPushPlatform::new(), MemoryBackend::new(), Some(user))
    }

    /// Drain queued notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            out.push(notice);
        }
        out
    }

    /// Wait for the next notice, failing the test after a second.
    pub async fn next_notice(&mut self) -> Notice {
        tokio::time::timeout(Duration::from_secs(1), self.notices.recv())
            .await
            .expect("notice within timeout")
            .expect("notice channel open")
    }
}

/// Memory platform whose `subscribe` waits until the test opens the gate.
pub struct GatedPlatform {
    pub inner: MemoryPushPlatform,
    pub gate: Notify,
}

impl GatedPlatform {
    pub fn new(inner: MemoryPushPlatform) -> Self {
        Self {
            inner,
            gate: Notify::new(),
        }
    }
}

#[async_trait]
impl PushPlatform for GatedPlatform {
    fn is_supported(&self) -> bool {
        self.inner.is_supported()
    }

    async fn permission(&self) -> Permission {
        self.inner.permission().await
    }

    async fn request_permission(&self) -> Result<Permission, PlatformError> {
        self.inner.request_permission().await
    }

    async fn service_worker(&self) -> Option<ServiceWorkerRegistration> {
        self.inner.service_worker().await
    }

    async fn register_service_worker(&self) -> Result<ServiceWorkerRegistration, PlatformError> {
        self.inner.register_service_worker().await
    }

    async fn get_subscription(
        &self,
        registration: &ServiceWorkerRegistration,
    ) -> Result<Option<PushSubscription>, PlatformError> {
        self.inner.get_subscription(registration).await
    }

    async fn subscribe(
        &self,
        registration: &ServiceWorkerRegistration,
        application_server_key: &[u8],
    ) -> Result<PushSubscription, PlatformError> {
        self.gate.notified().await;
        self.inner.subscribe(registration, application_server_key).await
    }

    async fn unsubscribe(
        &self,
        registration: &ServiceWorkerRegistration,
        subscription: &PushSubscription,
    ) -> Result<(), PlatformError> {
        self.inner.unsubscribe(registration, subscription).await
    }

    fn is_visible(&self) -> bool {
        self.inner.is_visible()
    }

    async fn show_notification(
        &self,
        notification: PlatformNotification,
    ) -> Result<(), PlatformError> {
        self.inner.show_notification(notification).await
    }
}
