//! Push coordinator lifecycle: reconciliation, enable/disable sequencing,
//! failure handling and teardown.

mod common;

use chrono::Utc;
use common::push::push_config;
use common::{GatedPlatform, PushFixture};
use std::sync::Arc;
use std::time::Duration;
use superfeed::PushError;
use superfeed::push::memory::{MemoryBackend, MemoryPushPlatform};
use superfeed::push::{
    ChangeKind, ChannelActivity, Notice, NoticeLevel, PushCoordinator, PushMessage, PushState,
};
use superfeed_model::{Permission, ServerRecord};

fn granted_platform() -> MemoryPushPlatform {
    let platform = MemoryPushPlatform::new();
    platform.set_permission(Permission::Granted);
    platform
}

fn toasts(notices: &[Notice]) -> Vec<(NoticeLevel, String)> {
    notices
        .iter()
        .filter_map(|n| match n {
            Notice::Toast { level, message } => Some((*level, message.clone())),
            Notice::InApp(_) => None,
        })
        .collect()
}

#[tokio::test]
async fn new_user_starts_without_permission() {
    let f = PushFixture::spawn("asha");
    let status = f.handle.reconcile().await.unwrap();
    assert_eq!(status.state, PushState::NoPermission);
    assert!(!status.enabled);
    assert!(!status.has_active_subscription);
    assert_eq!(status.user.as_deref(), Some("asha"));
}

#[tokio::test]
async fn enable_prompts_registers_subscribes_and_persists() {
    let mut f = PushFixture::spawn("asha");

    let status = f.handle.toggle(true).await.unwrap();
    assert_eq!(status.state, PushState::Active);
    assert!(status.enabled);
    assert_eq!(status.permission, Permission::Granted);
    assert!(f.handle.enabled());

    let subscription = f.platform.subscription().unwrap();
    let calls = f.platform.calls();
    assert_eq!(calls[0], "request_permission");
    assert_eq!(calls[1], "register");
    assert_eq!(calls[2], format!("subscribe:{}", subscription.endpoint));

    let record = f.backend.record("asha");
    assert!(record.enabled);
    assert!(record.is_enabled(&subscription.endpoint));

    let toasts = toasts(&f.drain_notices());
    assert_eq!(toasts, vec![(NoticeLevel::Success, "Notifications enabled".to_string())]);
}

#[tokio::test]
async fn endpoint_disabled_on_server_is_not_active() {
    let platform = granted_platform();
    let subscription = MemoryPushPlatform::new_subscription();
    platform.install_subscription(subscription.clone());

    let backend = MemoryBackend::new();
    let mut record = ServerRecord::default();
    record.upsert(subscription, false, Utc::now());
    backend.insert_record("asha", record);

    let f = PushFixture::spawn_with(platform, backend, Some("asha"));
    let status = f.handle.reconcile().await.unwrap();
    assert!(!status.enabled);
    assert_ne!(status.state, PushState::Active);
    assert_eq!(status.state, PushState::PermissionGrantedNoSubscription);
    assert!(status.has_active_subscription);
}

#[tokio::test]
async fn enable_replaces_mismatched_subscription() {
    let platform = granted_platform();
    let old = MemoryPushPlatform::new_subscription();
    platform.install_subscription(old.clone());

    let f = PushFixture::spawn_with(platform, MemoryBackend::new(), Some("asha"));
    assert_eq!(f.handle.reconcile().await.unwrap().state, PushState::Orphaned);

    let status = f.handle.toggle(true).await.unwrap();
    assert_eq!(status.state, PushState::Active);

    let new = f.platform.subscription().unwrap();
    assert_ne!(new.endpoint, old.endpoint);

    let calls = f.platform.calls();
    let unsubscribed = calls
        .iter()
        .position(|c| *c == format!("unsubscribe:{}", old.endpoint))
        .unwrap();
    let subscribed = calls
        .iter()
        .position(|c| *c == format!("subscribe:{}", new.endpoint))
        .unwrap();
    assert!(unsubscribed < subscribed);

    let record = f.backend.record("asha");
    assert!(record.is_enabled(&new.endpoint));
    assert!(record.find(&old.endpoint).is_none());
}

#[tokio::test]
async fn enable_retires_own_previous_endpoint() {
    let platform = granted_platform();
    let old = MemoryPushPlatform::new_subscription();
    platform.install_subscription(old.clone());

    let backend = MemoryBackend::new();
    let mut record = ServerRecord::default();
    record.upsert(old.clone(), true, Utc::now());
    backend.insert_record("asha", record);

    let f = PushFixture::spawn_with(platform, backend, Some("asha"));
    assert_eq!(f.handle.reconcile().await.unwrap().state, PushState::Active);

    f.handle.toggle(true).await.unwrap();
    let new = f.platform.subscription().unwrap();
    let record = f.backend.record("asha");
    assert!(record.is_enabled(&new.endpoint));
    assert!(!record.is_enabled(&old.endpoint));
    assert!(record.find(&old.endpoint).is_some());
}

#[tokio::test]
async fn disable_without_subscription_persists_preference() {
    let backend = MemoryBackend::new();
    backend.insert_record(
        "asha",
        ServerRecord {
            enabled: true,
            subscriptions: Vec::new(),
        },
    );

    let f = PushFixture::spawn_with(granted_platform(), backend, Some("asha"));
    let status = f.handle.toggle(false).await.unwrap();
    assert!(!status.enabled);
    assert!(!f.backend.record("asha").enabled);
    assert!(f.platform.calls().is_empty());
}

#[tokio::test]
async fn disable_unsubscribes_and_keeps_permission() {
    let f = PushFixture::spawn("asha");
    f.handle.toggle(true).await.unwrap();
    let endpoint = f.platform.subscription().unwrap().endpoint;

    let status = f.handle.toggle(false).await.unwrap();
    assert_eq!(status.state, PushState::PermissionGrantedNoSubscription);
    assert_eq!(status.permission, Permission::Granted);
    assert!(!status.has_active_subscription);
    assert!(f.platform.subscription().is_none());

    let record = f.backend.record("asha");
    assert!(!record.enabled);
    assert!(!record.is_enabled(&endpoint));
}

#[tokio::test]
async fn denied_prompt_aborts_enable() {
    let platform = MemoryPushPlatform::new();
    platform.set_prompt_result(Permission::Denied);
    let mut f = PushFixture::spawn_with(platform, MemoryBackend::new(), Some("asha"));

    let err = f.handle.toggle(true).await.unwrap_err();
    assert!(matches!(err, PushError::PermissionDenied(Permission::Denied)));

    let status = f.handle.status();
    assert_eq!(status.state, PushState::NoPermission);
    assert!(!status.enabled);
    assert!(f.platform.calls().iter().all(|c| !c.starts_with("subscribe")));

    let toasts = toasts(&f.drain_notices());
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].0, NoticeLevel::Warning);
}

#[tokio::test]
async fn request_permission_updates_status() {
    let f = PushFixture::spawn("asha");
    assert_eq!(f.handle.request_permission().await.unwrap(), Permission::Granted);
    assert_eq!(f.handle.permission(), Permission::Granted);
    assert_eq!(
        f.handle.status().state,
        PushState::PermissionGrantedNoSubscription
    );
}

#[tokio::test]
async fn revoked_permission_is_picked_up_on_visibility_regain() {
    let f = PushFixture::spawn("asha");
    f.handle.toggle(true).await.unwrap();
    assert!(f.handle.enabled());

    f.platform.set_permission(Permission::Denied);
    let mut status_rx = f.handle.watch_status();
    f.handle.visibility_changed(false).await.unwrap();
    f.handle.visibility_changed(true).await.unwrap();

    let status = tokio::time::timeout(
        Duration::from_secs(1),
        status_rx.wait_for(|s| s.state == PushState::NoPermission),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert!(!status.enabled);
    // The browser still holds the subscription; permission caps it.
    assert!(status.has_active_subscription);
}

#[tokio::test]
async fn server_side_disable_is_picked_up_on_visibility_regain() {
    let f = PushFixture::spawn("asha");
    f.handle.toggle(true).await.unwrap();
    assert_eq!(f.handle.status().state, PushState::Active);

    // Another device turns this endpoint off.
    let subscription = f.platform.subscription().unwrap();
    let mut record = f.backend.record("asha");
    record.upsert(subscription, false, Utc::now());
    f.backend.insert_record("asha", record);

    let mut status_rx = f.handle.watch_status();
    f.handle.visibility_changed(false).await.unwrap();
    f.handle.visibility_changed(true).await.unwrap();

    let status = tokio::time::timeout(
        Duration::from_secs(1),
        status_rx.wait_for(|s| s.state != PushState::Active),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert!(!status.enabled);
    assert_eq!(status.state, PushState::PermissionGrantedNoSubscription);
    assert!(status.has_active_subscription);
}

#[tokio::test]
async fn other_account_sees_orphaned_subscription() {
    let f = PushFixture::spawn("asha");
    f.handle.toggle(true).await.unwrap();
    let asha_endpoint = f.platform.subscription().unwrap().endpoint;

    f.handle.auth_changed(Some("ravi".to_string())).await.unwrap();
    let status = f.handle.reconcile().await.unwrap();
    assert_eq!(status.state, PushState::Orphaned);
    assert!(!status.enabled);
    assert_eq!(status.user.as_deref(), Some("ravi"));

    let status = f.handle.toggle(true).await.unwrap();
    assert_eq!(status.state, PushState::Active);
    let ravi_endpoint = f.platform.subscription().unwrap().endpoint;
    assert_ne!(ravi_endpoint, asha_endpoint);
    assert!(f.backend.record("ravi").is_enabled(&ravi_endpoint));
    assert!(f.backend.record("ravi").find(&asha_endpoint).is_none());
}

#[tokio::test]
async fn sign_out_resets_local_state() {
    let f = PushFixture::spawn("asha");
    f.handle.toggle(true).await.unwrap();

    f.handle.signed_out().await.unwrap();
    let mut status_rx = f.handle.watch_status();
    let status = tokio::time::timeout(
        Duration::from_secs(1),
        status_rx.wait_for(|s| s.user.is_none()),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert!(!status.enabled);
    assert!(!status.has_active_subscription);

    assert!(matches!(
        f.handle.toggle(false).await,
        Err(PushError::NotSignedIn)
    ));
}

#[tokio::test]
async fn unsupported_platform_is_reported_once() {
    let mut f = PushFixture::spawn_with(
        MemoryPushPlatform::unsupported(),
        MemoryBackend::new(),
        Some("asha"),
    );

    assert!(matches!(f.handle.toggle(true).await, Err(PushError::Unsupported)));
    assert!(matches!(
        f.handle.request_permission().await,
        Err(PushError::Unsupported)
    ));
    let status = f.handle.reconcile().await.unwrap();
    assert_eq!(status.state, PushState::Unsupported);

    let toasts = toasts(&f.drain_notices());
    assert_eq!(toasts.len(), 1);
    assert!(toasts[0].1.contains("not supported"));
}

#[tokio::test]
async fn persist_failure_leaves_state_honest_and_retry_recovers() {
    let mut f = PushFixture::spawn_with(granted_platform(), MemoryBackend::new(), Some("asha"));
    f.backend.fail_writes(true);

    let err = f.handle.toggle(true).await.unwrap_err();
    assert!(matches!(err, PushError::Persist(_)));
    let status = f.handle.status();
    assert!(!status.enabled);
    assert!(status.has_active_subscription);
    assert_eq!(
        toasts(&f.drain_notices())[0].0,
        NoticeLevel::Error
    );

    f.backend.fail_writes(false);
    let status = f.handle.toggle(true).await.unwrap();
    assert_eq!(status.state, PushState::Active);
}

#[tokio::test]
async fn subscribe_failure_is_reported() {
    let platform = granted_platform();
    platform.fail_subscribe(true);
    let f = PushFixture::spawn_with(platform, MemoryBackend::new(), Some("asha"));

    let err = f.handle.toggle(true).await.unwrap_err();
    assert!(matches!(err, PushError::Subscribe(_)));
    assert_eq!(
        f.handle.status().state,
        PushState::PermissionGrantedNoSubscription
    );
    assert!(!f.backend.record("asha").enabled);
}

#[tokio::test]
async fn registration_failure_is_reported() {
    let platform = granted_platform();
    platform.fail_registration(true);
    let f = PushFixture::spawn_with(platform, MemoryBackend::new(), Some("asha"));

    let err = f.handle.toggle(true).await.unwrap_err();
    assert!(matches!(err, PushError::Registration(_)));
    assert!(f.platform.subscription().is_none());
}

#[tokio::test]
async fn not_signed_in_cannot_enable() {
    let f = PushFixture::spawn_with(granted_platform(), MemoryBackend::new(), None);
    assert!(matches!(
        f.handle.toggle(true).await,
        Err(PushError::NotSignedIn)
    ));
}

#[tokio::test]
async fn overlapping_toggle_is_busy() {
    let platform = Arc::new(GatedPlatform::new(granted_platform()));
    let (handle, _notices) = PushCoordinator::spawn(
        platform.clone(),
        Arc::new(MemoryBackend::new()),
        push_config(),
        Some("asha".to_string()),
    );

    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.toggle(true).await }
    });
    while !handle.is_busy() {
        tokio::task::yield_now().await;
    }

    assert!(matches!(handle.toggle(false).await, Err(PushError::Busy)));

    platform.gate.notify_one();
    let status = first.await.unwrap().unwrap();
    assert!(status.enabled);
    assert!(!handle.is_busy());
}

#[tokio::test]
async fn abandoned_toggle_stays_busy_until_the_coordinator_finishes() {
    let platform = Arc::new(GatedPlatform::new(granted_platform()));
    let (handle, _notices) = PushCoordinator::spawn(
        platform.clone(),
        Arc::new(MemoryBackend::new()),
        push_config(),
        Some("asha".to_string()),
    );

    // The caller gives up while enable is parked in subscribe.
    let abandoned = tokio::time::timeout(Duration::from_millis(50), handle.toggle(true)).await;
    assert!(abandoned.is_err());
    assert!(handle.is_busy());
    assert!(matches!(handle.toggle(false).await, Err(PushError::Busy)));

    platform.gate.notify_one();
    let mut status_rx = handle.watch_status();
    tokio::time::timeout(Duration::from_secs(1), status_rx.wait_for(|s| s.enabled))
        .await
        .unwrap()
        .unwrap();
    tokio::time::timeout(Duration::from_secs(1), async {
        while handle.is_busy() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let status = handle.toggle(false).await.unwrap();
    assert!(!status.enabled);
    assert!(platform.inner.subscription().is_none());
}

#[tokio::test]
async fn shutdown_stops_the_coordinator() {
    let f = PushFixture::spawn("asha");
    let before = f.handle.reconcile().await.unwrap();

    f.handle.shutdown();
    assert!(f.handle.is_shut_down());
    assert!(matches!(
        f.handle.toggle(true).await,
        Err(PushError::CoordinatorGone)
    ));
    assert!(matches!(
        f.handle.reconcile().await,
        Err(PushError::CoordinatorGone)
    ));
    assert!(f.handle.visibility_changed(true).await.is_err());
    assert_eq!(f.handle.status(), before);
    assert!(f.platform.calls().is_empty());
}

#[tokio::test]
async fn in_flight_operation_finishes_but_does_not_publish_after_shutdown() {
    let platform = Arc::new(GatedPlatform::new(granted_platform()));
    let backend = Arc::new(MemoryBackend::new());
    let (handle, _notices) = PushCoordinator::spawn(
        platform.clone(),
        backend.clone(),
        push_config(),
        Some("asha".to_string()),
    );
    let before = handle.reconcile().await.unwrap();

    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.toggle(true).await }
    });
    while !platform.inner.calls().iter().any(|c| c == "register") {
        tokio::task::yield_now().await;
    }

    handle.shutdown();
    platform.gate.notify_one();

    let result = first.await.unwrap().unwrap();
    assert!(result.enabled);
    assert!(backend.record("asha").enabled);
    assert_eq!(handle.status(), before);
}

#[tokio::test]
async fn visible_tab_gets_in_app_notice() {
    let mut f = PushFixture::spawn("asha");
    f.handle
        .realtime_activity(ChannelActivity {
            username: "pune_mp".to_string(),
            kind: ChangeKind::Update,
            preview: Some("Ward meeting at 6".to_string()),
        })
        .await
        .unwrap();

    match f.next_notice().await {
        Notice::InApp(n) => {
            assert_eq!(n.title, "pune_mp");
            assert_eq!(n.body, "Ward meeting at 6");
        }
        other => panic!("expected in-app notice, got {other:?}"),
    }
    assert!(f.platform.shown().is_empty());
}

#[tokio::test]
async fn hidden_tab_uses_platform_notification() {
    let mut f = PushFixture::spawn("asha");
    f.handle.toggle(true).await.unwrap();
    f.drain_notices();

    f.handle.visibility_changed(false).await.unwrap();
    f.handle
        .service_worker_message(PushMessage {
            body: "hello".to_string(),
            ..PushMessage::default()
        })
        .await
        .unwrap();
    f.handle.reconcile().await.unwrap();

    let shown = f.platform.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Superfeed");
    assert_eq!(shown[0].body, "hello");
    assert!(f.drain_notices().is_empty());
}

#[tokio::test]
async fn hidden_tab_without_permission_drops_notification() {
    let platform = MemoryPushPlatform::new();
    platform.set_visible(false);
    let mut f = PushFixture::spawn_with(platform, MemoryBackend::new(), Some("asha"));

    f.handle
        .service_worker_message(PushMessage {
            body: "hello".to_string(),
            ..PushMessage::default()
        })
        .await
        .unwrap();
    f.handle.reconcile().await.unwrap();

    assert!(f.platform.shown().is_empty());
    assert!(f.drain_notices().is_empty());
}
