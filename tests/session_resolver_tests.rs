//! Session resolver integration tests: role resolution, stale-result discard,
//! error absorption and provider-driven notifications.

mod support;

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::json;

use alumni_portal::identity::{AuthProvider, Guard, LocalAuthProvider, Role, SessionResolver, SessionState, Verdict};
use alumni_portal::store::MemoryStore;
use alumni_portal::PortalConfig;

use support::{ident, CountingReporter, GatedStore};

fn seed() -> MemoryStore {
    MemoryStore::from_json(&json!({
        "administrators": { "admin1": { "name": "Registrar" }, "both": {} },
        "members": { "u1": { "fullName": "Ada Obi" }, "b": { "fullName": "Bola" }, "both": {} }
    }))
    .expect("seed")
}

fn resolver_with(store: MemoryStore) -> (SessionResolver, Arc<CountingReporter>) {
    let reporter = Arc::new(CountingReporter::default());
    let resolver = SessionResolver::with_reporter(Arc::new(store), PortalConfig::default(), reporter.clone());
    (resolver, reporter)
}

#[tokio::test]
async fn starts_resolving_with_no_identity() {
    let (resolver, _) = resolver_with(seed());
    assert_eq!(resolver.current_session(), SessionState::initial());
    assert!(resolver.current_session().resolving);
}

#[tokio::test]
async fn resolves_each_role() -> Result<()> {
    let (resolver, reporter) = resolver_with(seed());
    for (id, role) in [("admin1", Role::Admin), ("u1", Role::Member), ("ghost", Role::None), ("both", Role::Admin)] {
        assert!(resolver.on_provider_notification(Some(ident(id))).await);
        let s = resolver.current_session();
        assert_eq!(s.role, role, "identity {}", id);
        assert!(!s.resolving);
        assert_eq!(s.identity.as_ref().map(|i| i.id.as_str()), Some(id));
    }
    assert_eq!(reporter.count(), 0);
    Ok(())
}

#[tokio::test]
async fn repeated_notifications_are_idempotent() {
    let (resolver, _) = resolver_with(seed());
    resolver.on_provider_notification(Some(ident("u1"))).await;
    let first = resolver.current_session();
    resolver.on_provider_notification(Some(ident("u1"))).await;
    assert_eq!(resolver.current_session(), first);
}

#[tokio::test]
async fn member_scenario_on_dashboard() {
    let (resolver, _) = resolver_with(seed());
    let cfg = PortalConfig::default();
    resolver.on_provider_notification(Some(ident("u1"))).await;
    let s = resolver.current_session();
    assert_eq!(Guard::member(&cfg).evaluate(&s, Some("/dashboard")), Verdict::Allow);
    assert_eq!(
        Guard::admin(&cfg).evaluate(&s, Some("/admin/dashboard")),
        Verdict::Deny { redirect: "/admin/login".into(), from: Some("/admin/dashboard".into()) }
    );
}

#[tokio::test]
async fn sign_out_after_admin_session_denies_both_gates() {
    let (resolver, _) = resolver_with(seed());
    let cfg = PortalConfig::default();
    resolver.on_provider_notification(Some(ident("admin1"))).await;
    assert_eq!(resolver.current_session().role, Role::Admin);

    assert!(resolver.on_provider_notification(None).await);
    let s = resolver.current_session();
    assert_eq!(s, SessionState::signed_out());
    assert!(matches!(Guard::member(&cfg).evaluate(&s, None), Verdict::Deny { .. }));
    assert!(matches!(Guard::admin(&cfg).evaluate(&s, None), Verdict::Deny { .. }));
}

#[tokio::test]
async fn administrators_lookup_failure_resolves_none_and_reports_once() {
    let store = seed();
    store.fail_collection("administrators");
    let (resolver, reporter) = resolver_with(store);

    assert!(resolver.on_provider_notification(Some(ident("admin1"))).await);
    let s = resolver.current_session();
    assert_eq!(s.role, Role::None);
    assert!(!s.resolving);
    assert_eq!(reporter.count(), 1);
    let last = reporter.last.lock().clone().expect("reported error");
    assert_eq!(last.code_str(), "unavailable");

    let cfg = PortalConfig::default();
    assert!(matches!(Guard::admin(&cfg).evaluate(&s, None), Verdict::Deny { .. }));
}

#[tokio::test]
async fn later_identity_wins_when_earlier_lookup_finishes_last() -> Result<()> {
    let store = Arc::new(GatedStore::new(seed()));
    let gate = store.gate("administrators", "admin1");
    let resolver = SessionResolver::new(store.clone(), PortalConfig::default());

    let r1 = resolver.clone();
    let slow = tokio::spawn(async move { r1.on_provider_notification(Some(ident("admin1"))).await });
    gate.entered.notified().await;
    assert!(resolver.current_session().resolving);

    assert!(resolver.on_provider_notification(Some(ident("b"))).await);
    gate.release.notify_one();
    assert!(!slow.await?, "superseded attempt must not commit");

    let s = resolver.current_session();
    assert_eq!(s.identity.map(|i| i.id), Some("b".to_string()));
    assert_eq!(s.role, Role::Member);
    assert!(!s.resolving);
    Ok(())
}

#[tokio::test]
async fn later_identity_wins_when_earlier_lookup_finishes_first() -> Result<()> {
    let store = Arc::new(GatedStore::new(seed()));
    let gate = store.gate("administrators", "b");
    let resolver = SessionResolver::new(store.clone(), PortalConfig::default());

    // N1 (admin1) is already complete; N2 (b) is still in flight
    resolver.on_provider_notification(Some(ident("admin1"))).await;
    let r2 = resolver.clone();
    let pending = tokio::spawn(async move { r2.on_provider_notification(Some(ident("b"))).await });
    gate.entered.notified().await;
    let mid = resolver.current_session();
    assert!(mid.resolving, "the older admin result must not linger as resolved");
    assert_eq!(mid.role, Role::None);

    gate.release.notify_one();
    assert!(pending.await?);
    assert_eq!(resolver.current_session().role, Role::Member);
    Ok(())
}

#[tokio::test]
async fn sign_out_supersedes_in_flight_resolution() -> Result<()> {
    let store = Arc::new(GatedStore::new(seed()));
    let gate = store.gate("administrators", "admin1");
    let resolver = SessionResolver::new(store.clone(), PortalConfig::default());

    let r1 = resolver.clone();
    let slow = tokio::spawn(async move { r1.on_provider_notification(Some(ident("admin1"))).await });
    gate.entered.notified().await;
    resolver.on_provider_notification(None).await;
    gate.release.notify_one();
    assert!(!slow.await?);
    assert_eq!(resolver.current_session(), SessionState::signed_out());
    Ok(())
}

#[tokio::test]
async fn stale_lookup_errors_are_not_reported() -> Result<()> {
    let store = Arc::new(GatedStore::new(seed()));
    let gate = store.gate("administrators", "admin1");
    let reporter = Arc::new(CountingReporter::default());
    let resolver = SessionResolver::with_reporter(store.clone(), PortalConfig::default(), reporter.clone());

    let r1 = resolver.clone();
    let slow = tokio::spawn(async move { r1.on_provider_notification(Some(ident("admin1"))).await });
    gate.entered.notified().await;
    store.inner.fail_collection("administrators");
    resolver.on_provider_notification(None).await;
    gate.release.notify_one();

    assert!(!slow.await?);
    assert_eq!(reporter.count(), 0);
    assert_eq!(resolver.current_session(), SessionState::signed_out());
    Ok(())
}

#[tokio::test]
async fn observers_see_resolving_then_resolved() {
    let (resolver, _) = resolver_with(seed());
    let seen: Arc<Mutex<Vec<SessionState>>> = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let sub = resolver.subscribe(move |state| s.lock().push(state));

    resolver.on_provider_notification(Some(ident("u1"))).await;
    {
        let states = seen.lock();
        assert_eq!(states.len(), 2);
        assert!(states[0].resolving);
        assert_eq!(states[0].identity.as_ref().map(|i| i.id.as_str()), Some("u1"));
        assert_eq!(states[1].role, Role::Member);
        assert!(!states[1].resolving);
    }

    assert!(sub.unsubscribe());
    resolver.on_provider_notification(None).await;
    assert_eq!(seen.lock().len(), 2);
}

#[tokio::test]
async fn observer_sign_out_during_delivery_leaves_observers_on_latest_state() -> Result<()> {
    let (resolver, _) = resolver_with(seed());
    let provider = Arc::new(LocalAuthProvider::new());
    let _attached = resolver.attach(provider.as_ref())?;

    // bounce identities that resolved to no role, from inside observer delivery
    let p = provider.clone();
    let _bouncer = resolver.subscribe(move |s: SessionState| {
        if !s.resolving && s.identity.is_some() && s.role == Role::None {
            let _ = p.sign_out();
        }
    });
    let seen: Arc<Mutex<Vec<SessionState>>> = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let _recorder = resolver.subscribe(move |state| s.lock().push(state));

    resolver.on_provider_notification(Some(ident("ghost"))).await;

    assert_eq!(resolver.current_session(), SessionState::signed_out());
    let states = seen.lock().clone();
    assert_eq!(states.len(), 3, "resolving, resolved, signed out: {:?}", states);
    assert!(states[0].resolving);
    assert_eq!(states[1].identity.as_ref().map(|i| i.id.as_str()), Some("ghost"));
    assert!(!states[1].resolving);
    assert_eq!(states.last(), Some(&SessionState::signed_out()));
    Ok(())
}

#[tokio::test]
async fn lookup_failure_is_reported_after_its_state_is_published() {
    let store = seed();
    store.fail_collection("members");
    let (resolver, reporter) = resolver_with(store);
    let counts: Arc<Mutex<Vec<(bool, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let c = counts.clone();
    let r = reporter.clone();
    let _sub = resolver.subscribe(move |state| c.lock().push((state.resolving, r.count())));

    assert!(resolver.on_provider_notification(Some(ident("u1"))).await);
    assert_eq!(*counts.lock(), vec![(true, 0), (false, 0)]);
    assert_eq!(reporter.count(), 1);
}

#[tokio::test]
async fn attached_provider_drives_resolution() -> Result<()> {
    let (resolver, _) = resolver_with(seed());
    let provider = LocalAuthProvider::new();
    let sub = resolver.attach(&provider)?;
    // the immediate callback carries "no session"
    assert_eq!(resolver.current_session(), SessionState::signed_out());

    provider.restore(ident("u1"));
    let mut rx = resolver.watch();
    let s = rx.wait_for(|s| !s.resolving).await?.clone();
    assert_eq!(s.role, Role::Member);

    provider.sign_out()?;
    assert_eq!(resolver.current_session(), SessionState::signed_out());

    // rapid sign-in A, sign-out, sign-in B: only B's resolution may stick
    provider.restore(ident("admin1"));
    provider.sign_out()?;
    provider.restore(ident("b"));
    let s = rx.wait_for(|s| !s.resolving).await?.clone();
    assert_eq!(s.identity.map(|i| i.id), Some("b".to_string()));
    assert_eq!(s.role, Role::Member);

    assert!(sub.unsubscribe());
    assert_eq!(provider.subscriber_count(), 0);
    Ok(())
}

#[tokio::test]
async fn failed_restore_reads_as_signed_out() -> Result<()> {
    let (resolver, _) = resolver_with(seed());
    let provider = LocalAuthProvider::new();
    provider.restore(ident("admin1"));
    let _sub = resolver.attach(&provider)?;
    let mut rx = resolver.watch();
    assert_eq!(rx.wait_for(|s| !s.resolving).await?.role, Role::Admin);

    provider.fail_restore("refresh token revoked");
    assert_eq!(resolver.current_session(), SessionState::signed_out());
    Ok(())
}

#[test]
fn attach_outside_runtime_is_an_error() {
    let (resolver, _) = resolver_with(seed());
    let provider = LocalAuthProvider::new();
    let err = resolver.attach(&provider).unwrap_err();
    assert_eq!(err.code_str(), "no_runtime");
}
