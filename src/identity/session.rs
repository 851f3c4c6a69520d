use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::authorizer::{resolve_role, Role};
use super::listeners::{Listeners, Subscription};
use super::principal::Identity;
use super::provider::AuthProvider;
use super::reporter::{ErrorReporter, TracingReporter};
use crate::config::PortalConfig;
use crate::error::{AppError, AppResult};
use crate::store::SharedDocumentStore;

/// Process-wide answer to "who is signed in and what may they access".
/// Readers always receive an owned snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub role: Role,
    pub resolving: bool,
}

impl SessionState {
    /// State before the provider has reported anything.
    pub fn initial() -> Self { Self { identity: None, role: Role::None, resolving: true } }

    pub fn signed_out() -> Self { Self { identity: None, role: Role::None, resolving: false } }
}

impl Default for SessionState {
    fn default() -> Self { Self::initial() }
}

struct Slot {
    // bumped on every provider notification; results tagged with an older value are stale
    attempt: u64,
    state: SessionState,
}

/// States waiting for observer delivery, in publish order.
#[derive(Default)]
struct Outbox {
    queue: VecDeque<SessionState>,
    // set while some caller is delivering; nested or concurrent publishes only enqueue
    draining: bool,
}

struct Inner {
    slot: Mutex<Slot>,
    outbox: Mutex<Outbox>,
    tx: watch::Sender<SessionState>,
    observers: Listeners<SessionState>,
    store: SharedDocumentStore,
    cfg: PortalConfig,
    reporter: Arc<dyn ErrorReporter>,
}

/// A resolution started by `begin` and not yet committed.
struct Attempt {
    seq: u64,
    identity: Identity,
}

/// Single writer of `SessionState`. Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct SessionResolver {
    inner: Arc<Inner>,
}

impl SessionResolver {
    pub fn new(store: SharedDocumentStore, cfg: PortalConfig) -> Self {
        Self::with_reporter(store, cfg, Arc::new(TracingReporter))
    }

    pub fn with_reporter(store: SharedDocumentStore, cfg: PortalConfig, reporter: Arc<dyn ErrorReporter>) -> Self {
        let (tx, _rx) = watch::channel(SessionState::initial());
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot { attempt: 0, state: SessionState::initial() }),
                outbox: Mutex::new(Outbox::default()),
                tx,
                observers: Listeners::default(),
                store,
                cfg,
                reporter,
            }),
        }
    }

    pub fn current_session(&self) -> SessionState { self.inner.slot.lock().state.clone() }

    /// Observer invoked with every published state.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(SessionState) + Send + Sync + 'static,
    {
        self.inner.observers.add(Arc::new(observer))
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> { self.inner.tx.subscribe() }

    /// Drive this resolver from a provider's notifications. Each notification claims its
    /// attempt number synchronously, in delivery order, and resolves on the current runtime.
    pub fn attach(&self, provider: &dyn AuthProvider) -> AppResult<Subscription> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::internal("no_runtime".to_string(), e.to_string()))?;
        let resolver = self.clone();
        Ok(provider.subscribe(Arc::new(move |identity: Option<Identity>| {
            if let Some(attempt) = resolver.begin(identity) {
                let r = resolver.clone();
                handle.spawn(async move {
                    r.complete(attempt).await;
                });
            }
        })))
    }

    /// Handle one provider notification to completion. Returns whether this
    /// notification's outcome is the published state (false when superseded).
    pub async fn on_provider_notification(&self, identity: Option<Identity>) -> bool {
        match self.begin(identity) {
            Some(attempt) => self.complete(attempt).await,
            None => true,
        }
    }

    /// Start a resolution attempt, superseding every earlier one.
    /// A sign-out is published immediately and needs no further work.
    fn begin(&self, identity: Option<Identity>) -> Option<Attempt> {
        let attempt = {
            let mut slot = self.inner.slot.lock();
            slot.attempt += 1;
            let seq = slot.attempt;
            let (state, attempt) = match identity {
                None => (SessionState::signed_out(), None),
                Some(identity) => (
                    SessionState { identity: Some(identity.clone()), role: Role::None, resolving: true },
                    Some(Attempt { seq, identity }),
                ),
            };
            self.publish_locked(&mut slot, state);
            attempt
        };
        match &attempt {
            Some(a) => debug!(target: "alumni_portal::session", "session.resolve begin attempt={} id={}", a.seq, a.identity.id),
            None => info!(target: "alumni_portal::session", "session.signed_out"),
        }
        self.deliver();
        attempt
    }

    async fn complete(&self, attempt: Attempt) -> bool {
        let (role, failure) = match resolve_role(self.inner.store.as_ref(), &self.inner.cfg, &attempt.identity.id).await {
            Ok(role) => (role, None),
            Err(err) => (Role::None, Some(err)),
        };
        let seq = attempt.seq;
        let id = attempt.identity.id.clone();
        let committed = self.commit(seq, SessionState { identity: Some(attempt.identity), role, resolving: false });
        if !committed {
            return false;
        }
        // only the attempt that reached the published state reports its failure
        if let Some(err) = failure {
            self.inner.reporter.report("role resolution failed", &err);
        }
        if role == Role::None {
            warn!(target: "alumni_portal::session", "identity '{}' has no portal role", id);
        }
        true
    }

    fn commit(&self, seq: u64, next: SessionState) -> bool {
        {
            let mut slot = self.inner.slot.lock();
            if slot.attempt != seq {
                debug!(target: "alumni_portal::session", "session.resolve stale result discarded attempt={} current={}", seq, slot.attempt);
                return false;
            }
            info!(
                target: "alumni_portal::session",
                "session.resolved attempt={} id={} role={}",
                seq,
                next.identity.as_ref().map(|i| i.id.as_str()).unwrap_or("-"),
                next.role
            );
            self.publish_locked(&mut slot, next);
        }
        self.deliver();
        true
    }

    // Caller holds the slot lock, so the watch value and the outbox follow attempt order.
    fn publish_locked(&self, slot: &mut Slot, state: SessionState) {
        slot.state = state.clone();
        self.inner.tx.send_replace(state.clone());
        self.inner.outbox.lock().queue.push_back(state);
    }

    /// Hand queued states to observers, oldest first, outside the slot lock so observers may
    /// read `current_session` or trigger another notification. Only one caller delivers at a
    /// time; a publish made during delivery is picked up by the loop already running.
    fn deliver(&self) {
        {
            let mut outbox = self.inner.outbox.lock();
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }
        let mut guard = DrainGuard { outbox: &self.inner.outbox, armed: true };
        loop {
            let next = {
                let mut outbox = self.inner.outbox.lock();
                match outbox.queue.pop_front() {
                    Some(state) => state,
                    None => {
                        // cleared under the same lock as the empty check, so no enqueue is stranded
                        outbox.draining = false;
                        guard.armed = false;
                        return;
                    }
                }
            };
            self.inner.observers.emit(next);
        }
    }
}

// Releases the delivery flag if an observer panics mid-delivery.
struct DrainGuard<'a> {
    outbox: &'a Mutex<Outbox>,
    armed: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.outbox.lock().draining = false;
        }
    }
}
