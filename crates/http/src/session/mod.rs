//! Session context: token store, refresh coordination and invalidation
//!
//! A [`SessionContext`] is created once and shared as an `Arc` by every
//! component that needs an access token. Components never read tokens from
//! anywhere else; they ask [`SessionContext::get_valid_token`], which refreshes
//! a near-expiry token on the way and reports a dead session as a
//! [`SessionError`].
//!
//! ```text
//! SignedOut --sign_in--> Valid --(expiry - 30s)--> NearExpiry --> Refreshing
//!                          ^                                          |
//!                          +----------------- ok ---------------------+
//!                                                                     | err
//!                                              Invalid <--------------+
//! ```
//!
//! `Invalid` is terminal until the next [`SessionContext::sign_in`].

pub mod claims;
pub mod clock;
pub mod codec;
pub mod error;
pub mod refresh;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::SessionCodec;
pub use error::SessionError;
pub use refresh::{RefreshCoordinator, TokenRefresher};

use cartjo_core::config::DEFAULT_SESSION_MAX_AGE_SECS;
use cartjo_core::{CartConfig, SessionToken, UserClaims};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything the token store holds for a signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub token: SessionToken,
    pub user: UserClaims,
    /// Epoch milliseconds of the sign-in that created this session
    pub signed_in_at: i64,
}

/// Observable session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    Valid,
    NearExpiry,
    Refreshing,
    Invalid(SessionError),
}

/// Handle returned by [`SessionContext::on_session_invalid`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&SessionError) + Send + Sync>;

enum Store {
    SignedOut,
    Active(SessionData),
    Invalid(SessionError),
}

/// Shared session for one signed-in user
pub struct SessionContext {
    store: Mutex<Store>,
    coordinator: RefreshCoordinator,
    clock: Arc<dyn Clock>,
    max_age_ms: i64,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionContext {
    /// Signed-out context refreshing through `refresher`, on the wall clock
    /// and the default 30 day max age
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store: Mutex::new(Store::SignedOut),
            coordinator: RefreshCoordinator::new(refresher),
            clock: Arc::new(SystemClock),
            max_age_ms: Self::duration_ms(Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS)),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    pub fn from_config(refresher: Arc<dyn TokenRefresher>, config: &CartConfig) -> Self {
        Self::new(refresher).with_max_age(config.session_max_age())
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age_ms = Self::duration_ms(max_age);
        self
    }

    fn duration_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }

    /// Current time on the context's clock
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Start a session from a freshly issued token.
    ///
    /// Replaces any previous session, including an invalid one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Invalid`] when the access token carries no
    /// readable identity claims; the previous state is kept.
    pub fn sign_in(&self, token: SessionToken) -> Result<UserClaims, SessionError> {
        let user = claims::decode_claims(&token.access_token)?;
        let data = SessionData {
            token,
            user: user.clone(),
            signed_in_at: self.clock.now_ms(),
        };
        *lock(&self.store) = Store::Active(data);
        info!(user_id = %user.id, "session started");
        Ok(user)
    }

    /// Resume a previously persisted session
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Expired`] when the session is past its max age
    /// or [`SessionError::RefreshFailed`] when it was persisted after a failed
    /// refresh. Nothing is stored in either case.
    pub fn restore(&self, data: SessionData) -> Result<(), SessionError> {
        if self.is_past_max_age(&data, self.clock.now_ms()) {
            return Err(SessionError::Expired);
        }
        if data.token.is_errored() {
            return Err(SessionError::RefreshFailed);
        }
        debug!(user_id = %data.user.id, "session restored");
        *lock(&self.store) = Store::Active(data);
        Ok(())
    }

    /// End the session. Listeners are not notified.
    pub fn sign_out(&self) {
        *lock(&self.store) = Store::SignedOut;
        info!("session ended by sign-out");
    }

    /// Claims of the signed-in user
    pub fn user(&self) -> Option<UserClaims> {
        match &*lock(&self.store) {
            Store::Active(data) => Some(data.user.clone()),
            Store::SignedOut | Store::Invalid(_) => None,
        }
    }

    /// Copy of the stored session, for sealing
    pub fn snapshot(&self) -> Option<SessionData> {
        match &*lock(&self.store) {
            Store::Active(data) => Some(data.clone()),
            Store::SignedOut | Store::Invalid(_) => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(&*lock(&self.store), Store::Active(_))
    }

    /// Where the session stands at this instant, without side effects
    pub fn state(&self) -> SessionState {
        let now = self.clock.now_ms();
        match &*lock(&self.store) {
            Store::SignedOut => SessionState::SignedOut,
            Store::Invalid(reason) => SessionState::Invalid(reason.clone()),
            Store::Active(data) => {
                if self.is_past_max_age(data, now) {
                    SessionState::Invalid(SessionError::Expired)
                } else if data.token.is_errored() {
                    SessionState::Invalid(SessionError::RefreshFailed)
                } else if !data.token.needs_refresh(now) {
                    SessionState::Valid
                } else if self.coordinator.is_refreshing(&data.token.access_token) {
                    SessionState::Refreshing
                } else {
                    SessionState::NearExpiry
                }
            }
        }
    }

    /// Access token usable right now, refreshing it first when near expiry.
    ///
    /// Concurrent callers share one refresh call.
    ///
    /// # Errors
    ///
    /// Any [`SessionError`]: the session is signed out, was invalidated,
    /// outlived its max age or could not be refreshed.
    pub async fn get_valid_token(&self) -> Result<String, SessionError> {
        let current = match &*lock(&self.store) {
            Store::SignedOut => return Err(SessionError::SignedOut),
            Store::Invalid(reason) => return Err(reason.clone()),
            Store::Active(data) => data.clone(),
        };

        let now = self.clock.now_ms();
        if self.is_past_max_age(&current, now) {
            return Err(self.invalidate(SessionError::Expired));
        }
        if current.token.is_errored() {
            return Err(self.invalidate(SessionError::RefreshFailed));
        }

        let fresh = self.coordinator.ensure_fresh(current.token.clone(), now).await;
        if fresh.is_errored() {
            return Err(self.invalidate(SessionError::RefreshFailed));
        }

        if fresh != current.token {
            let mut store = lock(&self.store);
            // Write back only over the token that was refreshed; a sign-in or
            // an earlier waiter may have replaced it meanwhile.
            if let Store::Active(data) = &mut *store {
                if data.token.access_token == current.token.access_token {
                    data.token = fresh.clone();
                }
            }
        }
        Ok(fresh.access_token)
    }

    /// Record that the backend refused the access token
    ///
    /// Returns the resulting error for the caller to propagate.
    pub fn report_unauthorized(&self, status: u16) -> SessionError {
        self.invalidate(SessionError::Unauthorized { status })
    }

    /// Register a callback fired once each time the session becomes invalid
    pub fn on_session_invalid<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&SessionError) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).push((id, Arc::new(callback)));
        id
    }

    /// Unregister a callback; returns whether it was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn is_past_max_age(&self, data: &SessionData, now_ms: i64) -> bool {
        now_ms.saturating_sub(data.signed_in_at) >= self.max_age_ms
    }

    /// Move an active session to `Invalid` and notify listeners.
    ///
    /// Only the transition notifies; an already invalid session returns its
    /// original reason.
    fn invalidate(&self, reason: SessionError) -> SessionError {
        {
            let mut store = lock(&self.store);
            match &*store {
                Store::Active(_) => {}
                Store::Invalid(existing) => return existing.clone(),
                Store::SignedOut => return SessionError::SignedOut,
            }
            *store = Store::Invalid(reason.clone());
        }
        warn!(reason = %reason, "session invalidated");

        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&reason);
        }
        reason
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &self.state())
            .field("max_age_ms", &self.max_age_ms)
            .finish_non_exhaustive()
    }
}
