//! Access token refresh with single-flight deduplication

use crate::client::ClientError;
use async_trait::async_trait;
use cartjo_core::SessionToken;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Exchanges a refresh token for a new token pair
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Perform one refresh call. `now_ms` is the issuance time used to turn
    /// the server's declared TTL into an absolute expiry.
    async fn refresh_token(
        &self,
        refresh_token: &str,
        now_ms: i64,
    ) -> Result<SessionToken, ClientError>;
}

type RefreshFuture = Shared<BoxFuture<'static, SessionToken>>;

/// Refresh attempt keyed by the access token it replaces
struct InFlight {
    access_token: String,
    future: RefreshFuture,
}

/// Decides on each session read whether the access token must be exchanged.
///
/// At most one refresh call is made per stale token: the first caller to
/// see it starts the exchange, every concurrent or later caller holding the
/// same token awaits that same attempt.
pub struct RefreshCoordinator {
    refresher: Arc<dyn TokenRefresher>,
    in_flight: Mutex<Option<InFlight>>,
}

impl RefreshCoordinator {
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            refresher,
            in_flight: Mutex::new(None),
        }
    }

    /// Return `token` unchanged while it is fresh; otherwise the refreshed
    /// token, or `token` tagged with the refresh error marker on failure.
    ///
    /// Refresh failures never surface as errors here; callers inspect
    /// [`SessionToken::is_errored`].
    pub async fn ensure_fresh(&self, token: SessionToken, now_ms: i64) -> SessionToken {
        if token.is_errored() || !token.needs_refresh(now_ms) {
            return token;
        }
        self.refresh_shared(token, now_ms).await
    }

    /// Whether an exchange for `access_token` has started and not finished
    pub fn is_refreshing(&self, access_token: &str) -> bool {
        let slot = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .is_some_and(|f| f.access_token == access_token && f.future.peek().is_none())
    }

    fn refresh_shared(&self, token: SessionToken, now_ms: i64) -> RefreshFuture {
        let mut slot = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(in_flight) = slot.as_ref() {
            if in_flight.access_token == token.access_token {
                debug!("joining in-flight token refresh");
                return in_flight.future.clone();
            }
        }

        let refresher = Arc::clone(&self.refresher);
        let access_token = token.access_token.clone();
        let future = async move {
            match refresher.refresh_token(&token.refresh_token, now_ms).await {
                Ok(fresh) => {
                    info!(expires = fresh.access_token_expires, "access token refreshed");
                    fresh
                }
                Err(e) => {
                    warn!(error = %e, "access token refresh failed");
                    token.into_errored()
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            access_token,
            future: future.clone(),
        });
        future
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionError;

    fn token(refresh: &str, expires: i64) -> SessionToken {
        SessionToken {
            access_token: format!("access-{refresh}"),
            refresh_token: refresh.to_string(),
            access_token_expires: expires,
            error: None,
        }
    }

    #[tokio::test]
    async fn test_fresh_token_makes_no_call() {
        let mut refresher = MockTokenRefresher::new();
        refresher.expect_refresh_token().times(0);
        let coordinator = RefreshCoordinator::new(Arc::new(refresher));

        let original = token("r1", 100_000);
        let result = coordinator.ensure_fresh(original.clone(), 69_999).await;
        assert_eq!(result, original);
    }

    #[tokio::test]
    async fn test_stale_token_refreshes_once() {
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh_token()
            .withf(|refresh, now| refresh == "r1" && *now == 70_000)
            .times(1)
            .returning(|_, now| Ok(token("r2", now + 900_000)));
        let coordinator = RefreshCoordinator::new(Arc::new(refresher));

        let result = coordinator.ensure_fresh(token("r1", 100_000), 70_000).await;
        assert_eq!(result.refresh_token, "r2");
        assert_eq!(result.access_token_expires, 970_000);
        assert!(!result.is_errored());
    }

    #[tokio::test]
    async fn test_failed_refresh_tags_token() {
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh_token()
            .times(1)
            .returning(|_, _| Err(SessionError::Unauthorized { status: 401 }.into()));
        let coordinator = RefreshCoordinator::new(Arc::new(refresher));

        let result = coordinator.ensure_fresh(token("r1", 0), 10).await;
        assert!(result.is_errored());
        assert_eq!(result.refresh_token, "r1");

        // An errored token is terminal; no second call is attempted.
        let again = coordinator.ensure_fresh(result, 20).await;
        assert!(again.is_errored());
    }

    #[tokio::test]
    async fn test_stale_caller_reuses_completed_refresh() {
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh_token()
            .times(1)
            .returning(|_, now| Ok(token("r2", now + 60_000)));
        let coordinator = RefreshCoordinator::new(Arc::new(refresher));

        let first = coordinator.ensure_fresh(token("r1", 0), 1_000).await;
        let second = coordinator.ensure_fresh(token("r1", 0), 2_000).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_next_expiry_window_refreshes_again() {
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh_token()
            .times(2)
            .returning(|refresh, now| {
                Ok(SessionToken {
                    access_token: format!("access-{now}"),
                    refresh_token: refresh.to_string(),
                    access_token_expires: now + 60_000,
                    error: None,
                })
            });
        let coordinator = RefreshCoordinator::new(Arc::new(refresher));

        let first = coordinator.ensure_fresh(token("r1", 0), 1_000).await;
        assert_eq!(first.access_token_expires, 61_000);
        assert!(!coordinator.is_refreshing(&first.access_token));

        let second = coordinator.ensure_fresh(first, 40_000).await;
        assert_eq!(second.access_token, "access-40000");
        assert_eq!(second.access_token_expires, 100_000);
    }
}
