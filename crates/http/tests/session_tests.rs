//! Session lifecycle, token refresh and invalidation

#![cfg(feature = "client")]

use async_trait::async_trait;
use cartjo_core::SessionToken;
use cartjo_http::client::{ApiClient, ClientError};
use cartjo_http::session::{
    ManualClock, SessionCodec, SessionContext, SessionError, SessionState, TokenRefresher,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOW: i64 = 1_700_000_000_000;

fn access_token(user: &str) -> String {
    encode(
        &Header::default(),
        &json!({"id": user, "email": format!("{user}@cartjo.com"), "role": "user"}),
        &EncodingKey::from_secret(b"backend"),
    )
    .unwrap()
}

fn token(user: &str, refresh: &str, expires: i64) -> SessionToken {
    SessionToken {
        access_token: access_token(user),
        refresh_token: refresh.to_string(),
        access_token_expires: expires,
        error: None,
    }
}

/// Refresher that counts calls and answers after a delay
struct SlowRefresher {
    calls: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl SlowRefresher {
    fn new(delay: Duration, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for SlowRefresher {
    async fn refresh_token(
        &self,
        refresh_token: &str,
        now_ms: i64,
    ) -> Result<SessionToken, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(SessionError::Unauthorized { status: 401 }.into());
        }
        Ok(SessionToken {
            access_token: access_token("u1"),
            refresh_token: format!("{refresh_token}-next"),
            access_token_expires: now_ms + 900_000,
            error: None,
        })
    }
}

fn context(refresher: Arc<SlowRefresher>, clock: &Arc<ManualClock>) -> Arc<SessionContext> {
    Arc::new(SessionContext::new(refresher).with_clock(clock.clone()))
}

#[tokio::test]
async fn test_valid_token_makes_no_refresh_call() {
    let refresher = SlowRefresher::new(Duration::ZERO, false);
    let clock = Arc::new(ManualClock::new(NOW));
    let session = context(refresher.clone(), &clock);

    let issued = token("u1", "r1", NOW + 60_000);
    let user = session.sign_in(issued.clone()).unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(session.state(), SessionState::Valid);

    assert_eq!(session.get_valid_token().await.unwrap(), issued.access_token);
    assert_eq!(refresher.calls(), 0);
}

#[tokio::test]
async fn test_near_expiry_refreshes_once_and_stores_result() {
    let refresher = SlowRefresher::new(Duration::ZERO, false);
    let clock = Arc::new(ManualClock::new(NOW));
    let session = context(refresher.clone(), &clock);
    session.sign_in(token("u1", "r1", NOW + 60_000)).unwrap();

    clock.advance(30_000);
    assert_eq!(session.state(), SessionState::NearExpiry);

    session.get_valid_token().await.unwrap();
    session.get_valid_token().await.unwrap();
    assert_eq!(refresher.calls(), 1);

    let stored = session.snapshot().unwrap();
    assert_eq!(stored.token.refresh_token, "r1-next");
    assert_eq!(stored.token.access_token_expires, NOW + 30_000 + 900_000);
    assert_eq!(session.state(), SessionState::Valid);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_refresh() {
    let refresher = SlowRefresher::new(Duration::from_millis(200), false);
    let clock = Arc::new(ManualClock::new(NOW));
    let session = context(refresher.clone(), &clock);
    session.sign_in(token("u1", "r1", NOW + 10_000)).unwrap();

    let callers: Vec<_> = (0..8)
        .map(|_| {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.get_valid_token().await })
        })
        .collect();

    tokio::task::yield_now().await;
    assert_eq!(session.state(), SessionState::Refreshing);

    let mut tokens = Vec::new();
    for caller in callers {
        tokens.push(caller.await.unwrap().unwrap());
    }
    assert_eq!(refresher.calls(), 1);
    assert!(tokens.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_failed_refresh_invalidates_and_notifies_once() {
    let refresher = SlowRefresher::new(Duration::ZERO, true);
    let clock = Arc::new(ManualClock::new(NOW));
    let session = context(refresher.clone(), &clock);
    session.sign_in(token("u1", "r1", NOW)).unwrap();

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    session.on_session_invalid(move |reason| {
        assert_eq!(reason, &SessionError::RefreshFailed);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(
        session.get_valid_token().await,
        Err(SessionError::RefreshFailed)
    );
    assert_eq!(
        session.get_valid_token().await,
        Err(SessionError::RefreshFailed)
    );
    assert_eq!(refresher.calls(), 1);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), SessionState::Invalid(SessionError::RefreshFailed));

    // A fresh sign-in leaves the terminal state
    session.sign_in(token("u1", "r2", NOW + 600_000)).unwrap();
    assert!(session.get_valid_token().await.is_ok());
}

#[tokio::test]
async fn test_session_past_max_age_is_invalid() {
    let refresher = SlowRefresher::new(Duration::ZERO, false);
    let clock = Arc::new(ManualClock::new(NOW));
    let session = Arc::new(
        SessionContext::new(refresher.clone())
            .with_clock(clock.clone())
            .with_max_age(Duration::from_secs(60)),
    );
    session.sign_in(token("u1", "r1", NOW + 3_600_000)).unwrap();

    clock.advance(60_000);
    assert_eq!(session.get_valid_token().await, Err(SessionError::Expired));
    assert_eq!(refresher.calls(), 0);
    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_reported_unauthorized_fires_listeners() {
    let refresher = SlowRefresher::new(Duration::ZERO, false);
    let clock = Arc::new(ManualClock::new(NOW));
    let session = context(refresher, &clock);
    session.sign_in(token("u1", "r1", NOW + 600_000)).unwrap();

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = session.on_session_invalid(move |reason| sink.lock().unwrap().push(reason.clone()));

    session.report_unauthorized(403);
    session.report_unauthorized(401);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![SessionError::Unauthorized { status: 403 }]
    );
    assert!(session.remove_listener(id));
    assert!(!session.remove_listener(id));
}

#[tokio::test]
async fn test_sign_out_does_not_notify() {
    let refresher = SlowRefresher::new(Duration::ZERO, false);
    let clock = Arc::new(ManualClock::new(NOW));
    let session = context(refresher, &clock);
    session.sign_in(token("u1", "r1", NOW + 600_000)).unwrap();

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    session.on_session_invalid(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    session.sign_out();
    assert_eq!(session.get_valid_token().await, Err(SessionError::SignedOut));
    assert_eq!(notified.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sealed_session_survives_restart() {
    let refresher = SlowRefresher::new(Duration::ZERO, false);
    let clock = Arc::new(ManualClock::new(NOW));
    let codec = SessionCodec::new("nextauth-secret", Duration::from_secs(3600)).unwrap();

    let first = context(refresher.clone(), &clock);
    first.sign_in(token("u1", "r1", NOW + 600_000)).unwrap();
    let sealed = codec.seal(&first.snapshot().unwrap()).unwrap();

    let second = context(refresher, &clock);
    second.restore(codec.open(&sealed).unwrap()).unwrap();
    assert_eq!(second.user().unwrap().id, "u1");

    let foreign = SessionCodec::new("other-secret", Duration::from_secs(3600)).unwrap();
    assert!(matches!(foreign.open(&sealed), Err(SessionError::Invalid(_))));
}

#[tokio::test]
async fn test_api_client_refreshes_through_backend() {
    let server = MockServer::start().await;
    let fresh_access = access_token("u1");

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({"refreshToken": "r1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isSuccess": true,
            "message": "",
            "data": {"accessToken": fresh_access, "refreshToken": "r2", "expiresIn": 900}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(ApiClient::new(server.uri()).unwrap());
    let clock = Arc::new(ManualClock::new(NOW));
    let session = SessionContext::new(client).with_clock(clock.clone());
    session.sign_in(token("u1", "r1", NOW + 5_000)).unwrap();

    assert_eq!(session.get_valid_token().await.unwrap(), fresh_access);
    let stored = session.snapshot().unwrap().token;
    assert_eq!(stored.refresh_token, "r2");
    assert_eq!(stored.access_token_expires, NOW + 900_000);
}
