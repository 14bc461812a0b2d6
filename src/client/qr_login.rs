use super::error::ClientResult;
use super::functions::SharedFunctions;
use crate::models::{QrStatusResponse, QrTokenResponse};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Polling limits for one QR token.
///
/// The default gives up after about two minutes, well before the server
/// invalidates the token (five minutes by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrPollPolicy {
    pub interval: Duration,
    /// Hard cap on status checks per token.
    pub max_attempts: u32,
    /// Polling stops once this many errors in a row have been exceeded.
    pub max_consecutive_errors: u32,
}

impl Default for QrPollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
            max_consecutive_errors: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrLoginState {
    Idle,
    Waiting {
        token: String,
        qr_url: String,
        attempts: u32,
        consecutive_errors: u32,
    },
    Connected {
        session_id: String,
    },
    Expired,
    Failed {
        message: String,
    },
}

impl QrLoginState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QrLoginState::Connected { .. } | QrLoginState::Expired | QrLoginState::Failed { .. }
        )
    }

    /// Applies one status check to a waiting state. Any other state is
    /// returned unchanged.
    pub fn after_poll(
        self,
        outcome: Result<QrStatusResponse, String>,
        policy: &QrPollPolicy,
    ) -> QrLoginState {
        let (token, qr_url, attempts, consecutive_errors) = match self {
            QrLoginState::Waiting {
                token,
                qr_url,
                attempts,
                consecutive_errors,
            } => (token, qr_url, attempts + 1, consecutive_errors),
            other => return other,
        };

        let error = match outcome {
            Ok(QrStatusResponse {
                success: true,
                session_id: Some(session_id),
                ..
            }) => return QrLoginState::Connected { session_id },
            Ok(QrStatusResponse {
                expired: Some(true),
                ..
            }) => return QrLoginState::Expired,
            Ok(QrStatusResponse {
                error: Some(message),
                ..
            }) => Some(message),
            Ok(_) => None,
            Err(message) => Some(message),
        };

        let consecutive_errors = match error {
            Some(message) => {
                let errors = consecutive_errors + 1;
                if errors > policy.max_consecutive_errors {
                    return QrLoginState::Failed { message };
                }
                errors
            }
            None => 0,
        };

        if attempts >= policy.max_attempts {
            return QrLoginState::Expired;
        }

        QrLoginState::Waiting {
            token,
            qr_url,
            attempts,
            consecutive_errors,
        }
    }
}

/// Drives the QR login for one user: fetches a token, then polls its status
/// in a background task until it connects, expires or fails.
///
/// At most one poll task runs at a time. It is aborted on `retry`, `cancel`
/// and drop.
pub struct QrLoginSession {
    functions: SharedFunctions,
    user_id: i64,
    policy: QrPollPolicy,
    state: watch::Sender<QrLoginState>,
    poller: Option<JoinHandle<()>>,
}

impl QrLoginSession {
    pub fn new(functions: SharedFunctions, user_id: i64, policy: QrPollPolicy) -> Self {
        let (state, _) = watch::channel(QrLoginState::Idle);
        Self {
            functions,
            user_id,
            policy,
            state,
            poller: None,
        }
    }

    pub fn state(&self) -> QrLoginState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QrLoginState> {
        self.state.subscribe()
    }

    /// Requests a fresh token and starts polling it. Any earlier poll task is
    /// cancelled first.
    pub async fn start(&mut self) -> ClientResult<QrTokenResponse> {
        self.stop_poller();

        let qr = match self.functions.get_qr_token(self.user_id).await {
            Ok(qr) => qr,
            Err(e) => {
                self.state.send_replace(QrLoginState::Failed {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        self.state.send_replace(QrLoginState::Waiting {
            token: qr.token.clone(),
            qr_url: qr.qr_url.clone(),
            attempts: 0,
            consecutive_errors: 0,
        });

        self.poller = Some(tokio::spawn(poll_until_done(
            self.functions.clone(),
            self.user_id,
            qr.token.clone(),
            self.policy,
            self.state.clone(),
        )));

        Ok(qr)
    }

    /// Regenerates the token, dropping whatever was being polled.
    pub async fn retry(&mut self) -> ClientResult<QrTokenResponse> {
        self.start().await
    }

    pub fn cancel(&mut self) {
        self.stop_poller();
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = QrLoginState::Idle;
            true
        });
    }

    /// Resolves once the flow is finished or idle.
    pub async fn wait(&self) -> QrLoginState {
        let mut rx = self.state.subscribe();
        match rx
            .wait_for(|s| s.is_terminal() || *s == QrLoginState::Idle)
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

impl Drop for QrLoginSession {
    fn drop(&mut self) {
        self.stop_poller();
    }
}

async fn poll_until_done(
    functions: SharedFunctions,
    user_id: i64,
    token: String,
    policy: QrPollPolicy,
    state: watch::Sender<QrLoginState>,
) {
    let mut ticker = tokio::time::interval(policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick fires immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let outcome = functions
            .check_qr_status(user_id, &token)
            .await
            .map_err(|e| e.to_string());
        if let Err(e) = &outcome {
            log::debug!("QR status check failed: {e}");
        }

        let mut finished = true;
        // Only touch the state while it still belongs to this token.
        state.send_if_modified(|current| {
            let ours = matches!(current, QrLoginState::Waiting { token: t, .. } if *t == token);
            if !ours {
                return false;
            }
            let next = std::mem::replace(current, QrLoginState::Idle).after_poll(outcome, &policy);
            finished = next.is_terminal();
            *current = next;
            true
        });

        if finished {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error::ClientError;
    use crate::client::testing::FakeFunctions;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use tokio::time::Instant;

    fn waiting(attempts: u32, consecutive_errors: u32) -> QrLoginState {
        QrLoginState::Waiting {
            token: "t".into(),
            qr_url: "tg://login?token=t".into(),
            attempts,
            consecutive_errors,
        }
    }

    fn session(fake: &Arc<FakeFunctions>) -> QrLoginSession {
        QrLoginSession::new(fake.clone(), 1, QrPollPolicy::default())
    }

    #[test]
    fn test_transitions() {
        let policy = QrPollPolicy::default();

        assert_eq!(
            waiting(0, 0).after_poll(Ok(QrStatusResponse::pending()), &policy),
            waiting(1, 0)
        );
        assert_eq!(
            waiting(3, 0).after_poll(Ok(QrStatusResponse::completed("s".into())), &policy),
            QrLoginState::Connected {
                session_id: "s".into()
            }
        );
        assert_eq!(
            waiting(3, 2).after_poll(Ok(QrStatusResponse::expired()), &policy),
            QrLoginState::Expired
        );
        assert_eq!(
            waiting(3, 4).after_poll(Err("timeout".into()), &policy),
            waiting(4, 5)
        );
        assert_eq!(
            waiting(3, 4).after_poll(Ok(QrStatusResponse::failed("Unknown QR token")), &policy),
            waiting(4, 5)
        );
        // a clean poll resets the error streak
        assert_eq!(
            waiting(5, 10).after_poll(Ok(QrStatusResponse::pending()), &policy),
            waiting(6, 0)
        );
        assert_eq!(
            waiting(5, 10).after_poll(Err("boom".into()), &policy),
            QrLoginState::Failed {
                message: "boom".into()
            }
        );
        assert_eq!(
            waiting(59, 0).after_poll(Ok(QrStatusResponse::pending()), &policy),
            QrLoginState::Expired
        );
        assert_eq!(
            QrLoginState::Expired.after_poll(Ok(QrStatusResponse::pending()), &policy),
            QrLoginState::Expired
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_after_pending_polls() {
        let fake = Arc::new(FakeFunctions::default());
        fake.script_qr(vec![
            Ok(QrStatusResponse::pending()),
            Ok(QrStatusResponse::pending()),
            Ok(QrStatusResponse::completed("sess-1".into())),
        ]);

        let mut session = session(&fake);
        let qr = session.start().await.unwrap();
        assert!(qr.qr_url.contains(&qr.token));

        let state = session.wait().await;
        assert_eq!(
            state,
            QrLoginState::Connected {
                session_id: "sess-1".into()
            }
        );
        assert_eq!(fake.qr_checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_sixty_checks() {
        let fake = Arc::new(FakeFunctions::default());
        let mut session = session(&fake);

        let started = Instant::now();
        session.start().await.unwrap();
        assert_eq!(session.wait().await, QrLoginState::Expired);

        assert_eq!(fake.qr_checks.load(Ordering::SeqCst), 60);
        assert_eq!(started.elapsed(), Duration::from_secs(120));

        // nothing keeps polling afterwards
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fake.qr_checks.load(Ordering::SeqCst), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_after_more_than_ten_errors_in_a_row() {
        let fake = Arc::new(FakeFunctions::default());
        fake.script_qr(
            (1..=11)
                .map(|i| Err(ClientError::remote("HTTP_503", format!("outage {i}"))))
                .collect(),
        );

        let mut session = session(&fake);
        session.start().await.unwrap();
        assert_eq!(
            session.wait().await,
            QrLoginState::Failed {
                message: "outage 11".into()
            }
        );
        assert_eq!(fake.qr_checks.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_streak_resets_on_clean_poll() {
        let fake = Arc::new(FakeFunctions::default());
        let mut script: Vec<ClientResult<QrStatusResponse>> = Vec::new();
        script.extend((0..10).map(|_| Err(ClientError::remote("HTTP_500", "flaky"))));
        script.push(Ok(QrStatusResponse::pending()));
        script.extend((0..10).map(|_| Err(ClientError::remote("HTTP_500", "flaky"))));
        script.push(Ok(QrStatusResponse::completed("sess-2".into())));
        fake.script_qr(script);

        let mut session = session(&fake);
        session.start().await.unwrap();
        assert_eq!(
            session.wait().await,
            QrLoginState::Connected {
                session_id: "sess-2".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_replaces_token_and_poller() {
        let fake = Arc::new(FakeFunctions::default());
        let mut session = session(&fake);

        let first = session.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fake.checks_for(&first.token), 2);

        let second = session.retry().await.unwrap();
        assert_ne!(first.token, second.token);
        assert!(matches!(
            session.state(),
            QrLoginState::Waiting { ref token, attempts: 0, .. } if *token == second.token
        ));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(fake.checks_for(&first.token), 2);
        assert_eq!(fake.checks_for(&second.token), 3);
        assert_eq!(fake.qr_tokens_issued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_stop_polling() {
        let fake = Arc::new(FakeFunctions::default());

        let mut session = session(&fake);
        session.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        session.cancel();
        assert_eq!(session.state(), QrLoginState::Idle);

        let mut other = QrLoginSession::new(fake.clone(), 1, QrPollPolicy::default());
        other.start().await.unwrap();
        drop(other);

        let checks = fake.qr_checks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fake.qr_checks.load(Ordering::SeqCst), checks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_request_failure() {
        let fake = Arc::new(FakeFunctions::default());
        fake.offline.store(true, Ordering::SeqCst);

        let mut session = session(&fake);
        assert!(session.start().await.is_err());
        assert!(matches!(session.state(), QrLoginState::Failed { .. }));
        assert_eq!(fake.qr_checks.load(Ordering::SeqCst), 0);
    }
}
