use super::{ApiCredentials, MessageSource, ResolvedPeer, TelegramError, TelegramGateway};
use crate::models::TelegramMessage;
use crate::utils::generate_hex_token;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

pub const MOCK_MARKER: &str = "[mock]";

/// Code that makes the mock ask for a two-factor password.
pub const MOCK_PASSWORD_CODE: &str = "00000";

/// Simulated login backend. QR tokens only complete through the confirmation callback.
#[derive(Clone)]
pub struct MockGateway {
    accepted_code: String,
}

impl MockGateway {
    pub fn new(accepted_code: String) -> Self {
        Self { accepted_code }
    }
}

#[async_trait]
impl TelegramGateway for MockGateway {
    async fn check_credentials(
        &self,
        creds: &ApiCredentials,
    ) -> Result<Option<String>, TelegramError> {
        if creds.api_hash.trim().is_empty() {
            return Err(TelegramError::Upstream("API_ID_INVALID".into()));
        }
        Ok(Some(format!("mock-session-{}", creds.api_id)))
    }

    async fn start_qr_login(&self, _user_id: i64, token: Uuid) -> Result<String, TelegramError> {
        Ok(format!("tg://login?token={}", token.simple()))
    }

    async fn poll_qr_login(
        &self,
        _user_id: i64,
        _token: Uuid,
    ) -> Result<Option<String>, TelegramError> {
        Ok(None)
    }

    async fn send_code(
        &self,
        _creds: Option<&ApiCredentials>,
        _phone: &str,
    ) -> Result<String, TelegramError> {
        Ok(generate_hex_token(18))
    }

    async fn sign_in(
        &self,
        _creds: Option<&ApiCredentials>,
        phone: &str,
        _phone_code_hash: &str,
        code: &str,
    ) -> Result<String, TelegramError> {
        let code = code.trim();
        if code == MOCK_PASSWORD_CODE {
            return Err(TelegramError::SessionPasswordNeeded);
        }
        if code != self.accepted_code {
            return Err(TelegramError::PhoneCodeInvalid);
        }
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        Ok(format!("mock-session-{digits}"))
    }
}

/// Deterministic placeholder messages.
#[derive(Clone, Default)]
pub struct MockMessageSource;

impl MockMessageSource {
    pub fn new() -> Self {
        Self
    }

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn peer_id(handle: &str) -> i64 {
        // FNV-1a keeps ids stable across runs
        let mut hash: u64 = 0xcbf29ce484222325;
        for b in handle.to_ascii_lowercase().bytes() {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash >> 1) as i64
    }
}

#[async_trait]
impl MessageSource for MockMessageSource {
    async fn resolve_handle(
        &self,
        _session: Option<&str>,
        handle: &str,
    ) -> Result<ResolvedPeer, TelegramError> {
        let valid = !handle.is_empty()
            && handle.len() <= 32
            && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(TelegramError::UsernameNotFound(handle.to_string()));
        }
        Ok(ResolvedPeer {
            handle: handle.to_string(),
            peer_id: Self::peer_id(handle),
            title: Some(format!("@{handle}")),
        })
    }

    async fn recent_messages(
        &self,
        _session: Option<&str>,
        peer: &ResolvedPeer,
        limit: u32,
    ) -> Result<Vec<TelegramMessage>, TelegramError> {
        let anchor = Self::anchor();
        Ok((1..=i64::from(limit))
            .map(|n| TelegramMessage {
                id: n,
                text: format!("{MOCK_MARKER} Message #{n} from @{}", peer.handle),
                date: anchor - Duration::minutes(n * 15),
                sender: Some(peer.handle.clone()),
            })
            .collect())
    }

    fn is_mock(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sign_in_outcomes() {
        let gw = MockGateway::new("12345".into());
        assert_eq!(
            gw.sign_in(None, "+15550001111", "h", "12345").await.unwrap(),
            "mock-session-15550001111"
        );
        assert_eq!(
            gw.sign_in(None, "+15550001111", "h", "99999").await,
            Err(TelegramError::PhoneCodeInvalid)
        );
        assert_eq!(
            gw.sign_in(None, "+15550001111", "h", MOCK_PASSWORD_CODE).await,
            Err(TelegramError::SessionPasswordNeeded)
        );
    }

    #[tokio::test]
    async fn test_mock_messages_are_deterministic() {
        let source = MockMessageSource::new();
        let peer = source.resolve_handle(None, "alice").await.unwrap();
        let first = source.recent_messages(None, &peer, 3).await.unwrap();
        let second = source.recent_messages(None, &peer, 3).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].id, 1);
        assert!(first.iter().all(|m| m.text.contains(MOCK_MARKER)));
        assert!(first[0].date > first[1].date);
    }

    #[tokio::test]
    async fn test_mock_rejects_malformed_handles() {
        let source = MockMessageSource::new();
        assert!(source.resolve_handle(None, "no spaces").await.is_err());
        assert!(source.resolve_handle(None, "").await.is_err());
        assert_eq!(
            source.resolve_handle(None, "Bob").await.unwrap().peer_id,
            source.resolve_handle(None, "bob").await.unwrap().peer_id
        );
    }
}
