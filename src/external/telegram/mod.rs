//! Seams to the Telegram client.
//!
//! The login flows go through [`TelegramGateway`], message reads through
//! [`MessageSource`]. Each has a deterministic mock implementation and a bridge
//! implementation that forwards to the process running the real Telegram client.
//! Which pair is used is decided by `telegram.mode` in the configuration.

pub mod bridge;
pub mod mock;

use crate::config::{TelegramConfig, TelegramMode};
use crate::error::{AppError, AppResult};
use crate::models::TelegramMessage;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub use bridge::{BridgeClient, BridgeGateway, BridgeMessageSource};
pub use mock::{MockGateway, MockMessageSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub api_id: String,
    pub api_hash: String,
}

/// A handle resolved to something messages can be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPeer {
    pub handle: String,
    pub peer_id: i64,
    pub title: Option<String>,
}

/// Failures reported by the Telegram side. Display output uses Telegram's own
/// error identifiers so they survive the trip to the dashboard.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TelegramError {
    #[error("PHONE_CODE_INVALID")]
    PhoneCodeInvalid,

    #[error("PHONE_CODE_EXPIRED")]
    PhoneCodeExpired,

    #[error("SESSION_PASSWORD_NEEDED")]
    SessionPasswordNeeded,

    #[error("PHONE_NUMBER_INVALID")]
    PhoneNumberInvalid,

    #[error("USERNAME_NOT_OCCUPIED: {0}")]
    UsernameNotFound(String),

    #[error("Telegram account is not connected")]
    NotConnected,

    #[error("{0}")]
    Upstream(String),
}

impl TelegramError {
    /// Classifies free-form upstream error text by the identifiers it contains.
    pub fn from_upstream(text: &str) -> Self {
        if text.contains("PHONE_CODE_INVALID") {
            TelegramError::PhoneCodeInvalid
        } else if text.contains("PHONE_CODE_EXPIRED") {
            TelegramError::PhoneCodeExpired
        } else if text.contains("SESSION_PASSWORD_NEEDED") {
            TelegramError::SessionPasswordNeeded
        } else if text.contains("PHONE_NUMBER_INVALID") {
            TelegramError::PhoneNumberInvalid
        } else {
            TelegramError::Upstream(text.to_string())
        }
    }
}

impl From<TelegramError> for AppError {
    fn from(e: TelegramError) -> Self {
        AppError::ExternalApiError(e.to_string())
    }
}

#[async_trait]
pub trait TelegramGateway: Send + Sync {
    /// Opens a connection with the given app credentials. Returns a session string
    /// when the backend hands one out.
    async fn check_credentials(
        &self,
        creds: &ApiCredentials,
    ) -> Result<Option<String>, TelegramError>;

    /// Registers a QR login token and returns the URL to encode in the QR image.
    async fn start_qr_login(&self, user_id: i64, token: Uuid) -> Result<String, TelegramError>;

    /// Returns the session id once the QR code has been accepted on a device.
    async fn poll_qr_login(&self, user_id: i64, token: Uuid)
    -> Result<Option<String>, TelegramError>;

    /// Requests a login code by SMS/Telegram. Returns the phone code hash.
    async fn send_code(
        &self,
        creds: Option<&ApiCredentials>,
        phone: &str,
    ) -> Result<String, TelegramError>;

    async fn sign_in(
        &self,
        creds: Option<&ApiCredentials>,
        phone: &str,
        phone_code_hash: &str,
        code: &str,
    ) -> Result<String, TelegramError>;
}

#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn resolve_handle(
        &self,
        session: Option<&str>,
        handle: &str,
    ) -> Result<ResolvedPeer, TelegramError>;

    /// Most recent messages first, at most `limit`.
    async fn recent_messages(
        &self,
        session: Option<&str>,
        peer: &ResolvedPeer,
        limit: u32,
    ) -> Result<Vec<TelegramMessage>, TelegramError>;

    /// True when results are simulated.
    fn is_mock(&self) -> bool;
}

pub type SharedGateway = Arc<dyn TelegramGateway>;
pub type SharedMessageSource = Arc<dyn MessageSource>;

/// Builds the gateway/message-source pair selected by configuration.
pub fn build_telegram(cfg: &TelegramConfig) -> AppResult<(SharedGateway, SharedMessageSource)> {
    match cfg.mode {
        TelegramMode::Mock => {
            log::warn!("Telegram running in mock mode; messages are simulated");
            Ok((
                Arc::new(MockGateway::new(cfg.mock_login_code.clone())),
                Arc::new(MockMessageSource::new()),
            ))
        }
        TelegramMode::Bridge => {
            if cfg.bridge_url.is_empty() {
                return Err(AppError::ConfigError(
                    "telegram.bridge_url is required in bridge mode".into(),
                ));
            }
            let client = BridgeClient::new(cfg.bridge_url.clone(), cfg.bridge_token.clone());
            log::info!("Telegram bridge at {}", cfg.bridge_url);
            Ok((
                Arc::new(BridgeGateway::new(client.clone())),
                Arc::new(BridgeMessageSource::new(client)),
            ))
        }
    }
}
