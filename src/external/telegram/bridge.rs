use super::{ApiCredentials, MessageSource, ResolvedPeer, TelegramError, TelegramGateway};
use crate::models::TelegramMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

/// Reply envelope of the bridge: `{ "ok": true, ... }` or `{ "ok": false, "error": "..." }`.
#[derive(Debug, Deserialize)]
struct BridgeReply<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionReply {
    #[serde(default)]
    session: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QrStartReply {
    qr_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QrPollReply {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeReply {
    phone_code_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInReply {
    session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReply {
    peer_id: i64,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    messages: Vec<TelegramMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsBody<'a> {
    api_id: &'a str,
    api_hash: &'a str,
}

impl<'a> From<&'a ApiCredentials> for CredentialsBody<'a> {
    fn from(c: &'a ApiCredentials) -> Self {
        Self {
            api_id: &c.api_id,
            api_hash: &c.api_hash,
        }
    }
}

/// HTTP client for the process that hosts the real Telegram client library.
#[derive(Clone)]
pub struct BridgeClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl BridgeClient {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        let http = Client::builder()
            .user_agent("tgdash-backend/bridge")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, TelegramError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.post(&url).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| {
            log::error!("Telegram bridge unreachable at {url}: {e}");
            TelegramError::Upstream(format!("Telegram bridge unreachable: {e}"))
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let reply: BridgeReply<T> = match serde_json::from_str(&text) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                log::error!("Telegram bridge {path} failed: HTTP {} {}", status.as_u16(), text);
                return Err(TelegramError::from_upstream(&text));
            }
            Err(e) => {
                return Err(TelegramError::Upstream(format!(
                    "Malformed bridge reply from {path}: {e}"
                )));
            }
        };

        if !reply.ok {
            let error = reply.error.unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            log::warn!("Telegram bridge {path} reported: {error}");
            return Err(TelegramError::from_upstream(&error));
        }

        reply
            .data
            .ok_or_else(|| TelegramError::Upstream(format!("Empty bridge reply from {path}")))
    }
}

#[derive(Clone)]
pub struct BridgeGateway {
    client: BridgeClient,
}

impl BridgeGateway {
    pub fn new(client: BridgeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TelegramGateway for BridgeGateway {
    async fn check_credentials(
        &self,
        creds: &ApiCredentials,
    ) -> Result<Option<String>, TelegramError> {
        let reply: SessionReply = self
            .client
            .call("/credentials/check", json!(CredentialsBody::from(creds)))
            .await?;
        Ok(reply.session)
    }

    async fn start_qr_login(&self, user_id: i64, token: Uuid) -> Result<String, TelegramError> {
        let reply: QrStartReply = self
            .client
            .call("/qr/start", json!({ "userId": user_id, "token": token }))
            .await?;
        Ok(reply.qr_url)
    }

    async fn poll_qr_login(
        &self,
        user_id: i64,
        token: Uuid,
    ) -> Result<Option<String>, TelegramError> {
        let reply: QrPollReply = self
            .client
            .call("/qr/poll", json!({ "userId": user_id, "token": token }))
            .await?;
        Ok(reply.session_id)
    }

    async fn send_code(
        &self,
        creds: Option<&ApiCredentials>,
        phone: &str,
    ) -> Result<String, TelegramError> {
        let reply: SendCodeReply = self
            .client
            .call(
                "/auth/send-code",
                json!({ "credentials": creds.map(CredentialsBody::from), "phone": phone }),
            )
            .await?;
        Ok(reply.phone_code_hash)
    }

    async fn sign_in(
        &self,
        creds: Option<&ApiCredentials>,
        phone: &str,
        phone_code_hash: &str,
        code: &str,
    ) -> Result<String, TelegramError> {
        let reply: SignInReply = self
            .client
            .call(
                "/auth/sign-in",
                json!({
                    "credentials": creds.map(CredentialsBody::from),
                    "phone": phone,
                    "phoneCodeHash": phone_code_hash,
                    "code": code,
                }),
            )
            .await?;
        Ok(reply.session_id)
    }
}

#[derive(Clone)]
pub struct BridgeMessageSource {
    client: BridgeClient,
}

impl BridgeMessageSource {
    pub fn new(client: BridgeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageSource for BridgeMessageSource {
    async fn resolve_handle(
        &self,
        session: Option<&str>,
        handle: &str,
    ) -> Result<ResolvedPeer, TelegramError> {
        let session = session.ok_or(TelegramError::NotConnected)?;
        let reply: ResolveReply = self
            .client
            .call("/peers/resolve", json!({ "session": session, "handle": handle }))
            .await?;
        Ok(ResolvedPeer {
            handle: handle.to_string(),
            peer_id: reply.peer_id,
            title: reply.title,
        })
    }

    async fn recent_messages(
        &self,
        session: Option<&str>,
        peer: &ResolvedPeer,
        limit: u32,
    ) -> Result<Vec<TelegramMessage>, TelegramError> {
        let session = session.ok_or(TelegramError::NotConnected)?;
        let reply: MessagesReply = self
            .client
            .call(
                "/messages/recent",
                json!({ "session": session, "peerId": peer.peer_id, "limit": limit }),
            )
            .await?;
        let mut messages = reply.messages;
        messages.truncate(limit as usize);
        Ok(messages)
    }

    fn is_mock(&self) -> bool {
        false
    }
}
