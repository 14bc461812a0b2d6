use super::error::{ClientError, ClientResult};
use crate::models::*;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// One method per backend function, plus the settings endpoints.
#[async_trait]
pub trait RemoteFunctions: Send + Sync {
    async fn validate_credentials(
        &self,
        request: &ValidateCredentialsRequest,
    ) -> ClientResult<ValidateCredentialsResponse>;

    async fn get_qr_token(&self, user_id: i64) -> ClientResult<QrTokenResponse>;

    async fn check_qr_status(&self, user_id: i64, token: &str) -> ClientResult<QrStatusResponse>;

    async fn send_code(&self, user_id: i64, phone: &str) -> ClientResult<SendCodeResponse>;

    async fn verify_code(&self, request: &VerifyCodeRequest) -> ClientResult<VerifyCodeResponse>;

    async fn get_telegram_credentials(
        &self,
        user_id: i64,
    ) -> ClientResult<TelegramCredentialsResponse>;

    async fn get_api_key(&self, user_id: i64, service: &str) -> ClientResult<ApiKeyResponse>;

    async fn store_api_key(
        &self,
        user_id: i64,
        service: &str,
        api_key: &str,
    ) -> ClientResult<SuccessResponse>;

    async fn fetch_messages(
        &self,
        request: &FetchMessagesRequest,
    ) -> ClientResult<FetchMessagesResponse>;

    async fn get_settings(&self) -> ClientResult<UserSettings>;

    async fn update_settings(&self, settings: &UserSettings) -> ClientResult<UserSettings>;

    async fn disconnect_telegram(&self) -> ClientResult<UserSettings>;
}

pub type SharedFunctions = Arc<dyn RemoteFunctions>;

/// `RemoteFunctions` over HTTP. Build one per backend and share it.
#[derive(Clone)]
pub struct HttpFunctions {
    http: Client,
    base_url: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl HttpFunctions {
    /// `base_url` includes the API prefix, e.g. `https://host/api/v1`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent("tgdash-client")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        if let Some(token) = self.access_token.read().await.as_deref() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        decode_envelope(status, &bytes)
    }

    async fn function<B, T>(&self, name: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.call(Method::POST, &format!("/functions/{name}"), Some(body))
            .await
    }
}

/// Unwraps `{success, data}`; an error envelope or a non-JSON body becomes
/// `ClientError::Remote`.
fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> ClientResult<T> {
    match serde_json::from_slice::<ApiResponse<T>>(body) {
        Ok(ApiResponse {
            success: true,
            data: Some(data),
            ..
        }) => Ok(data),
        Ok(ApiResponse {
            error: Some(error), ..
        }) => Err(ClientError::remote(error.code, error.message)),
        Ok(ApiResponse { message, .. }) => Err(ClientError::remote(
            format!("HTTP_{}", status.as_u16()),
            message.unwrap_or_else(|| "Empty response".to_string()),
        )),
        Err(e) if status.is_success() => Err(e.into()),
        Err(_) => Err(ClientError::remote(
            format!("HTTP_{}", status.as_u16()),
            String::from_utf8_lossy(body).into_owned(),
        )),
    }
}

#[async_trait]
impl RemoteFunctions for HttpFunctions {
    async fn validate_credentials(
        &self,
        request: &ValidateCredentialsRequest,
    ) -> ClientResult<ValidateCredentialsResponse> {
        self.function("validate-credentials", request).await
    }

    async fn get_qr_token(&self, user_id: i64) -> ClientResult<QrTokenResponse> {
        self.function("get-qr-token", &UserScopedRequest { user_id })
            .await
    }

    async fn check_qr_status(&self, user_id: i64, token: &str) -> ClientResult<QrStatusResponse> {
        let body = CheckQrStatusRequest {
            user_id,
            token: token.to_string(),
        };
        self.function("check-qr-status", &body).await
    }

    async fn send_code(&self, user_id: i64, phone: &str) -> ClientResult<SendCodeResponse> {
        let body = SendCodeRequest {
            phone: phone.to_string(),
            user_id,
        };
        self.function("send-code", &body).await
    }

    async fn verify_code(&self, request: &VerifyCodeRequest) -> ClientResult<VerifyCodeResponse> {
        self.function("verify-code", request).await
    }

    async fn get_telegram_credentials(
        &self,
        user_id: i64,
    ) -> ClientResult<TelegramCredentialsResponse> {
        self.function("get-telegram-credentials", &UserScopedRequest { user_id })
            .await
    }

    async fn get_api_key(&self, user_id: i64, service: &str) -> ClientResult<ApiKeyResponse> {
        let body = GetApiKeyRequest {
            user_id,
            service: service.to_string(),
        };
        self.function("get-api-key", &body).await
    }

    async fn store_api_key(
        &self,
        user_id: i64,
        service: &str,
        api_key: &str,
    ) -> ClientResult<SuccessResponse> {
        let body = StoreApiKeyRequest {
            user_id,
            service: service.to_string(),
            api_key: api_key.to_string(),
        };
        self.function("store-api-key", &body).await
    }

    async fn fetch_messages(
        &self,
        request: &FetchMessagesRequest,
    ) -> ClientResult<FetchMessagesResponse> {
        self.function("fetch-messages", request).await
    }

    async fn get_settings(&self) -> ClientResult<UserSettings> {
        self.call::<(), _>(Method::GET, "/settings", None).await
    }

    async fn update_settings(&self, settings: &UserSettings) -> ClientResult<UserSettings> {
        self.call(Method::PUT, "/settings", Some(settings)).await
    }

    async fn disconnect_telegram(&self) -> ClientResult<UserSettings> {
        self.call(Method::POST, "/settings/telegram/disconnect", Some(&json!({})))
            .await
    }
}
