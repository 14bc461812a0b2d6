//! Scriptable in-memory `RemoteFunctions` for client tests.

use super::error::{ClientError, ClientResult};
use super::functions::RemoteFunctions;
use crate::models::*;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Default)]
pub(crate) struct FakeFunctions {
    /// Every call fails with an HTTP-style error while set.
    pub offline: AtomicBool,
    pub qr_tokens_issued: AtomicU32,
    pub qr_checks: AtomicU32,
    qr_script: Mutex<VecDeque<ClientResult<QrStatusResponse>>>,
    qr_checks_by_token: Mutex<HashMap<String, u32>>,
    pub send_code_calls: AtomicU32,
    pub verify_calls: AtomicU32,
    verify_script: Mutex<VecDeque<ClientResult<VerifyCodeResponse>>>,
    pub settings: Mutex<Option<UserSettings>>,
    pub credentials: Mutex<TelegramCredentialsResponse>,
}

impl FakeFunctions {
    pub fn script_qr(&self, replies: Vec<ClientResult<QrStatusResponse>>) {
        self.qr_script.lock().unwrap().extend(replies);
    }

    pub fn script_verify(&self, replies: Vec<ClientResult<VerifyCodeResponse>>) {
        self.verify_script.lock().unwrap().extend(replies);
    }

    pub fn checks_for(&self, token: &str) -> u32 {
        self.qr_checks_by_token
            .lock()
            .unwrap()
            .get(token)
            .copied()
            .unwrap_or(0)
    }

    fn online(&self) -> ClientResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::remote("HTTP_503", "backend unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteFunctions for FakeFunctions {
    async fn validate_credentials(
        &self,
        request: &ValidateCredentialsRequest,
    ) -> ClientResult<ValidateCredentialsResponse> {
        self.online()?;
        if request.api_id.chars().all(|c| c.is_ascii_digit()) {
            Ok(ValidateCredentialsResponse {
                valid: true,
                message: "Credentials validated successfully".into(),
                session: None,
            })
        } else {
            Ok(ValidateCredentialsResponse::invalid("API ID must be numeric"))
        }
    }

    async fn get_qr_token(&self, _user_id: i64) -> ClientResult<QrTokenResponse> {
        self.online()?;
        let n = self.qr_tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("tok-{n}");
        Ok(QrTokenResponse {
            qr_url: format!("tg://login?token={token}"),
            token,
            expires_at: chrono::Utc::now(),
        })
    }

    async fn check_qr_status(&self, _user_id: i64, token: &str) -> ClientResult<QrStatusResponse> {
        self.qr_checks.fetch_add(1, Ordering::SeqCst);
        *self
            .qr_checks_by_token
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default() += 1;
        self.qr_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QrStatusResponse::pending()))
    }

    async fn send_code(&self, _user_id: i64, phone: &str) -> ClientResult<SendCodeResponse> {
        self.send_code_calls.fetch_add(1, Ordering::SeqCst);
        self.online()?;
        Ok(SendCodeResponse {
            success: true,
            phone_code_hash: format!("hash-{}", phone.len()),
        })
    }

    async fn verify_code(&self, request: &VerifyCodeRequest) -> ClientResult<VerifyCodeResponse> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.online()?;
        self.verify_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(VerifyCodeResponse {
                    success: true,
                    session_id: format!("session-for-{}", request.phone_code_hash),
                })
            })
    }

    async fn get_telegram_credentials(
        &self,
        _user_id: i64,
    ) -> ClientResult<TelegramCredentialsResponse> {
        self.online()?;
        Ok(self.credentials.lock().unwrap().clone())
    }

    async fn get_api_key(&self, _user_id: i64, _service: &str) -> ClientResult<ApiKeyResponse> {
        self.online()?;
        Ok(ApiKeyResponse { api_key: None })
    }

    async fn store_api_key(
        &self,
        _user_id: i64,
        _service: &str,
        _api_key: &str,
    ) -> ClientResult<SuccessResponse> {
        self.online()?;
        Ok(SuccessResponse { success: true })
    }

    async fn fetch_messages(
        &self,
        _request: &FetchMessagesRequest,
    ) -> ClientResult<FetchMessagesResponse> {
        self.online()?;
        Ok(FetchMessagesResponse {
            messages: Default::default(),
            mock_mode: true,
            successful_messages: 0,
        })
    }

    async fn get_settings(&self) -> ClientResult<UserSettings> {
        self.online()?;
        Ok(self.settings.lock().unwrap().clone().unwrap_or_default())
    }

    async fn update_settings(&self, settings: &UserSettings) -> ClientResult<UserSettings> {
        self.online()?;
        *self.settings.lock().unwrap() = Some(settings.clone());
        Ok(settings.clone())
    }

    async fn disconnect_telegram(&self) -> ClientResult<UserSettings> {
        self.online()?;
        let mut settings = self.settings.lock().unwrap().clone().unwrap_or_default();
        settings.telegram_integration_enabled = Some(false);
        *self.settings.lock().unwrap() = Some(settings.clone());
        Ok(settings)
    }
}
