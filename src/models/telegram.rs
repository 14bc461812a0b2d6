use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub const ERROR_SENTINEL_PREFIX: &str = "Error";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCredentialsRequest {
    #[schema(example = "123456")]
    pub api_id: String,
    #[schema(example = "0123456789abcdef0123456789abcdef")]
    pub api_hash: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCredentialsResponse {
    pub valid: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl ValidateCredentialsResponse {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            session: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserScopedRequest {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrTokenResponse {
    pub token: String,
    /// URL to encode into the scannable QR image.
    pub qr_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckQrStatusRequest {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QrStatusResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QrStatusResponse {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn completed(session_id: String) -> Self {
        Self {
            success: true,
            session_id: Some(session_id),
            ..Self::default()
        }
    }

    pub fn expired() -> Self {
        Self {
            expired: Some(true),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmQrLoginRequest {
    pub token: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeRequest {
    #[schema(example = "+15551234567")]
    pub phone: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeResponse {
    pub success: bool,
    pub phone_code_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    pub phone: String,
    pub code: String,
    pub phone_code_hash: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub success: bool,
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelegramCredentialsResponse {
    pub api_id: Option<String>,
    pub api_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetApiKeyRequest {
    pub user_id: i64,
    pub service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreApiKeyRequest {
    pub user_id: i64,
    pub service: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchMessagesRequest {
    pub handles: Vec<String>,
    pub user_id: i64,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelegramMessage {
    pub id: i64,
    pub text: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

impl TelegramMessage {
    /// Placeholder standing in for a handle whose fetch failed.
    pub fn error_sentinel(reason: &str) -> Self {
        Self {
            id: 0,
            text: format!("{ERROR_SENTINEL_PREFIX}: {reason}"),
            date: Utc::now(),
            sender: None,
        }
    }

    pub fn is_error_sentinel(&self) -> bool {
        self.id == 0 && self.text.starts_with(ERROR_SENTINEL_PREFIX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchMessagesResponse {
    pub messages: BTreeMap<String, Vec<TelegramMessage>>,
    /// Set when simulated data stands in for a real Telegram client.
    pub mock_mode: bool,
    pub successful_messages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_sentinel() {
        let m = TelegramMessage::error_sentinel("USERNAME_NOT_OCCUPIED");
        assert_eq!(m.id, 0);
        assert_eq!(m.text, "Error: USERNAME_NOT_OCCUPIED");
        assert!(m.is_error_sentinel());

        let real = TelegramMessage {
            id: 42,
            text: "Error budget report".into(),
            date: Utc::now(),
            sender: None,
        };
        assert!(!real.is_error_sentinel());
    }

    #[test]
    fn test_qr_status_wire_shape() {
        let pending = serde_json::to_value(QrStatusResponse::pending()).unwrap();
        assert_eq!(pending, serde_json::json!({"success": false}));

        let done = serde_json::to_value(QrStatusResponse::completed("s1".into())).unwrap();
        assert_eq!(done, serde_json::json!({"success": true, "sessionId": "s1"}));

        let expired = serde_json::to_value(QrStatusResponse::expired()).unwrap();
        assert_eq!(expired, serde_json::json!({"success": false, "expired": true}));
    }
}
