use crate::entities::{
    QrLoginStatus, SessionMethod, qr_login_token_entity as qr_tokens,
    telegram_session_entity as sessions,
};
use crate::error::{AppError, AppResult};
use crate::external::{SharedGateway, TelegramError};
use crate::models::*;
use crate::services::{CredentialService, SettingsService};
use crate::utils::{generate_hex_token, validate_login_code, validate_phone};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// How long a requested phone code stays usable.
const PHONE_CODE_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
struct PendingPhoneLogin {
    phone: String,
    phone_code_hash: String,
    expires_at: DateTime<Utc>,
}

/// QR and phone/code login against the configured Telegram gateway.
#[derive(Clone)]
pub struct TelegramLoginService {
    pool: DatabaseConnection,
    gateway: SharedGateway,
    credentials: CredentialService,
    settings: SettingsService,
    qr_token_ttl: Duration,
    pending_phone_logins: Arc<RwLock<HashMap<i64, PendingPhoneLogin>>>,
}

impl TelegramLoginService {
    pub fn new(
        pool: DatabaseConnection,
        gateway: SharedGateway,
        credentials: CredentialService,
        settings: SettingsService,
        qr_token_ttl_secs: i64,
    ) -> Self {
        Self {
            pool,
            gateway,
            credentials,
            settings,
            qr_token_ttl: Duration::seconds(qr_token_ttl_secs),
            pending_phone_logins: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn create_qr_token(&self, user_id: i64) -> AppResult<QrTokenResponse> {
        let token = Uuid::new_v4();
        let qr_url = self.gateway.start_qr_login(user_id, token).await?;
        let now = Utc::now();
        let expires_at = now + self.qr_token_ttl;

        qr_tokens::ActiveModel {
            token: Set(token),
            user_id: Set(user_id),
            status: Set(QrLoginStatus::Pending),
            session_id: Set(None),
            expires_at: Set(expires_at),
            created_at: Set(Some(now)),
            completed_at: Set(None),
        }
        .insert(&self.pool)
        .await?;

        log::info!("Issued QR login token for user {user_id}");
        Ok(QrTokenResponse {
            token: token.to_string(),
            qr_url,
            expires_at,
        })
    }

    pub async fn check_qr_status(&self, user_id: i64, token: &str) -> AppResult<QrStatusResponse> {
        let Some(row) = self.find_qr_token(token).await? else {
            return Ok(QrStatusResponse::failed("Unknown QR token"));
        };
        if row.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        match row.status {
            QrLoginStatus::Completed => {
                let session_id = row.session_id.unwrap_or_default();
                Ok(QrStatusResponse::completed(session_id))
            }
            QrLoginStatus::Pending if row.is_expired_at(Utc::now()) => {
                Ok(QrStatusResponse::expired())
            }
            QrLoginStatus::Pending => {
                match self.gateway.poll_qr_login(user_id, row.token).await? {
                    Some(session_id) => {
                        let completed = self.complete_qr_login(row, session_id).await?;
                        Ok(QrStatusResponse::completed(completed))
                    }
                    None => Ok(QrStatusResponse::pending()),
                }
            }
        }
    }

    /// Verification callback: the QR code was accepted on a logged-in device.
    pub async fn confirm_qr_login(
        &self,
        request: ConfirmQrLoginRequest,
    ) -> AppResult<QrStatusResponse> {
        let row = self
            .find_qr_token(&request.token)
            .await?
            .ok_or_else(|| AppError::NotFound("Unknown QR token".to_string()))?;

        if row.status == QrLoginStatus::Completed {
            return Ok(QrStatusResponse::completed(row.session_id.unwrap_or_default()));
        }
        if row.is_expired_at(Utc::now()) {
            return Ok(QrStatusResponse::expired());
        }

        let session_id = request
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("qr-{}", generate_hex_token(32)));
        let session_id = self.complete_qr_login(row, session_id).await?;
        Ok(QrStatusResponse::completed(session_id))
    }

    /// Deletes QR tokens past their expiry. Returns how many were removed.
    pub async fn purge_expired_qr_tokens(&self) -> AppResult<u64> {
        let result = qr_tokens::Entity::delete_many()
            .filter(qr_tokens::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.pool)
            .await?;
        Ok(result.rows_affected)
    }

    /// Drops phone logins whose code was never used in time.
    pub async fn purge_expired_phone_logins(&self) -> usize {
        let now = Utc::now();
        let mut pending = self.pending_phone_logins.write().await;
        let before = pending.len();
        pending.retain(|_, p| now < p.expires_at);
        before - pending.len()
    }

    pub async fn send_code(&self, user_id: i64, phone: &str) -> AppResult<SendCodeResponse> {
        let phone = phone.trim();
        validate_phone(phone)?;

        let creds = self.credentials.load_credentials(user_id).await?;
        let phone_code_hash = self.gateway.send_code(creds.as_ref(), phone).await?;

        {
            let mut pending = self.pending_phone_logins.write().await;
            pending.insert(
                user_id,
                PendingPhoneLogin {
                    phone: phone.to_string(),
                    phone_code_hash: phone_code_hash.clone(),
                    expires_at: Utc::now() + Duration::seconds(PHONE_CODE_TTL_SECS),
                },
            );
        }

        log::info!("Login code requested for user {user_id}");
        Ok(SendCodeResponse {
            success: true,
            phone_code_hash,
        })
    }

    pub async fn verify_code(&self, request: VerifyCodeRequest) -> AppResult<VerifyCodeResponse> {
        let phone = request.phone.trim();
        let code = request.code.trim();
        validate_phone(phone)?;
        validate_login_code(code)?;

        let user_id = request.user_id;
        {
            let pending = self.pending_phone_logins.read().await;
            let usable = pending.get(&user_id).is_some_and(|p| {
                p.phone == phone
                    && p.phone_code_hash == request.phone_code_hash
                    && Utc::now() < p.expires_at
            });
            if !usable {
                return Err(TelegramError::PhoneCodeExpired.into());
            }
        }

        let creds = self.credentials.load_credentials(user_id).await?;
        let result = self
            .gateway
            .sign_in(creds.as_ref(), phone, &request.phone_code_hash, code)
            .await;

        match result {
            Ok(session_id) => {
                self.pending_phone_logins.write().await.remove(&user_id);
                self.store_session(user_id, &session_id, SessionMethod::Phone)
                    .await?;
                Ok(VerifyCodeResponse {
                    success: true,
                    session_id,
                })
            }
            Err(TelegramError::PhoneCodeExpired) => {
                self.pending_phone_logins.write().await.remove(&user_id);
                Err(TelegramError::PhoneCodeExpired.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn store_session(
        &self,
        user_id: i64,
        session_id: &str,
        method: SessionMethod,
    ) -> AppResult<()> {
        let now = Utc::now();
        match sessions::Entity::find_by_id(user_id).one(&self.pool).await? {
            Some(row) => {
                let mut model = row.into_active_model();
                model.session_id = Set(session_id.to_string());
                model.method = Set(method);
                model.created_at = Set(Some(now));
                model.update(&self.pool).await?;
            }
            None => {
                sessions::ActiveModel {
                    user_id: Set(user_id),
                    session_id: Set(session_id.to_string()),
                    method: Set(method),
                    created_at: Set(Some(now)),
                }
                .insert(&self.pool)
                .await?;
            }
        }

        self.settings.set_telegram_enabled(user_id, true).await?;
        log::info!("Telegram connected for user {user_id} via {method:?}");
        Ok(())
    }

    async fn find_qr_token(&self, token: &str) -> AppResult<Option<qr_tokens::Model>> {
        let Ok(token) = Uuid::parse_str(token.trim()) else {
            return Ok(None);
        };
        Ok(qr_tokens::Entity::find_by_id(token).one(&self.pool).await?)
    }

    async fn complete_qr_login(
        &self,
        row: qr_tokens::Model,
        session_id: String,
    ) -> AppResult<String> {
        let user_id = row.user_id;
        let mut model = row.into_active_model();
        model.status = Set(QrLoginStatus::Completed);
        model.session_id = Set(Some(session_id.clone()));
        model.completed_at = Set(Some(Utc::now()));
        model.update(&self.pool).await?;

        self.store_session(user_id, &session_id, SessionMethod::Qr)
            .await?;
        Ok(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::memory_db;
    use crate::external::telegram::MockGateway;
    use crate::external::telegram::mock::MOCK_PASSWORD_CODE;

    async fn service_with_ttl(ttl_secs: i64) -> TelegramLoginService {
        let pool = memory_db().await;
        let gateway: SharedGateway = Arc::new(MockGateway::new("12345".into()));
        let credentials = CredentialService::new(pool.clone(), gateway.clone());
        let settings = SettingsService::new(pool.clone());
        TelegramLoginService::new(pool, gateway, credentials, settings, ttl_secs)
    }

    async fn service() -> TelegramLoginService {
        service_with_ttl(300).await
    }

    fn verify(phone: &str, code: &str, hash: &str, user_id: i64) -> VerifyCodeRequest {
        VerifyCodeRequest {
            phone: phone.into(),
            code: code.into(),
            phone_code_hash: hash.into(),
            user_id,
        }
    }

    #[tokio::test]
    async fn test_qr_token_stays_pending_until_confirmed() {
        let svc = service().await;
        let issued = svc.create_qr_token(1).await.unwrap();
        assert!(issued.qr_url.starts_with("tg://login?token="));

        let status = svc.check_qr_status(1, &issued.token).await.unwrap();
        assert_eq!(status, QrStatusResponse::pending());

        let confirmed = svc
            .confirm_qr_login(ConfirmQrLoginRequest {
                token: issued.token.clone(),
                session_id: Some("sess-1".into()),
            })
            .await
            .unwrap();
        assert_eq!(confirmed, QrStatusResponse::completed("sess-1".into()));

        let status = svc.check_qr_status(1, &issued.token).await.unwrap();
        assert_eq!(status, QrStatusResponse::completed("sess-1".into()));
        assert!(svc.settings.get_settings(1).await.unwrap().telegram_enabled());
    }

    #[tokio::test]
    async fn test_completed_token_is_never_reopened() {
        let svc = service().await;
        let issued = svc.create_qr_token(1).await.unwrap();
        let confirm = |session: &str| ConfirmQrLoginRequest {
            token: issued.token.clone(),
            session_id: Some(session.into()),
        };
        svc.confirm_qr_login(confirm("first")).await.unwrap();
        let again = svc.confirm_qr_login(confirm("second")).await.unwrap();
        assert_eq!(again.session_id.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_expired_qr_token() {
        let svc = service_with_ttl(-1).await;
        let issued = svc.create_qr_token(1).await.unwrap();

        let status = svc.check_qr_status(1, &issued.token).await.unwrap();
        assert_eq!(status, QrStatusResponse::expired());

        assert_eq!(svc.purge_expired_qr_tokens().await.unwrap(), 1);
        let status = svc.check_qr_status(1, &issued.token).await.unwrap();
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn test_abandoned_phone_logins_are_purged() {
        let svc = service().await;
        svc.send_code(3, "+15551234567").await.unwrap();
        svc.send_code(4, "+15557654321").await.unwrap();
        svc.pending_phone_logins
            .write()
            .await
            .get_mut(&4)
            .unwrap()
            .expires_at = Utc::now() - Duration::seconds(1);

        assert_eq!(svc.purge_expired_phone_logins().await, 1);
        assert_eq!(svc.purge_expired_phone_logins().await, 0);

        let pending = svc.pending_phone_logins.read().await;
        assert!(pending.contains_key(&3));
        assert!(!pending.contains_key(&4));
    }

    #[tokio::test]
    async fn test_qr_token_of_another_user_is_forbidden() {
        let svc = service().await;
        let issued = svc.create_qr_token(1).await.unwrap();
        let err = svc.check_qr_status(2, &issued.token).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_unknown_qr_token() {
        let svc = service().await;
        let status = svc.check_qr_status(1, "not-a-uuid").await.unwrap();
        assert!(!status.success);
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn test_phone_login_happy_path() {
        let svc = service().await;
        let sent = svc.send_code(3, "+15551234567").await.unwrap();
        assert!(sent.success);

        let verified = svc
            .verify_code(verify("+15551234567", "12345", &sent.phone_code_hash, 3))
            .await
            .unwrap();
        assert_eq!(verified.session_id, "mock-session-15551234567");

        // code is single use
        let err = svc
            .verify_code(verify("+15551234567", "12345", &sent.phone_code_hash, 3))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "PHONE_CODE_EXPIRED");
    }

    #[tokio::test]
    async fn test_phone_login_rejects_bad_input() {
        let svc = service().await;
        assert!(matches!(
            svc.send_code(3, "15551234567").await.unwrap_err(),
            AppError::ValidationError(_)
        ));
        assert!(matches!(
            svc.send_code(3, "+1555").await.unwrap_err(),
            AppError::ValidationError(_)
        ));
        let sent = svc.send_code(3, "+15551234567").await.unwrap();
        assert!(matches!(
            svc.verify_code(verify("+15551234567", "12", &sent.phone_code_hash, 3))
                .await
                .unwrap_err(),
            AppError::ValidationError(_)
        ));
    }

    #[tokio::test]
    async fn test_phone_login_upstream_errors_keep_identifiers() {
        let svc = service().await;
        let sent = svc.send_code(3, "+15551234567").await.unwrap();

        let invalid = svc
            .verify_code(verify("+15551234567", "99999", &sent.phone_code_hash, 3))
            .await
            .unwrap_err();
        assert_eq!(invalid.user_message(), "PHONE_CODE_INVALID");

        // an invalid code does not burn the pending login
        let password = svc
            .verify_code(verify("+15551234567", MOCK_PASSWORD_CODE, &sent.phone_code_hash, 3))
            .await
            .unwrap_err();
        assert_eq!(password.user_message(), "SESSION_PASSWORD_NEEDED");

        let wrong_hash = svc
            .verify_code(verify("+15551234567", "12345", "other-hash", 3))
            .await
            .unwrap_err();
        assert_eq!(wrong_hash.user_message(), "PHONE_CODE_EXPIRED");
    }
}
