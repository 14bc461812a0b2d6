use crate::entities::{api_key_entity as api_keys, telegram_credential_entity as credentials};
use crate::error::{AppError, AppResult};
use crate::external::{ApiCredentials, SharedGateway};
use crate::models::*;
use crate::utils::is_numeric_api_id;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};

#[derive(Clone)]
pub struct CredentialService {
    pool: DatabaseConnection,
    gateway: SharedGateway,
}

impl CredentialService {
    pub fn new(pool: DatabaseConnection, gateway: SharedGateway) -> Self {
        Self { pool, gateway }
    }

    /// Checks an API id/hash pair. Every failure is reported as `valid: false`;
    /// this never returns an error to the caller.
    pub async fn validate_credentials(
        &self,
        request: ValidateCredentialsRequest,
    ) -> ValidateCredentialsResponse {
        let api_id = request.api_id.trim();
        let api_hash = request.api_hash.trim();

        if api_id.is_empty() || api_hash.is_empty() {
            return ValidateCredentialsResponse::invalid("API ID and API Hash are required");
        }
        if !is_numeric_api_id(api_id) {
            return ValidateCredentialsResponse::invalid("API ID must be numeric");
        }

        let creds = ApiCredentials {
            api_id: api_id.to_string(),
            api_hash: api_hash.to_string(),
        };

        let session = match self.gateway.check_credentials(&creds).await {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Telegram credential check failed: {e}");
                return ValidateCredentialsResponse::invalid(format!(
                    "Failed to connect to Telegram: {e}"
                ));
            }
        };

        if let Some(user_id) = request.user_id
            && let Err(e) = self.save_credentials(user_id, &creds).await
        {
            log::error!("Failed to persist Telegram credentials of user {user_id}: {e}");
            return ValidateCredentialsResponse::invalid(format!(
                "Credentials are valid but could not be saved: {}",
                e.user_message()
            ));
        }

        ValidateCredentialsResponse {
            valid: true,
            message: "Credentials validated successfully".to_string(),
            session,
        }
    }

    pub async fn load_credentials(&self, user_id: i64) -> AppResult<Option<ApiCredentials>> {
        let row = credentials::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?;
        Ok(row.map(|r| ApiCredentials {
            api_id: r.api_id,
            api_hash: r.api_hash,
        }))
    }

    pub async fn get_telegram_credentials(
        &self,
        user_id: i64,
    ) -> AppResult<TelegramCredentialsResponse> {
        Ok(match self.load_credentials(user_id).await? {
            Some(c) => TelegramCredentialsResponse {
                api_id: Some(c.api_id),
                api_hash: Some(c.api_hash),
            },
            None => TelegramCredentialsResponse::default(),
        })
    }

    pub async fn save_credentials(&self, user_id: i64, creds: &ApiCredentials) -> AppResult<()> {
        let now = Utc::now();
        match credentials::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
        {
            Some(row) => {
                let mut model = row.into_active_model();
                model.api_id = Set(creds.api_id.clone());
                model.api_hash = Set(creds.api_hash.clone());
                model.updated_at = Set(Some(now));
                model.update(&self.pool).await?;
            }
            None => {
                credentials::ActiveModel {
                    user_id: Set(user_id),
                    api_id: Set(creds.api_id.clone()),
                    api_hash: Set(creds.api_hash.clone()),
                    created_at: Set(Some(now)),
                    updated_at: Set(Some(now)),
                }
                .insert(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    pub async fn get_api_key(&self, user_id: i64, service: &str) -> AppResult<ApiKeyResponse> {
        let service = normalize_service(service)?;
        let row = api_keys::Entity::find()
            .filter(api_keys::Column::UserId.eq(user_id))
            .filter(api_keys::Column::Service.eq(service.as_str()))
            .one(&self.pool)
            .await?;
        Ok(ApiKeyResponse {
            api_key: row.map(|r| r.api_key),
        })
    }

    pub async fn store_api_key(
        &self,
        user_id: i64,
        service: &str,
        api_key: &str,
    ) -> AppResult<SuccessResponse> {
        let service = normalize_service(service)?;
        if api_key.trim().is_empty() {
            return Err(AppError::ValidationError("API key is required".to_string()));
        }

        let now = Utc::now();
        let existing = api_keys::Entity::find()
            .filter(api_keys::Column::UserId.eq(user_id))
            .filter(api_keys::Column::Service.eq(service.as_str()))
            .one(&self.pool)
            .await?;

        match existing {
            Some(row) => {
                let mut model = row.into_active_model();
                model.api_key = Set(api_key.trim().to_string());
                model.updated_at = Set(Some(now));
                model.update(&self.pool).await?;
            }
            None => {
                api_keys::ActiveModel {
                    user_id: Set(user_id),
                    service: Set(service.clone()),
                    api_key: Set(api_key.trim().to_string()),
                    created_at: Set(Some(now)),
                    updated_at: Set(Some(now)),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await?;
            }
        }

        log::info!("Stored {service} API key for user {user_id}");
        Ok(SuccessResponse { success: true })
    }
}

fn normalize_service(service: &str) -> AppResult<String> {
    let service = service.trim().to_ascii_lowercase();
    if service.is_empty() {
        return Err(AppError::ValidationError("Service name is required".to_string()));
    }
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::memory_db;
    use crate::external::{TelegramError, TelegramGateway};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Counts credential checks and fails them on demand.
    struct CountingGateway {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TelegramGateway for CountingGateway {
        async fn check_credentials(
            &self,
            creds: &ApiCredentials,
        ) -> Result<Option<String>, TelegramError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(TelegramError::Upstream("API_ID_INVALID".into()))
            } else {
                Ok(Some(format!("session-{}", creds.api_id)))
            }
        }
        async fn start_qr_login(&self, _: i64, _: Uuid) -> Result<String, TelegramError> {
            unreachable!()
        }
        async fn poll_qr_login(&self, _: i64, _: Uuid) -> Result<Option<String>, TelegramError> {
            unreachable!()
        }
        async fn send_code(
            &self,
            _: Option<&ApiCredentials>,
            _: &str,
        ) -> Result<String, TelegramError> {
            unreachable!()
        }
        async fn sign_in(
            &self,
            _: Option<&ApiCredentials>,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<String, TelegramError> {
            unreachable!()
        }
    }

    async fn service(fail: bool) -> (CredentialService, Arc<CountingGateway>) {
        let gateway = Arc::new(CountingGateway {
            calls: AtomicUsize::new(0),
            fail,
        });
        (
            CredentialService::new(memory_db().await, gateway.clone()),
            gateway,
        )
    }

    fn request(api_id: &str, user_id: Option<i64>) -> ValidateCredentialsRequest {
        ValidateCredentialsRequest {
            api_id: api_id.into(),
            api_hash: "0123456789abcdef".into(),
            user_id,
        }
    }

    #[tokio::test]
    async fn test_non_numeric_api_id_never_reaches_gateway() {
        let (service, gateway) = service(false).await;
        let resp = service.validate_credentials(request("12ab", Some(1))).await;
        assert!(!resp.valid);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.get_telegram_credentials(1).await.unwrap().api_id, None);
    }

    #[tokio::test]
    async fn test_missing_hash_is_invalid() {
        let (service, gateway) = service(false).await;
        let mut req = request("123", None);
        req.api_hash = " ".into();
        assert!(!service.validate_credentials(req).await.valid);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_pair_is_persisted_for_user() {
        let (service, _) = service(false).await;
        let resp = service.validate_credentials(request("123456", Some(9))).await;
        assert!(resp.valid);
        assert_eq!(resp.session.as_deref(), Some("session-123456"));

        let stored = service.get_telegram_credentials(9).await.unwrap();
        assert_eq!(stored.api_id.as_deref(), Some("123456"));
        assert_eq!(stored.api_hash.as_deref(), Some("0123456789abcdef"));
    }

    #[tokio::test]
    async fn test_valid_pair_without_user_is_not_persisted() {
        let (service, _) = service(false).await;
        assert!(service.validate_credentials(request("777", None)).await.valid);
        assert!(service.load_credentials(777).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upstream_failure_degrades_to_invalid() {
        let (service, gateway) = service(true).await;
        let resp = service.validate_credentials(request("123", Some(1))).await;
        assert!(!resp.valid);
        assert!(resp.message.contains("API_ID_INVALID"));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_api_key_round_trip_and_overwrite() {
        let (service, _) = service(false).await;
        assert_eq!(service.get_api_key(1, "openai").await.unwrap().api_key, None);

        service.store_api_key(1, "OpenAI", "k1").await.unwrap();
        service.store_api_key(1, "openai", "k2").await.unwrap();
        assert_eq!(
            service.get_api_key(1, "openai").await.unwrap().api_key.as_deref(),
            Some("k2")
        );
        assert_eq!(service.get_api_key(2, "openai").await.unwrap().api_key, None);
        assert!(service.store_api_key(1, " ", "k").await.is_err());
    }
}
