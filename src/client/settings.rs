use super::error::ClientResult;
use super::functions::SharedFunctions;
use super::local_store::LocalStore;
use crate::models::{
    TelegramCredentialsResponse, UserSettings, ValidateCredentialsRequest,
    ValidateCredentialsResponse,
};
use serde::{Deserialize, Serialize};

const SETTINGS_KEY: &str = "settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedCredentials {
    pub api_id: String,
    pub api_hash: String,
}

fn credentials_key(user_id: i64) -> String {
    format!("telegram-credentials-{user_id}")
}

/// Settings backed by the remote store, falling back to the local store
/// whenever the backend cannot be reached.
#[derive(Clone)]
pub struct SettingsClient {
    functions: SharedFunctions,
    store: LocalStore,
}

impl SettingsClient {
    pub fn new(functions: SharedFunctions, store: LocalStore) -> Self {
        Self { functions, store }
    }

    pub async fn load(&self) -> ClientResult<UserSettings> {
        match self.functions.get_settings().await {
            Ok(settings) => {
                self.store.set(SETTINGS_KEY, &settings).await?;
                Ok(settings)
            }
            Err(e) => {
                log::warn!("Loading remote settings failed, using local copy: {e}");
                Ok(self.store.get(SETTINGS_KEY).await?.unwrap_or_default())
            }
        }
    }

    /// Whole-document replace. Kept locally when the backend is unavailable.
    pub async fn save(&self, settings: UserSettings) -> ClientResult<UserSettings> {
        let saved = match self.functions.update_settings(&settings).await {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("Saving remote settings failed, keeping them locally: {e}");
                settings
            }
        };
        self.store.set(SETTINGS_KEY, &saved).await?;
        Ok(saved)
    }

    pub async fn disconnect_telegram(&self) -> ClientResult<UserSettings> {
        match self.functions.disconnect_telegram().await {
            Ok(settings) => {
                self.store.set(SETTINGS_KEY, &settings).await?;
                Ok(settings)
            }
            Err(e) => {
                log::warn!("Remote disconnect failed, disabling locally: {e}");
                let mut settings: UserSettings =
                    self.store.get(SETTINGS_KEY).await?.unwrap_or_default();
                settings.telegram_integration_enabled = Some(false);
                self.store.set(SETTINGS_KEY, &settings).await?;
                Ok(settings)
            }
        }
    }

    /// Validates an API id/hash pair and caches it locally when valid.
    pub async fn validate_credentials(
        &self,
        request: ValidateCredentialsRequest,
    ) -> ClientResult<ValidateCredentialsResponse> {
        let resp = self.functions.validate_credentials(&request).await?;
        if resp.valid
            && let Some(user_id) = request.user_id
        {
            self.cache_credentials(
                user_id,
                &CachedCredentials {
                    api_id: request.api_id.trim().to_string(),
                    api_hash: request.api_hash.trim().to_string(),
                },
            )
            .await?;
        }
        Ok(resp)
    }

    /// Stored credentials, preferring the backend copy.
    pub async fn credentials(&self, user_id: i64) -> ClientResult<Option<CachedCredentials>> {
        match self.functions.get_telegram_credentials(user_id).await {
            Ok(TelegramCredentialsResponse {
                api_id: Some(api_id),
                api_hash: Some(api_hash),
            }) => {
                let creds = CachedCredentials { api_id, api_hash };
                self.cache_credentials(user_id, &creds).await?;
                Ok(Some(creds))
            }
            Ok(_) => self.cached_credentials(user_id).await,
            Err(e) => {
                log::warn!("Loading remote credentials failed, using local cache: {e}");
                self.cached_credentials(user_id).await
            }
        }
    }

    pub async fn cached_credentials(&self, user_id: i64) -> ClientResult<Option<CachedCredentials>> {
        self.store.get(&credentials_key(user_id)).await
    }

    async fn cache_credentials(&self, user_id: i64, creds: &CachedCredentials) -> ClientResult<()> {
        self.store.set(&credentials_key(user_id), creds).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeFunctions;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn client(fake: &Arc<FakeFunctions>) -> (SettingsClient, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let client = SettingsClient::new(fake.clone(), LocalStore::new(dir.path()));
        (client, dir)
    }

    fn enabled() -> UserSettings {
        UserSettings {
            telegram_integration_enabled: Some(true),
            watched_handles: Some(vec!["alice".into()]),
            ..UserSettings::default()
        }
    }

    #[tokio::test]
    async fn test_remote_round_trip_is_cached() {
        let fake = Arc::new(FakeFunctions::default());
        let (client, _dir) = client(&fake);

        client.save(enabled()).await.unwrap();
        assert_eq!(*fake.settings.lock().unwrap(), Some(enabled()));

        fake.offline.store(true, Ordering::SeqCst);
        assert_eq!(client.load().await.unwrap(), enabled());
    }

    #[tokio::test]
    async fn test_offline_save_falls_back_to_local() {
        let fake = Arc::new(FakeFunctions::default());
        fake.offline.store(true, Ordering::SeqCst);
        let (client, _dir) = client(&fake);

        assert_eq!(client.load().await.unwrap(), UserSettings::default());
        assert_eq!(client.save(enabled()).await.unwrap(), enabled());
        assert_eq!(client.load().await.unwrap(), enabled());
        assert!(fake.settings.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_offline_still_disables() {
        let fake = Arc::new(FakeFunctions::default());
        let (client, _dir) = client(&fake);
        client.save(enabled()).await.unwrap();

        fake.offline.store(true, Ordering::SeqCst);
        let settings = client.disconnect_telegram().await.unwrap();
        assert!(!settings.telegram_enabled());
        assert_eq!(settings.watched_handles, Some(vec!["alice".to_string()]));
    }

    #[tokio::test]
    async fn test_valid_credentials_are_cached_per_user() {
        let fake = Arc::new(FakeFunctions::default());
        let (client, _dir) = client(&fake);

        let resp = client
            .validate_credentials(ValidateCredentialsRequest {
                api_id: "12345".into(),
                api_hash: "abcdef".into(),
                user_id: Some(3),
            })
            .await
            .unwrap();
        assert!(resp.valid);

        let bad = client
            .validate_credentials(ValidateCredentialsRequest {
                api_id: "12a".into(),
                api_hash: "zzz".into(),
                user_id: Some(4),
            })
            .await
            .unwrap();
        assert!(!bad.valid);

        fake.offline.store(true, Ordering::SeqCst);
        assert_eq!(
            client.credentials(3).await.unwrap(),
            Some(CachedCredentials {
                api_id: "12345".into(),
                api_hash: "abcdef".into(),
            })
        );
        assert_eq!(client.credentials(4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_backend_credentials_win() {
        let fake = Arc::new(FakeFunctions::default());
        *fake.credentials.lock().unwrap() = TelegramCredentialsResponse {
            api_id: Some("999".into()),
            api_hash: Some("remote".into()),
        };
        let (client, _dir) = client(&fake);

        let creds = client.credentials(1).await.unwrap().unwrap();
        assert_eq!(creds.api_id, "999");
        assert_eq!(client.cached_credentials(1).await.unwrap(), Some(creds));
    }
}
