use crate::entities::{telegram_session_entity as sessions, user_settings_entity as user_settings};
use crate::error::AppResult;
use crate::models::UserSettings;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};

#[derive(Clone)]
pub struct SettingsService {
    pool: DatabaseConnection,
}

impl SettingsService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Stored settings, or the empty document when the user has none yet.
    pub async fn get_settings(&self, user_id: i64) -> AppResult<UserSettings> {
        let row = user_settings::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(serde_json::from_str(&row.settings)?),
            None => Ok(UserSettings::default()),
        }
    }

    /// Replaces the whole document. Last write wins.
    pub async fn update_settings(
        &self,
        user_id: i64,
        settings: UserSettings,
    ) -> AppResult<UserSettings> {
        let raw = serde_json::to_string(&settings)?;
        let now = Utc::now();

        match user_settings::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
        {
            Some(row) => {
                let mut model = row.into_active_model();
                model.settings = Set(raw);
                model.updated_at = Set(Some(now));
                model.update(&self.pool).await?;
            }
            None => {
                user_settings::ActiveModel {
                    user_id: Set(user_id),
                    settings: Set(raw),
                    updated_at: Set(Some(now)),
                }
                .insert(&self.pool)
                .await?;
            }
        }

        Ok(settings)
    }

    pub async fn set_telegram_enabled(&self, user_id: i64, enabled: bool) -> AppResult<UserSettings> {
        let mut settings = self.get_settings(user_id).await?;
        settings.telegram_integration_enabled = Some(enabled);
        self.update_settings(user_id, settings).await
    }

    /// Drops the stored Telegram session and turns the integration off.
    /// Safe to call when nothing is connected.
    pub async fn disconnect_telegram(&self, user_id: i64) -> AppResult<UserSettings> {
        let removed = sessions::Entity::delete_by_id(user_id)
            .exec(&self.pool)
            .await?
            .rows_affected;
        if removed > 0 {
            log::info!("Removed Telegram session of user {user_id}");
        }
        self.set_telegram_enabled(user_id, false).await
    }
}
