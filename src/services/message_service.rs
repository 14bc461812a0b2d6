use crate::entities::telegram_session_entity as sessions;
use crate::error::AppResult;
use crate::external::{SharedMessageSource, TelegramError};
use crate::models::*;
use crate::utils::{clamp_message_limit, normalize_handle};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::collections::BTreeMap;

#[derive(Clone)]
pub struct MessageService {
    pool: DatabaseConnection,
    source: SharedMessageSource,
    default_limit: u32,
}

impl MessageService {
    pub fn new(pool: DatabaseConnection, source: SharedMessageSource, default_limit: u32) -> Self {
        Self {
            pool,
            source,
            default_limit,
        }
    }

    /// Fetches recent messages for every handle, one handle at a time.
    /// A failing handle yields a single error sentinel in its own list and does
    /// not affect the others.
    pub async fn fetch_messages(
        &self,
        request: FetchMessagesRequest,
    ) -> AppResult<FetchMessagesResponse> {
        let limit = clamp_message_limit(request.limit, self.default_limit);

        let session = sessions::Entity::find_by_id(request.user_id)
            .one(&self.pool)
            .await?
            .map(|s| s.session_id);

        let mut messages = BTreeMap::new();
        for raw in &request.handles {
            let handle = normalize_handle(raw);
            if handle.is_empty() {
                // nothing to resolve; keep the input so the entry stays visible
                messages
                    .entry(raw.trim().to_string())
                    .or_insert_with(|| vec![TelegramMessage::error_sentinel("empty handle")]);
                continue;
            }
            if messages.contains_key(&handle) {
                continue;
            }
            let fetched = match self.fetch_one(session.as_deref(), &handle, limit).await {
                Ok(list) => list,
                Err(e) => {
                    log::warn!("Fetching messages for @{handle} failed: {e}");
                    vec![TelegramMessage::error_sentinel(&e.to_string())]
                }
            };
            messages.insert(handle, fetched);
        }

        let successful_messages = messages
            .values()
            .flatten()
            .filter(|m| !m.is_error_sentinel())
            .count();

        Ok(FetchMessagesResponse {
            messages,
            mock_mode: self.source.is_mock(),
            successful_messages,
        })
    }

    async fn fetch_one(
        &self,
        session: Option<&str>,
        handle: &str,
        limit: u32,
    ) -> Result<Vec<TelegramMessage>, TelegramError> {
        let peer = self.source.resolve_handle(session, handle).await?;
        self.source.recent_messages(session, &peer, limit).await
    }
}
