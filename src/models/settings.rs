use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-user settings document. Known fields are typed; anything else the dashboard
/// stores is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_integration_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_handles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_limit: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserSettings {
    pub fn telegram_enabled(&self) -> bool {
        self.telegram_integration_enabled.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive() {
        let raw = json!({
            "telegramIntegrationEnabled": true,
            "watchedHandles": ["alice"],
            "theme": "dark",
            "layout": {"columns": 2}
        });
        let settings: UserSettings = serde_json::from_value(raw.clone()).unwrap();
        assert!(settings.telegram_enabled());
        assert_eq!(settings.extra.get("theme"), Some(&json!("dark")));
        assert_eq!(serde_json::to_value(&settings).unwrap(), raw);
    }

    #[test]
    fn test_empty_document_defaults() {
        let settings: UserSettings = serde_json::from_str("{}").unwrap();
        assert!(!settings.telegram_enabled());
        assert!(settings.watched_handles.is_none());
        assert_eq!(serde_json::to_string(&settings).unwrap(), "{}");
    }
}
