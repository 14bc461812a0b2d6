pub mod api_keys;
pub mod qr_login_tokens;
pub mod telegram_credentials;
pub mod telegram_sessions;
pub mod user_settings;
pub mod users;

pub use api_keys as api_key_entity;
pub use qr_login_tokens as qr_login_token_entity;
pub use qr_login_tokens::QrLoginStatus;
pub use telegram_credentials as telegram_credential_entity;
pub use telegram_sessions as telegram_session_entity;
pub use telegram_sessions::SessionMethod;
pub use user_settings as user_settings_entity;
pub use users as user_entity;
