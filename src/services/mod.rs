pub mod auth_service;
pub mod credential_service;
pub mod message_service;
pub mod settings_service;
pub mod telegram_login_service;

pub use auth_service::*;
pub use credential_service::*;
pub use message_service::*;
pub use settings_service::*;
pub use telegram_login_service::*;
