pub mod auth;
pub mod functions;
pub mod settings;
pub mod user;
pub mod webhook;

pub use auth::auth_config;
pub use functions::functions_config;
pub use settings::settings_config;
pub use user::user_config;
pub use webhook::webhook_config;
