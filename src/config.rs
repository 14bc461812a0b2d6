use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client id the identity token must be issued for. Empty disables the audience check.
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_tokeninfo_url")]
    pub tokeninfo_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            tokeninfo_url: default_tokeninfo_url(),
        }
    }
}

fn default_tokeninfo_url() -> String {
    "https://oauth2.googleapis.com/tokeninfo".to_string()
}

/// Which Telegram backend drives the login flows and message fetches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TelegramMode {
    #[default]
    Mock,
    Bridge,
}

impl std::str::FromStr for TelegramMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(TelegramMode::Mock),
            "bridge" => Ok(TelegramMode::Bridge),
            other => Err(format!("unknown telegram mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub mode: TelegramMode,
    /// Base URL of the process running the real Telegram client (bridge mode only).
    #[serde(default)]
    pub bridge_url: String,
    #[serde(default)]
    pub bridge_token: Option<String>,
    #[serde(default = "default_qr_token_ttl_secs")]
    pub qr_token_ttl_secs: i64,
    #[serde(default = "default_message_limit")]
    pub default_message_limit: u32,
    #[serde(default = "default_mock_login_code")]
    pub mock_login_code: String,
    /// Shared secret expected in `X-Callback-Secret` on the QR confirmation webhook.
    #[serde(default)]
    pub callback_secret: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            mode: TelegramMode::default(),
            bridge_url: String::new(),
            bridge_token: None,
            qr_token_ttl_secs: default_qr_token_ttl_secs(),
            default_message_limit: default_message_limit(),
            mock_login_code: default_mock_login_code(),
            callback_secret: String::new(),
        }
    }
}

fn default_qr_token_ttl_secs() -> i64 {
    300
}

fn default_message_limit() -> u32 {
    10
}

fn default_mock_login_code() -> String {
    "12345".to_string()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // No config file means environment variables and defaults only
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and config.toml was not found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    google: GoogleConfig::default(),
                    telegram: TelegramConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("cannot read config file {config_path}: {e}").into());
            }
        };

        // Environment variables win over the file
        config.apply_env_overrides()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.refresh_token_expires_in = n;
        }

        // Google
        if let Ok(v) = env::var("GOOGLE_CLIENT_ID") {
            self.google.client_id = v;
        }
        if let Ok(v) = env::var("GOOGLE_TOKENINFO_URL") {
            self.google.tokeninfo_url = v;
        }

        // Telegram
        if let Ok(v) = env::var("TELEGRAM_MODE") {
            self.telegram.mode = v.parse()?;
        }
        if let Ok(v) = env::var("TELEGRAM_BRIDGE_URL") {
            self.telegram.bridge_url = v;
        }
        if let Ok(v) = env::var("TELEGRAM_BRIDGE_TOKEN") {
            self.telegram.bridge_token = Some(v);
        }
        if let Ok(v) = env::var("TELEGRAM_QR_TOKEN_TTL_SECS")
            && let Ok(n) = v.parse()
        {
            self.telegram.qr_token_ttl_secs = n;
        }
        if let Ok(v) = env::var("TELEGRAM_DEFAULT_MESSAGE_LIMIT")
            && let Ok(n) = v.parse()
        {
            self.telegram.default_message_limit = n;
        }
        if let Ok(v) = env::var("TELEGRAM_MOCK_LOGIN_CODE") {
            self.telegram.mock_login_code = v;
        }
        if let Ok(v) = env::var("TELEGRAM_CALLBACK_SECRET") {
            self.telegram.callback_secret = v;
        }

        if self.telegram.mode == TelegramMode::Bridge && self.telegram.bridge_url.is_empty() {
            return Err("telegram.mode = \"bridge\" requires telegram.bridge_url".into());
        }

        Ok(())
    }
}
