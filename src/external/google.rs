use crate::config::GoogleConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Identity extracted from a verified Google ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Clone)]
pub struct GoogleIdentityService {
    http: Client,
    cfg: GoogleConfig,
}

impl GoogleIdentityService {
    pub fn new(cfg: GoogleConfig) -> Self {
        let http = Client::builder()
            .user_agent("tgdash-backend/google")
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http, cfg }
    }

    /// Verifies the ID token against Google's tokeninfo endpoint.
    pub async fn verify_id_token(&self, id_token: &str) -> AppResult<GoogleIdentity> {
        if id_token.is_empty() {
            return Err(AppError::ValidationError("Missing identity token".into()));
        }
        if id_token.len() > 4096 {
            return Err(AppError::ValidationError("Invalid identity token".into()));
        }

        let resp = self
            .http
            .get(&self.cfg.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            log::warn!("Google tokeninfo rejected token: HTTP {} {}", status.as_u16(), body);
            return Err(AppError::AuthError("Invalid Google identity token".into()));
        }

        let info: TokenInfo = resp.json().await?;
        self.check_claims(info)
    }

    fn check_claims(&self, info: TokenInfo) -> AppResult<GoogleIdentity> {
        if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
            return Err(AppError::AuthError("Unexpected token issuer".into()));
        }
        if !self.cfg.client_id.is_empty() && info.aud != self.cfg.client_id {
            return Err(AppError::AuthError("Token was issued for another client".into()));
        }
        let email = info
            .email
            .ok_or_else(|| AppError::AuthError("Token carries no email".into()))?;
        if info.email_verified.as_deref() == Some("false") {
            return Err(AppError::AuthError("Google email is not verified".into()));
        }

        Ok(GoogleIdentity {
            sub: info.sub,
            email,
            name: info.name,
            picture: info.picture,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    iss: String,
    aud: String,
    sub: String,
    #[serde(default)]
    email: Option<String>,
    // tokeninfo encodes booleans as strings
    #[serde(default)]
    email_verified: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}
