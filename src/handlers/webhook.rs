use crate::config::TelegramConfig;
use crate::error::AppError;
use crate::models::ConfirmQrLoginRequest;
use crate::services::TelegramLoginService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use log::{info, warn};

pub const CALLBACK_SECRET_HEADER: &str = "X-Callback-Secret";

/// Compares in time independent of where the inputs first differ.
fn secrets_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// QR login confirmation
///
/// Called by the login bridge once a logged-in device accepted the QR code.
/// Requests must carry the shared secret from `telegram.callback_secret`;
/// with no secret configured the endpoint rejects everything.
pub async fn telegram_qr_login(
    req: HttpRequest,
    telegram_config: web::Data<TelegramConfig>,
    login_service: web::Data<TelegramLoginService>,
    request: web::Json<ConfirmQrLoginRequest>,
) -> Result<HttpResponse> {
    let provided = req
        .headers()
        .get(CALLBACK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let expected = telegram_config.callback_secret.as_str();
    if expected.is_empty() || !secrets_match(provided, expected) {
        warn!("Rejected QR login callback with a bad or missing secret");
        return Ok(AppError::AuthError("Invalid callback secret".to_string()).error_response());
    }

    match login_service.confirm_qr_login(request.into_inner()).await {
        Ok(status) => {
            info!("QR login callback processed: success={}", status.success);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "data": status
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhook").route("/telegram/qr-login", web::post().to(telegram_qr_login)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::memory_db;
    use crate::external::telegram::MockGateway;
    use crate::services::{CredentialService, SettingsService};
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[::core::prelude::v1::test]
    fn test_secrets_match() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cres", "s3cret"));
        assert!(!secrets_match("s3cret-longer", "s3cret"));
        assert!(!secrets_match("", "s3cret"));
    }

    #[actix_web::test]
    async fn test_callback_completes_pending_token() {
        let pool = memory_db().await;
        let gateway = Arc::new(MockGateway::new("12345".to_string()));
        let settings = SettingsService::new(pool.clone());
        let credentials = CredentialService::new(pool.clone(), gateway.clone());
        let login = TelegramLoginService::new(pool, gateway, credentials, settings.clone(), 300);
        let qr = login.create_qr_token(4).await.unwrap();

        let telegram_config = TelegramConfig {
            callback_secret: "s3cret".into(),
            ..TelegramConfig::default()
        };
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(telegram_config))
                .app_data(web::Data::new(login.clone()))
                .configure(webhook_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/webhook/telegram/qr-login")
            .insert_header((CALLBACK_SECRET_HEADER, "wrong"))
            .set_json(json!({"token": qr.token}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/webhook/telegram/qr-login")
            .insert_header((CALLBACK_SECRET_HEADER, "s3cret"))
            .set_json(json!({"token": qr.token, "sessionId": "bridge-session"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["sessionId"], "bridge-session");

        let status = login.check_qr_status(4, &qr.token).await.unwrap();
        assert!(status.success);
        assert!(settings.get_settings(4).await.unwrap().telegram_enabled());
    }
}
