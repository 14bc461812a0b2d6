use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::google_login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::user::get_me,
        handlers::settings::get_settings,
        handlers::settings::update_settings,
        handlers::settings::disconnect_telegram,
        handlers::functions::validate_credentials,
        handlers::functions::get_qr_token,
        handlers::functions::check_qr_status,
        handlers::functions::send_code,
        handlers::functions::verify_code,
        handlers::functions::get_telegram_credentials,
        handlers::functions::get_api_key,
        handlers::functions::store_api_key,
        handlers::functions::fetch_messages,
    ),
    components(
        schemas(
            GoogleLoginRequest,
            UserResponse,
            AuthResponse,
            ValidateCredentialsRequest,
            ValidateCredentialsResponse,
            UserScopedRequest,
            QrTokenResponse,
            CheckQrStatusRequest,
            QrStatusResponse,
            ConfirmQrLoginRequest,
            SendCodeRequest,
            SendCodeResponse,
            VerifyCodeRequest,
            VerifyCodeResponse,
            TelegramCredentialsResponse,
            GetApiKeyRequest,
            ApiKeyResponse,
            StoreApiKeyRequest,
            SuccessResponse,
            FetchMessagesRequest,
            TelegramMessage,
            FetchMessagesResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Google sign-in and token refresh"),
        (name = "user", description = "Signed-in user"),
        (name = "settings", description = "Per-user dashboard settings"),
        (name = "functions", description = "Telegram login, credentials and message fetch"),
    ),
    info(
        title = "Telegram Dashboard API",
        version = "0.1.0",
        description = "Backend for the Telegram dashboard: Google auth, Telegram login flows and message fetch",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_function_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/functions/fetch-messages"));
        assert!(doc.paths.paths.contains_key("/settings/telegram/disconnect"));
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
