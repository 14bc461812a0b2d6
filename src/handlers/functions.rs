//! Remote functions called by the dashboard. Every body names the user it acts
//! for, and that user must match the access token.

use crate::middlewares::authorize_user;
use crate::models::*;
use crate::services::{CredentialService, MessageService, TelegramLoginService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde::Serialize;
use serde_json::json;

fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": data
    }))
}

#[utoipa::path(
    post,
    path = "/functions/validate-credentials",
    tag = "functions",
    request_body = ValidateCredentialsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Validation outcome, including failures", body = ValidateCredentialsResponse)
    )
)]
pub async fn validate_credentials(
    credential_service: web::Data<CredentialService>,
    req: HttpRequest,
    request: web::Json<ValidateCredentialsRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    if let Some(claimed) = request.user_id
        && authorize_user(&req, claimed).is_err()
    {
        return Ok(ok(ValidateCredentialsResponse::invalid(
            "User id does not match the signed-in user",
        )));
    }

    Ok(ok(credential_service.validate_credentials(request).await))
}

#[utoipa::path(
    post,
    path = "/functions/get-qr-token",
    tag = "functions",
    request_body = UserScopedRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Fresh single-use login token", body = QrTokenResponse),
        (status = 403, description = "User id does not match the token")
    )
)]
pub async fn get_qr_token(
    login_service: web::Data<TelegramLoginService>,
    req: HttpRequest,
    request: web::Json<UserScopedRequest>,
) -> Result<HttpResponse> {
    let user_id = match authorize_user(&req, request.user_id) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match login_service.create_qr_token(user_id).await {
        Ok(response) => Ok(ok(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/functions/check-qr-status",
    tag = "functions",
    request_body = CheckQrStatusRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current login status of the token", body = QrStatusResponse),
        (status = 403, description = "Token belongs to another user")
    )
)]
pub async fn check_qr_status(
    login_service: web::Data<TelegramLoginService>,
    req: HttpRequest,
    request: web::Json<CheckQrStatusRequest>,
) -> Result<HttpResponse> {
    let user_id = match authorize_user(&req, request.user_id) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match login_service.check_qr_status(user_id, &request.token).await {
        Ok(response) => Ok(ok(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/functions/send-code",
    tag = "functions",
    request_body = SendCodeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Login code sent", body = SendCodeResponse),
        (status = 400, description = "Malformed phone number"),
        (status = 502, description = "Telegram rejected the request")
    )
)]
pub async fn send_code(
    login_service: web::Data<TelegramLoginService>,
    req: HttpRequest,
    request: web::Json<SendCodeRequest>,
) -> Result<HttpResponse> {
    let user_id = match authorize_user(&req, request.user_id) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match login_service.send_code(user_id, &request.phone).await {
        Ok(response) => Ok(ok(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/functions/verify-code",
    tag = "functions",
    request_body = VerifyCodeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Signed in to Telegram", body = VerifyCodeResponse),
        (status = 400, description = "Malformed phone number or code"),
        (status = 502, description = "PHONE_CODE_INVALID, PHONE_CODE_EXPIRED or SESSION_PASSWORD_NEEDED")
    )
)]
pub async fn verify_code(
    login_service: web::Data<TelegramLoginService>,
    req: HttpRequest,
    request: web::Json<VerifyCodeRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = authorize_user(&req, request.user_id) {
        return Ok(e.error_response());
    }

    match login_service.verify_code(request.into_inner()).await {
        Ok(response) => Ok(ok(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/functions/get-telegram-credentials",
    tag = "functions",
    request_body = UserScopedRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Stored API id and hash, if any", body = TelegramCredentialsResponse)
    )
)]
pub async fn get_telegram_credentials(
    credential_service: web::Data<CredentialService>,
    req: HttpRequest,
    request: web::Json<UserScopedRequest>,
) -> Result<HttpResponse> {
    let user_id = match authorize_user(&req, request.user_id) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match credential_service.get_telegram_credentials(user_id).await {
        Ok(response) => Ok(ok(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/functions/get-api-key",
    tag = "functions",
    request_body = GetApiKeyRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Stored key for the service, if any", body = ApiKeyResponse)
    )
)]
pub async fn get_api_key(
    credential_service: web::Data<CredentialService>,
    req: HttpRequest,
    request: web::Json<GetApiKeyRequest>,
) -> Result<HttpResponse> {
    let user_id = match authorize_user(&req, request.user_id) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match credential_service.get_api_key(user_id, &request.service).await {
        Ok(response) => Ok(ok(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/functions/store-api-key",
    tag = "functions",
    request_body = StoreApiKeyRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Key stored", body = SuccessResponse),
        (status = 400, description = "Missing service or key")
    )
)]
pub async fn store_api_key(
    credential_service: web::Data<CredentialService>,
    req: HttpRequest,
    request: web::Json<StoreApiKeyRequest>,
) -> Result<HttpResponse> {
    let user_id = match authorize_user(&req, request.user_id) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match credential_service
        .store_api_key(user_id, &request.service, &request.api_key)
        .await
    {
        Ok(response) => Ok(ok(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/functions/fetch-messages",
    tag = "functions",
    request_body = FetchMessagesRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Messages per handle; failed handles carry an error entry", body = FetchMessagesResponse)
    )
)]
pub async fn fetch_messages(
    message_service: web::Data<MessageService>,
    req: HttpRequest,
    request: web::Json<FetchMessagesRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = authorize_user(&req, request.user_id) {
        return Ok(e.error_response());
    }

    match message_service.fetch_messages(request.into_inner()).await {
        Ok(response) => Ok(ok(response)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn functions_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/functions")
            .route("/validate-credentials", web::post().to(validate_credentials))
            .route("/get-qr-token", web::post().to(get_qr_token))
            .route("/check-qr-status", web::post().to(check_qr_status))
            .route("/send-code", web::post().to(send_code))
            .route("/verify-code", web::post().to(verify_code))
            .route("/get-telegram-credentials", web::post().to(get_telegram_credentials))
            .route("/get-api-key", web::post().to(get_api_key))
            .route("/store-api-key", web::post().to(store_api_key))
            .route("/fetch-messages", web::post().to(fetch_messages)),
    );
}
