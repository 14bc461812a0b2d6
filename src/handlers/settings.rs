use crate::middlewares::current_user_id;
use crate::models::*;
use crate::services::SettingsService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Settings document of the signed-in user"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_settings(
    settings_service: web::Data<SettingsService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match settings_service.get_settings(user_id).await {
        Ok(settings) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": settings
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Settings replaced"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn update_settings(
    settings_service: web::Data<SettingsService>,
    req: HttpRequest,
    request: web::Json<UserSettings>,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match settings_service
        .update_settings(user_id, request.into_inner())
        .await
    {
        Ok(settings) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": settings
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/settings/telegram/disconnect",
    tag = "settings",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Telegram session removed, integration disabled"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn disconnect_telegram(
    settings_service: web::Data<SettingsService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match current_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match settings_service.disconnect_telegram(user_id).await {
        Ok(settings) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": settings,
            "message": "Telegram disconnected"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn settings_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/settings")
            .route("", web::get().to(get_settings))
            .route("", web::put().to(update_settings))
            .route("/telegram/disconnect", web::post().to(disconnect_telegram)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::memory_db;
    use crate::middlewares::AuthMiddleware;
    use crate::utils::JwtService;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;

    const SECRET: &str = "settings-test-secret";

    fn bearer(user_id: i64) -> (&'static str, String) {
        let jwt = JwtService::new(SECRET, 600, 1200);
        let token = jwt
            .generate_access_token(user_id, "tester@example.com")
            .unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    #[actix_web::test]
    async fn test_settings_routes_through_auth() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(JwtService::new(SECRET, 600, 1200)))
                .app_data(web::Data::new(SettingsService::new(memory_db().await)))
                .service(web::scope("/api/v1").configure(settings_config)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/settings").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::get()
            .uri("/api/v1/settings")
            .insert_header(bearer(5))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], json!({}));

        let req = test::TestRequest::put()
            .uri("/api/v1/settings")
            .insert_header(bearer(5))
            .set_json(json!({
                "telegramIntegrationEnabled": true,
                "watchedHandles": ["alice"],
                "theme": "dark"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["theme"], "dark");

        let req = test::TestRequest::post()
            .uri("/api/v1/settings/telegram/disconnect")
            .insert_header(bearer(5))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["telegramIntegrationEnabled"], false);
        assert_eq!(body["data"]["watchedHandles"], json!(["alice"]));

        // another user sees none of it
        let req = test::TestRequest::get()
            .uri("/api/v1/settings")
            .insert_header(bearer(6))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"], json!({}));
    }
}
