use actix_web::{App, HttpResponse, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use tgdash_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{GoogleIdentityService, build_telegram},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    let google = GoogleIdentityService::new(config.google.clone());
    let (gateway, message_source) =
        build_telegram(&config.telegram).expect("Failed to set up the Telegram backend");

    let auth_service = AuthService::new(pool.clone(), jwt_service.clone(), google);
    let settings_service = SettingsService::new(pool.clone());
    let credential_service = CredentialService::new(pool.clone(), gateway.clone());
    let login_service = TelegramLoginService::new(
        pool.clone(),
        gateway,
        credential_service.clone(),
        settings_service.clone(),
        config.telegram.qr_token_ttl_secs,
    );
    let message_service = MessageService::new(
        pool.clone(),
        message_source,
        config.telegram.default_message_limit,
    );

    tasks::spawn_all(login_service.clone());

    log::info!(
        "Starting HTTP server at {}:{} (telegram mode: {:?})",
        config.server.host,
        config.server.port,
        config.telegram.mode,
    );

    let telegram_config = config.telegram.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(telegram_config.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(settings_service.clone()))
            .app_data(web::Data::new(credential_service.clone()))
            .app_data(web::Data::new(login_service.clone()))
            .app_data(web::Data::new(message_service.clone()))
            .route("/health", web::get().to(|| async { HttpResponse::Ok().body("ok") }))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config)
                    .configure(handlers::settings_config)
                    .configure(handlers::functions_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
