//! In-memory SQLite schema for service tests, built straight from the entities.

use crate::entities::*;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

pub(crate) async fn memory_db() -> DatabaseConnection {
    // Every pooled connection would get its own memory database
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("open in-memory sqlite");

    create_table(&db, user_entity::Entity).await;
    create_table(&db, user_settings_entity::Entity).await;
    create_table(&db, telegram_credential_entity::Entity).await;
    create_table(&db, api_key_entity::Entity).await;
    create_table(&db, qr_login_token_entity::Entity).await;
    create_table(&db, telegram_session_entity::Entity).await;

    db
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let stmt = schema.create_table_from_entity(entity);
    db.execute(backend.build(&stmt))
        .await
        .expect("create table");
}
