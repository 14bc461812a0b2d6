use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum TelegramCredentials {
    Table,
    UserId,
    ApiId,
    ApiHash,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApiKeys {
    Table,
    Id,
    UserId,
    Service,
    ApiKey,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum QrLoginTokens {
    Table,
    Token,
    UserId,
    Status,
    SessionId,
    ExpiresAt,
    CreatedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum TelegramSessions {
    Table,
    UserId,
    SessionId,
    Method,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TelegramCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TelegramCredentials::UserId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TelegramCredentials::ApiId).string().not_null())
                    .col(ColumnDef::new(TelegramCredentials::ApiHash).string().not_null())
                    .col(
                        ColumnDef::new(TelegramCredentials::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TelegramCredentials::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApiKeys::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiKeys::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApiKeys::UserId).big_integer().not_null())
                    .col(ColumnDef::new(ApiKeys::Service).string().not_null())
                    .col(ColumnDef::new(ApiKeys::ApiKey).text().not_null())
                    .col(
                        ColumnDef::new(ApiKeys::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ApiKeys::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_api_keys_user_service_unique")
                    .table(ApiKeys::Table)
                    .col(ApiKeys::UserId)
                    .col(ApiKeys::Service)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // QR login tokens: pending -> completed, never back
        manager
            .create_table(
                Table::create()
                    .table(QrLoginTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QrLoginTokens::Token)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QrLoginTokens::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(QrLoginTokens::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(QrLoginTokens::SessionId).text().null())
                    .col(
                        ColumnDef::new(QrLoginTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QrLoginTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(QrLoginTokens::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_qr_login_tokens_user")
                    .table(QrLoginTokens::Table)
                    .col(QrLoginTokens::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_qr_login_tokens_expires_at")
                    .table(QrLoginTokens::Table)
                    .col(QrLoginTokens::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TelegramSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TelegramSessions::UserId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TelegramSessions::SessionId).text().not_null())
                    .col(ColumnDef::new(TelegramSessions::Method).string().not_null())
                    .col(
                        ColumnDef::new(TelegramSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TelegramSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QrLoginTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApiKeys::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TelegramCredentials::Table).to_owned())
            .await
    }
}
