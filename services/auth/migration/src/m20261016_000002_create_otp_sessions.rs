use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OtpSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OtpSessions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OtpSessions::Address).string_len(32).not_null())
                    .col(
                        ColumnDef::new(OtpSessions::ClientSecret)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(OtpSessions::OtpCode).string_len(8).not_null())
                    .col(
                        ColumnDef::new(OtpSessions::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OtpSessions::LastSentAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OtpSessions::Attempts)
                            .small_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OtpSessions::MaxAttempts)
                            .small_integer()
                            .not_null()
                            .default(5),
                    )
                    .col(
                        ColumnDef::new(OtpSessions::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(OtpSessions::VerifiedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(OtpSessions::ConsumedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(OtpSessions::SessionData)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(OtpSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OtpSessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Active-session lookup: WHERE address = ? AND consumed_at IS NULL ORDER BY created_at DESC.
        manager
            .create_index(
                Index::create()
                    .table(OtpSessions::Table)
                    .col(OtpSessions::Address)
                    .col(OtpSessions::CreatedAt)
                    .name("idx_otp_sessions_address_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OtpSessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum OtpSessions {
    Table,
    Id,
    Address,
    ClientSecret,
    OtpCode,
    ExpiresAt,
    LastSentAt,
    Attempts,
    MaxAttempts,
    IsVerified,
    VerifiedAt,
    ConsumedAt,
    SessionData,
    CreatedAt,
    UpdatedAt,
}
