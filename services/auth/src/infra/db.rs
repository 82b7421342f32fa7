use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use test24_auth_schema::{otp_sessions, users};

use crate::domain::repository::OtpSessionRepository;
use crate::domain::types::{LoginMetadata, OtpSession, Reissue, User};
use crate::error::AuthServiceError;

pub struct DbOtpSessionRepository {
    pub db: DatabaseConnection,
}

impl OtpSessionRepository for DbOtpSessionRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<OtpSession>, AuthServiceError> {
        let model = otp_sessions::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find otp session by id")?;
        Ok(model.map(session_from_model))
    }

    async fn find_active_by_address(
        &self,
        address: &str,
    ) -> Result<Option<OtpSession>, AuthServiceError> {
        let model = otp_sessions::Entity::find()
            .filter(otp_sessions::Column::Address.eq(address))
            .filter(otp_sessions::Column::ConsumedAt.is_null())
            .order_by_desc(otp_sessions::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find active otp session")?;
        Ok(model.map(session_from_model))
    }

    async fn create(&self, session: &OtpSession) -> Result<(), AuthServiceError> {
        otp_sessions::ActiveModel {
            id: Set(session.id),
            address: Set(session.address.clone()),
            client_secret: Set(session.client_secret.clone()),
            otp_code: Set(session.otp_code.clone()),
            expires_at: Set(session.expires_at),
            last_sent_at: Set(session.last_sent_at),
            attempts: Set(session.attempts),
            max_attempts: Set(session.max_attempts),
            is_verified: Set(session.is_verified),
            verified_at: Set(session.verified_at),
            consumed_at: Set(session.consumed_at),
            session_data: Set(session.session_data.clone()),
            created_at: Set(session.created_at),
            updated_at: Set(session.updated_at),
        }
        .insert(&self.db)
        .await
        .context("create otp session")?;
        Ok(())
    }

    async fn reissue(&self, id: Uuid, reissue: &Reissue) -> Result<bool, AuthServiceError> {
        let result = otp_sessions::Entity::update_many()
            .col_expr(
                otp_sessions::Column::OtpCode,
                Expr::value(reissue.otp_code.clone()),
            )
            .col_expr(
                otp_sessions::Column::ClientSecret,
                Expr::value(reissue.client_secret.clone()),
            )
            .col_expr(
                otp_sessions::Column::LastSentAt,
                Expr::value(reissue.last_sent_at),
            )
            .col_expr(
                otp_sessions::Column::ExpiresAt,
                Expr::value(reissue.expires_at),
            )
            .col_expr(otp_sessions::Column::Attempts, Expr::value(0i16))
            .col_expr(otp_sessions::Column::IsVerified, Expr::value(false))
            .col_expr(
                otp_sessions::Column::VerifiedAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(
                otp_sessions::Column::UpdatedAt,
                Expr::value(reissue.last_sent_at),
            )
            .filter(otp_sessions::Column::Id.eq(id))
            .filter(otp_sessions::Column::ConsumedAt.is_null())
            .filter(otp_sessions::Column::IsVerified.eq(false))
            .exec(&self.db)
            .await
            .context("reissue otp session")?;
        Ok(result.rows_affected > 0)
    }

    async fn increment_attempts(&self, id: Uuid) -> Result<Option<i16>, AuthServiceError> {
        let updated = otp_sessions::Entity::update_many()
            .col_expr(
                otp_sessions::Column::Attempts,
                Expr::col(otp_sessions::Column::Attempts).add(1),
            )
            .col_expr(otp_sessions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(otp_sessions::Column::Id.eq(id))
            .filter(
                Expr::col(otp_sessions::Column::Attempts)
                    .lt(Expr::col(otp_sessions::Column::MaxAttempts)),
            )
            .exec_with_returning(&self.db)
            .await
            .context("increment otp attempts")?;
        Ok(updated.into_iter().next().map(|m| m.attempts))
    }

    async fn mark_verified(
        &self,
        id: Uuid,
        code: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError> {
        let result = otp_sessions::Entity::update_many()
            .col_expr(otp_sessions::Column::IsVerified, Expr::value(true))
            .col_expr(otp_sessions::Column::VerifiedAt, Expr::value(Some(at)))
            .col_expr(otp_sessions::Column::UpdatedAt, Expr::value(at))
            .filter(otp_sessions::Column::Id.eq(id))
            .filter(otp_sessions::Column::ConsumedAt.is_null())
            .filter(otp_sessions::Column::OtpCode.eq(code))
            .filter(otp_sessions::Column::ExpiresAt.gt(at))
            .filter(
                Expr::col(otp_sessions::Column::Attempts)
                    .lt(Expr::col(otp_sessions::Column::MaxAttempts)),
            )
            .exec(&self.db)
            .await
            .context("mark otp session verified")?;
        Ok(result.rows_affected > 0)
    }

    async fn consume(
        &self,
        id: Uuid,
        address: &str,
        metadata: &LoginMetadata,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, AuthServiceError> {
        let session_data = serde_json::to_value(metadata).context("serialize login metadata")?;
        let address = address.to_owned();

        let model = self
            .db
            .transaction::<_, Option<users::Model>, sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    // Guarded terminal write: a concurrent consume blocks on the
                    // row lock and then matches nothing.
                    let result = otp_sessions::Entity::update_many()
                        .col_expr(otp_sessions::Column::ConsumedAt, Expr::value(Some(at)))
                        .col_expr(otp_sessions::Column::SessionData, Expr::value(session_data))
                        .col_expr(otp_sessions::Column::UpdatedAt, Expr::value(at))
                        .filter(otp_sessions::Column::Id.eq(id))
                        .filter(otp_sessions::Column::ConsumedAt.is_null())
                        .filter(otp_sessions::Column::IsVerified.eq(true))
                        .filter(otp_sessions::Column::ExpiresAt.gt(at))
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Ok(None);
                    }

                    let fresh = User::new(&address, at);
                    users::Entity::insert(users::ActiveModel {
                        id: Set(fresh.id),
                        phone_number: Set(fresh.phone_number),
                        first_name: Set(fresh.first_name),
                        last_name: Set(fresh.last_name),
                        is_active: Set(fresh.is_active),
                        is_staff: Set(fresh.is_staff),
                        date_joined: Set(fresh.date_joined),
                    })
                    .on_conflict(
                        OnConflict::column(users::Column::PhoneNumber)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await?;

                    let user = users::Entity::find()
                        .filter(users::Column::PhoneNumber.eq(address.as_str()))
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            sea_orm::DbErr::RecordNotFound(format!("user {address}"))
                        })?;
                    Ok(Some(user))
                })
            })
            .await
            .context("consume otp session")?;

        Ok(model.map(user_from_model))
    }
}

fn session_from_model(model: otp_sessions::Model) -> OtpSession {
    OtpSession {
        id: model.id,
        address: model.address,
        client_secret: model.client_secret,
        otp_code: model.otp_code,
        expires_at: model.expires_at,
        last_sent_at: model.last_sent_at,
        attempts: model.attempts,
        max_attempts: model.max_attempts,
        is_verified: model.is_verified,
        verified_at: model.verified_at,
        consumed_at: model.consumed_at,
        session_data: model.session_data,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id,
        phone_number: model.phone_number,
        first_name: model.first_name,
        last_name: model.last_name,
        is_active: model.is_active,
        is_staff: model.is_staff,
        date_joined: model.date_joined,
    }
}
