use sea_orm::entity::prelude::*;

/// Phone OTP verification session.
///
/// Reissued in place while unverified; terminal once `consumed_at` is set.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "otp_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub address: String,
    pub client_secret: String,
    pub otp_code: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub last_sent_at: chrono::DateTime<chrono::Utc>,
    pub attempts: i16,
    pub max_attempts: i16,
    pub is_verified: bool,
    pub verified_at: Option<chrono::DateTime<chrono::Utc>>,
    pub consumed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub session_data: Json,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
