//! User entity - the only persistent account record.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2id PHC string. `None` for accounts created through Google.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: OffsetDateTime,
    /// Address the account was registered from.
    pub ip: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<OffsetDateTime>,
    #[sea_orm(unique)]
    pub google_id: Option<String>,
}

impl Model {
    /// Google-only accounts have no local password to reset.
    pub fn is_federated_only(&self) -> bool {
        self.google_id.is_some() && self.password_hash.is_none()
    }

    /// Whether the stored reset token may still be redeemed at `now`.
    ///
    /// A token expiring exactly at `now` is already expired.
    pub fn reset_token_valid_at(&self, now: OffsetDateTime) -> bool {
        self.reset_token.is_some() && self.reset_token_expires_at.is_some_and(|exp| exp > now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
