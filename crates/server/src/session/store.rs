use super::SessionData;
use crate::config::SessionConfig;
use crate::entity::session;
use crate::error::AuthError;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, sea_query::Expr,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

/// A session loaded from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub id: String,
    pub data: SessionData,
}

/// Database side of the session manager.
#[derive(Clone)]
pub struct SessionStore {
    db: Arc<DatabaseConnection>,
    secret: String,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(db: Arc<DatabaseConnection>, config: &SessionConfig) -> Self {
        Self {
            db,
            secret: config.secret.clone(),
            max_age: Duration::seconds(i64::try_from(config.max_age_secs).unwrap_or(i64::MAX)),
        }
    }

    /// Generate a fresh cookie token (32 random bytes, hex).
    pub fn generate_token() -> Result<String, AuthError> {
        let mut bytes = [0u8; 32];
        getrandom::fill(&mut bytes)?;
        Ok(hex::encode(bytes))
    }

    /// Row id for a cookie token. Only this keyed hash is ever stored.
    pub fn session_id(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update([0u8]);
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Look up the session behind `token`. Unknown and expired sessions yield `None`.
    pub async fn load(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<StoredSession>, DbErr> {
        let id = self.session_id(token);
        let Some(record) = session::Entity::find_by_id(&id)
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(None);
        };

        if record.is_expired_at(now) {
            return Ok(None);
        }

        let mut data: SessionData = match serde_json::from_str(&record.data) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session data");
                SessionData::default()
            }
        };
        // The column is authoritative for the signed-in user.
        data.user_id = record.user_id;

        Ok(Some(StoredSession { id, data }))
    }

    /// Insert a new session and return the cookie token for it.
    pub async fn create(&self, data: &SessionData, now: OffsetDateTime) -> Result<String, AuthError> {
        let token = Self::generate_token()?;
        let record = session::ActiveModel {
            id: Set(self.session_id(&token)),
            user_id: Set(data.user_id.clone()),
            data: Set(encode(data)?),
            created_at: Set(now),
            expires_at: Set(now + self.max_age),
        };
        record.insert(self.db.as_ref()).await?;
        Ok(token)
    }

    /// Overwrite the data of an existing session. Expiry is not extended.
    pub async fn update(&self, id: &str, data: &SessionData) -> Result<(), DbErr> {
        session::Entity::update_many()
            .col_expr(session::Column::UserId, Expr::value(data.user_id.clone()))
            .col_expr(session::Column::Data, Expr::value(encode(data)?))
            .filter(session::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), DbErr> {
        session::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Remove every session that expired before `now`.
    pub async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, DbErr> {
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(now))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}

fn encode(data: &SessionData) -> Result<String, DbErr> {
    serde_json::to_string(data).map_err(|e| DbErr::Custom(format!("session encode: {e}")))
}
