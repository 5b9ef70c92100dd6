//! Email + password authentication.

use super::password::verify_password;
use crate::entity::user;
use crate::error::AuthError;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Canonical form of a submitted email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Look up a user by (normalized) email.
pub async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, sea_orm::DbErr> {
    user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
}

/// Return the user owning `email` if `password` verifies.
///
/// Unknown email, Google-only account and wrong password all fail the same
/// way so the response does not reveal which accounts exist.
#[tracing::instrument(skip(db, password))]
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<user::Model, AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }

    let Some(user) = find_by_email(db, email).await? else {
        return Err(AuthError::InvalidCredentials);
    };

    match &user.password_hash {
        Some(hash) if verify_password(password, hash) => Ok(user),
        _ => Err(AuthError::InvalidCredentials),
    }
}
