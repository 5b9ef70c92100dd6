//! Local account registration.

use super::credentials::{find_by_email, normalize_email};
use super::password::{hash_password, password_errors};
use crate::entity::user;
use crate::error::AuthError;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, SqlErr};
use serde::Deserialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

pub const MISSING_FIELDS: &str = "Please fill all fields!";

/// Form data for registration submission.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct RegistrationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub pass2: String,
}

/// Run every field check and collect all failures.
pub fn validate(form: &RegistrationForm) -> Vec<String> {
    let mut errors = Vec::new();
    if form.name.trim().is_empty()
        || form.email.trim().is_empty()
        || form.pass.is_empty()
        || form.pass2.is_empty()
    {
        errors.push(MISSING_FIELDS.to_string());
    }
    errors.extend(password_errors(&form.pass, &form.pass2));
    errors
}

/// Validate the form and create the account.
///
/// A duplicate email stops before any write. Two racing registrations for the
/// same address are settled by the unique index; the loser gets the same
/// [`AuthError::EmailTaken`].
#[tracing::instrument(skip(db, form), fields(email = %form.email))]
pub async fn register(
    db: &DatabaseConnection,
    form: &RegistrationForm,
    ip: Option<String>,
) -> Result<user::Model, AuthError> {
    let errors = validate(form);
    if !errors.is_empty() {
        return Err(AuthError::Validation(errors));
    }

    if find_by_email(db, &form.email).await?.is_some() {
        return Err(AuthError::EmailTaken);
    }

    let password_hash = hash_password(&form.pass)?;

    let user = user::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        name: Set(form.name.trim().to_string()),
        email: Set(normalize_email(&form.email)),
        password_hash: Set(Some(password_hash)),
        created_at: Set(OffsetDateTime::now_utc()),
        ip: Set(ip),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        google_id: Set(None),
    };

    match user.insert(db).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User registered");
            Ok(user)
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(AuthError::EmailTaken)
        }
        Err(e) => Err(e.into()),
    }
}
