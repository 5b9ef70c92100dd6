//! Password reset by email.
//!
//! Requesting a reset runs three steps, each feeding the next:
//!
//! 1. [`generate_reset_token`] - fresh random token
//! 2. [`assign_reset_token`] - find the account, store token and expiry
//! 3. [`send_reset_email`] - mail the link
//!
//! Redeeming is a separate request: [`redeem_reset_token`] checks the token
//! and the new password, then rewrites the credential and clears the token.
//! The caller signs the user in and calls [`send_password_changed_email`].

use super::credentials::find_by_email;
use super::password::{generate_reset_token, hash_password, password_errors};
use crate::AppResources;
use crate::email_templates::{PasswordChangedEmailTemplate, ResetPasswordEmailTemplate};
use crate::entity::user;
use crate::error::AuthError;
use crate::mail::{MailError, send_text};
use askama::Template;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::Expr,
};
use time::{Duration, OffsetDateTime};

/// How long a reset token stays valid: 30 minutes (1,800,000 ms).
pub const RESET_TOKEN_TTL: Duration = Duration::milliseconds(1_800_000);

/// Run the whole request-a-reset pipeline for `email`.
///
/// A mail failure is reported, but the stored token is not rolled back and
/// stays redeemable.
#[tracing::instrument(skip(resources))]
pub async fn request_reset(
    resources: &AppResources,
    email: &str,
    now: OffsetDateTime,
) -> Result<user::Model, AuthError> {
    let token = generate_reset_token()?;
    let user = assign_reset_token(resources.db.as_ref(), email, &token, now).await?;
    send_reset_email(resources, &user, &token).await?;
    tracing::info!(user_id = %user.id, "Password reset email sent");
    Ok(user)
}

/// Store `token` on the account owning `email`, expiring [`RESET_TOKEN_TTL`] after `now`.
pub async fn assign_reset_token(
    db: &DatabaseConnection,
    email: &str,
    token: &str,
    now: OffsetDateTime,
) -> Result<user::Model, AuthError> {
    let Some(user) = find_by_email(db, email).await? else {
        return Err(AuthError::AccountNotFound);
    };

    if user.is_federated_only() {
        return Err(AuthError::FederatedAccount);
    }

    let mut active: user::ActiveModel = user.into();
    active.reset_token = Set(Some(token.to_string()));
    active.reset_token_expires_at = Set(Some(now + RESET_TOKEN_TTL));
    Ok(active.update(db).await?)
}

/// Link embedded in the reset email.
pub fn reset_url(public_url: &str, token: &str) -> String {
    format!("{}/reset/{}", public_url.trim_end_matches('/'), token)
}

pub async fn send_reset_email(
    resources: &AppResources,
    user: &user::Model,
    token: &str,
) -> Result<(), MailError> {
    let body = ResetPasswordEmailTemplate {
        name: user.name.clone(),
        reset_url: reset_url(&resources.config.public_url, token),
        valid_minutes: RESET_TOKEN_TTL.whole_minutes(),
    }
    .render()?;

    send_text(
        resources.mailer.as_ref(),
        &resources.config.smtp.from,
        &user.email,
        ResetPasswordEmailTemplate::SUBJECT,
        body,
    )
    .await
}

/// The account holding `token`, if the token is still valid at `now`.
///
/// A matching token that has already expired is cleared on the way out.
pub async fn find_by_valid_token(
    db: &DatabaseConnection,
    token: &str,
    now: OffsetDateTime,
) -> Result<Option<user::Model>, sea_orm::DbErr> {
    if token.is_empty() {
        return Ok(None);
    }
    let Some(user) = user::Entity::find()
        .filter(user::Column::ResetToken.eq(token))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    if user.reset_token_valid_at(now) {
        return Ok(Some(user));
    }

    let cleared = clear_reset_token(db, &user.id, token).await?;
    if cleared {
        tracing::debug!(user_id = %user.id, "Cleared expired reset token");
    }
    Ok(None)
}

/// Null out token and expiry, but only if `token` is still the stored one.
async fn clear_reset_token(
    db: &DatabaseConnection,
    user_id: &str,
    token: &str,
) -> Result<bool, sea_orm::DbErr> {
    let result = user::Entity::update_many()
        .col_expr(user::Column::ResetToken, Expr::value(Option::<String>::None))
        .col_expr(
            user::Column::ResetTokenExpiresAt,
            Expr::value(Option::<OffsetDateTime>::None),
        )
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::ResetToken.eq(token))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Set a new password using a reset token.
///
/// The token is consumed with a single conditional update, so of two
/// concurrent redemptions only one succeeds; the other sees
/// [`AuthError::TokenInvalid`]. On success the returned user has no reset
/// token or expiry left.
#[tracing::instrument(skip_all)]
pub async fn redeem_reset_token(
    db: &DatabaseConnection,
    token: &str,
    password: &str,
    confirmation: &str,
    now: OffsetDateTime,
) -> Result<user::Model, AuthError> {
    let Some(user) = find_by_valid_token(db, token, now).await? else {
        return Err(AuthError::TokenInvalid);
    };

    let errors = password_errors(password, confirmation);
    if !errors.is_empty() {
        return Err(AuthError::Validation(errors));
    }

    let password_hash = hash_password(password)?;

    let result = user::Entity::update_many()
        .col_expr(
            user::Column::PasswordHash,
            Expr::value(Some(password_hash.clone())),
        )
        .col_expr(user::Column::ResetToken, Expr::value(Option::<String>::None))
        .col_expr(
            user::Column::ResetTokenExpiresAt,
            Expr::value(Option::<OffsetDateTime>::None),
        )
        .filter(user::Column::Id.eq(&user.id))
        .filter(user::Column::ResetToken.eq(token))
        .exec(db)
        .await?;

    if result.rows_affected != 1 {
        tracing::info!(user_id = %user.id, "Reset token already consumed");
        return Err(AuthError::TokenInvalid);
    }

    tracing::info!(user_id = %user.id, "Password reset completed");
    Ok(user::Model {
        password_hash: Some(password_hash),
        reset_token: None,
        reset_token_expires_at: None,
        ..user
    })
}

pub async fn send_password_changed_email(
    resources: &AppResources,
    user: &user::Model,
) -> Result<(), MailError> {
    let body = PasswordChangedEmailTemplate {
        name: user.name.clone(),
    }
    .render()?;

    send_text(
        resources.mailer.as_ref(),
        &resources.config.smtp.from,
        &user.email,
        PasswordChangedEmailTemplate::SUBJECT,
        body,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_thirty_minutes() {
        assert_eq!(RESET_TOKEN_TTL.whole_milliseconds(), 1_800_000);
        assert_eq!(RESET_TOKEN_TTL.whole_minutes(), 30);
    }

    #[test]
    fn reset_url_handles_trailing_slash() {
        assert_eq!(
            reset_url("https://example.org/", "abc"),
            "https://example.org/reset/abc"
        );
        assert_eq!(
            reset_url("https://example.org", "abc"),
            "https://example.org/reset/abc"
        );
    }
}
