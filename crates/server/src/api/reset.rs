//! Password reset.
//!
//! - `GET /reset` - ask for the account email
//! - `POST /reset` - mail a reset link
//! - `GET /reset/{token}` - new password form, valid tokens only
//! - `POST /reset/{token}` - set the new password and sign in

use super::login::AUTH_TAG;
use super::pages::{PageContext, render};
use crate::AppResources;
use crate::auth::reset::{
    find_by_valid_token, redeem_reset_token, request_reset, send_password_changed_email,
};
use crate::error::{AuthError, GENERIC_ERROR_MESSAGE};
use crate::session::Session;
use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Template)]
#[template(path = "reset.html")]
struct ResetTemplate {
    ctx: PageContext,
}

#[derive(Template)]
#[template(path = "new_password.html")]
struct NewPasswordTemplate {
    ctx: PageContext,
    token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetRequestForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewPasswordForm {
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub pass2: String,
}

pub fn router() -> OpenApiRouter<AppResources> {
    OpenApiRouter::new()
        .routes(routes!(reset_page, reset_submit))
        .routes(routes!(new_password_page, new_password_submit))
}

#[tracing::instrument(skip(resources, session))]
#[utoipa::path(
    get,
    path = "/reset",
    tag = AUTH_TAG,
    operation_id = "Reset Page",
    summary = "Display the password reset request form",
    responses(
        (status = 200, description = "Reset page HTML", content_type = "text/html"),
    )
)]
pub async fn reset_page(State(resources): State<AppResources>, session: Session) -> Response {
    render(&ResetTemplate {
        ctx: PageContext::new(&resources, &session),
    })
}

/// Email a reset link to the account owner.
#[tracing::instrument(skip(resources, session, form), fields(email = %form.email))]
#[utoipa::path(
    post,
    path = "/reset",
    tag = AUTH_TAG,
    operation_id = "Reset Submit",
    summary = "Request a password reset link",
    description = "Stores a reset token valid for 30 minutes and emails a link to it. \
                   Accounts that only sign in with Google cannot be reset.",
    request_body(
        content = ResetRequestForm,
        content_type = "application/x-www-form-urlencoded",
        description = "Account email"
    ),
    responses(
        (status = 303, description = "Redirect to `/login` once the email is sent, otherwise back to `/reset`"),
    )
)]
pub async fn reset_submit(
    State(resources): State<AppResources>,
    session: Session,
    Form(form): Form<ResetRequestForm>,
) -> Response {
    match request_reset(&resources, &form.email, OffsetDateTime::now_utc()).await {
        Ok(_) => {
            session.flash_success("Please check your email inbox for instructions.");
            Redirect::to("/login").into_response()
        }
        Err(e @ AuthError::AccountNotFound) => {
            session.flash_error(e.user_message());
            Redirect::to("/reset").into_response()
        }
        Err(e @ AuthError::FederatedAccount) => {
            session.flash_error(e.user_message());
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Password reset request failed");
            session.flash_error(GENERIC_ERROR_MESSAGE);
            Redirect::to("/reset").into_response()
        }
    }
}

/// Show the new password form if the token is still good.
#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/reset/{token}",
    tag = AUTH_TAG,
    operation_id = "New Password Page",
    summary = "Display the new password form",
    params(
        ("token" = String, Path, description = "Reset token from the emailed link")
    ),
    responses(
        (status = 200, description = "New password form HTML", content_type = "text/html"),
        (status = 303, description = "Token unknown or expired; redirect to `/reset`"),
    )
)]
pub async fn new_password_page(
    State(resources): State<AppResources>,
    session: Session,
    Path(token): Path<String>,
) -> Response {
    match find_by_valid_token(resources.db.as_ref(), &token, OffsetDateTime::now_utc()).await {
        Ok(Some(_)) => render(&NewPasswordTemplate {
            ctx: PageContext::new(&resources, &session),
            token,
        }),
        Ok(None) => {
            session.flash_error(AuthError::TokenInvalid.user_message());
            Redirect::to("/reset").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to look up reset token");
            session.flash_error(GENERIC_ERROR_MESSAGE);
            Redirect::to("/reset").into_response()
        }
    }
}

/// Set the new password, sign the user in and send a confirmation email.
#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/reset/{token}",
    tag = AUTH_TAG,
    operation_id = "New Password Submit",
    summary = "Set a new password with a reset token",
    params(
        ("token" = String, Path, description = "Reset token from the emailed link")
    ),
    request_body(
        content = NewPasswordForm,
        content_type = "application/x-www-form-urlencoded",
        description = "New password and confirmation"
    ),
    responses(
        (status = 303, description = "Redirect to `/` on success, `/reset` for a bad token, \
                                      back to the form for an invalid password"),
    )
)]
pub async fn new_password_submit(
    State(resources): State<AppResources>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<NewPasswordForm>,
) -> Response {
    let result = redeem_reset_token(
        resources.db.as_ref(),
        &token,
        &form.pass,
        &form.pass2,
        OffsetDateTime::now_utc(),
    )
    .await;

    match result {
        Ok(user) => {
            session.login(&user.id);
            session.flash_success("Password changed successfully!");
            if let Err(e) = send_password_changed_email(&resources, &user).await {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to send password changed email");
            }
            Redirect::to("/").into_response()
        }
        Err(e @ AuthError::TokenInvalid) => {
            session.flash_error(e.user_message());
            Redirect::to("/reset").into_response()
        }
        Err(AuthError::Validation(errors)) => {
            for message in errors {
                session.flash_error(message);
            }
            Redirect::to(&format!("/reset/{token}")).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Password reset failed");
            session.flash_error(GENERIC_ERROR_MESSAGE);
            Redirect::to("/reset").into_response()
        }
    }
}
