//! Login and logout.
//!
//! - `GET /login` - login form
//! - `POST /login` - check credentials and start the session
//! - `GET /logout` - end the session (behind the access gate)

use super::pages::{PageContext, render};
use crate::AppResources;
use crate::auth::authenticate;
use crate::error::{AuthError, GENERIC_ERROR_MESSAGE};
use crate::session::Session;
use askama::Template;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const AUTH_TAG: &str = "Authentication";

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    ctx: PageContext,
}

/// Form data for login submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub pass: String,
}

/// Login form routes. These sit behind the bot-check.
pub fn router() -> OpenApiRouter<AppResources> {
    OpenApiRouter::new()
        .routes(routes!(login_page, login_submit))
}

/// Logout route. Sits behind the access gate.
pub fn logout_router() -> OpenApiRouter<AppResources> {
    OpenApiRouter::new().routes(routes!(logout))
}

/// Display the login page.
#[tracing::instrument(skip(resources, session))]
#[utoipa::path(
    get,
    path = "/login",
    tag = AUTH_TAG,
    operation_id = "Login Page",
    summary = "Display the login form",
    responses(
        (status = 200, description = "Login page HTML", content_type = "text/html"),
    )
)]
pub async fn login_page(State(resources): State<AppResources>, session: Session) -> Response {
    render(&LoginTemplate {
        ctx: PageContext::new(&resources, &session),
    })
}

/// Handle login form submission.
#[tracing::instrument(skip(resources, session, form), fields(email = %form.email))]
#[utoipa::path(
    post,
    path = "/login",
    tag = AUTH_TAG,
    operation_id = "Login Submit",
    summary = "Sign in with email and password",
    description = "Checks the credentials. On success the session is bound to the user and the browser \
                   is sent to the dashboard; otherwise back to the login form with an error.",
    request_body(
        content = LoginForm,
        content_type = "application/x-www-form-urlencoded",
        description = "Login credentials"
    ),
    responses(
        (status = 303, description = "Redirect to `/` on success, `/login` on failure"),
    )
)]
pub async fn login_submit(
    State(resources): State<AppResources>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match authenticate(resources.db.as_ref(), &form.email, &form.pass).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User authenticated successfully");
            session.login(&user.id);
            Redirect::to("/").into_response()
        }
        Err(e @ AuthError::InvalidCredentials) => {
            session.flash_error(e.user_message());
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Login failed");
            session.flash_error(GENERIC_ERROR_MESSAGE);
            Redirect::to("/login").into_response()
        }
    }
}

/// End the session.
#[tracing::instrument(skip(session))]
#[utoipa::path(
    get,
    path = "/logout",
    tag = AUTH_TAG,
    operation_id = "Logout",
    summary = "Sign out",
    responses(
        (status = 303, description = "Redirect to `/login`"),
    )
)]
pub async fn logout(session: Session) -> Response {
    session.logout();
    session.flash_success("You are logged out.");
    Redirect::to("/login").into_response()
}
