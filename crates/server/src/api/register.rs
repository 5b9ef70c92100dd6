//! Account registration.
//!
//! - `GET /register` - registration form
//! - `POST /register` - create the account and sign in

use super::client_ip::ClientIp;
use super::login::AUTH_TAG;
use super::pages::{PageContext, render};
use crate::AppResources;
use crate::auth::registration::{RegistrationForm, register};
use crate::error::{ErrorKind, GENERIC_ERROR_MESSAGE};
use crate::session::Session;
use askama::Template;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Registration page template.
#[derive(Template)]
#[template(path = "register.html")]
struct RegisterTemplate {
    ctx: PageContext,
    errors: Vec<String>,
    // Preserved form values
    name: String,
    email: String,
}

pub fn router() -> OpenApiRouter<AppResources> {
    OpenApiRouter::new()
        .routes(routes!(register_page, register_submit))
}

/// Display the registration page.
#[tracing::instrument(skip(resources, session))]
#[utoipa::path(
    get,
    path = "/register",
    tag = AUTH_TAG,
    operation_id = "Register Page",
    summary = "Display the registration form",
    responses(
        (status = 200, description = "Registration page HTML", content_type = "text/html"),
    )
)]
pub async fn register_page(State(resources): State<AppResources>, session: Session) -> Response {
    render(&RegisterTemplate {
        ctx: PageContext::new(&resources, &session),
        errors: Vec::new(),
        name: String::new(),
        email: String::new(),
    })
}

/// Handle registration form submission.
#[tracing::instrument(skip(resources, session, form), fields(email = %form.email))]
#[utoipa::path(
    post,
    path = "/register",
    tag = AUTH_TAG,
    operation_id = "Register Submit",
    summary = "Create a local account",
    description = "Validates all fields and reports every failing rule at once. A taken email address \
                   stops registration. On success the new user is signed in.",
    request_body(
        content = RegistrationForm,
        content_type = "application/x-www-form-urlencoded",
        description = "Registration data"
    ),
    responses(
        (status = 303, description = "Redirect to `/` after the account is created"),
        (status = 200, description = "Registration form re-rendered with errors", content_type = "text/html"),
    )
)]
pub async fn register_submit(
    State(resources): State<AppResources>,
    session: Session,
    ClientIp(ip): ClientIp,
    Form(form): Form<RegistrationForm>,
) -> Response {
    match register(resources.db.as_ref(), &form, ip).await {
        Ok(user) => {
            session.login(&user.id);
            session.flash_success("Registration successful!");
            Redirect::to("/").into_response()
        }
        Err(e) if e.kind() == ErrorKind::Validation => render(&RegisterTemplate {
            ctx: PageContext::new(&resources, &session),
            errors: e.messages(),
            name: form.name,
            email: form.email,
        }),
        Err(e) => {
            tracing::error!(error = %e, "Failed to register user");
            session.flash_error(GENERIC_ERROR_MESSAGE);
            Redirect::to("/register").into_response()
        }
    }
}
