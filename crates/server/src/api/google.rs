//! Sign in with Google.
//!
//! - `GET /google` - start the authorization code flow
//! - `GET /google/callback` - finish it and sign the user in
//!
//! Only mounted when `google.enabled` is set.

use super::login::AUTH_TAG;
use crate::AppResources;
use crate::auth::google::{GoogleClient, sign_in};
use crate::auth::password::generate_state_token;
use crate::error::{AuthError, ErrorKind, GENERIC_ERROR_MESSAGE};
use crate::session::Session;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    /// Authorization code issued by Google.
    pub code: Option<String>,
    /// Echo of the `state` sent with the authorization request.
    pub state: Option<String>,
    /// Set instead of `code` when the user declined.
    pub error: Option<String>,
}

pub fn router() -> OpenApiRouter<AppResources> {
    OpenApiRouter::new()
        .routes(routes!(google_start))
        .routes(routes!(google_callback))
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/google",
    tag = AUTH_TAG,
    operation_id = "Google Sign-In",
    summary = "Redirect to Google to sign in",
    responses(
        (status = 303, description = "Redirect to the Google consent screen"),
    )
)]
pub async fn google_start(State(resources): State<AppResources>, session: Session) -> Response {
    let state = match generate_state_token() {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to generate sign-in state");
            session.flash_error(GENERIC_ERROR_MESSAGE);
            return Redirect::to("/login").into_response();
        }
    };

    let client = GoogleClient::new(&resources.http, &resources.config.google);
    match client.authorize_url(&state) {
        Ok(url) => {
            session.set_oauth_state(state);
            Redirect::to(&url).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Invalid Google authorization URL");
            session.flash_error(GENERIC_ERROR_MESSAGE);
            Redirect::to("/login").into_response()
        }
    }
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/google/callback",
    tag = AUTH_TAG,
    operation_id = "Google Callback",
    summary = "Complete Google sign-in",
    description = "Verifies the anti-forgery state, exchanges the code for the user's identity and \
                   signs them in. An email that already belongs to a local account is refused.",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Redirect to `/` on success, `/login` otherwise"),
    )
)]
pub async fn google_callback(
    State(resources): State<AppResources>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match complete_sign_in(&resources, &session, query).await {
        Ok(user_id) => {
            tracing::info!(user_id = %user_id, "User signed in with Google");
            session.login(&user_id);
            Redirect::to("/").into_response()
        }
        Err(e) => {
            if e.kind() == ErrorKind::ExternalService {
                tracing::error!(error = %e, "Google sign-in failed");
            } else {
                tracing::info!(error = %e, "Google sign-in refused");
            }
            session.flash_error(e.user_message());
            Redirect::to("/login").into_response()
        }
    }
}

async fn complete_sign_in(
    resources: &AppResources,
    session: &Session,
    query: CallbackQuery,
) -> Result<String, AuthError> {
    let expected = session.take_oauth_state();
    if expected.is_none() || expected != query.state {
        return Err(AuthError::StateMismatch);
    }

    if let Some(error) = query.error {
        tracing::info!(%error, "Google returned an error");
        return Err(AuthError::StateMismatch);
    }
    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        return Err(AuthError::StateMismatch);
    };

    let identity = GoogleClient::new(&resources.http, &resources.config.google)
        .fetch_identity(&code)
        .await?;
    let user = sign_in(resources.db.as_ref(), &identity).await?;
    Ok(user.id)
}
