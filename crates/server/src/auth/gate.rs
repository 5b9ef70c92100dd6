//! Access gate for protected pages.

use crate::AppResources;
use crate::entity::user;
use crate::session::Session;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use sea_orm::EntityTrait;

pub const NOT_LOGGED_IN: &str = "You are not logged in!";

/// The signed-in user, placed in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

/// Let the request through only when the session belongs to an existing user.
///
/// Otherwise queue "You are not logged in!" and redirect to `/login`.
pub async fn require_auth(
    State(resources): State<AppResources>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(user_id) = session.user_id() else {
        session.flash_error(NOT_LOGGED_IN);
        return Redirect::to("/login").into_response();
    };

    match user::Entity::find_by_id(&user_id)
        .one(resources.db.as_ref())
        .await
    {
        Ok(Some(user)) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Ok(None) => {
            // Session points at an account that no longer exists
            session.logout();
            session.flash_error(NOT_LOGGED_IN);
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = %user_id, "Database error resolving session user");
            session.flash_error(crate::error::GENERIC_ERROR_MESSAGE);
            Redirect::to("/login").into_response()
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            tracing::error!("CurrentUser not found in extensions; route is missing require_auth");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })
    }
}
