//! The protected home page.

use super::pages::{PageContext, render};
use crate::AppResources;
use crate::auth::CurrentUser;
use crate::session::Session;
use askama::Template;
use axum::{extract::State, response::Response};
use utoipa_axum::{router::OpenApiRouter, routes};

pub const DASHBOARD_TAG: &str = "Dashboard";

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    ctx: PageContext,
    name: String,
    email: String,
}

pub fn router() -> OpenApiRouter<AppResources> {
    OpenApiRouter::new().routes(routes!(dashboard))
}

#[tracing::instrument(skip_all, fields(user_id = %user.id))]
#[utoipa::path(
    get,
    path = "/",
    tag = DASHBOARD_TAG,
    operation_id = "Dashboard",
    summary = "Signed-in home page",
    responses(
        (status = 200, description = "Dashboard HTML", content_type = "text/html"),
        (status = 303, description = "Not signed in; redirect to `/login`"),
    )
)]
pub async fn dashboard(
    State(resources): State<AppResources>,
    session: Session,
    CurrentUser(user): CurrentUser,
) -> Response {
    render(&DashboardTemplate {
        ctx: PageContext::new(&resources, &session),
        name: user.name,
        email: user.email,
    })
}
