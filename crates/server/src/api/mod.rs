//! HTTP surface.
//!
//! Submodules by page:
//! - `login` - /login, /logout
//! - `register` - /register
//! - `reset` - /reset, /reset/{token}
//! - `google` - /google, /google/callback (when enabled)
//! - `dashboard` - / (signed-in only)
//! - `health` - /healthz
//! - `openapi` - OpenAPI/Utoipa configuration

pub mod client_ip;
pub mod dashboard;
pub mod google;
pub mod health;
pub mod login;
pub mod openapi;
pub mod pages;
pub mod register;
pub mod reset;

use crate::AppResources;
use crate::auth::require_auth;
use crate::captcha::verify_captcha;
use crate::session::manage_session;
use axum::middleware::from_fn_with_state;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Assemble the application router.
///
/// Layer order, outermost first: tracing, session, then per-group gates
/// (bot-check on the forms, access gate on the protected pages).
pub fn router(resources: AppResources) -> axum::Router {
    let forms = OpenApiRouter::new()
        .merge(login::router())
        .merge(register::router())
        .merge(reset::router())
        .route_layer(from_fn_with_state(resources.clone(), verify_captcha));

    let protected = OpenApiRouter::new()
        .merge(dashboard::router())
        .merge(login::logout_router())
        .route_layer(from_fn_with_state(resources.clone(), require_auth));

    let mut app = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .merge(forms)
        .merge(protected);

    if resources.config.google.enabled {
        app = app.merge(google::router());
    }

    let (router, api) = app
        .layer(from_fn_with_state(resources.clone(), manage_session))
        .routes(routes!(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(resources)
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(resources))]
pub async fn start_webserver(resources: AppResources) -> color_eyre::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], resources.config.port));
    let router = router(resources);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
