//! Shared bits for rendering HTML pages.

use crate::AppResources;
use crate::session::{Flash, Session};
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// Values every page layout needs.
pub struct PageContext {
    pub flashes: Vec<Flash>,
    /// reCAPTCHA site key, present only when the bot-check is enabled.
    pub captcha_site_key: Option<String>,
    pub google_enabled: bool,
    pub signed_in: bool,
}

impl PageContext {
    /// Build the context, consuming the session's pending flash messages.
    pub fn new(resources: &AppResources, session: &Session) -> Self {
        let captcha = &resources.config.captcha;
        Self {
            flashes: session.take_flashes(),
            captcha_site_key: captcha.enabled.then(|| captcha.site_key.clone()),
            google_enabled: resources.config.google.enabled,
            signed_in: session.is_authenticated(),
        }
    }
}

pub fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
