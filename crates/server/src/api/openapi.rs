//! OpenAPI/Utoipa configuration.

use crate::api::{dashboard::DASHBOARD_TAG, health::MISC_TAG, login::AUTH_TAG};
use crate::session::SESSION_COOKIE_NAME;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

/// Documents the session cookie used by the protected pages.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    SESSION_COOKIE_NAME,
                    "Issued on sign-in by `/login`, `/register`, `/reset/{token}` or `/google/callback`.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Gatehouse",
        version = "1.0.0",
        description = "Sign-in, registration and password reset pages guarding a dashboard."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = AUTH_TAG, description = "Sign-in, registration and password reset"),
        (name = DASHBOARD_TAG, description = "Pages that require a signed-in user")
    )
)]
pub struct ApiDoc;
