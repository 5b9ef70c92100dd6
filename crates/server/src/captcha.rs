//! reCAPTCHA bot-check for form submissions.
//!
//! [`verify_captcha`] is installed on the form routes. It only acts on `POST`
//! requests and only when `captcha.enabled` is set; everything else passes
//! straight through.

use crate::AppResources;
use crate::api::client_ip::client_ip;
use crate::config::CaptchaConfig;
use crate::error::GENERIC_ERROR_MESSAGE;
use crate::session::Session;
use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, header::REFERER},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

/// Form field the reCAPTCHA widget posts its answer in.
pub const RESPONSE_FIELD: &str = "g-recaptcha-response";

pub const CAPTCHA_INCORRECT: &str = "reCAPTCHA Incorrect!";

/// Upper bound on the form bodies buffered for inspection.
const MAX_FORM_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Client for the siteverify endpoint.
pub struct RecaptchaVerifier<'a> {
    http: &'a reqwest::Client,
    config: &'a CaptchaConfig,
}

impl<'a> RecaptchaVerifier<'a> {
    pub fn new(http: &'a reqwest::Client, config: &'a CaptchaConfig) -> Self {
        Self { http, config }
    }

    /// Ask the verifier whether `response` is a solved challenge.
    ///
    /// An empty response is rejected without a round trip.
    #[tracing::instrument(skip(self, response))]
    pub async fn verify(
        &self,
        response: &str,
        remote_ip: Option<&str>,
    ) -> Result<bool, reqwest::Error> {
        if response.is_empty() {
            return Ok(false);
        }

        let mut params = vec![
            ("secret", self.config.secret_key.as_str()),
            ("response", response),
        ];
        if let Some(ip) = remote_ip {
            params.push(("remoteip", ip));
        }

        let result: SiteVerifyResponse = self
            .http
            .post(&self.config.verify_url)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !result.success {
            tracing::debug!(errors = ?result.error_codes, "reCAPTCHA verification failed");
        }
        Ok(result.success)
    }
}

/// Reject form posts that fail the bot-check, sending the user back.
pub async fn verify_captcha(
    State(resources): State<AppResources>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    if !resources.config.captcha.enabled || request.method() != Method::POST {
        return next.run(request).await;
    }

    let back = back_path(request.headers(), request.uri().path());
    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, MAX_FORM_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read form body for bot-check");
            session.flash_error(CAPTCHA_INCORRECT);
            return Redirect::to(&back).into_response();
        }
    };

    let answer = form_field(&bytes, RESPONSE_FIELD).unwrap_or_default();
    let remote_ip = client_ip(&parts.headers, &parts.extensions);
    let verifier = RecaptchaVerifier::new(&resources.http, &resources.config.captcha);

    match verifier.verify(&answer, remote_ip.as_deref()).await {
        Ok(true) => next.run(Request::from_parts(parts, Body::from(bytes))).await,
        Ok(false) => {
            session.flash_error(CAPTCHA_INCORRECT);
            Redirect::to(&back).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "reCAPTCHA verifier unavailable");
            session.flash_error(GENERIC_ERROR_MESSAGE);
            Redirect::to(&back).into_response()
        }
    }
}

/// First value of `name` in a urlencoded body.
fn form_field(body: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Same-origin path of the `Referer`, or `fallback`.
///
/// Only the path and query are kept so a forged header cannot redirect
/// off-site.
fn back_path(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| url::Url::parse(value).ok())
        .map(|url| match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        })
        .unwrap_or_else(|| fallback.to_string())
}
