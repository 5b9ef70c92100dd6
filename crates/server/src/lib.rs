//! Email/password and Google sign-in for a small web application.
//!
//! Provides registration, login, cookie sessions backed by the database,
//! password reset by email, an optional reCAPTCHA gate on form posts and a
//! single dashboard page behind an access gate.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::mail::MailTransport;

pub mod api;
pub mod auth;
pub mod captcha;
pub mod config;
pub mod email_templates;
pub mod entity;
pub mod error;
pub mod mail;
pub mod session;

#[derive(Clone)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub mailer: Arc<dyn MailTransport>,
    pub config: Arc<AppConfig>,
    /// Shared client for the reCAPTCHA verifier and Google endpoints.
    pub http: reqwest::Client,
}
