//! Plain text email bodies rendered with Askama.
use askama::Template;

/// Sent when a user asks for a password reset.
#[derive(Template)]
#[template(path = "email/reset_password.txt")]
pub struct ResetPasswordEmailTemplate {
    pub name: String,
    pub reset_url: String,
    pub valid_minutes: i64,
}

impl ResetPasswordEmailTemplate {
    pub const SUBJECT: &'static str = "Reset Password";
}

/// Sent after a reset token was redeemed.
#[derive(Template)]
#[template(path = "email/password_changed.txt")]
pub struct PasswordChangedEmailTemplate {
    pub name: String,
}

impl PasswordChangedEmailTemplate {
    pub const SUBJECT: &'static str = "Password Changed";
}
