use thiserror::Error;

use crate::mail::MailError;

/// Message shown for any failure whose cause must not reach the user.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

/// How a failure is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rendered inline on the form, submitted values preserved.
    Validation,
    /// Flash message and redirect to a safe page.
    NotFound,
    /// Lookup succeeded but the action is not allowed for this account.
    Authorization,
    /// Database, mail, verifier or identity provider failure.
    ExternalService,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("no account with that email")]
    AccountNotFound,
    #[error("reset token unknown or expired")]
    TokenInvalid,
    #[error("password reset requested for a Google-only account")]
    FederatedAccount,
    #[error("email already registered")]
    EmailTaken,
    #[error("Google identity email belongs to a local account")]
    LocalAccountExists,
    #[error("Google identity email is not verified")]
    UnverifiedIdentity,
    #[error("Google sign-in state mismatch")]
    StateMismatch,
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("mail delivery failed: {0}")]
    Mail(#[from] MailError),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("entropy source failure: {0}")]
    Entropy(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) | AuthError::EmailTaken => ErrorKind::Validation,
            AuthError::InvalidCredentials
            | AuthError::AccountNotFound
            | AuthError::TokenInvalid => ErrorKind::NotFound,
            AuthError::FederatedAccount
            | AuthError::LocalAccountExists
            | AuthError::UnverifiedIdentity
            | AuthError::StateMismatch => ErrorKind::Authorization,
            AuthError::Database(_)
            | AuthError::Mail(_)
            | AuthError::Upstream(_)
            | AuthError::Hash(_)
            | AuthError::Entropy(_) => ErrorKind::ExternalService,
        }
    }

    /// Text safe to show to the user.
    ///
    /// Validation failures carry several messages; use [`AuthError::messages`] for those.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(errors) => errors.join(" "),
            AuthError::InvalidCredentials => "Incorrect Email or Password!".into(),
            AuthError::AccountNotFound => "Account does not exist!".into(),
            AuthError::TokenInvalid => "Token invalid!".into(),
            AuthError::FederatedAccount => {
                "You cannot reset your password. Please sign in with Google.".into()
            }
            AuthError::EmailTaken => "An account with that email already exists!".into(),
            AuthError::LocalAccountExists => "An account already exists with this email address. Please sign in with your email and password.".into(),
            AuthError::UnverifiedIdentity => {
                "Your Google account email address is not verified.".into()
            }
            AuthError::StateMismatch => "Google sign-in failed. Please try again.".into(),
            _ => GENERIC_ERROR_MESSAGE.into(),
        }
    }

    /// Every user facing message carried by this error.
    pub fn messages(&self) -> Vec<String> {
        match self {
            AuthError::Validation(errors) => errors.clone(),
            other => vec![other.user_message()],
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AuthError::Hash(e.to_string())
    }
}

impl From<getrandom::Error> for AuthError {
    fn from(e: getrandom::Error) -> Self {
        AuthError::Entropy(e.to_string())
    }
}
