//! Sign in with Google.
//!
//! [`GoogleClient`] performs the authorization code round trip and returns a
//! [`FederatedIdentity`]. [`sign_in`] maps that identity onto a local user:
//!
//! - known Google id: that user
//! - email already used by a local account: refused, nothing is linked
//! - otherwise: a new user without a local password

use super::credentials::{find_by_email, normalize_email};
use crate::config::GoogleConfig;
use crate::entity::user;
use crate::error::AuthError;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::Deserialize;
use time::OffsetDateTime;

/// Scopes requested from Google.
pub const GOOGLE_SCOPES: &str = "email profile";

/// What the identity provider asserted about the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub id: String,
    pub email: String,
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl FederatedIdentity {
    /// "Given Family", falling back to the email address.
    pub fn display_name(&self) -> String {
        let name = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
    given_name: Option<String>,
    family_name: Option<String>,
}

pub struct GoogleClient<'a> {
    http: &'a reqwest::Client,
    config: &'a GoogleConfig,
}

impl<'a> GoogleClient<'a> {
    pub fn new(http: &'a reqwest::Client, config: &'a GoogleConfig) -> Self {
        Self { http, config }
    }

    /// Where to send the browser to start the sign-in.
    pub fn authorize_url(&self, state: &str) -> Result<String, url::ParseError> {
        let url = url::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("scope", GOOGLE_SCOPES),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchange an authorization code for the user's identity.
    #[tracing::instrument(skip(self, code))]
    pub async fn fetch_identity(&self, code: &str) -> Result<FederatedIdentity, AuthError> {
        let token: TokenResponse = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let info: UserInfo = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(FederatedIdentity {
            id: info.sub,
            email: info.email,
            email_verified: info.email_verified,
            given_name: info.given_name,
            family_name: info.family_name,
        })
    }
}

/// Map a Google identity onto a local user, creating one if needed.
#[tracing::instrument(skip(db, identity), fields(google_id = %identity.id))]
pub async fn sign_in(
    db: &DatabaseConnection,
    identity: &FederatedIdentity,
) -> Result<user::Model, AuthError> {
    if let Some(user) = user::Entity::find()
        .filter(user::Column::GoogleId.eq(&identity.id))
        .one(db)
        .await?
    {
        return Ok(user);
    }

    if !identity.email_verified {
        return Err(AuthError::UnverifiedIdentity);
    }

    if find_by_email(db, &identity.email).await?.is_some() {
        tracing::info!("Google sign-in refused: email belongs to an existing account");
        return Err(AuthError::LocalAccountExists);
    }

    let user = user::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        name: Set(identity.display_name()),
        email: Set(normalize_email(&identity.email)),
        password_hash: Set(None),
        created_at: Set(OffsetDateTime::now_utc()),
        ip: Set(None),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        google_id: Set(Some(identity.id.clone())),
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = %user.id, "Created user from Google sign-in");
    Ok(user)
}
