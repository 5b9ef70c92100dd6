use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Clone, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// Key mixed into the stored session id hash.
    pub secret: String,
    /// Cookie and record lifetime in seconds.
    #[serde(default = "default_session_max_age")]
    pub max_age_secs: u64,
    /// Mark the cookie `Secure`. Only enable when served over HTTPS.
    #[serde(default)]
    pub secure_cookie: bool,
}

/// reCAPTCHA v2 bot-check settings.
#[derive(Clone, Deserialize)]
pub struct CaptchaConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub site_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_captcha_verify_url")]
    pub verify_url: String,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            site_key: String::new(),
            secret_key: String::new(),
            verify_url: default_captcha_verify_url(),
        }
    }
}

/// Sign in with Google settings.
///
/// The endpoint URLs default to Google's and only need overriding in tests.
#[derive(Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub callback_url: String,
    #[serde(default = "default_google_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_google_token_url")]
    pub token_url: String,
    #[serde(default = "default_google_userinfo_url")]
    pub userinfo_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            client_secret: String::new(),
            callback_url: String::new(),
            auth_url: default_google_auth_url(),
            token_url: default_google_token_url(),
            userinfo_url: default_google_userinfo_url(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL, used to build the links sent by email.
    pub public_url: String,
    pub session: SessionConfig,
    #[serde(default)]
    pub captcha: CaptchaConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    pub smtp: SmtpConfig,
}

fn default_port() -> u16 {
    3000
}

fn default_session_max_age() -> u64 {
    86_400
}

fn default_captcha_verify_url() -> String {
    "https://www.google.com/recaptcha/api/siteverify".into()
}

fn default_google_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".into()
}

fn default_google_token_url() -> String {
    "https://oauth2.googleapis.com/token".into()
}

fn default_google_userinfo_url() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".into()
}

impl AppConfig {
    /// Check the settings that deserialization alone cannot catch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.secret.len() < 32 {
            return Err(ConfigError::Validation(
                "session.secret must be at least 32 characters".into(),
            ));
        }
        if self.session.max_age_secs == 0 {
            return Err(ConfigError::Validation(
                "session.max_age_secs must be > 0".into(),
            ));
        }
        if self.smtp.port == 0 {
            return Err(ConfigError::Validation("smtp.port must be > 0".into()));
        }
        if let Err(e) = self.smtp.from.parse::<lettre::message::Mailbox>() {
            return Err(ConfigError::Validation(format!(
                "smtp.from is not a valid mailbox ({}): {e}",
                self.smtp.from
            )));
        }
        if url::Url::parse(&self.public_url).is_err() {
            return Err(ConfigError::Validation(format!(
                "public_url is not a valid URL: {}",
                self.public_url
            )));
        }
        if self.captcha.enabled
            && (self.captcha.site_key.is_empty() || self.captcha.secret_key.is_empty())
        {
            return Err(ConfigError::Validation(
                "captcha.site_key and captcha.secret_key are required when captcha is enabled"
                    .into(),
            ));
        }
        if self.google.enabled
            && (self.google.client_id.is_empty()
                || self.google.client_secret.is_empty()
                || self.google.callback_url.is_empty())
        {
            return Err(ConfigError::Validation(
                "google.client_id, google.client_secret and google.callback_url are required when Google sign-in is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Load application configuration from an optional `config.yaml` + environment overrides.
///
/// Environment variables override file values using double underscores as the
/// path separator, e.g. `SESSION__SECRET` or `SMTP__PORT`. Top level keys are
/// plain: `DATABASE_URL`, `PORT`, `PUBLIC_URL`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(Environment::default().separator("__").try_parsing(true))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;

    Ok(app)
}
