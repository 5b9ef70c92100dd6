use config::Config;
use gatehouse::config::{AppConfig, SmtpConfig};

fn from_yaml(yaml_content: &str) -> Config {
    Config::builder()
        .add_source(config::File::from_str(
            yaml_content,
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config")
}

#[test]
fn test_smtp_config_deserialization() {
    let config = from_yaml(
        r#"
server: "smtp.example.com"
port: 587
username: "user@example.com"
password: "secret123"
from: "noreply@example.com"
"#,
    );

    let smtp_config: SmtpConfig = config
        .try_deserialize()
        .expect("Failed to deserialize SMTP config");
    assert_eq!(smtp_config.server, "smtp.example.com");
    assert_eq!(smtp_config.port, 587);
    assert_eq!(smtp_config.from, "noreply@example.com");
}

#[test]
fn test_app_config_defaults() {
    let config = from_yaml(
        r#"
database_url: "postgres://localhost/gatehouse"
public_url: "https://auth.example.com"
session:
  secret: "0123456789abcdef0123456789abcdef"
smtp:
  server: "smtp.example.com"
  port: 587
  username: "user@example.com"
  password: "secret123"
  from: "noreply@example.com"
"#,
    );

    let app_config: AppConfig = config
        .try_deserialize()
        .expect("Failed to deserialize app config");
    assert_eq!(app_config.database_url, "postgres://localhost/gatehouse");
    assert_eq!(app_config.port, 3000);
    assert_eq!(app_config.session.max_age_secs, 86_400);
    assert!(!app_config.session.secure_cookie);
    assert!(!app_config.captcha.enabled);
    assert_eq!(
        app_config.captcha.verify_url,
        "https://www.google.com/recaptcha/api/siteverify"
    );
    assert!(!app_config.google.enabled);
    assert!(app_config.google.auth_url.starts_with("https://accounts.google.com/"));
    assert!(app_config.validate().is_ok());
}

#[test]
fn test_app_config_feature_flags() {
    let config = from_yaml(
        r#"
database_url: "sqlite::memory:"
port: 8080
public_url: "http://localhost:8080"
session:
  secret: "0123456789abcdef0123456789abcdef"
  max_age_secs: 600
  secure_cookie: true
captcha:
  enabled: true
  site_key: "site"
  secret_key: "secret"
google:
  enabled: true
  client_id: "client"
  client_secret: "client-secret"
  callback_url: "http://localhost:8080/google/callback"
smtp:
  server: "localhost"
  port: 25
  username: "u"
  password: "p"
  from: "noreply@example.com"
"#,
    );

    let app_config: AppConfig = config.try_deserialize().expect("deserialize");
    assert_eq!(app_config.port, 8080);
    assert_eq!(app_config.session.max_age_secs, 600);
    assert!(app_config.session.secure_cookie);
    assert!(app_config.captcha.enabled);
    assert!(app_config.google.enabled);
    assert!(app_config.validate().is_ok());
}

#[test]
fn test_missing_session_secret_fails() {
    let config = from_yaml(
        r#"
database_url: "sqlite::memory:"
public_url: "http://localhost:3000"
smtp:
  server: "localhost"
  port: 25
  username: "u"
  password: "p"
  from: "noreply@example.com"
"#,
    );

    assert!(config.try_deserialize::<AppConfig>().is_err());
}

#[test]
fn test_enabled_google_without_client_is_invalid() {
    let config = from_yaml(
        r#"
database_url: "sqlite::memory:"
public_url: "http://localhost:3000"
session:
  secret: "0123456789abcdef0123456789abcdef"
google:
  enabled: true
smtp:
  server: "localhost"
  port: 25
  username: "u"
  password: "p"
  from: "noreply@example.com"
"#,
    );

    let app_config: AppConfig = config.try_deserialize().expect("deserialize");
    assert!(app_config.validate().is_err());
}
