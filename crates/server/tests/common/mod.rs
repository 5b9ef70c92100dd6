//! Shared setup for the integration tests.

#![allow(dead_code)]

use axum_test::TestServer;
use gatehouse::{
    AppResources,
    auth::registration::{RegistrationForm, register},
    config::{AppConfig, CaptchaConfig, GoogleConfig, SessionConfig, SmtpConfig},
    entity::user,
};
use lettre::transport::stub::AsyncStubTransport;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait, Statement};
use std::sync::Arc;

/// Create a test database with the users and sessions tables.
pub async fn create_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.expect("connect");

    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"CREATE TABLE users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NULL,
            created_at TEXT NOT NULL,
            ip TEXT NULL,
            reset_token TEXT NULL,
            reset_token_expires_at TEXT NULL,
            google_id TEXT NULL UNIQUE
        );"#,
    ))
    .await
    .expect("create users table");

    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"CREATE TABLE sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );"#,
    ))
    .await
    .expect("create sessions table");

    db
}

pub fn create_test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        port: 3000,
        public_url: "http://localhost:3000".into(),
        session: SessionConfig {
            secret: "0123456789abcdef0123456789abcdef".into(),
            max_age_secs: 3600,
            secure_cookie: false,
        },
        captcha: CaptchaConfig::default(),
        google: GoogleConfig::default(),
        smtp: SmtpConfig {
            server: "localhost".into(),
            port: 25,
            username: "test".into(),
            password: "test".into(),
            from: "noreply@test.example.org".into(),
        },
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<DatabaseConnection>,
    pub mailer: Arc<AsyncStubTransport>,
}

/// Build the full application router over a fresh database.
pub async fn spawn_app(config: AppConfig) -> TestApp {
    spawn_app_with_mailer(config, AsyncStubTransport::new_ok()).await
}

pub async fn spawn_app_with_mailer(config: AppConfig, mailer: AsyncStubTransport) -> TestApp {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let db = Arc::new(create_test_db().await);
    let mailer = Arc::new(mailer);
    let resources = AppResources {
        db: db.clone(),
        mailer: mailer.clone(),
        config: Arc::new(config),
        http: reqwest::Client::new(),
    };

    let server = TestServer::builder()
        .save_cookies()
        .build(gatehouse::api::router(resources))
        .expect("create test server");

    TestApp { server, db, mailer }
}

/// Insert a local account directly.
pub async fn create_user(db: &DatabaseConnection, name: &str, email: &str, pass: &str) -> user::Model {
    let form = RegistrationForm {
        name: name.into(),
        email: email.into(),
        pass: pass.into(),
        pass2: pass.into(),
    };
    register(db, &form, None).await.expect("register user")
}

pub async fn find_user(db: &DatabaseConnection, id: &str) -> user::Model {
    user::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("query user")
        .expect("user exists")
}

/// `Location` header of a redirect response.
pub fn location(response: &axum_test::TestResponse) -> String {
    response
        .header("location")
        .to_str()
        .expect("ascii location")
        .to_string()
}
