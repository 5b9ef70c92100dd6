//! Sign in with Google against a mocked provider.

mod common;

use axum::http::StatusCode;
use common::{TestApp, create_test_config, create_user, location, spawn_app};
use gatehouse::entity::user;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_google(identity: serde_json::Value) -> MockServer {
    let provider = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-123",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .mount(&provider)
        .await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer access-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity))
        .mount(&provider)
        .await;

    provider
}

async fn spawn_with_google(provider: &MockServer) -> TestApp {
    let mut config = create_test_config();
    config.google.enabled = true;
    config.google.client_id = "client-1".into();
    config.google.client_secret = "client-secret".into();
    config.google.callback_url = "http://localhost:3000/google/callback".into();
    config.google.token_url = format!("{}/token", provider.uri());
    config.google.userinfo_url = format!("{}/userinfo", provider.uri());
    spawn_app(config).await
}

/// Follow `/google` and return the `state` it put in the authorization URL.
async fn start_sign_in(app: &TestApp) -> String {
    let response = app.server.get("/google").await;
    response.assert_status(StatusCode::SEE_OTHER);
    let target = url::Url::parse(&location(&response)).expect("authorize url");
    target
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("state param")
}

fn bob(verified: bool) -> serde_json::Value {
    json!({
        "sub": "google-bob",
        "email": "bob@example.com",
        "email_verified": verified,
        "given_name": "Bob",
        "family_name": "Smith"
    })
}

#[tokio::test]
async fn test_google_routes_absent_when_disabled() {
    let app = spawn_app(create_test_config()).await;
    app.server.get("/google").await.assert_status_not_found();

    let page = app.server.get("/login").await;
    assert!(!page.text().contains("Sign in with Google"));
}

#[tokio::test]
async fn test_google_sign_in_creates_user() {
    let provider = mock_google(bob(true)).await;
    let app = spawn_with_google(&provider).await;

    let page = app.server.get("/login").await;
    assert!(page.text().contains("Sign in with Google"));

    let state = start_sign_in(&app).await;
    let response = app
        .server
        .get(&format!("/google/callback?code=auth-code&state={state}"))
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let home = app.server.get("/").await;
    home.assert_status_ok();
    assert!(home.text().contains("Bob Smith"));

    let created = user::Entity::find()
        .filter(user::Column::GoogleId.eq("google-bob"))
        .one(app.db.as_ref())
        .await
        .expect("query")
        .expect("user created");
    assert_eq!(created.email, "bob@example.com");
    assert!(created.password_hash.is_none());

    // Signing in again reuses the same account
    app.server.get("/logout").await;
    let state = start_sign_in(&app).await;
    app.server
        .get(&format!("/google/callback?code=auth-code&state={state}"))
        .await;
    let count = user::Entity::find()
        .count(app.db.as_ref())
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_google_email_collision_is_refused() {
    let provider = mock_google(bob(true)).await;
    let app = spawn_with_google(&provider).await;
    create_user(app.db.as_ref(), "Bob Local", "bob@example.com", "secret1").await;

    let state = start_sign_in(&app).await;
    let response = app
        .server
        .get(&format!("/google/callback?code=auth-code&state={state}"))
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let page = app.server.get("/login").await;
    assert!(page.text().contains(
        "An account already exists with this email address. Please sign in with your email and password."
    ));

    let home = app.server.get("/").await;
    assert_eq!(location(&home), "/login");

    let matching = user::Entity::find()
        .filter(user::Column::Email.eq("bob@example.com"))
        .all(app.db.as_ref())
        .await
        .expect("query");
    assert_eq!(matching.len(), 1);
    assert!(matching[0].google_id.is_none());
}

#[tokio::test]
async fn test_google_state_mismatch() {
    let provider = mock_google(bob(true)).await;
    let app = spawn_with_google(&provider).await;

    start_sign_in(&app).await;
    let response = app
        .server
        .get("/google/callback?code=auth-code&state=forged")
        .await;
    assert_eq!(location(&response), "/login");

    let page = app.server.get("/login").await;
    assert!(page.text().contains("Google sign-in failed. Please try again."));
    let count = user::Entity::find()
        .count(app.db.as_ref())
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_google_unverified_email() {
    let provider = mock_google(bob(false)).await;
    let app = spawn_with_google(&provider).await;

    let state = start_sign_in(&app).await;
    let response = app
        .server
        .get(&format!("/google/callback?code=auth-code&state={state}"))
        .await;
    assert_eq!(location(&response), "/login");

    let page = app.server.get("/login").await;
    assert!(
        page.text()
            .contains("Your Google account email address is not verified.")
    );
}

#[tokio::test]
async fn test_google_provider_failure() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&provider)
        .await;
    let app = spawn_with_google(&provider).await;

    let state = start_sign_in(&app).await;
    let response = app
        .server
        .get(&format!("/google/callback?code=auth-code&state={state}"))
        .await;
    assert_eq!(location(&response), "/login");

    let page = app.server.get("/login").await;
    assert!(page.text().contains("An error occurred. Please try again."));
}
