//! Password reset by email.

mod common;

use axum::http::StatusCode;
use common::{
    create_test_config, create_test_db, create_user, find_user, location, spawn_app,
    spawn_app_with_mailer,
};
use gatehouse::auth::reset::{
    RESET_TOKEN_TTL, assign_reset_token, find_by_valid_token, redeem_reset_token,
};
use gatehouse::auth::verify_password;
use gatehouse::entity::user;
use gatehouse::error::AuthError;
use lettre::transport::stub::AsyncStubTransport;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use time::{Duration, OffsetDateTime};

#[tokio::test]
async fn test_reset_unknown_account() {
    let app = spawn_app(create_test_config()).await;

    let response = app
        .server
        .post("/reset")
        .form(&[("email", "z@x.com")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/reset");

    let page = app.server.get("/reset").await;
    assert!(page.text().contains("Account does not exist!"));
    assert!(app.mailer.messages().await.is_empty());
}

#[tokio::test]
async fn test_full_reset_flow() {
    let app = spawn_app(create_test_config()).await;
    let alice = create_user(app.db.as_ref(), "Alice", "a@x.com", "secret1").await;

    let response = app
        .server
        .post("/reset")
        .form(&[("email", "a@x.com")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let page = app.server.get("/login").await;
    assert!(
        page.text()
            .contains("Please check your email inbox for instructions.")
    );

    let stored = find_user(app.db.as_ref(), &alice.id).await;
    let token = stored.reset_token.clone().expect("token stored");
    assert_eq!(token.len(), 40);
    let expires = stored.reset_token_expires_at.expect("expiry stored");
    let remaining = expires - OffsetDateTime::now_utc();
    assert!(remaining <= RESET_TOKEN_TTL && remaining > RESET_TOKEN_TTL - Duration::minutes(1));

    let messages = app.mailer.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("Subject: Reset Password"));
    assert!(messages[0].1.contains(&token));

    let form = app.server.get(&format!("/reset/{token}")).await;
    form.assert_status_ok();
    assert!(form.text().contains(&format!(r#"action="/reset/{token}""#)));

    let response = app
        .server
        .post(&format!("/reset/{token}"))
        .form(&[("pass", "newpass1"), ("pass2", "newpass1")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let home = app.server.get("/").await;
    home.assert_status_ok();
    assert!(home.text().contains("Password changed successfully!"));

    let stored = find_user(app.db.as_ref(), &alice.id).await;
    assert!(stored.reset_token.is_none());
    assert!(stored.reset_token_expires_at.is_none());
    let hash = stored.password_hash.expect("hash");
    assert!(verify_password("newpass1", &hash));
    assert!(!verify_password("secret1", &hash));

    let messages = app.mailer.messages().await;
    assert_eq!(messages.len(), 2);
    assert!(messages[1].1.contains("Subject: Password Changed"));

    // The token is single use
    let again = app.server.get(&format!("/reset/{token}")).await;
    again.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&again), "/reset");
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = spawn_app(create_test_config()).await;
    create_user(app.db.as_ref(), "Alice", "a@x.com", "secret1").await;

    let issued = OffsetDateTime::now_utc() - Duration::minutes(31);
    assign_reset_token(app.db.as_ref(), "a@x.com", "expiredtoken", issued)
        .await
        .expect("assign");

    let response = app.server.get("/reset/expiredtoken").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/reset");
    let page = app.server.get("/reset").await;
    assert!(page.text().contains("Token invalid!"));

    let response = app
        .server
        .post("/reset/expiredtoken")
        .form(&[("pass", "newpass1"), ("pass2", "newpass1")])
        .await;
    assert_eq!(location(&response), "/reset");
}

#[tokio::test]
async fn test_token_expiring_now_is_invalid() {
    let db = create_test_db().await;
    create_user(&db, "Alice", "a@x.com", "secret1").await;

    let issued = OffsetDateTime::now_utc();
    assign_reset_token(&db, "a@x.com", "edge", issued)
        .await
        .expect("assign");

    let at_expiry = issued + RESET_TOKEN_TTL;
    let result = redeem_reset_token(&db, "edge", "newpass1", "newpass1", at_expiry).await;
    assert!(matches!(result, Err(AuthError::TokenInvalid)));

    let just_before = at_expiry - Duration::seconds(1);
    let result = redeem_reset_token(&db, "edge", "newpass1", "newpass1", just_before).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_short_password_keeps_token() {
    let app = spawn_app(create_test_config()).await;
    let alice = create_user(app.db.as_ref(), "Alice", "a@x.com", "secret1").await;
    assign_reset_token(
        app.db.as_ref(),
        "a@x.com",
        "goodtoken",
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("assign");

    let response = app
        .server
        .post("/reset/goodtoken")
        .form(&[("pass", "abc"), ("pass2", "abc")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/reset/goodtoken");

    let page = app.server.get("/reset/goodtoken").await;
    page.assert_status_ok();
    assert!(
        page.text()
            .contains("Password must be at least 6 characters.")
    );

    let stored = find_user(app.db.as_ref(), &alice.id).await;
    assert_eq!(stored.reset_token.as_deref(), Some("goodtoken"));
}

#[tokio::test]
async fn test_google_only_account_cannot_reset() {
    let app = spawn_app(create_test_config()).await;
    user::ActiveModel {
        id: Set("google-user".into()),
        name: Set("Bob".into()),
        email: Set("bob@example.com".into()),
        password_hash: Set(None),
        created_at: Set(OffsetDateTime::now_utc()),
        ip: Set(None),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        google_id: Set(Some("g-1".into())),
    }
    .insert(app.db.as_ref())
    .await
    .expect("insert");

    let response = app
        .server
        .post("/reset")
        .form(&[("email", "bob@example.com")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let page = app.server.get("/login").await;
    assert!(
        page.text()
            .contains("You cannot reset your password. Please sign in with Google.")
    );
    let stored = find_user(app.db.as_ref(), "google-user").await;
    assert!(stored.reset_token.is_none());
    assert!(app.mailer.messages().await.is_empty());
}

#[tokio::test]
async fn test_mail_failure_keeps_token() {
    let app = spawn_app_with_mailer(create_test_config(), AsyncStubTransport::new_error()).await;
    let alice = create_user(app.db.as_ref(), "Alice", "a@x.com", "secret1").await;

    let response = app
        .server
        .post("/reset")
        .form(&[("email", "a@x.com")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/reset");

    let page = app.server.get("/reset").await;
    assert!(page.text().contains("An error occurred. Please try again."));

    let stored = find_user(app.db.as_ref(), &alice.id).await;
    assert!(stored.reset_token.is_some());
}

#[tokio::test]
async fn test_concurrent_redemption_consumes_token_once() {
    let db = create_test_db().await;
    let alice = create_user(&db, "Alice", "a@x.com", "secret1").await;
    let now = OffsetDateTime::now_utc();
    assign_reset_token(&db, "a@x.com", "shared", now)
        .await
        .expect("assign");

    let (first, second) = tokio::join!(
        redeem_reset_token(&db, "shared", "password-one", "password-one", now),
        redeem_reset_token(&db, "shared", "password-two", "password-two", now),
    );

    let winner = match (&first, &second) {
        (Ok(_), Err(AuthError::TokenInvalid)) => "password-one",
        (Err(AuthError::TokenInvalid), Ok(_)) => "password-two",
        other => panic!("expected exactly one redemption to succeed, got {other:?}"),
    };

    let stored = find_user(&db, &alice.id).await;
    assert!(stored.reset_token.is_none());
    let hash = stored.password_hash.expect("hash");
    assert!(verify_password(winner, &hash));
}

#[tokio::test]
async fn test_expired_token_is_cleared_on_lookup() {
    let db = create_test_db().await;
    let alice = create_user(&db, "Alice", "a@x.com", "secret1").await;
    let issued = OffsetDateTime::now_utc() - Duration::minutes(31);
    assign_reset_token(&db, "a@x.com", "stale", issued)
        .await
        .expect("assign");

    let found = find_by_valid_token(&db, "stale", OffsetDateTime::now_utc())
        .await
        .expect("lookup");
    assert!(found.is_none());

    let stored = find_user(&db, &alice.id).await;
    assert!(stored.reset_token.is_none());
    assert!(stored.reset_token_expires_at.is_none());
}

#[tokio::test]
async fn test_confirmation_email_failure_keeps_new_password() {
    let app = spawn_app_with_mailer(create_test_config(), AsyncStubTransport::new_error()).await;
    let alice = create_user(app.db.as_ref(), "Alice", "a@x.com", "secret1").await;
    assign_reset_token(
        app.db.as_ref(),
        "a@x.com",
        "mailfails",
        OffsetDateTime::now_utc(),
    )
    .await
    .expect("assign");

    let response = app
        .server
        .post("/reset/mailfails")
        .form(&[("pass", "newpass1"), ("pass2", "newpass1")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let home = app.server.get("/").await;
    home.assert_status_ok();
    assert!(home.text().contains("Password changed successfully!"));

    let stored = find_user(app.db.as_ref(), &alice.id).await;
    assert!(stored.reset_token.is_none());
    assert!(stored.reset_token_expires_at.is_none());
    assert!(verify_password("newpass1", &stored.password_hash.expect("hash")));
}
