//! Password changes through `PUT /Users/{id}/password` and their effect on
//! account locks.

use lockward::auth::LOCKED_REASON;
use lockward::testing::{self, TestApp, TestUser};
use serde_json::json;

fn joe() -> TestUser {
    TestUser::builder()
        .with_username("joe")
        .with_password("password")
        .build()
}

async fn lock(app: &TestApp, user: &TestUser) {
    for _ in 0..5 {
        app.login(&user.username, "wrong-password")
            .await
            .assert_unauthorized();
    }
    app.login(&user.username, &user.password)
        .await
        .assert_unauthorized()
        .assert_error("unauthorized", LOCKED_REASON)
        .await;
}

#[tokio::test]
async fn test_client_credentials_change_unlocks_account() {
    let app = TestApp::new();
    let user = joe();
    app.add_user(&user);
    lock(&app, &user).await;

    let token = app.client_token().await;
    app.change_password(&user.id, &token, json!({ "password": "koala" }))
        .await
        .assert_ok()
        .assert_json_path("status", "ok".into())
        .await;

    app.login(&user.username, "koala").await.assert_ok();
    assert_eq!(app.engine().status(&user.id).await.failed_attempts, 0);
}

#[tokio::test]
async fn test_administrator_change_unlocks_account() {
    let app = TestApp::new();
    let user = joe();
    let admin = TestUser::builder().administrator().build();
    app.add_user(&user);
    app.add_user(&admin);
    let admin_token = app.user_token(&admin).await;

    app.login(&user.username, &user.password).await.assert_ok();
    lock(&app, &user).await;

    app.change_password(&user.id, &admin_token, json!({ "password": "koala" }))
        .await
        .assert_ok();

    app.login(&user.username, "koala").await.assert_ok();
    assert_eq!(app.engine().status(&user.id).await.failed_attempts, 0);
}

#[tokio::test]
async fn test_self_service_without_old_password_keeps_lock() {
    let app = TestApp::new();
    let user = joe();
    app.add_user(&user);
    let token = app.user_token(&user).await;
    lock(&app, &user).await;

    app.change_password(&user.id, &token, json!({ "password": "koala" }))
        .await
        .assert_bad_request()
        .assert_error("invalid_request", "old password required")
        .await;

    let state = app.engine().status(&user.id).await;
    assert_eq!(state.failed_attempts, 5);
    assert!(state.locked_until.is_some());
    app.login(&user.username, "koala")
        .await
        .assert_unauthorized()
        .assert_error("unauthorized", LOCKED_REASON)
        .await;
}

#[tokio::test]
async fn test_self_service_with_old_password_unlocks() {
    let app = TestApp::new();
    let user = joe();
    app.add_user(&user);
    let token = app.user_token(&user).await;
    lock(&app, &user).await;

    app.change_password(
        &user.id,
        &token,
        json!({ "password": "koala", "oldPassword": "password" }),
    )
    .await
    .assert_ok();

    app.login(&user.username, "koala").await.assert_ok();
}

#[tokio::test]
async fn test_self_service_wrong_old_password() {
    let app = TestApp::new();
    let user = joe();
    app.add_user(&user);
    let token = app.user_token(&user).await;

    app.change_password(
        &user.id,
        &token,
        json!({ "password": "koala", "oldPassword": "guess" }),
    )
    .await
    .assert_unauthorized()
    .assert_error("unauthorized", "Old password is incorrect")
    .await;

    app.login(&user.username, &user.password).await.assert_ok();
}

#[tokio::test]
async fn test_cannot_change_another_users_password() {
    let app = TestApp::new();
    let user = joe();
    let other = TestUser::generate();
    app.add_user(&user);
    app.add_user(&other);
    let token = app.user_token(&user).await;

    app.change_password(
        &other.id,
        &token,
        json!({ "password": "koala", "oldPassword": "password" }),
    )
    .await
    .assert_forbidden()
    .assert_json_path("error", "access_denied".into())
    .await;

    app.login(&other.username, &other.password).await.assert_ok();
}

#[tokio::test]
async fn test_unknown_user() {
    let app = TestApp::new();
    let token = app.client_token().await;

    app.change_password("ghost", &token, json!({ "password": "koala" }))
        .await
        .assert_not_found();
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let app = TestApp::new();
    let user = joe();
    app.add_user(&user);

    testing::put(app.router(), &format!("/Users/{}/password", user.id))
        .json_body(&json!({ "password": "koala" }))
        .execute()
        .await
        .assert_unauthorized()
        .assert_error("unauthorized", "Full authentication is required")
        .await;
}

#[tokio::test]
async fn test_rejects_invalid_token() {
    let app = TestApp::new();
    let user = joe();
    app.add_user(&user);

    app.change_password(&user.id, "not.a.jwt", json!({ "password": "koala" }))
        .await
        .assert_unauthorized();

    app.login(&user.username, &user.password).await.assert_ok();
}

#[tokio::test]
async fn test_malformed_body() {
    let app = TestApp::new();
    let user = joe();
    app.add_user(&user);
    let token = app.client_token().await;

    testing::put(app.router(), &format!("/Users/{}/password", user.id))
        .bearer_token(&token)
        .header("content-type", "application/json")
        .text_body("{not json")
        .execute()
        .await
        .assert_bad_request()
        .assert_json_path("error", "invalid_request".into())
        .await;
}

#[tokio::test]
async fn test_empty_password_rejected() {
    let app = TestApp::new();
    let user = joe();
    app.add_user(&user);
    let token = app.client_token().await;

    app.change_password(&user.id, &token, json!({ "password": "" }))
        .await
        .assert_bad_request();

    app.login(&user.username, &user.password).await.assert_ok();
}
