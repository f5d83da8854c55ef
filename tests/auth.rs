mod common;

use reqwest::{header, StatusCode};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use std::sync::Arc;

use common::{json, spawn_app, spawn_app_with_mailer, BrokenMailer};
use gustul_casei::entities::{user, verification_token};

fn token_from_link(link: &str) -> String {
    link.rsplit("token=")
        .next()
        .expect("Link has no token")
        .to_owned()
}

#[tokio::test]
async fn register_verify_login_flow() {
    let app = spawn_app().await;

    // Step 1: Register
    let response = app
        .post("/auth/register")
        .json(&json!({
            "name": "Ana Popescu",
            "email": "Ana@Mail.md",
            "password": "placinte123",
            "city": "Bălți"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json(response).await;
    assert!(body["userId"].as_i64().is_some());

    let link = app.outbox.links.lock().unwrap().pop().expect("No verification mail sent");
    assert!(link.starts_with("http://localhost:3000/auth/verify?token="));

    // Step 2: Login is refused before verification
    let response = app
        .post("/auth/login")
        .json(&json!({ "email": "ana@mail.md", "password": "placinte123" }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Step 3: Verify
    let token = token_from_link(&link);
    let response = app
        .post("/auth/verify")
        .json(&json!({ "token": token }))
        .send()
        .await
        .expect("Failed to send verify request");
    assert_eq!(response.status(), StatusCode::OK);

    // Tokens are single use
    let response = app
        .post("/auth/verify")
        .json(&json!({ "token": token }))
        .send()
        .await
        .expect("Failed to send verify request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Step 4: Login and use the session
    let response = app
        .post("/auth/login")
        .json(&json!({ "email": "ana@mail.md", "password": "placinte123" }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(response.status(), StatusCode::OK);
    let session = json(response).await["token"]
        .as_str()
        .expect("Token not found in login response")
        .to_owned();

    let response = app
        .get("/orders")
        .header(header::AUTHORIZATION, format!("Bearer {}", session))
        .send()
        .await
        .expect("Failed to send orders request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await, json!([]));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = spawn_app().await;
    let payload = json!({
        "name": "Ion",
        "email": "ion@mail.md",
        "password": "secret12"
    });

    let first = app.post("/auth/register").json(&payload).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.post("/auth/register").json(&payload).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json(second).await["error"],
        json!("User with this email already exists")
    );
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .post("/auth/register")
        .json(&json!({ "name": "Vera", "email": "vera@mail.md", "password": "123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json(response).await["error"],
        json!("Password must be at least 6 characters long")
    );
    assert!(app.outbox.links.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_verification_token_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .post("/auth/verify")
        .json(&json!({ "token": "not-a-token" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], json!("Invalid verification token"));
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = spawn_app().await;

    let response = app.get("/orders").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["error"], json!("Unauthorized"));

    let response = app
        .get("/admin/stats")
        .header(header::AUTHORIZATION, "Bearer garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn failed_mail_leaves_no_account_behind() {
    let app = spawn_app_with_mailer(Arc::new(BrokenMailer)).await;

    let response = app
        .post("/auth/register")
        .json(&json!({ "name": "Dan", "email": "dan@mail.md", "password": "secret12" }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(response).await["error"], json!("Internal server error"));

    let users = user::Entity::find().count(&*app.db).await.unwrap();
    let tokens = verification_token::Entity::find().count(&*app.db).await.unwrap();
    assert_eq!((users, tokens), (0, 0));
}

#[tokio::test]
async fn malformed_login_body_is_a_bad_request() {
    let app = spawn_app().await;

    let response = app
        .post("/auth/login")
        .json(&json!({ "email": "ana@mail.md" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = json(response).await["error"].as_str().unwrap_or_default().to_owned();
    assert!(error.contains("password"), "unexpected error: {}", error);

    let response = app
        .post("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json(response).await["error"].is_string());
}
