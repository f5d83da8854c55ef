mod common;

use reqwest::{header, StatusCode};
use serde_json::{json, Value};

use common::{json, spawn_app, TestApp};
use gustul_casei::entities::user::{self, Role};

async fn place_order(app: &TestApp, customer: &user::Model, product_id: i32, quantity: i32) -> Value {
    let response = app
        .post("/orders")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token_for(customer)))
        .json(&json!({
            "items": [{ "productId": product_id, "quantity": quantity }],
            "address": "Strada Ștefan cel Mare 1",
            "phone": "+373 60000001"
        }))
        .send()
        .await
        .expect("Failed to send order request");
    assert_eq!(response.status(), StatusCode::CREATED);
    json(response).await["order"]["id"].clone()
}

async fn patch_status(app: &TestApp, token: &str, id: &Value, status: &str) -> reqwest::Response {
    app.patch(&format!("/admin/orders/{}", id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "status": status, "notes": "Livrare după ora 18" }))
        .send()
        .await
        .expect("Failed to send patch request")
}

#[tokio::test]
async fn non_admin_cannot_change_status() {
    let app = spawn_app().await;
    let cook = app.user("maria@gustulcasei.md", Role::Cook).await;
    let customer = app.user("ana@mail.md", Role::Customer).await;
    let admin = app.user("admin@gustulcasei.md", Role::Admin).await;
    let sarmale = app.product(cook.id, "Sarmale", "Feluri principale", 120.0).await;
    let id = place_order(&app, &customer, sarmale.id, 1).await;

    for intruder in [&customer, &cook] {
        let response = patch_status(&app, &app.token_for(intruder), &id, "CONFIRMED").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .get(&format!("/admin/orders/{}", id))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token_for(&admin)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = json(response).await;
    assert_eq!(order["order"]["status"], json!("PENDING"));
    assert_eq!(order["order"]["notes"], Value::Null);
}

#[tokio::test]
async fn status_follows_the_workflow() {
    let app = spawn_app().await;
    let cook = app.user("maria@gustulcasei.md", Role::Cook).await;
    let customer = app.user("ana@mail.md", Role::Customer).await;
    let admin = app.user("admin@gustulcasei.md", Role::Admin).await;
    let sarmale = app.product(cook.id, "Sarmale", "Feluri principale", 120.0).await;
    let id = place_order(&app, &customer, sarmale.id, 1).await;
    let token = app.token_for(&admin);

    for status in ["CONFIRMED", "PREPARING", "READY", "READY", "DELIVERED"] {
        let response = patch_status(&app, &token, &id, status).await;
        assert_eq!(response.status(), StatusCode::OK, "moving to {}", status);
        let body = json(response).await;
        assert_eq!(body["order"]["status"], json!(status));
        assert_eq!(body["order"]["notes"], json!("Livrare după ora 18"));
    }

    let response = patch_status(&app, &token, &id, "PENDING").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = patch_status(&app, &token, &id, "LOST").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], json!("Invalid status"));

    let response = patch_status(&app, &token, &json!(9999), "CONFIRMED").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pending_orders_can_be_cancelled_once() {
    let app = spawn_app().await;
    let cook = app.user("maria@gustulcasei.md", Role::Cook).await;
    let customer = app.user("ana@mail.md", Role::Customer).await;
    let admin = app.user("admin@gustulcasei.md", Role::Admin).await;
    let sarmale = app.product(cook.id, "Sarmale", "Feluri principale", 120.0).await;
    let id = place_order(&app, &customer, sarmale.id, 1).await;
    let token = app.token_for(&admin);

    let response = patch_status(&app, &token, &id, "CANCELLED").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = patch_status(&app, &token, &id, "CONFIRMED").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_listing_filters_by_status() {
    let app = spawn_app().await;
    let cook = app.user("maria@gustulcasei.md", Role::Cook).await;
    let customer = app.user("ana@mail.md", Role::Customer).await;
    let admin = app.user("admin@gustulcasei.md", Role::Admin).await;
    let sarmale = app.product(cook.id, "Sarmale", "Feluri principale", 120.0).await;
    let first = place_order(&app, &customer, sarmale.id, 1).await;
    place_order(&app, &customer, sarmale.id, 2).await;
    let token = app.token_for(&admin);

    let response = patch_status(&app, &token, &first, "CONFIRMED").await;
    assert_eq!(response.status(), StatusCode::OK);

    let list = |query: &'static str| {
        app.get(&format!("/admin/orders{}", query))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .send()
    };

    let all = json(list("").await.unwrap()).await;
    assert_eq!(all["orders"].as_array().map(Vec::len), Some(2));

    let confirmed = json(list("?status=CONFIRMED").await.unwrap()).await;
    assert_eq!(confirmed["orders"].as_array().map(Vec::len), Some(1));
    assert_eq!(confirmed["orders"][0]["id"], first);

    let response = list("?status=SHIPPED").await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_and_user_list() {
    let app = spawn_app().await;
    let cook = app.user("maria@gustulcasei.md", Role::Cook).await;
    let customer = app.user("ana@mail.md", Role::Customer).await;
    let admin = app.user("admin@gustulcasei.md", Role::Admin).await;
    let sarmale = app.product(cook.id, "Sarmale", "Feluri principale", 120.0).await;
    place_order(&app, &customer, sarmale.id, 2).await;
    let auth = format!("Bearer {}", app.token_for(&admin));

    let response = app
        .get("/admin/stats")
        .header(header::AUTHORIZATION, &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json(response).await,
        json!({
            "totalUsers": 3,
            "totalProducts": 1,
            "totalOrders": 1,
            "pendingApprovals": 0,
            "totalRevenue": 240.0,
            "averageRating": 0.0
        })
    );

    let response = app
        .get("/admin/users")
        .header(header::AUTHORIZATION, &auth)
        .send()
        .await
        .unwrap();
    let users = json(response).await;
    let users = users.as_array().expect("Users response is not a list");
    assert_eq!(users.len(), 3);
    let maria = users
        .iter()
        .find(|u| u["email"] == json!("maria@gustulcasei.md"))
        .expect("Cook missing from user list");
    assert_eq!(maria["isCook"], json!(true));
    assert_eq!(maria["isAdmin"], json!(false));
    assert!(maria.get("password").is_none());
}
