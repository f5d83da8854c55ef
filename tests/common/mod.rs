#![allow(dead_code)]

use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use gustul_casei::config::Config;
use gustul_casei::entities::{product, setup_schema, user, user::Role, DEFAULT_CURRENCY};
use gustul_casei::mailer::{MailError, Mailer};
use gustul_casei::middleware::auth::generate_token;
use gustul_casei::{create_api_router, AppState};

pub const SECRET: &str = "integration-test-secret";

/// Keeps every verification link instead of sending it.
#[derive(Default)]
pub struct Outbox {
    pub links: Mutex<Vec<String>>,
}

impl Mailer for Outbox {
    fn send_verification(&self, _recipient: &str, link: &str) -> Result<(), MailError> {
        self.links
            .lock()
            .expect("Outbox lock poisoned")
            .push(link.to_owned());
        Ok(())
    }
}

/// Relay that is always down.
pub struct BrokenMailer;

impl Mailer for BrokenMailer {
    fn send_verification(&self, recipient: &str, _link: &str) -> Result<(), MailError> {
        Err(MailError::Delivery {
            recipient: recipient.to_owned(),
            reason: "relay unavailable".to_owned(),
        })
    }
}

pub struct TestApp {
    pub base: String,
    pub db: Arc<DatabaseConnection>,
    pub outbox: Arc<Outbox>,
    pub client: Client,
}

/// Serves the API on a free local port over a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    let outbox = Arc::new(Outbox::default());
    serve(outbox.clone(), outbox).await
}

pub async fn spawn_app_with_mailer(mailer: Arc<dyn Mailer>) -> TestApp {
    serve(mailer, Arc::new(Outbox::default())).await
}

async fn serve(mailer: Arc<dyn Mailer>, outbox: Arc<Outbox>) -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    setup_schema(&db).await.expect("Failed to create schema");
    let db = Arc::new(db);

    let config = Config {
        database_url: "sqlite::memory:".into(),
        secret: SECRET.into(),
        bind_addr: "127.0.0.1:0".into(),
        app_url: "http://localhost:3000".into(),
        cors_origin: None,
        admin: None,
    };
    let app = create_api_router(AppState {
        db: db.clone(),
        config: Arc::new(config),
        mailer,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server stopped");
    });

    TestApp {
        base: format!("http://{}/api", addr),
        db,
        outbox,
        client: Client::new(),
    }
}

impl TestApp {
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{}", self.base, path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(format!("{}{}", self.base, path))
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.client.patch(format!("{}{}", self.base, path))
    }

    pub async fn user(&self, email: &str, role: Role) -> user::Model {
        user::ActiveModel {
            email: Set(email.to_owned()),
            name: Set(email.split('@').next().unwrap_or(email).to_owned()),
            password: Set(None),
            phone: Set(Some("+373 60000000".to_owned())),
            address: Set(None),
            city: Set(Some("Chișinău".to_owned())),
            avatar: Set(None),
            role: Set(role),
            is_verified: Set(true),
            email_verified_at: Set(None),
            rating: Set(0.0),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("Failed to insert user")
    }

    pub async fn product(&self, cook_id: i32, name: &str, category: &str, price: f64) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            name: Set(name.to_owned()),
            description: Set(format!("Homemade {}", name.to_lowercase())),
            price: Set(price),
            currency: Set(DEFAULT_CURRENCY.to_owned()),
            image: Set("/img/placeholder.jpg".to_owned()),
            category: Set(category.to_owned()),
            is_available: Set(true),
            is_approved: Set(true),
            cook_id: Set(cook_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("Failed to insert product")
    }

    pub fn token_for(&self, user: &user::Model) -> String {
        generate_token(SECRET, user.id, user.role).expect("Failed to generate token")
    }
}

pub async fn json(response: Response) -> Value {
    response
        .json::<Value>()
        .await
        .expect("Failed to parse response JSON")
}
