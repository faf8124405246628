#![allow(dead_code)]

use std::net::SocketAddr;

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crm::auth::tokens;
use crm::config::{Config, RegistrationMode};
use crm::db::tokens::TokenKind;

pub const PASSWORD: &str = "password123";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

/// An organizer with a live session.
pub struct Organizer {
    pub token: String,
    pub username: String,
}

/// An agent created by an organizer, signed in with a password set through
/// the reset flow.
pub struct AgentSession {
    pub token: String,
    pub agent_id: String,
    pub user_id: String,
    pub username: String,
}

async fn into_parts(resp: reqwest::Response) -> (Value, StatusCode) {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(json!(null));
    (body, status)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn signup(&self, username: &str, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/signup"))
            .json(&json!({
                "username": username,
                "email": email,
                "password1": password,
                "password2": password,
            }))
            .send()
            .await
            .expect("signup request failed");
        into_parts(resp).await
    }

    pub async fn login(&self, username: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request failed");
        into_parts(resp).await
    }

    /// Sign up an organizer (and with it an organization).
    pub async fn organizer(&self, username: &str) -> Organizer {
        let (body, status) = self
            .signup(username, &format!("{username}@test.com"), PASSWORD)
            .await;
        assert_eq!(status, StatusCode::OK, "organizer signup failed: {body}");
        Organizer {
            token: body["access_token"].as_str().unwrap().to_string(),
            username: username.to_string(),
        }
    }

    /// Create an agent under the organizer and return the agent JSON.
    pub async fn create_agent(&self, token: &str, username: &str) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/v1/agents",
                token,
                &json!({
                    "username": username,
                    "email": format!("{username}@test.com"),
                    "first_name": "Agent",
                    "last_name": username,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create agent failed: {body}");
        body
    }

    /// Create an agent, give them a known password through a stored reset
    /// token and sign them in.
    pub async fn agent_session(&self, organizer_token: &str, username: &str) -> AgentSession {
        let agent = self.create_agent(organizer_token, username).await;
        let user_id: Uuid = agent["user_id"].as_str().unwrap().parse().unwrap();

        let reset = tokens::generate();
        crm::db::tokens::create(
            &self.pool,
            TokenKind::PasswordReset,
            user_id,
            &tokens::hash(&reset),
            Utc::now() + Duration::hours(1),
        )
        .await
        .expect("store reset token");

        let resp = self
            .client
            .post(self.url("/api/v1/auth/reset-password"))
            .json(&json!({ "token": reset, "password": PASSWORD }))
            .send()
            .await
            .expect("reset request failed");
        assert_eq!(resp.status(), StatusCode::OK, "agent password reset failed");

        let (body, status) = self.login(username, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "agent login failed: {body}");

        AgentSession {
            token: body["access_token"].as_str().unwrap().to_string(),
            agent_id: agent["id"].as_str().unwrap().to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
        }
    }

    pub async fn create_category(&self, token: &str, name: &str) -> Value {
        let (body, status) = self
            .post_auth("/api/v1/categories", token, &json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::OK, "create category failed: {body}");
        body
    }

    /// Create a lead with optional agent / category ids, return the lead JSON.
    pub async fn create_lead(
        &self,
        token: &str,
        first_name: &str,
        agent_id: Option<&str>,
        category_id: Option<&str>,
    ) -> Value {
        let (body, status) = self
            .post_auth("/api/v1/leads", token, &lead_body(first_name, agent_id, category_id))
            .await;
        assert_eq!(status, StatusCode::OK, "create lead failed: {body}");
        body
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        into_parts(resp).await
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        into_parts(resp).await
    }

    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        into_parts(resp).await
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        into_parts(resp).await
    }
}

/// Request body for a valid lead.
pub fn lead_body(first_name: &str, agent_id: Option<&str>, category_id: Option<&str>) -> Value {
    json!({
        "first_name": first_name,
        "last_name": "Lead",
        "age": 30,
        "phone_number": "555-0100",
        "email": format!("{}@example.com", first_name.to_lowercase()),
        "description": "Met at the expo",
        "agent_id": agent_id,
        "category_id": category_id,
    })
}

/// Ids of the leads in a list response.
pub fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|l| l["id"].as_str().unwrap().to_string())
        .collect()
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(RegistrationMode::Open).await
}

pub async fn spawn_app_with(registration: RegistrationMode) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("crm_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        base_url: "http://localhost:0".to_string(),
        registration,
        log_level: "warn".to_string(),
        smtp: None,
    };

    let (app, _state) = crm::build_app(pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
    }
}

/// Drop stale test databases (useful after test crashes).
pub async fn cleanup_stale_test_dbs() {
    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    if let Ok(admin_pool) = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
    {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT datname FROM pg_database WHERE datname LIKE 'crm_test_%'",
        )
        .fetch_all(&admin_pool)
        .await
        .unwrap_or_default();

        for db_name in rows {
            let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
                .execute(&admin_pool)
                .await;
        }
        admin_pool.close().await;
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
