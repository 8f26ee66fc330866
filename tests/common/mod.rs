#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use omnipass::models::AuthProvider;
use omnipass::seed::seed_catalog;
use omnipass::services::{Chatbot, IdentityVerifier, VerifiedIdentity};
use omnipass::{AppConfig, AppState, Database, OmniError, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@omnipass.kr";
pub const PASSWORD: &str = "seoul-nights";

/// Accepts `valid-<local part>` tokens and `no-email`; rejects everything else
pub struct FakeVerifier;

#[async_trait]
impl IdentityVerifier for FakeVerifier {
    async fn verify(
        &self,
        provider: AuthProvider,
        access_token: &str,
    ) -> omnipass::Result<VerifiedIdentity> {
        if access_token == "no-email" {
            return Ok(VerifiedIdentity {
                provider,
                provider_id: Some("no-email-id".to_string()),
                email: None,
                name: "Nameless".to_string(),
                picture: None,
            });
        }
        let local = access_token.strip_prefix("valid-").ok_or_else(|| {
            OmniError::unauthorized(format!("Invalid {} access token", provider.display_name()))
        })?;
        Ok(VerifiedIdentity {
            provider,
            provider_id: Some(format!("{local}-id")),
            email: Some(format!("{local}@social.example")),
            name: String::new(),
            picture: Some(format!("https://img.example/{local}.png")),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_database(Database::in_memory())
    }

    pub fn with_database(db: Database) -> Self {
        seed_catalog(&db).expect("seed catalogue");
        let config = AppConfig::default()
            .secret_key("integration-test-secret")
            .bcrypt_cost(4)
            .admin_email(ADMIN_EMAIL);
        let state = AppState::with_parts(config, db, Chatbot::offline(), Arc::new(FakeVerifier));
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    pub async fn register(&self, email: &str, country: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "name": "Test Traveler",
                    "country": country,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().expect("access token").to_string()
    }

    /// Registers a member and returns their bearer token.
    pub async fn member(&self, email: &str) -> String {
        self.register(email, "Japan").await;
        self.login(email).await
    }

    pub async fn admin(&self) -> String {
        self.member(ADMIN_EMAIL).await
    }

    pub async fn store_id(&self, name: &str) -> String {
        let (_, body) = self.get("/api/stores?page_size=100", None).await;
        body["stores"]
            .as_array()
            .expect("stores")
            .iter()
            .find(|store| store["name"] == name)
            .and_then(|store| store["id"].as_str())
            .expect("seeded store")
            .to_string()
    }

    pub async fn mission_id(&self, title: &str) -> String {
        let (_, body) = self.get("/api/missions", None).await;
        body.as_array()
            .expect("missions")
            .iter()
            .find(|mission| mission["title"] == title)
            .and_then(|mission| mission["id"].as_str())
            .expect("seeded mission")
            .to_string()
    }

    pub async fn balance(&self, token: &str) -> i64 {
        let (_, body) = self.get("/api/points/balance", Some(token)).await;
        body["balance"].as_i64().expect("balance")
    }
}
