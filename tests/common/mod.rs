#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use serde_json::{json, Value};
use urlshort::auth::{Role, TokenEngine};
use urlshort::startup::run;
use urlshort::store::{InMemoryStore, UrlStore, UserStore};

pub const SIGNING_KEY: &str = "test-signing-key";

pub struct TestApp {
    pub address: String,
    pub store: Arc<dyn UserStore>,
    pub client: reqwest::Client,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(InMemoryStore::new()))
}

pub fn spawn_app_with<S>(store: Arc<S>) -> TestApp
where
    S: UserStore + UrlStore + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = run(
        listener,
        store.clone(),
        store.clone(),
        TokenEngine::from_key(SIGNING_KEY),
    )
    .expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_credentials(&self, path: &str, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Register and return the `{refresh, access}` body
    pub async fn register(&self, email: &str, password: &str) -> Value {
        let response = self.post_credentials("/api/jwt/register", email, password).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    pub async fn get_with_bearer(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Register an account, give it the admin role, then log in again so the
    /// access token carries it.
    pub async fn admin(&self, email: &str, password: &str) -> Value {
        self.register(email, password).await;

        let user = self
            .store
            .find_by_email_and_password(email, &urlshort::auth::hash_password(email, password))
            .await
            .expect("Admin account should exist");
        self.store
            .set_role(user.id, Role::Admin)
            .await
            .expect("Failed to promote admin");

        let response = self.post_credentials("/api/jwt/login", email, password).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }
}

pub async fn assert_error_body(response: reqwest::Response, code: u16, message: &str) {
    assert_eq!(code, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse error body");
    assert_eq!(body, json!({ "code": code, "message": message }));
}
