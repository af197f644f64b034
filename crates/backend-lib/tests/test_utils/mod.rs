//! Test utilities for the ticketing backend integration tests
//!
//! Builds a router over an in-memory (or temp-dir) identity store with a
//! mailer that records every verification link instead of sending it.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Request, Response, StatusCode},
    Router,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use ticketing_backend_lib::{
    config::{Secret, Settings, StorageKind},
    create_router,
    mailer::{MailError, Mailer},
    storage::{FlatFileUserStore, MemoryUserStore, UserStore},
    AppState,
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Mailer double that keeps `(to, link)` pairs
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, verification_link: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .push((to.to_string(), verification_link.to_string()));
        Ok(())
    }
}

impl RecordingMailer {
    /// Wait for the background dispatch to deliver a link to `to`
    pub async fn link_for(&self, to: &str) -> String {
        for _ in 0..100 {
            let found = self
                .sent
                .lock()
                .iter()
                .find(|(addr, _)| addr == to)
                .map(|(_, link)| link.clone());
            if let Some(link) = found {
                return link;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no verification mail sent to {to}");
    }

    /// Token part of the link sent to `to`
    pub async fn token_for(&self, to: &str) -> String {
        let link = self.link_for(to).await;
        link.rsplit('/').next().unwrap().to_string()
    }
}

/// Mailer double whose every delivery fails
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, to: &str, _verification_link: &str) -> Result<(), MailError> {
        // An address lettre rejects stands in for any delivery failure
        let _: lettre::Address = format!("{to} (unroutable)").parse()?;
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub mailer: Arc<RecordingMailer>,
    /// Keep in scope so the data directory outlives the test
    pub temp_dir: Option<TempDir>,
}

pub fn test_settings(secret: Option<&str>) -> Settings {
    let mut settings = Settings::default();
    settings.storage = StorageKind::Memory;
    settings.auth.scrypt_log_n = 10;
    settings.auth.jwt_secret = secret.map(Secret::new);
    settings.mail.public_base_url = "http://localhost:3000".to_string();
    settings.mail.verified_redirect_url = "http://localhost:5173/login".to_string();
    settings
}

fn build(store: Arc<dyn UserStore>, settings: Settings, temp_dir: Option<TempDir>) -> TestApp {
    let mailer = Arc::new(RecordingMailer::default());
    build_with_mailer(store, settings, temp_dir, mailer.clone(), mailer)
}

fn build_with_mailer(
    store: Arc<dyn UserStore>,
    settings: Settings,
    temp_dir: Option<TempDir>,
    delivery: Arc<dyn Mailer>,
    mailer: Arc<RecordingMailer>,
) -> TestApp {
    let state = Arc::new(AppState::new(store, delivery, settings).unwrap());
    TestApp {
        router: create_router(state.clone()),
        state,
        mailer,
        temp_dir,
    }
}

/// App over an in-memory store with the test secret configured
pub fn setup_test_app() -> TestApp {
    setup_test_app_with_secret(Some(TEST_SECRET))
}

pub fn setup_test_app_with_secret(secret: Option<&str>) -> TestApp {
    build(Arc::new(MemoryUserStore::new()), test_settings(secret), None)
}

/// App whose verification mail always fails to send.
/// `mailer` records nothing.
pub fn setup_test_app_with_failing_mailer() -> TestApp {
    build_with_mailer(
        Arc::new(MemoryUserStore::new()),
        test_settings(Some(TEST_SECRET)),
        None,
        Arc::new(FailingMailer),
        Arc::new(RecordingMailer::default()),
    )
}

/// App over a flat-file store in a fresh temp directory
pub async fn setup_file_backed_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let store = FlatFileUserStore::open(temp_dir.path()).await.unwrap();
    let mut settings = test_settings(Some(TEST_SECRET));
    settings.storage = StorageKind::File;
    settings.data_dir = temp_dir.path().to_path_buf();
    build(Arc::new(store), settings, Some(temp_dir))
}

impl TestApp {
    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST as if the connection came from `peer`
    pub async fn post_json_from(&self, uri: &str, body: Value, peer: &str) -> Response<Body> {
        let peer: SocketAddr = peer.parse().unwrap();
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        self.request(request).await
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> StatusCode {
        self.post_json(
            "/auth/register",
            serde_json::json!({ "username": username, "email": email, "password": password }),
        )
        .await
        .status()
    }

    /// Register, follow the verification link and log in; returns the bearer token
    pub async fn verified_login(&self, username: &str, email: &str, password: &str) -> String {
        assert_eq!(self.register(username, email, password).await, StatusCode::CREATED);
        let token = self.mailer.token_for(email).await;
        let response = self.get(&format!("/auth/verify/{token}"), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = self
            .post_json(
                "/auth/login",
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        read_json::<Value>(response).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
