//! Shared harness for the HTTP integration tests.
//!
//! Builds the full router over an in-memory (or temp-dir) store with a
//! recording mail sender, and sends requests through it with `oneshot`.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use careerhub::auth::email::EmailTemplate;
use careerhub::auth::MockEmailSender;
use careerhub::grading::{GradingClient, GradingConfig};
use careerhub::http_server::{build_router, AppState};
use careerhub::{AppConfig, Database};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@school.edu";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<MockEmailSender>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(Database::in_memory(), None)
    }

    pub fn persistent(dir: &Path) -> Self {
        Self::build(Database::open(dir).expect("open store"), None)
    }

    /// In-memory app whose server-side grading calls `grading.base_url`
    pub fn with_grader(grading: GradingConfig) -> Self {
        Self::build(Database::in_memory(), Some(grading))
    }

    fn build(db: Database, grading: Option<GradingConfig>) -> Self {
        let grader = grading
            .clone()
            .map(|config| GradingClient::new(config).expect("grading client"));
        let config = AppConfig {
            data_dir: None,
            grading,
            ..AppConfig::default()
        };
        let mailer = Arc::new(MockEmailSender::new());
        let state = AppState::new(config, Arc::new(db), mailer.clone(), grader);

        Self {
            router: build_router(state.clone()),
            state,
            mailer,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        (status, value)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, Some(token), None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        token_of(&body)
    }

    /// Create the administrator directly and log in over HTTP
    pub async fn admin(&self) -> String {
        self.state
            .auth
            .create_admin("Admin", ADMIN_EMAIL, ADMIN_PASSWORD)
            .expect("create admin");
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Invite and register a teacher; returns (token, user id)
    pub async fn teacher(&self, admin_token: &str, email: &str) -> (String, String) {
        let (status, _) = self
            .post("/api/invites", admin_token, json!({ "email": email }))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let code = self.last_invite_code(email);
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": "Teacher",
                    "email": email,
                    "password": PASSWORD,
                    "invite_code": code,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "teacher register: {}", body);
        (token_of(&body), id_of(&body["user"]))
    }

    /// Register a student, optionally joining a section; returns (token, user id)
    pub async fn student(&self, email: &str, join_code: Option<&str>) -> (String, String) {
        let mut body = json!({ "name": "Student", "email": email, "password": PASSWORD });
        if let Some(code) = join_code {
            body["join_code"] = json!(code);
        }

        let (status, body) = self
            .request(Method::POST, "/api/auth/register", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "student register: {}", body);
        (token_of(&body), id_of(&body["user"]))
    }

    /// Create a section led by `teacher_id`; returns (section id, join code)
    pub async fn section(&self, admin_token: &str, name: &str, teacher_id: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/sections",
                admin_token,
                json!({ "name": name, "teacher_id": teacher_id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create section: {}", body);
        (
            id_of(&body),
            body["join_code"].as_str().expect("join code").to_string(),
        )
    }

    pub fn last_invite_code(&self, email: &str) -> String {
        self.mailer
            .sent()
            .into_iter()
            .rev()
            .find_map(|mail| match mail {
                EmailTemplate::TeacherInvite { to, code, .. } if to == email => Some(code),
                _ => None,
            })
            .expect("invite email sent")
    }
}

pub fn token_of(body: &Value) -> String {
    body["token"].as_str().expect("token").to_string()
}

pub fn id_of(body: &Value) -> String {
    body["id"].as_str().expect("id").to_string()
}
