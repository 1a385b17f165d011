#![allow(dead_code)]

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use blog_api::{config::Config, db, rest, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PASSWORD: &str = "p12345678";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }

    /// Token from a `Set-Cookie: session=...` header, if any.
    pub fn session_token(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.strip_prefix("session="))
            .map(|v| v.split(';').next().unwrap_or_default().to_owned())
            .next()
    }
}

pub fn config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("DATABASE_URL", "sqlite::memory:"),
        ("SESSION_SECRET", "integration-test-secret-0123456789abcdef"),
        ("AUTH_RATE_LIMIT", "1000"),
        ("SESSION_REFRESH_WINDOW_MINUTES", "0"),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
    .collect();
    for (k, v) in overrides {
        vars.insert((*k).to_owned(), (*v).to_owned());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(&[]).await
}

pub async fn spawn_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let config = config(overrides);
    let pool = db::connect(&config.database_url, 1).await.unwrap();
    db::migrate(&pool).await.unwrap();
    let state = AppState::new(pool, &config);
    TestApp {
        router: rest::router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let body = body.map(|value| value.to_string());
        self.request_raw(method, uri, token, body).await
    }

    /// Sends `body` verbatim as `application/json`.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("session={token}"));
        }
        let body = match body {
            Some(raw) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(raw)
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register(&self, name: &str, email: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": name, "email": email, "password": PASSWORD })),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Registers and logs in, returning `(user id, session token)`.
    pub async fn signed_in(&self, name: &str, email: &str) -> (String, String) {
        let registered = self.register(name, email).await;
        assert_eq!(registered.status, StatusCode::CREATED);
        let login = self.login(email, PASSWORD).await;
        assert_eq!(login.status, StatusCode::OK);
        let id = registered.body["id"].as_str().unwrap().to_owned();
        (id, login.session_token().unwrap())
    }

    pub async fn create_post(&self, token: &str, title: &str, body: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/posts",
            Some(token),
            Some(json!({ "title": title, "body": body })),
        )
        .await
    }
}
