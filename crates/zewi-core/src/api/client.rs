//! HTTP implementation of [`AuthGateway`] for the zewi backend.
//!
//! The backend keeps the session in an HTTP-only cookie, so the client runs
//! with a cookie store and never sees a bearer token.

use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::gateway::{AuthGateway, LoginResponse, ProfileResponse};
use super::ApiError;
use crate::config::Config;
use crate::models::{Credentials, ProfileUpdate};

const LOGIN_PATH: &str = "/api/v1/auth/login";
const LOGOUT_PATH: &str = "/api/v1/auth/logout";
const PROFILE_PATH: &str = "/api/v1/auth/me";
const PROFILE_UPDATE_PATH: &str = "/api/v1/auth/profile";

/// Auth client for the zewi API.
/// Clone is cheap - reqwest::Client uses Arc internally, and clones share
/// the cookie jar.
#[derive(Clone)]
pub struct HttpAuthGateway {
    client: Client,
    base_url: String,
}

impl HttpAuthGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status.as_u16(), &body))
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Validation(e.to_string()))
    }

    async fn send_json<B: Serialize>(
        &self,
        request: reqwest::RequestBuilder,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        let response = request.send().await?;
        Self::check_response(response).await
    }
}

impl AuthGateway for HttpAuthGateway {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let url = self.url(LOGIN_PATH);
        debug!(url = %url, email = %credentials.email, "Sending login request");
        let response = self
            .send_json(self.client.post(&url), Some(credentials))
            .await?;
        Self::parse(response).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let url = self.url(LOGOUT_PATH);
        debug!(url = %url, "Sending logout request");
        self.send_json::<()>(self.client.post(&url), None).await?;
        Ok(())
    }

    async fn get_profile(&self) -> Result<ProfileResponse, ApiError> {
        let url = self.url(PROFILE_PATH);
        debug!(url = %url, "Fetching profile");
        let response = self.send_json::<()>(self.client.get(&url), None).await?;
        Self::parse(response).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
        let url = self.url(PROFILE_UPDATE_PATH);
        debug!(url = %url, fields = update.fields().len(), "Updating profile");
        self.send_json(self.client.put(&url), Some(update)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, HeaderMap, StatusCode},
        routing::{get, post, put},
        Json, Router,
    };
    use serde_json::{json, Value};

    const SESSION_COOKIE: &str = "zewi_session=abc123";

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn has_session(headers: &HeaderMap) -> bool {
        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains(SESSION_COOKIE))
            .unwrap_or(false)
    }

    fn backend() -> Router {
        Router::new()
            .route(
                LOGIN_PATH,
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == json!("x") && body["rememberMe"] == json!(true) {
                        (
                            StatusCode::OK,
                            [(header::SET_COOKIE, "zewi_session=abc123; Path=/")],
                            Json(json!({"user": {"id": 2, "email": body["email"]}, "successMessage": "ok"})),
                        )
                    } else {
                        (
                            StatusCode::UNPROCESSABLE_ENTITY,
                            [(header::SET_COOKIE, "ignored=1; Path=/")],
                            Json(json!({"errorMessage": "Password is invalid"})),
                        )
                    }
                }),
            )
            .route(
                PROFILE_PATH,
                get(|headers: HeaderMap| async move {
                    if has_session(&headers) {
                        (StatusCode::OK, Json(json!({"user": {"id": 2}})))
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({"errorMessage": "unauthorized"})))
                    }
                }),
            )
            .route(LOGOUT_PATH, post(|| async { StatusCode::NO_CONTENT }))
            .route(
                PROFILE_UPDATE_PATH,
                put(|Json(body): Json<Value>| async move {
                    if body.get("name").is_some() {
                        StatusCode::OK
                    } else {
                        StatusCode::BAD_REQUEST
                    }
                }),
            )
            .route("/garbage/api/v1/auth/me", get(|| async { "not json" }))
    }

    fn gateway(base: &str) -> HttpAuthGateway {
        HttpAuthGateway::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_profile_is_unauthorized_without_cookie() {
        let base = spawn_server(backend()).await;
        let err = gateway(&base).get_profile().await.unwrap_err();
        assert_eq!(err, ApiError::Unauthorized(Some("unauthorized".to_string())));
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie_for_profile() {
        let base = spawn_server(backend()).await;
        let gw = gateway(&base);

        let creds = Credentials::new("a@b.com", "x").remember_me(true);
        let response = gw.login(&creds).await.unwrap();
        assert_eq!(response.success_message.as_deref(), Some("ok"));
        let user = response.into_user().unwrap();
        assert_eq!(user.email(), Some("a@b.com"));

        let profile = gw.get_profile().await.unwrap();
        assert_eq!(profile.user.and_then(|u| u.id()).as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_login_failure_carries_server_message() {
        let base = spawn_server(backend()).await;
        let err = gateway(&base)
            .login(&Credentials::new("a@b.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Password is invalid");
    }

    #[tokio::test]
    async fn test_logout_and_update() {
        let base = spawn_server(backend()).await;
        let gw = gateway(&base);
        gw.logout().await.unwrap();
        gw.update_profile(&ProfileUpdate::new().set("name", "B")).await.unwrap();

        let err = gw.update_profile(&ProfileUpdate::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let base = spawn_server(backend()).await;
        let gw = gateway(&format!("{}/garbage/", base));
        let err = gw.get_profile().await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = gateway(&format!("http://{}", addr)).logout().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
