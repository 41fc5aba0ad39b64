//! Scripted gateway double for session and guard tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;

use crate::api::gateway::{AuthGateway, LoginResponse, ProfileResponse};
use crate::api::ApiError;
use crate::models::{Credentials, ProfileUpdate, UserProfile};

struct Step<T> {
    delay: Duration,
    result: Result<T, ApiError>,
}

type Script<T> = Mutex<VecDeque<Step<T>>>;

/// Replies are consumed in call order. Each reply can be delayed so tests
/// control the order in which concurrent calls resolve (run them with
/// `start_paused = true`). Empty scripts fall back to: login and profile
/// fail with `Unauthorized`, logout and update succeed.
#[derive(Default)]
pub struct FakeGateway {
    logins: Script<LoginResponse>,
    profiles: Script<ProfileResponse>,
    logouts: Script<()>,
    updates: Script<()>,
    login_calls: AtomicUsize,
    profile_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    update_calls: AtomicUsize,
    last_login_email: Mutex<Option<String>>,
}

pub fn user(value: Value) -> UserProfile {
    serde_json::from_value(value).expect("test user should be a JSON object")
}

pub fn login_ok(value: Value) -> Result<LoginResponse, ApiError> {
    Ok(LoginResponse {
        user: Some(user(value)),
        success_message: Some("ok".to_string()),
    })
}

pub fn profile_ok(value: Value) -> Result<ProfileResponse, ApiError> {
    Ok(ProfileResponse { user: Some(user(value)) })
}

fn push<T>(script: &Script<T>, delay_ms: u64, result: Result<T, ApiError>) {
    script
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push_back(Step {
            delay: Duration::from_millis(delay_ms),
            result,
        });
}

async fn play<T>(script: &Script<T>, fallback: Result<T, ApiError>) -> Result<T, ApiError> {
    let step = script.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
    match step {
        Some(step) => {
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            step.result
        }
        None => fallback,
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_login(self, delay_ms: u64, result: Result<LoginResponse, ApiError>) -> Self {
        push(&self.logins, delay_ms, result);
        self
    }

    pub fn on_profile(self, delay_ms: u64, result: Result<ProfileResponse, ApiError>) -> Self {
        push(&self.profiles, delay_ms, result);
        self
    }

    pub fn on_logout(self, delay_ms: u64, result: Result<(), ApiError>) -> Self {
        push(&self.logouts, delay_ms, result);
        self
    }

    pub fn on_update(self, delay_ms: u64, result: Result<(), ApiError>) -> Self {
        push(&self.updates, delay_ms, result);
        self
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn last_login_email(&self) -> Option<String> {
        self.last_login_email
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuthGateway for FakeGateway {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_login_email
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials.email.clone());
        play(&self.logins, Err(ApiError::Unauthorized(None))).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        play(&self.logouts, Ok(())).await
    }

    async fn get_profile(&self) -> Result<ProfileResponse, ApiError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        play(&self.profiles, Err(ApiError::Unauthorized(None))).await
    }

    async fn update_profile(&self, _update: &ProfileUpdate) -> Result<(), ApiError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        play(&self.updates, Ok(())).await
    }
}
