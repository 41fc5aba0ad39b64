use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;

use super::ApiError;
use crate::models::{Credentials, ProfileUpdate, UserProfile};

/// Body of a login response. Both fields must be present for the login to
/// count as successful.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    pub user: Option<UserProfile>,
    #[serde(rename = "successMessage")]
    pub success_message: Option<String>,
}

impl LoginResponse {
    /// Returns the user only when the response carries both a user and a
    /// success indicator.
    pub fn into_user(self) -> Result<UserProfile, ApiError> {
        match (self.user, self.success_message) {
            (Some(user), Some(_)) => Ok(user),
            (None, _) => Err(ApiError::Validation("login response has no user".to_string())),
            (Some(_), None) => Err(ApiError::Validation(
                "login response has no success message".to_string(),
            )),
        }
    }
}

/// Body of a "who am I" response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileResponse {
    pub user: Option<UserProfile>,
}

/// Boundary to the remote identity service.
///
/// Implementations own transport concerns (timeouts, cookies, base URL);
/// the session store only sees these four calls.
pub trait AuthGateway: Send + Sync + 'static {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginResponse, ApiError>> + Send;

    fn logout(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `Err(ApiError::Unauthorized(_))` when there is no live server session.
    fn get_profile(&self) -> impl Future<Output = Result<ProfileResponse, ApiError>> + Send;

    fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl<T: AuthGateway> AuthGateway for Arc<T> {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginResponse, ApiError>> + Send {
        (**self).login(credentials)
    }

    fn logout(&self) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).logout()
    }

    fn get_profile(&self) -> impl Future<Output = Result<ProfileResponse, ApiError>> + Send {
        (**self).get_profile()
    }

    fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).update_profile(update)
    }
}
