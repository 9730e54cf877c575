use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Principal;

/// Body for `accounts:signInWithPassword` and `accounts:signUp`.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmailPasswordRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub return_secure_token: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub local_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Token lifetime in seconds, sent as a string.
    pub expires_in: String,
    pub registered: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOobCodeRequest {
    pub request_type: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOobCodeResponse {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    pub id_token: String,
}

/// Body for the Secure Token `token` endpoint.
#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest {
    pub grant_type: String,
    pub refresh_token: String,
}

/// The Secure Token API answers in snake_case, unlike Identity Toolkit.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenResponse {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
    pub user_id: Option<String>,
}

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// The signed-in user held by [`FirebaseIdentity`](super::FirebaseIdentity).
#[derive(Debug, Clone)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub is_anonymous: bool,
    pub(crate) id_token: String,
    pub(crate) refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl User {
    pub(crate) fn from_response(response: SignInResponse, is_anonymous: bool) -> Self {
        Self {
            uid: response.local_id,
            email: response.email.filter(|email| !email.is_empty()),
            display_name: response.display_name.filter(|name| !name.is_empty()),
            photo_url: response.photo_url,
            is_anonymous,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_at: expires_at(&response.expires_in),
        }
    }

    pub(crate) fn with_refreshed_tokens(&self, response: RefreshTokenResponse) -> Self {
        Self {
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_at: expires_at(&response.expires_in),
            ..self.clone()
        }
    }

    /// True once the ID token is within five minutes of expiry.
    pub fn is_token_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn principal(&self) -> Principal {
        Principal {
            id: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            is_anonymous: self.is_anonymous,
        }
    }
}

fn expires_at(expires_in: &str) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(expires_in.parse::<i64>().unwrap_or(0))
}

/// Public view of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDataResult {
    pub uid: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl From<&User> for AuthDataResult {
    fn from(user: &User) -> Self {
        Self {
            uid: user.uid.clone(),
            email: user.email.clone(),
            photo_url: user.photo_url.clone(),
        }
    }
}
