//! Client-side Firebase Authentication over the Identity Toolkit REST API.
//!
//! [`FirebaseIdentity`] keeps the signed-in user in memory and notifies
//! registered auth-state listeners whenever that user changes, which is what
//! the session core consumes through [`IdentityProvider`]. Expired ID tokens
//! are exchanged at the Secure Token endpoint on demand.

pub mod models;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use reqwest::{header, Client};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::models::{
    AuthDataResult, DeleteAccountRequest, EmailPasswordRequest, RefreshTokenRequest,
    RefreshTokenResponse, SendOobCodeRequest, SendOobCodeResponse, SignInResponse, User,
};
use crate::core::middleware::{ApiKeyMiddleware, TokenSource};
use crate::core::options::{FirebaseOptions, SECURE_TOKEN_V1_API};
use crate::core::parse_error_response;
use crate::session::{
    AuthSnapshot, IdentityProvider, ListenerHandle, ListenerRegistry, StateListener,
};


#[derive(Error, Debug)]
pub enum AuthError {
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("No user is signed in")]
    NotSignedIn,
    #[error("Credentials belong to a different user")]
    UserMismatch,
}

/// Email/password and anonymous authentication for one Firebase project.
///
/// Cloning is cheap; clones share the signed-in user and the listeners.
#[derive(Clone)]
pub struct FirebaseIdentity {
    inner: Arc<IdentityInner>,
}

struct IdentityInner {
    client: ClientWithMiddleware,
    base_url: String,
    token_url: String,
    current_user: RwLock<Option<User>>,
    /// Held across every user swap and the notification that follows it.
    transitions: Mutex<()>,
    listeners: ListenerRegistry,
}

impl FirebaseIdentity {
    /// Creates a client for the project described by `options`.
    ///
    /// This is typically called via `FirebaseApp::auth()`.
    pub fn new(options: &FirebaseOptions) -> Self {
        let client = ClientBuilder::new(Client::new())
            .with(ApiKeyMiddleware::new(options.api_key.clone()))
            .build();

        Self::new_with_endpoints(client, options.identity_url(), options.token_url())
    }

    /// Creates a client with a custom HTTP client and base URL (useful for testing).
    pub fn new_with_client(client: ClientWithMiddleware, base_url: String) -> Self {
        Self::new_with_endpoints(client, base_url, SECURE_TOKEN_V1_API.to_string())
    }

    /// Like [`new_with_client`](Self::new_with_client), also overriding the
    /// Secure Token endpoint used for ID token refresh.
    pub fn new_with_endpoints(
        client: ClientWithMiddleware,
        base_url: String,
        token_url: String,
    ) -> Self {
        Self {
            inner: Arc::new(IdentityInner {
                client,
                base_url,
                token_url,
                current_user: RwLock::new(None),
                transitions: Mutex::new(()),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    async fn post<B, R>(&self, method: &str, body: &B, failure: &str) -> Result<R, AuthError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}/accounts:{}", self.inner.base_url, method);
        self.post_json(&url, body, failure).await
    }

    async fn post_json<B, R>(&self, url: &str, body: &B, failure: &str) -> Result<R, AuthError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .inner
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(body)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::ApiError(parse_error_response(response, failure).await));
        }

        Ok(response.json().await?)
    }

    pub async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthDataResult, AuthError> {
        let user = self.verify_password(email, password).await?;
        Ok(self.set_user(user))
    }

    pub async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthDataResult, AuthError> {
        let request = EmailPasswordRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            return_secure_token: true,
        };
        let response: SignInResponse = self
            .post("signUp", &request, "Create user failed")
            .await?;
        Ok(self.set_user(User::from_response(response, false)))
    }

    pub async fn sign_in_anonymously(&self) -> Result<AuthDataResult, AuthError> {
        let request = EmailPasswordRequest {
            return_secure_token: true,
            ..Default::default()
        };
        let response: SignInResponse = self
            .post("signUp", &request, "Anonymous sign in failed")
            .await?;
        Ok(self.set_user(User::from_response(response, true)))
    }

    /// Confirms the current user's password and refreshes their tokens.
    ///
    /// Fails with [`AuthError::UserMismatch`] if the credentials resolve to a
    /// different account; the current user is left untouched in that case.
    pub async fn reauthenticate(&self, password: &str) -> Result<AuthDataResult, AuthError> {
        let current = self.user().ok_or(AuthError::NotSignedIn)?;
        let email = current.email.as_deref().ok_or(AuthError::NotSignedIn)?;

        let user = self.verify_password(email, password).await?;
        if user.uid != current.uid {
            return Err(AuthError::UserMismatch);
        }
        Ok(self.set_user(user))
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let request = EmailPasswordRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            return_secure_token: true,
        };
        let response: SignInResponse = self
            .post("signInWithPassword", &request, "Sign in failed")
            .await?;
        Ok(User::from_response(response, false))
    }

    pub async fn send_password_reset_email(&self, email: &str) -> Result<(), AuthError> {
        let request = SendOobCodeRequest {
            request_type: "PASSWORD_RESET".to_string(),
            email: email.to_string(),
        };
        let _: SendOobCodeResponse = self
            .post("sendOobCode", &request, "Send password reset failed")
            .await?;
        Ok(())
    }

    /// Sends a password reset email to the signed-in user.
    ///
    /// Does nothing for a user without an email, such as an anonymous one.
    pub async fn reset_password(&self) -> Result<(), AuthError> {
        let user = self.current_user()?;
        if let Some(email) = user.email {
            self.send_password_reset_email(&email).await?;
        }
        Ok(())
    }

    /// Deletes the signed-in account, then signs out.
    pub async fn delete_current_user(&self) -> Result<(), AuthError> {
        let user = self.user().ok_or(AuthError::NotSignedIn)?;
        let request = DeleteAccountRequest {
            id_token: user.id_token.clone(),
        };
        let _: serde_json::Value = self.post("delete", &request, "Delete user failed").await?;

        info!(uid = %user.uid, "account deleted");
        self.sign_out_if(&user.uid);
        Ok(())
    }

    fn sign_out_if(&self, uid: &str) {
        let _transition = self.lock_transitions();
        if self.user().is_some_and(|current| current.uid == uid) {
            self.swap_and_notify(None);
        }
    }

    /// Signs out locally. Listeners are only notified if someone was signed in.
    pub fn sign_out(&self) {
        let _transition = self.lock_transitions();
        if self.user().is_none() {
            return;
        }
        if let Some(user) = self.swap_and_notify(None) {
            info!(uid = %user.uid, "signed out");
        }
    }

    /// The signed-in user's ID token.
    ///
    /// When the cached token is expired (or about to be), or `force_refresh`
    /// is set, the refresh token is exchanged for a new one first and
    /// listeners are notified of the refreshed user.
    pub async fn get_id_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        let user = self.user().ok_or(AuthError::NotSignedIn)?;
        if !force_refresh && !user.is_token_expired() {
            return Ok(user.id_token);
        }

        debug!(uid = %user.uid, "refreshing ID token");
        let request = RefreshTokenRequest {
            grant_type: "refresh_token".to_string(),
            refresh_token: user.refresh_token.clone(),
        };
        let url = format!("{}/token", self.inner.token_url);
        let response: RefreshTokenResponse = self
            .post_json(&url, &request, "Token refresh failed")
            .await?;

        let refreshed = user.with_refreshed_tokens(response);
        let id_token = refreshed.id_token.clone();
        self.store_refreshed(&user, refreshed);
        Ok(id_token)
    }

    /// Keeps the refreshed tokens unless the user changed while the request
    /// was in flight.
    fn store_refreshed(&self, stale: &User, refreshed: User) {
        let _transition = self.lock_transitions();
        let unchanged = self.user().is_some_and(|current| {
            current.uid == stale.uid && current.refresh_token == stale.refresh_token
        });
        if unchanged {
            info!(uid = %refreshed.uid, "ID token refreshed");
            self.swap_and_notify(Some(refreshed));
        } else {
            debug!(uid = %stale.uid, "user changed during token refresh; result dropped");
        }
    }

    /// The signed-in user, or [`AuthError::NotSignedIn`].
    pub fn current_user(&self) -> Result<AuthDataResult, AuthError> {
        self.user()
            .as_ref()
            .map(AuthDataResult::from)
            .ok_or(AuthError::NotSignedIn)
    }

    pub fn user(&self) -> Option<User> {
        self.inner
            .current_user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_user(&self, user: User) -> AuthDataResult {
        let result = AuthDataResult::from(&user);
        info!(uid = %user.uid, anonymous = user.is_anonymous, "signed in");
        self.replace_user(Some(user));
        result
    }

    fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.inner
            .transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Swaps the current user and notifies listeners. Returns the old user.
    fn replace_user(&self, user: Option<User>) -> Option<User> {
        let _transition = self.lock_transitions();
        self.swap_and_notify(user)
    }

    /// Caller must hold the transition lock, so that listeners observe
    /// snapshots in the order the swaps happened.
    fn swap_and_notify(&self, user: Option<User>) -> Option<User> {
        let snapshot = snapshot_of(user.as_ref());
        let previous = std::mem::replace(
            &mut *self
                .inner
                .current_user
                .write()
                .unwrap_or_else(PoisonError::into_inner),
            user,
        );
        self.inner.listeners.notify(&snapshot);
        previous
    }
}

fn snapshot_of(user: Option<&User>) -> AuthSnapshot {
    match user {
        Some(user) => AuthSnapshot::signed_in(user.principal()),
        None => AuthSnapshot::signed_out(),
    }
}

/// Listeners run while the transition lock is held; they must not sign in,
/// sign out or refresh tokens from inside the callback.
impl IdentityProvider for FirebaseIdentity {
    fn add_state_listener(&self, listener: StateListener) -> ListenerHandle {
        let _transition = self.lock_transitions();
        self.inner.listeners.register(listener, self.current_snapshot())
    }

    fn remove_listener(&self, handle: ListenerHandle) {
        self.inner.listeners.remove(handle);
    }

    fn current_snapshot(&self) -> AuthSnapshot {
        snapshot_of(self.user().as_ref())
    }
}

#[async_trait::async_trait]
impl TokenSource for FirebaseIdentity {
    /// Falls back to the cached token if a refresh fails; the request then
    /// surfaces the server's rejection.
    async fn id_token(&self) -> Option<String> {
        match self.get_id_token(false).await {
            Ok(token) => Some(token),
            Err(AuthError::NotSignedIn) => None,
            Err(e) => {
                warn!(error = %e, "ID token refresh failed");
                self.user().map(|user| user.id_token)
            }
        }
    }
}
