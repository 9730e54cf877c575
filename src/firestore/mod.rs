//! Cloud Firestore access for the signed-in user.
//!
//! [`FirebaseFirestore`] is a small document client over the Firestore REST
//! API. [`FirestoreDirectory`] builds the per-user profile collection on top of
//! it and is the [`UserDirectory`](crate::session::UserDirectory) the session
//! core writes to.

pub mod directory;
pub mod models;
pub mod reference;


pub use self::directory::{FirestoreDirectory, UserInformation};

use self::reference::{CollectionReference, DocumentReference};
use crate::core::middleware::{BearerTokenMiddleware, TokenSource};
use crate::core::options::FirebaseOptions;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during Firestore operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Wrapper for `reqwest_middleware::Error`.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// Errors returned by the Firestore API.
    #[error("API error: {0}")]
    ApiError(String),
    /// Wrapper for `serde_json::Error`.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Client for interacting with Cloud Firestore.
pub struct FirebaseFirestore {
    client: ClientWithMiddleware,
    base_url: String,
}

impl FirebaseFirestore {
    /// Creates a new `FirebaseFirestore` instance that authenticates requests
    /// with the ID token from `tokens`.
    ///
    /// This is typically called via `FirebaseApp::firestore()`.
    pub fn new(options: &FirebaseOptions, tokens: Arc<dyn TokenSource>) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(BearerTokenMiddleware::new(tokens))
            .build();

        Self::new_with_client(client, options.firestore_url())
    }

    /// Creates a new `FirebaseFirestore` instance with a custom client and base
    /// URL (useful for testing).
    pub fn new_with_client(client: ClientWithMiddleware, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Gets a `CollectionReference` instance that refers to the collection at the specified path.
    ///
    /// # Arguments
    ///
    /// * `collection_id` - The ID of the collection (e.g., "users").
    pub fn collection(&self, collection_id: &str) -> CollectionReference<'_> {
        CollectionReference {
            client: &self.client,
            path: format!("{}/{}", self.base_url, collection_id),
        }
    }

    /// Gets a `DocumentReference` instance that refers to the document at the specified path.
    ///
    /// # Arguments
    ///
    /// * `document_path` - The slash-separated path to the document (e.g., "users/user1").
    pub fn doc(&self, document_path: &str) -> DocumentReference<'_> {
        DocumentReference {
            client: &self.client,
            path: format!("{}/{}", self.base_url, document_path),
        }
    }
}
