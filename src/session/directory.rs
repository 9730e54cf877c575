use serde::Serialize;
use thiserror::Error;

#[cfg(feature = "firestore")]
use crate::firestore::FirestoreError;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[cfg(feature = "firestore")]
    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Fields written to a user's profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileFields {
    pub email: String,
    pub name: String,
    /// Push token; omitted from the document while empty.
    #[serde(rename = "fcm", skip_serializing_if = "Option::is_none")]
    pub push_token: Option<String>,
}

/// Per-user profile storage.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Creates or replaces the profile keyed by `principal_id`.
    ///
    /// Must be safe to repeat; the session core may send the same profile
    /// more than once.
    async fn upsert_profile(
        &self,
        principal_id: &str,
        fields: ProfileFields,
    ) -> Result<(), DirectoryError>;
}
