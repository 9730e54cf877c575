use serde::Deserialize;
use tracing::{debug, warn};

use super::reference::decode_document;
use super::{FirebaseFirestore, FirestoreError};
use crate::session::{DirectoryError, ProfileFields, UserDirectory};

/// A profile document from the users collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInformation {
    /// Document id, which is the user's principal id.
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Push token, empty if the user never registered one.
    #[serde(default)]
    pub fcm: String,
}

/// User profiles stored as `<collection>/<principal id>` documents.
pub struct FirestoreDirectory {
    firestore: FirebaseFirestore,
    collection: String,
}

impl FirestoreDirectory {
    pub fn new(firestore: FirebaseFirestore, collection: impl Into<String>) -> Self {
        Self {
            firestore,
            collection: collection.into(),
        }
    }

    pub fn collection_id(&self) -> &str {
        &self.collection
    }

    pub async fn get_user(
        &self,
        principal_id: &str,
    ) -> Result<Option<UserInformation>, FirestoreError> {
        let user: Option<UserInformation> = self
            .firestore
            .collection(&self.collection)
            .doc(principal_id)
            .get()
            .await?;

        Ok(user.map(|user| UserInformation {
            id: principal_id.to_string(),
            ..user
        }))
    }

    /// Every profile with a non-empty email. Documents that do not decode as
    /// a profile are logged and skipped.
    pub async fn list_users(&self) -> Result<Vec<UserInformation>, FirestoreError> {
        let documents = self
            .firestore
            .collection(&self.collection)
            .list_documents()
            .await?;

        let mut users = Vec::with_capacity(documents.len());
        for doc in documents {
            let id = doc.id().to_string();
            let user: UserInformation = match decode_document(doc) {
                Ok(user) => user,
                Err(e) => {
                    warn!(document = %id, error = %e, "skipping malformed profile document");
                    continue;
                }
            };
            if user.email.is_empty() {
                continue;
            }
            users.push(UserInformation { id, ..user });
        }
        Ok(users)
    }
}

#[async_trait::async_trait]
impl UserDirectory for FirestoreDirectory {
    async fn upsert_profile(
        &self,
        principal_id: &str,
        fields: ProfileFields,
    ) -> Result<(), DirectoryError> {
        self.firestore
            .collection(&self.collection)
            .doc(principal_id)
            .set(&fields)
            .await?;

        debug!(principal_id, collection = %self.collection, "profile document written");
        Ok(())
    }
}
