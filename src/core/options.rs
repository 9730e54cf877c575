use serde::Deserialize;

const IDENTITY_TOOLKIT_V1_API: &str = "https://identitytoolkit.googleapis.com/v1";
pub(crate) const SECURE_TOKEN_V1_API: &str = "https://securetoken.googleapis.com/v1";
const FIRESTORE_V1_API: &str =
    "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents";

/// Client configuration for a Firebase project.
///
/// Field names follow the web config snippet from the Firebase console, so the
/// JSON can be pasted as-is into [`FirebaseOptions::from_json`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseOptions {
    pub api_key: String,
    pub project_id: String,
    /// Collection holding one profile document per signed-in user.
    #[serde(default = "default_users_collection")]
    pub users_collection: String,
    /// Overrides the Identity Toolkit endpoint (emulator, tests).
    #[serde(default)]
    pub identity_url: Option<String>,
    /// Overrides the Secure Token endpoint used to refresh ID tokens.
    #[serde(default)]
    pub token_url: Option<String>,
    /// Overrides the Firestore documents endpoint (emulator, tests).
    #[serde(default)]
    pub firestore_url: Option<String>,
}

fn default_users_collection() -> String {
    "users".to_string()
}

impl FirebaseOptions {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            users_collection: default_users_collection(),
            identity_url: None,
            token_url: None,
            firestore_url: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_users_collection(mut self, collection: impl Into<String>) -> Self {
        self.users_collection = collection.into();
        self
    }

    pub fn with_identity_url(mut self, url: impl Into<String>) -> Self {
        self.identity_url = Some(url.into());
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn with_firestore_url(mut self, url: impl Into<String>) -> Self {
        self.firestore_url = Some(url.into());
        self
    }

    pub fn identity_url(&self) -> String {
        self.identity_url
            .clone()
            .unwrap_or_else(|| IDENTITY_TOOLKIT_V1_API.to_string())
    }

    pub fn token_url(&self) -> String {
        self.token_url
            .clone()
            .unwrap_or_else(|| SECURE_TOKEN_V1_API.to_string())
    }

    pub fn firestore_url(&self) -> String {
        self.firestore_url
            .clone()
            .unwrap_or_else(|| FIRESTORE_V1_API.replace("{project_id}", &self.project_id))
    }
}
