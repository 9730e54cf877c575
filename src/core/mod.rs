pub mod middleware;
pub mod options;

use serde::Deserialize;

#[cfg(test)]
mod tests;

#[derive(Debug, Deserialize)]
pub struct FirebaseErrorResponse {
    pub error: FirebaseErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct FirebaseErrorDetails {
    pub code: u16,
    pub message: String,
    pub status: Option<String>,
    pub errors: Option<Vec<FirebaseSubError>>,
}

#[derive(Debug, Deserialize)]
pub struct FirebaseSubError {
    pub message: String,
    pub domain: Option<String>,
    pub reason: Option<String>,
}

impl FirebaseErrorResponse {
    pub fn display_message(&self) -> String {
        format!("{} (code: {})", self.error.message, self.error.code)
    }
}

/// Reads a failed response body and turns it into a readable message.
///
/// Falls back to `default_msg` plus the HTTP status when the body is not the
/// usual `{ "error": { ... } }` envelope.
pub async fn parse_error_response(response: reqwest::Response, default_msg: &str) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    error_message_from_body(&text, status, default_msg)
}

fn error_message_from_body(body: &str, status: reqwest::StatusCode, default_msg: &str) -> String {
    match serde_json::from_str::<FirebaseErrorResponse>(body) {
        Ok(error_resp) => format!("{}: {}", default_msg, error_resp.display_message()),
        Err(_) => format!("{}: {}", default_msg, status),
    }
}
