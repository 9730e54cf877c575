use super::models::{fields_from_json, fields_into_json, Document, ListDocumentsResponse};
use super::FirestoreError;
use crate::core::parse_error_response;
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::{DeserializeOwned, Error as _};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Converts a document's fields into `T`.
pub(crate) fn decode_document<T: DeserializeOwned>(doc: Document) -> Result<T, FirestoreError> {
    let json = fields_into_json(doc.fields)?;
    Ok(serde_json::from_value(json)?)
}

fn encode_document<T: Serialize>(value: &T) -> Result<Vec<u8>, FirestoreError> {
    match serde_json::to_value(value)? {
        JsonValue::Object(map) => {
            let fields = fields_from_json(map)?;
            Ok(serde_json::to_vec(&serde_json::json!({ "fields": fields }))?)
        }
        _ => Err(FirestoreError::SerializationError(serde_json::Error::custom(
            "Can only set objects as documents",
        ))),
    }
}

#[derive(Clone)]
pub struct DocumentReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) path: String,
}

impl<'a> DocumentReference<'a> {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads the document. Returns `Ok(None)` if it does not exist.
    pub async fn get<T: DeserializeOwned>(&self) -> Result<Option<T>, FirestoreError> {
        let response = self.client.get(&self.path).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Get document failed").await,
            ));
        }

        let doc: Document = response.json().await?;
        Ok(Some(decode_document(doc)?))
    }

    /// Writes `value` as the whole document, creating it if needed.
    pub async fn set<T: Serialize>(&self, value: &T) -> Result<(), FirestoreError> {
        let body = encode_document(value)?;

        let response = self
            .client
            .patch(&self.path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Set document failed").await,
            ));
        }

        Ok(())
    }

    pub async fn delete(&self) -> Result<(), FirestoreError> {
        let response = self.client.delete(&self.path).send().await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Delete document failed").await,
            ));
        }

        Ok(())
    }
}

#[derive(Clone)]
pub struct CollectionReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) path: String,
}

impl<'a> CollectionReference<'a> {
    pub fn doc(&self, document_id: &str) -> DocumentReference<'a> {
        DocumentReference {
            client: self.client,
            path: format!("{}/{}", self.path, document_id),
        }
    }

    /// Lists every document in the collection, following page tokens.
    pub async fn list_documents(&self) -> Result<Vec<Document>, FirestoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&self.path);
            if let Some(token) = page_token.take() {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await?;

            if !response.status().is_success() {
                return Err(FirestoreError::ApiError(
                    parse_error_response(response, "List documents failed").await,
                ));
            }

            let page: ListDocumentsResponse = response.json().await?;
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }
}
