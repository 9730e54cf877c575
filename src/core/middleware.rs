use std::sync::Arc;

use http::Extensions;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};

/// Source of the signed-in user's ID token.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns `None` when nobody is signed in.
    async fn id_token(&self) -> Option<String>;
}

/// Appends the project's web API key as the `key` query parameter.
///
/// The Identity Toolkit endpoints used by client apps identify the project by
/// API key rather than by OAuth credentials.
#[derive(Clone)]
pub struct ApiKeyMiddleware {
    api_key: String,
}

impl ApiKeyMiddleware {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for ApiKeyMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair("key", &self.api_key);

        next.run(req, extensions).await
    }
}

/// Attaches `Authorization: Bearer <id token>` when a user is signed in.
///
/// Requests made while signed out go through unauthenticated and are left to
/// the security rules to accept or reject.
#[derive(Clone)]
pub struct BearerTokenMiddleware {
    source: Arc<dyn TokenSource>,
}

impl BearerTokenMiddleware {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self { source }
    }
}

#[async_trait::async_trait]
impl Middleware for BearerTokenMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        if let Some(token) = self.source.id_token().await {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                reqwest_middleware::Error::Middleware(anyhow::anyhow!("Invalid ID token: {}", e))
            })?;
            req.headers_mut().insert(header::AUTHORIZATION, value);
        }

        next.run(req, extensions).await
    }
}
