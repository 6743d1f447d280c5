//! Token authorization.
//!
//! The bridge never validates tokens itself; it asks the payment server's
//! auth endpoint whether a token carries the scope a stream requires.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::Principal;

/// Authorization errors.
///
/// Both variants close the connection the same way; the distinction exists
/// for logs only.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// Token missing the scope, expired, or unknown.
    #[error("token rejected: {0}")]
    Denied(String),

    /// The authorization service could not be reached.
    #[error("authorization service unavailable: {0}")]
    Unavailable(String),
}

/// Resolves an access token and a required scope to a principal.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Authorizes `token` for `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is rejected or the auth service is
    /// unreachable.
    async fn authorize(&self, token: &str, scope: &str) -> Result<Principal, AuthError>;
}

/// Token-introspection client against the payment server's auth endpoint.
#[derive(Debug, Clone)]
pub struct HttpAuthorizer {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
    scope: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    user_id: String,
    #[serde(default)]
    scopes: Vec<String>,
}

impl HttpAuthorizer {
    /// Creates an authorizer talking to the auth service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn verify_url(&self) -> String {
        format!(
            "{}/api/token/verify",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Authorizer for HttpAuthorizer {
    async fn authorize(&self, token: &str, scope: &str) -> Result<Principal, AuthError> {
        let response = self
            .http
            .post(self.verify_url())
            .json(&VerifyRequest { token, scope })
            .send()
            .await
            .map_err(|err| AuthError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Denied(response.status().to_string()));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|err| AuthError::Unavailable(err.to_string()))?;

        Ok(Principal {
            user_id: body.user_id,
            scopes: body.scopes,
        })
    }
}
