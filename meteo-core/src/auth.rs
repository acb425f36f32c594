//! Service-account authentication for the document store.
//!
//! Access tokens are obtained with the OAuth2 JWT-bearer grant: an RS256
//! assertion signed with the service account's private key is exchanged at
//! the key's `token_uri`. Tokens are cached until shortly before expiry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};
use tokio::sync::Mutex;

use crate::error::{AuthError, truncate_body};

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service-account JSON key we need.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let contents = fs::read_to_string(path).map_err(|source| AuthError::CredentialsRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Token source backed by a service-account key.
#[derive(Debug)]
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    cached: Mutex<Option<AccessToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            cached: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let claims = Claims {
            iss: &self.key.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&header, &claims, &signing_key)?)
    }

    /// Returns a valid access token, exchanging a new assertion if the cached
    /// one is missing or about to expire.
    pub async fn access_token(&self, http: &Client) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        tracing::debug!(client = %self.key.client_email, "requesting access token");
        let assertion = self.assertion(now)?;
        let res = http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => truncate_body(&body),
            };
            return Err(AuthError::TokenExchange { status, message });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::TokenExchange {
                status,
                message: format!("unexpected token response: {e}"),
            })?;
        let token = AccessToken {
            value: parsed.access_token,
            expires_at: now + Duration::seconds(parsed.expires_in),
        };
        let value = token.value.clone();
        *cached = Some(token);

        Ok(value)
    }
}

/// Where bearer tokens for store requests come from.
#[derive(Debug)]
pub enum TokenSource {
    /// Fixed token, used against the local emulator.
    Static(String),
    ServiceAccount(ServiceAccountAuth),
}

impl TokenSource {
    pub async fn bearer(&self, http: &Client) -> Result<String, AuthError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount(auth) => auth.access_token(http).await,
        }
    }
}
