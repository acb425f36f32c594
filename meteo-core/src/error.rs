use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure while fetching or decoding data from the forecast API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("forecast request failed with status {status}: {reason}")]
    Status { status: StatusCode, reason: String },

    #[error("invalid forecast response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure while loading credentials or obtaining an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read credentials file '{}': {source}", .path.display())]
    CredentialsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid service account key: {0}")]
    CredentialsParse(#[from] serde_json::Error),

    #[error("could not sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("token request failed: {0}")]
    TokenRequest(#[from] reqwest::Error),

    #[error("token endpoint answered {status}: {message}")]
    TokenExchange { status: StatusCode, message: String },
}

/// Failure while writing to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("document write failed with status {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("no project id in configuration or service account key")]
    MissingProject,
}

/// Everything that can go wrong while refreshing a single location.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("response has no 'daily' block")]
    MissingDaily,

    #[error("invalid 'daily' block: {0}")]
    InvalidDaily(#[source] serde_json::Error),

    #[error("daily series '{field}' has no value at offset {offset} (length {len})")]
    RaggedSeries {
        field: &'static str,
        offset: usize,
        len: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(300);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
    }

    #[test]
    fn ragged_series_message_names_the_field() {
        let err = RefreshError::RaggedSeries {
            field: "temperature_2m_max",
            offset: 4,
            len: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("temperature_2m_max"));
        assert!(msg.contains("offset 4"));
    }
}
