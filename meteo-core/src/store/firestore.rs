use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::{Document, DocumentPath, DocumentStore, FieldValue};
use crate::{
    auth::{ServiceAccountAuth, ServiceAccountKey, TokenSource},
    config::StoreConfig,
    error::{StoreError, truncate_body},
};

const EMULATOR_TOKEN: &str = "owner";

static SHARED: OnceCell<Arc<FirestoreStore>> = OnceCell::const_new();

/// Firestore client speaking the REST `documents:commit` API.
#[derive(Debug)]
pub struct FirestoreStore {
    http: Client,
    base_url: String,
    database: String,
    tokens: TokenSource,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
}

impl FirestoreStore {
    pub fn new(base_url: &str, project_id: &str, database: &str, tokens: TokenSource) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            database: format!("projects/{project_id}/databases/{database}"),
            tokens,
        }
    }

    /// Build a client from configuration: the emulator when one is
    /// configured, otherwise production Firestore with the service-account
    /// key from `credentials_path`.
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        if let Some(host) = config.emulator_host() {
            let project = config.project_id.clone().ok_or(StoreError::MissingProject)?;
            tracing::info!(%host, %project, "using Firestore emulator");
            return Ok(Self::new(
                &format!("http://{host}"),
                &project,
                &config.database,
                TokenSource::Static(EMULATOR_TOKEN.to_string()),
            ));
        }

        let key = ServiceAccountKey::from_file(&config.credentials_path)?;
        let project = config
            .project_id
            .clone()
            .or_else(|| key.project_id.clone())
            .ok_or(StoreError::MissingProject)?;

        tracing::info!(%project, client = %key.client_email, "connecting to Firestore");
        Ok(Self::new(
            &config.base_url,
            &project,
            &config.database,
            TokenSource::ServiceAccount(ServiceAccountAuth::new(key)),
        ))
    }

    /// Process-wide client. The first call connects; later calls return the
    /// same instance and ignore `config`.
    pub async fn shared(config: &StoreConfig) -> Result<Arc<Self>, StoreError> {
        SHARED
            .get_or_try_init(|| async { Self::connect(config).map(Arc::new) })
            .await
            .cloned()
    }

    pub fn document_name(&self, path: &DocumentPath) -> String {
        format!("{}/documents/{}", self.database, path)
    }

    async fn commit(&self, write: Value) -> Result<(), StoreError> {
        let url = format!("{}/v1/{}/documents:commit", self.base_url, self.database);
        let token = self.tokens.bearer(&self.http).await?;

        let res = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "writes": [write] }))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| truncate_body(&body));
            return Err(StoreError::Status { status, message });
        }

        Ok(())
    }

    fn encode_write(&self, path: &DocumentPath, document: &Document, merge: bool) -> Value {
        let mut fields = Map::new();
        let mut transforms = Vec::new();

        for (name, value) in document.iter() {
            match value {
                FieldValue::ServerTimestamp => transforms.push(json!({
                    "fieldPath": field_path(name),
                    "setToServerValue": "REQUEST_TIME",
                })),
                other => {
                    fields.insert(name.clone(), encode_value(other));
                }
            }
        }

        let mask: Vec<String> = fields.keys().map(|name| field_path(name)).collect();
        let mut write = json!({
            "update": {
                "name": self.document_name(path),
                "fields": fields,
            }
        });

        // Without a mask the update replaces the whole document.
        if merge {
            write["updateMask"] = json!({ "fieldPaths": mask });
        }
        if !transforms.is_empty() {
            write["updateTransforms"] = Value::Array(transforms);
        }

        write
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn merge(&self, path: &DocumentPath, document: Document) -> Result<(), StoreError> {
        tracing::debug!(%path, fields = document.len(), "merge");
        self.commit(self.encode_write(path, &document, true)).await
    }

    async fn set(&self, path: &DocumentPath, document: Document) -> Result<(), StoreError> {
        tracing::debug!(%path, fields = document.len(), "set");
        self.commit(self.encode_write(path, &document, false)).await
    }
}

fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null | FieldValue::ServerTimestamp => json!({ "nullValue": null }),
        FieldValue::Bool(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(ts) => {
            json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::Micros, true) })
        }
    }
}

/// Field names that are not plain identifiers must be backtick-quoted in
/// masks and transforms.
fn field_path(name: &str) -> String {
    let mut chars = name.chars();
    let simple = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}
