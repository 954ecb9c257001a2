//! [`DocumentStore`] over the Firestore REST API.
//!
//! Typed field values (`{"stringValue": ..}`, `{"integerValue": "3"}`, ...) are
//! decoded into plain JSON so the rest of the crate never sees the wire shape.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};

use crate::error::{StoreError, StoreResult};
use crate::quiz::remote::{Document, DocumentStore};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: &str = "300";

#[derive(Debug, Deserialize)]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RestDocument>,
    next_page_token: Option<String>,
}

#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    base_url: String,
    project_id: String,
    api_key: Option<String>,
}

impl FirestoreClient {
    pub fn new(base_url: &str, project_id: &str, api_key: Option<String>) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            api_key,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn documents_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.base_url,
            self.project_id,
            path.trim_matches('/')
        )
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key.as_str())]),
            None => request,
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>> {
        let url = self.documents_url(path);
        debug!("GET {}", url);

        let response = self.with_key(self.client.get(&url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        let doc: RestDocument = response.json().await.map_err(|e| StoreError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        decode_document(doc).map(Some)
    }

    async fn list_documents(&self, collection_path: &str) -> StoreResult<Vec<Document>> {
        let url = self.documents_url(collection_path);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            debug!("GET {} (page token {:?})", url, page_token);
            let mut request = self
                .with_key(self.client.get(&url))
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(StoreError::Status {
                    status: response.status().as_u16(),
                    path: collection_path.to_string(),
                });
            }

            let page: ListResponse = response.json().await.map_err(|e| StoreError::Decode {
                path: collection_path.to_string(),
                reason: e.to_string(),
            })?;

            for doc in page.documents {
                match decode_document(doc) {
                    Ok(doc) => documents.push(doc),
                    Err(e) => warn!("Skipping document in {}: {}", collection_path, e),
                }
            }

            match page.next_page_token {
                Some(token) if token.is_empty() => break,
                Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                    warn!("Page token repeated while listing {}, stopping", collection_path);
                    break;
                }
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }

    async fn set_document(&self, path: &str, fields: Map<String, Value>) -> StoreResult<()> {
        let url = self.documents_url(path);
        debug!("PATCH {}", url);

        let body = json!({ "fields": encode_fields(&fields) });
        let response = self.with_key(self.client.patch(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

fn decode_document(doc: RestDocument) -> StoreResult<Document> {
    let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
    let mut fields = Map::new();
    for (key, value) in doc.fields {
        let decoded = decode_value(&value).map_err(|reason| StoreError::Decode {
            path: doc.name.clone(),
            reason: format!("field '{}': {}", key, reason),
        })?;
        fields.insert(key, decoded);
    }
    Ok(Document { id, fields })
}

fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

/// Plain JSON into a typed Firestore value. Inverse of [`decode_value`].
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => {
            let values: Vec<Value> = values.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Turns one typed Firestore value into plain JSON.
pub fn decode_value(value: &Value) -> Result<Value, String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected a typed value, got {}", value))?;
    let (kind, inner) = object
        .iter()
        .next()
        .ok_or_else(|| "empty typed value".to_string())?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "doubleValue" => Ok(inner.clone()),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        // 64-bit integers travel as strings
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(|n| Value::Number(Number::from(n)))
                .map_err(|e| format!("bad integerValue '{}': {}", s, e)),
            Value::Number(_) => Ok(inner.clone()),
            _ => Err(format!("bad integerValue {}", inner)),
        },
        "arrayValue" => {
            let values = match inner.get("values").and_then(Value::as_array) {
                Some(values) => values,
                None => return Ok(Value::Array(Vec::new())),
            };
            values
                .iter()
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "mapValue" => {
            let mut map = Map::new();
            if let Some(fields) = inner.get("fields").and_then(Value::as_object) {
                for (key, value) in fields {
                    map.insert(key.clone(), decode_value(value)?);
                }
            }
            Ok(Value::Object(map))
        }
        "geoPointValue" => Ok(inner.clone()),
        other => {
            warn!("Unknown Firestore value type '{}'", other);
            Ok(inner.clone())
        }
    }
}
