//! Firestore inventory store.
//!
//! Talks to the Firestore REST API. Each item is one document in the
//! configured collection; the document id is the item name and the body is
//! `{ quantity: integer }`, which Firestore encodes as
//! `{"fields": {"quantity": {"integerValue": "5"}}}`.
//!
//! Writes use a full-document `PATCH`, which creates or replaces the
//! document the same way `setDoc` does in the web SDK.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::FirestoreConfig;
use crate::item::InventoryItem;

use super::{keep_decodable, InventoryStore, StoreError, StoreResult};

/// Name of the single field stored in each document.
const QUANTITY_FIELD: &str = "quantity";

/// Documents fetched per list request.
const PAGE_SIZE: u32 = 300;

/// Inventory store backed by a Firestore collection.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    database: String,
    collection: String,
    api_key: Option<String>,
}

/// A Firestore document as it appears on the wire.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl FirestoreStore {
    /// Create a store for the configured collection.
    #[must_use]
    pub fn new(config: &FirestoreConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            database: config.database.clone(),
            collection: config.collection.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// URL of the collection, or of one document when `name` is given.
    fn url(&self, name: Option<&str>) -> StoreResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StoreError::unavailable(format!("invalid Firestore URL: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| StoreError::unavailable("Firestore URL cannot be a base"))?;
            segments.pop_if_empty().extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                self.database.as_str(),
                "documents",
                self.collection.as_str(),
            ]);
            if let Some(name) = name {
                segments.push(name);
            }
        }
        Ok(url)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        self.with_key(request)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))
    }

    async fn list_page(&self, page_token: Option<&str>) -> StoreResult<ListDocumentsResponse> {
        let mut request = self
            .client
            .get(self.url(None)?)
            .query(&[("pageSize", PAGE_SIZE.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::unavailable(format!("malformed list response: {e}")))
    }
}

/// Encode a quantity as a Firestore document body.
fn encode_document(quantity: u32) -> Document {
    let mut fields = Map::new();
    fields.insert(
        QUANTITY_FIELD.to_string(),
        json!({ "integerValue": quantity.to_string() }),
    );
    Document {
        name: String::new(),
        fields,
    }
}

/// Decode a Firestore document into an item.
///
/// The item name is the last segment of the document's resource name.
fn decode_document(document: &Document) -> StoreResult<InventoryItem> {
    let name = document
        .name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::invalid_document(&document.name, "missing document id"))?;

    let value = document
        .fields
        .get(QUANTITY_FIELD)
        .ok_or_else(|| StoreError::invalid_document(name, "missing quantity field"))?;

    let quantity = decode_quantity(value)
        .ok_or_else(|| StoreError::invalid_document(name, format!("bad quantity: {value}")))?;

    Ok(InventoryItem::new(name, quantity))
}

/// Read a non-negative integer out of a Firestore value.
///
/// Integers arrive as strings (`int64` JSON encoding); whole doubles are
/// accepted too since other clients may have written them.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn decode_quantity(value: &Value) -> Option<u32> {
    if let Some(integer) = value.get("integerValue") {
        return match integer {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            _ => None,
        };
    }

    let double = value.get("doubleValue")?.as_f64()?;
    if double.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&double) {
        return Some(double as u32);
    }
    None
}

async fn describe(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    }
}

async fn read_failure(response: Response) -> StoreError {
    StoreError::unavailable(describe(response).await)
}

async fn write_failure(response: Response) -> StoreError {
    if response.status().is_client_error() {
        StoreError::write_rejected(describe(response).await)
    } else {
        StoreError::unavailable(describe(response).await)
    }
}

#[async_trait]
impl InventoryStore for FirestoreStore {
    async fn list_all(&self) -> StoreResult<Vec<InventoryItem>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(page_token.as_deref()).await?;
            items.extend(keep_decodable(page.documents.iter().map(decode_document)));

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Listed {} documents from {}", items.len(), self.collection);
        Ok(items)
    }

    async fn get(&self, name: &str) -> StoreResult<Option<InventoryItem>> {
        let response = self.send(self.client.get(self.url(Some(name))?)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }

        let document: Document = response
            .json()
            .await
            .map_err(|e| StoreError::invalid_document(name, e.to_string()))?;
        decode_document(&document).map(Some)
    }

    async fn upsert(&self, name: &str, quantity: u32) -> StoreResult<()> {
        let request = self
            .client
            .patch(self.url(Some(name))?)
            .json(&encode_document(quantity));
        let response = self.send(request).await?;

        if !response.status().is_success() {
            let err = write_failure(response).await;
            warn!("Firestore write of {name} failed: {err}");
            return Err(err);
        }

        debug!("Stored {name} = {quantity}");
        Ok(())
    }

    async fn delete(&self, name: &str) -> StoreResult<()> {
        let response = self.send(self.client.delete(self.url(Some(name))?)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Delete of absent item {name} ignored");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(write_failure(response).await);
        }
        Ok(())
    }
}
