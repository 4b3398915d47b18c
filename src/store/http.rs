use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::config::ItemApiConfig;
use crate::inventory::{ExpiringItems, Item};
use crate::layout::Position;

use super::{ItemSink, ItemSource, StoreError};

#[derive(Debug, Deserialize)]
struct ItemsEnvelope {
    #[serde(default)]
    items: Vec<Item>,
}

/// Client for the remote item API (`/items`, `/items/:id`, `/items/expiring`).
#[derive(Debug, Clone)]
pub struct HttpItemStore {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpItemStore {
    pub fn new(config: &ItemApiConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StoreError::Transport(format!("invalid item API URL '{}': {}", config.base_url, e)))?;

        Ok(Self::with_client(client, base_url, config.token.clone()))
    }

    pub fn with_client(client: reqwest::Client, base_url: Url, token: Option<String>) -> Self {
        Self { client, base_url, token }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("item API URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, subject: &str) -> Result<Response, StoreError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response).await;
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized(message),
            StatusCode::NOT_FOUND => StoreError::NotFound(subject.to_string()),
            _ => StoreError::Rejected {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// The item API answers errors as `{ "error": "..." }`; fall back to the raw body.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.to_string())
}

fn decode_error(e: reqwest::Error) -> StoreError {
    StoreError::Decode(e.to_string())
}

#[async_trait]
impl ItemSource for HttpItemStore {
    async fn list_items(&self, fridge_id: &str) -> Result<Vec<Item>, StoreError> {
        let url = self.endpoint(&["items"])?;
        let request = self.client.get(url).query(&[("fridgeId", fridge_id)]);

        let envelope: ItemsEnvelope = self.send(request, fridge_id).await?.json().await.map_err(decode_error)?;
        tracing::debug!("listed {} items for fridge {}", envelope.items.len(), fridge_id);
        Ok(envelope.items)
    }

    async fn expiring_items(&self, days: i64) -> Result<ExpiringItems, StoreError> {
        let url = self.endpoint(&["items", "expiring"])?;
        let request = self.client.get(url).query(&[("days", days)]);

        self.send(request, "expiring").await?.json().await.map_err(decode_error)
    }
}

#[async_trait]
impl ItemSink for HttpItemStore {
    async fn update_position(&self, item_id: &str, position: Position) -> Result<(), StoreError> {
        let url = self.endpoint(&["items", item_id])?;
        let request = self.client.put(url).json(&json!({ "position": position }));

        self.send(request, item_id).await?;
        Ok(())
    }
}
