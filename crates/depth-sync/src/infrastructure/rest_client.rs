use std::time::Duration;

use async_trait::async_trait;
use depth_core::{DepthSnapshot, Market};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::parsers::parse_order_book;
use crate::config::ExchangeConfig;
use crate::domain::{FetchError, SnapshotFetcher};

#[derive(Error, Debug)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {code} - {msg}")]
    Api { code: i32, msg: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convert infrastructure RestError to domain FetchError
impl From<RestError> for FetchError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Http(e) => FetchError::Network(e.to_string()),
            RestError::Api { code, msg } => FetchError::Api { code, message: msg },
            RestError::Parse(msg) => FetchError::Parse(msg),
        }
    }
}

/// REST client for the public order book query
/// Infrastructure component - handles HTTP communication
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        RestClient {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Build a client with the exchange's base URL and request timeout
    pub fn from_config(config: &ExchangeConfig) -> Result<Self, RestError> {
        Self::with_timeout(config.rest_url.clone(), config.request_timeout())
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RestError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(RestClient {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get an order book snapshot, `depth` levels per side
    pub async fn get_order_book(
        &self,
        market: &Market,
        depth: u32,
    ) -> Result<DepthSnapshot, RestError> {
        let path = order_book_path(market, depth);
        let body: Value = self.get(&path).await?;
        let snapshot = parse_order_book(&body).map_err(|e| match e {
            FetchError::Api { code, message } => RestError::Api { code, msg: message },
            other => RestError::Parse(other.to_string()),
        })?;

        debug!(
            market = %market,
            sequence = snapshot.sequence,
            asks = snapshot.asks.len(),
            bids = snapshot.bids.len(),
            "Fetched order book snapshot"
        );
        Ok(snapshot)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RestError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let resp = self.client.get(&url).send().await?;

        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, RestError> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiError>(&text) {
                return Err(RestError::Api {
                    code: i32::from(status.as_u16()),
                    msg: err.error,
                });
            }
            return Err(RestError::Parse(format!("HTTP {}: {}", status, text)));
        }

        serde_json::from_str(&text).map_err(|e| RestError::Parse(e.to_string()))
    }
}

fn order_book_path(market: &Market, depth: u32) -> String {
    format!(
        "/public?command=returnOrderBook&currencyPair={}&depth={}",
        market, depth
    )
}

#[derive(Deserialize)]
struct ApiError {
    error: String,
}

/// Implement SnapshotFetcher trait for RestClient (Dependency Inversion)
///
/// Converts infrastructure RestError to domain FetchError to maintain
/// proper dependency direction (infrastructure -> domain).
#[async_trait]
impl SnapshotFetcher for RestClient {
    async fn fetch_snapshot(
        &self,
        market: &Market,
        depth: u32,
    ) -> Result<DepthSnapshot, FetchError> {
        self.get_order_book(market, depth)
            .await
            .map_err(FetchError::from)
    }
}
