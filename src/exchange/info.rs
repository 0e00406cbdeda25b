use crate::errors::{HyperliquidError, Result};
use crate::models::{AllMids, Meta, SpotMeta, UserState};
use ethers::types::Address;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Read-only queries against `/info`
#[derive(Clone, Debug)]
pub struct InfoClient {
    http_client: Client,
    api_url: String,
}

impl InfoClient {
    pub fn new(api_url: String) -> Self {
        Self::with_client(Client::new(), api_url)
    }

    pub fn with_client(http_client: Client, api_url: String) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: DeserializeOwned>(&self, body: serde_json::Value) -> Result<T> {
        debug!("POST {}/info {}", self.api_url, body);
        let response = self
            .http_client
            .post(format!("{}/info", self.api_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await?;
            return Err(HyperliquidError::RemoteRejected {
                index: None,
                message: format!("info request failed ({}): {}", status, error),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Perpetuals universe
    pub async fn meta(&self) -> Result<Meta> {
        self.post(json!({ "type": "meta" })).await
    }

    pub async fn spot_meta(&self) -> Result<SpotMeta> {
        self.post(json!({ "type": "spotMeta" })).await
    }

    pub async fn all_mids(&self) -> Result<AllMids> {
        self.post(json!({ "type": "allMids" })).await
    }

    /// Mid price of one coin
    pub async fn mid(&self, coin: &str) -> Result<f64> {
        let mids = self.all_mids().await?;
        let mid = mids
            .get(coin)
            .ok_or_else(|| HyperliquidError::UnknownAsset(coin.to_string()))?;
        mid.parse()
            .map_err(|e| HyperliquidError::ParseError(format!("Invalid mid {} for {}: {}", mid, coin, e)))
    }

    pub async fn user_state(&self, user: Address) -> Result<UserState> {
        self.post(json!({ "type": "clearinghouseState", "user": format!("{:?}", user) }))
            .await
    }
}
