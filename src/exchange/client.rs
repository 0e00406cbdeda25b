use crate::errors::{HyperliquidError, Result};
use crate::exchange::assets::AssetTable;
use crate::exchange::builder::ActionBuilder;
use crate::exchange::info::InfoClient;
use crate::exchange::payload::{envelope_for, ExchangePayload};
use crate::models::{
    ApiResponse, BuilderInfo, CancelByCloidRequest, CancelRequest, Grouping, MarketCloseParams,
    MarketOpenParams, ModifyRequest, OrderRequest, OrderStatus, StatusesData,
};
use crate::signing::actions::Action;
use crate::signing::domain::Network;
use crate::signing::signer::ActionSigner;
use chrono::Utc;
use ethers::types::{Address, Signature};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, info, warn};

/// A signed action and the exact body that would be posted for it
#[derive(Clone, Debug)]
pub struct SignedAction {
    pub action: Action,
    pub nonce: u64,
    pub signature: Signature,
    pub body: Vec<u8>,
}

/// Authenticated client for `/exchange`
pub struct Exchange {
    http_client: Client,
    api_url: String,
    signer: ActionSigner,
    assets: AssetTable,
    info: InfoClient,
    network: Network,
    vault_address: Option<Address>,
    account_address: Option<Address>,
    expires_after: Option<u64>,
}

impl Exchange {
    pub fn new(api_url: String, signer: ActionSigner, assets: AssetTable) -> Self {
        let api_url = api_url.trim_end_matches('/').to_string();
        let http_client = Client::new();
        Self {
            info: InfoClient::with_client(http_client.clone(), api_url.clone()),
            network: Network::from_base_url(&api_url),
            http_client,
            api_url,
            signer,
            assets,
            vault_address: None,
            account_address: None,
            expires_after: None,
        }
    }

    /// Create a client whose asset table is loaded from the exchange metadata
    pub async fn connect(api_url: String, signer: ActionSigner) -> Result<Self> {
        let info = InfoClient::new(api_url.clone());
        let meta = info.meta().await?;
        let spot_meta = match info.spot_meta().await {
            Ok(spot) => Some(spot),
            Err(e) => {
                warn!("Spot metadata unavailable, spot assets disabled: {}", e);
                None
            }
        };
        let assets = AssetTable::from_meta(&meta, spot_meta.as_ref());
        info!("Loaded {} assets from {}", assets.len(), api_url);

        Ok(Self::new(api_url, signer, assets))
    }

    pub fn with_vault(mut self, vault_address: Option<Address>) -> Self {
        self.vault_address = vault_address;
        self
    }

    pub fn with_account(mut self, account_address: Option<Address>) -> Self {
        self.account_address = account_address;
        self
    }

    /// Absolute expiry in milliseconds applied to every following action
    pub fn set_expires_after(&mut self, expires_after: Option<u64>) {
        self.expires_after = expires_after;
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn assets(&self) -> &AssetTable {
        &self.assets
    }

    pub fn info(&self) -> &InfoClient {
        &self.info
    }

    /// Account whose positions a market close flattens
    pub fn position_owner(&self) -> Address {
        self.account_address
            .or(self.vault_address)
            .unwrap_or_else(|| self.signer.address())
    }

    pub fn builder(&self) -> ActionBuilder<'_> {
        ActionBuilder::new(&self.assets)
    }

    /// Sign an action and assemble its request body without sending it
    pub fn prepare(&self, action: Action, nonce: u64) -> Result<SignedAction> {
        let envelope = envelope_for(action.kind(), nonce, self.vault_address, self.expires_after);
        let signature = self.signer.sign_action(&action, &envelope, self.network)?;
        let body = ExchangePayload::new(
            &action,
            &signature,
            nonce,
            self.vault_address,
            self.expires_after,
        )
        .to_bytes()?;

        Ok(SignedAction {
            action,
            nonce,
            signature,
            body,
        })
    }

    /// Sign and post one action; a single attempt, never retried.
    pub async fn execute(&self, action: Action) -> Result<ApiResponse<StatusesData>> {
        let kind = action.kind();
        let signed = self.prepare(action, current_nonce())?;
        info!("Submitting {} action, nonce {}", kind.wire_name(), signed.nonce);

        let response = self
            .http_client
            .post(format!("{}/exchange", self.api_url))
            .header(CONTENT_TYPE, "application/json")
            .body(signed.body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await?;
            return Err(HyperliquidError::RemoteRejected {
                index: None,
                message: format!("HTTP {}: {}", status, error),
            });
        }

        let text = response.text().await?;
        debug!("Exchange response: {}", text);
        ApiResponse::from_json(&text)
    }

    /// Execute and surface `status: err` or any per-order error as `RemoteRejected`
    async fn execute_checked(&self, action: Action) -> Result<Vec<OrderStatus>> {
        let response = self.execute(action).await?;
        let statuses = check_response(response)?;
        debug!("{} statuses returned", statuses.len());
        Ok(statuses)
    }

    pub async fn order(&self, order: OrderRequest, builder: Option<BuilderInfo>) -> Result<OrderStatus> {
        let statuses = self.bulk_orders(&[order], builder).await?;
        first_status(statuses)
    }

    pub async fn bulk_orders(
        &self,
        orders: &[OrderRequest],
        builder: Option<BuilderInfo>,
    ) -> Result<Vec<OrderStatus>> {
        let action = self.builder().orders(orders, Grouping::Na, builder)?;
        self.execute_checked(action).await
    }

    /// Orders linked as take-profit / stop-loss siblings
    pub async fn grouped_orders(
        &self,
        orders: &[OrderRequest],
        grouping: Grouping,
        builder: Option<BuilderInfo>,
    ) -> Result<Vec<OrderStatus>> {
        let action = self.builder().orders(orders, grouping, builder)?;
        self.execute_checked(action).await
    }

    pub async fn modify_order(&self, request: ModifyRequest) -> Result<OrderStatus> {
        let action = self.builder().modify(&request)?;
        first_status(self.execute_checked(action).await?)
    }

    pub async fn bulk_modify_orders(&self, requests: &[ModifyRequest]) -> Result<Vec<OrderStatus>> {
        let action = self.builder().bulk_modify(requests)?;
        self.execute_checked(action).await
    }

    pub async fn cancel(&self, requests: &[CancelRequest]) -> Result<Vec<OrderStatus>> {
        let action = self.builder().cancel(requests)?;
        self.execute_checked(action).await
    }

    pub async fn cancel_by_cloid(&self, requests: &[CancelByCloidRequest]) -> Result<Vec<OrderStatus>> {
        let action = self.builder().cancel_by_cloid(requests)?;
        self.execute_checked(action).await
    }

    pub async fn market_open(&self, params: MarketOpenParams) -> Result<OrderStatus> {
        let mid = match params.px {
            Some(px) => px,
            None => self.info.mid(&params.coin).await?,
        };
        let action = self.builder().market_open(&params, mid)?;
        first_status(self.execute_checked(action).await?)
    }

    /// Flatten (part of) the position in `params.coin` for the account, or the vault
    pub async fn market_close(&self, params: MarketCloseParams) -> Result<OrderStatus> {
        let user_state = self.info.user_state(self.position_owner()).await?;
        let mid = match params.px {
            Some(px) => px,
            None => self.info.mid(&params.coin).await?,
        };
        let action = self.builder().market_close(&params, &user_state, mid)?;
        first_status(self.execute_checked(action).await?)
    }

    pub async fn update_leverage(&self, coin: &str, is_cross: bool, leverage: u32) -> Result<()> {
        let action = self.builder().update_leverage(coin, is_cross, leverage)?;
        self.execute_checked(action).await.map(|_| ())
    }

    pub async fn update_isolated_margin(&self, coin: &str, is_buy: bool, amount: f64) -> Result<()> {
        let action = self.builder().update_isolated_margin(coin, is_buy, amount)?;
        self.execute_checked(action).await.map(|_| ())
    }

    pub async fn usd_class_transfer(&self, amount: f64, to_perp: bool) -> Result<()> {
        let action = self.builder().usd_class_transfer(amount, to_perp)?;
        self.execute_checked(action).await.map(|_| ())
    }

    /// Schedule a cancel-all at `time` (ms), or clear the schedule with `None`
    pub async fn schedule_cancel(&self, time: Option<u64>) -> Result<()> {
        let action = self.builder().schedule_cancel(time);
        self.execute_checked(action).await.map(|_| ())
    }
}

/// Wall-clock milliseconds used as the action nonce
pub fn current_nonce() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Reject the whole response on `status: err`, or the first per-order error by index
pub fn check_response(response: ApiResponse<StatusesData>) -> Result<Vec<OrderStatus>> {
    if !response.ok {
        return Err(HyperliquidError::RemoteRejected {
            index: None,
            message: response.err.unwrap_or_default(),
        });
    }

    let statuses = response.data.map(|d| d.statuses).unwrap_or_default();
    if let Some((index, message)) = statuses
        .iter()
        .enumerate()
        .find_map(|(i, s)| s.error().map(|m| (i, m.to_string())))
    {
        warn!("Order {} rejected: {}", index, message);
        return Err(HyperliquidError::RemoteRejected {
            index: Some(index),
            message,
        });
    }

    Ok(statuses)
}

fn first_status(statuses: Vec<OrderStatus>) -> Result<OrderStatus> {
    statuses.into_iter().next().ok_or_else(|| HyperliquidError::RemoteRejected {
        index: None,
        message: "no status returned for order".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderType, Tif, Tpsl};
    use crate::signing::signer::{verify_action, SignatureWire, SigningEnvelope};
    use httpmock::prelude::*;
    use serde_json::{json, Value};

    const TEST_PRIVATE_KEY: &str =
        "0x0123456789012345678901234567890123456789012345678901234567890123";
    const TEST_ADDRESS: &str = "0x14791697260e4c9a71f18484c9f997b308e59325";

    fn signer() -> ActionSigner {
        ActionSigner::new(TEST_PRIVATE_KEY).unwrap()
    }

    fn btc_buy(limit_px: f64) -> OrderRequest {
        OrderRequest {
            coin: "BTC".to_string(),
            is_buy: true,
            limit_px,
            sz: 0.01,
            reduce_only: false,
            order_type: OrderType::limit(Tif::Gtc),
            cloid: None,
        }
    }

    fn exchange(api_url: String) -> Exchange {
        let assets: AssetTable = [("BTC", 0)].into_iter().collect();
        Exchange::new(api_url, signer(), assets)
    }

    #[test]
    fn test_end_to_end_fixture() {
        let client = exchange("https://api.hyperliquid.xyz".to_string());
        assert_eq!(client.network(), Network::Mainnet);

        let action = client
            .builder()
            .orders(&[btc_buy(65000.5)], Grouping::Na, None)
            .unwrap();
        let nonce = 1_700_000_000_000;
        let signed = client.prepare(action, nonce).unwrap();

        let body: Value = serde_json::from_slice(&signed.body).unwrap();
        assert_eq!(
            body["action"],
            json!({
                "type": "order",
                "orders": [{
                    "asset": 0,
                    "isBuy": true,
                    "limitPx": "65000.5",
                    "sz": "0.01",
                    "reduceOnly": false,
                    "orderType": { "limit": { "tif": "Gtc" } }
                }],
                "grouping": "na"
            })
        );
        assert_eq!(body["nonce"], json!(nonce));
        assert!(body.get("vaultAddress").is_none());
        assert!(body.get("expiresAfter").is_none());

        let wire: SignatureWire = serde_json::from_value(body["signature"].clone()).unwrap();
        assert_eq!(wire, SignatureWire::from(&signed.signature));

        let expected: Address = TEST_ADDRESS.parse().unwrap();
        assert!(verify_action(
            &signed.signature,
            &signed.action,
            &SigningEnvelope::new(nonce),
            Network::Mainnet,
            expected,
        )
        .unwrap());
    }

    #[test]
    fn test_prepare_with_vault_and_expiry() {
        let vault: Address = "0x1111111111111111111111111111111111111111".parse().unwrap();
        let mut client = exchange("http://localhost".to_string()).with_vault(Some(vault));
        client.set_expires_after(Some(1_700_000_060_000));

        let action = client.builder().schedule_cancel(None);
        let signed = client.prepare(action, 1_700_000_000_000).unwrap();
        let body: Value = serde_json::from_slice(&signed.body).unwrap();
        assert_eq!(body["vaultAddress"], json!("0x1111111111111111111111111111111111111111"));
        assert_eq!(body["expiresAfter"], json!(1_700_000_060_000u64));

        let envelope = SigningEnvelope::new(1_700_000_000_000)
            .with_vault(Some(vault))
            .with_expires_after(Some(1_700_000_060_000));
        assert!(verify_action(
            &signed.signature,
            &signed.action,
            &envelope,
            Network::Testnet,
            client.address(),
        )
        .unwrap());
    }

    #[test]
    fn test_transfer_with_vault_is_signed_without_it() {
        let vault: Address = "0x1111111111111111111111111111111111111111".parse().unwrap();
        let client = exchange("http://localhost".to_string()).with_vault(Some(vault));

        let action = client.builder().usd_class_transfer(25.0, true).unwrap();
        let signed = client.prepare(action, 1_700_000_000_000).unwrap();
        let body: Value = serde_json::from_slice(&signed.body).unwrap();
        assert_eq!(
            body["action"],
            json!({ "type": "usdClassTransfer", "amount": "25", "toPerp": true })
        );
        assert!(body.as_object().unwrap().contains_key("vaultAddress"));
        assert_eq!(body["vaultAddress"], Value::Null);

        let plain = SigningEnvelope::new(1_700_000_000_000);
        assert!(verify_action(
            &signed.signature,
            &signed.action,
            &plain,
            Network::Testnet,
            client.address(),
        )
        .unwrap());
        assert!(!verify_action(
            &signed.signature,
            &signed.action,
            &plain.with_vault(Some(vault)),
            Network::Testnet,
            client.address(),
        )
        .unwrap());
    }

    #[test]
    fn test_check_response_indexes_remote_errors() {
        let response = ApiResponse::<StatusesData>::from_json(
            r#"{"status":"ok","response":{"type":"order","data":{"statuses":[
                {"resting":{"oid":1}},
                {"error":"Order has invalid price."}
            ]}}}"#,
        )
        .unwrap();
        let err = check_response(response).unwrap_err();
        assert!(matches!(
            err,
            HyperliquidError::RemoteRejected { index: Some(1), ref message } if message == "Order has invalid price."
        ));
    }

    #[tokio::test]
    async fn test_bulk_orders_posts_signed_payload() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/exchange")
                    .header("content-type", "application/json")
                    .body_contains(r#""action":{"type":"order","orders":[{"asset":0,"isBuy":true,"limitPx":"65000.5""#);
                then.status(200).json_body(json!({
                    "status": "ok",
                    "response": {
                        "type": "order",
                        "data": { "statuses": [ { "resting": { "oid": 77738308 } } ] }
                    }
                }));
            })
            .await;

        let client = exchange(server.base_url());
        let status = client.order(btc_buy(65000.5), None).await.unwrap();
        mock.assert_async().await;
        assert!(matches!(status, OrderStatus::Resting(ref r) if r.oid == 77738308));
    }

    #[tokio::test]
    async fn test_grouped_orders_post_grouping() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/exchange")
                    .body_contains(r#""grouping":"positionTpsl""#);
                then.status(200).json_body(json!({
                    "status": "ok",
                    "response": {
                        "type": "order",
                        "data": { "statuses": [ "waitingForTrigger", "waitingForTrigger" ] }
                    }
                }));
            })
            .await;

        let client = exchange(server.base_url());
        let stop = OrderRequest {
            order_type: OrderType::trigger(60000.0, true, Tpsl::Sl),
            reduce_only: true,
            is_buy: false,
            ..btc_buy(60000.0)
        };
        let take = OrderRequest {
            order_type: OrderType::trigger(70000.0, true, Tpsl::Tp),
            ..stop.clone()
        };
        let statuses = client
            .grouped_orders(&[stop, take], Grouping::PositionTpsl, None)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(statuses.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_batch_element_is_never_signed_or_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/exchange");
                then.status(200).json_body(json!({ "status": "ok", "response": { "type": "order" } }));
            })
            .await;

        let client = exchange(server.base_url());
        let orders = vec![btc_buy(65000.0), btc_buy(f64::NAN), btc_buy(64000.0)];
        let err = client.bulk_orders(&orders, None).await.unwrap_err();

        assert_eq!(err.batch_index(), Some(1));
        assert!(err.to_string().contains("failed to build order 1"));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_remote_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/exchange");
                then.status(200).json_body(json!({
                    "status": "err",
                    "response": "User or API Wallet 0x0 does not exist."
                }));
            })
            .await;

        let client = exchange(server.base_url());
        let err = client.schedule_cancel(None).await.unwrap_err();
        assert!(matches!(err, HyperliquidError::RemoteRejected { index: None, .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_market_close_without_position() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/info").json_body(json!({
                    "type": "clearinghouseState",
                    "user": TEST_ADDRESS
                }));
                then.status(200).json_body(json!({ "assetPositions": [] }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/info").json_body(json!({ "type": "allMids" }));
                then.status(200).json_body(json!({ "BTC": "65000.5" }));
            })
            .await;
        let exchange_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/exchange");
                then.status(200);
            })
            .await;

        let client = exchange(server.base_url());
        let err = client
            .market_close(MarketCloseParams {
                coin: "BTC".to_string(),
                sz: None,
                px: None,
                slippage: 0.05,
                cloid: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HyperliquidError::PositionNotFound(ref coin) if coin == "BTC"));
        assert_eq!(exchange_mock.hits_async().await, 0);
    }
}
