use crate::errors::{HyperliquidError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Time in force for limit orders
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tif {
    Alo, // Add Liquidity Only (post only)
    Ioc, // Immediate Or Cancel
    Gtc, // Good Till Cancelled
}

impl Tif {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tif::Alo => "Alo",
            Tif::Ioc => "Ioc",
            Tif::Gtc => "Gtc",
        }
    }
}

impl FromStr for Tif {
    type Err = HyperliquidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "alo" => Ok(Tif::Alo),
            "ioc" => Ok(Tif::Ioc),
            "gtc" => Ok(Tif::Gtc),
            _ => Err(HyperliquidError::ParseError(format!(
                "Invalid time in force: {}",
                s
            ))),
        }
    }
}

/// Take-profit / stop-loss kind of a trigger order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tpsl {
    Tp,
    Sl,
}

impl Tpsl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tpsl::Tp => "tp",
            Tpsl::Sl => "sl",
        }
    }
}

impl FromStr for Tpsl {
    type Err = HyperliquidError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tp" => Ok(Tpsl::Tp),
            "sl" => Ok(Tpsl::Sl),
            _ => Err(HyperliquidError::ParseError(format!("Invalid tpsl: {}", s))),
        }
    }
}

/// How the orders of one `order` action relate to each other
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Grouping {
    #[default]
    Na,
    NormalTpsl,
    PositionTpsl,
}

impl Grouping {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grouping::Na => "na",
            Grouping::NormalTpsl => "normalTpsl",
            Grouping::PositionTpsl => "positionTpsl",
        }
    }
}

impl FromStr for Grouping {
    type Err = HyperliquidError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "na" => Ok(Grouping::Na),
            "normalTpsl" => Ok(Grouping::NormalTpsl),
            "positionTpsl" => Ok(Grouping::PositionTpsl),
            _ => Err(HyperliquidError::ParseError(format!("Invalid grouping: {}", s))),
        }
    }
}

// The wire carries these enums as bare strings; keep that explicit rather than
// relying on how a given serializer treats unit variants.
macro_rules! wire_string_serde {
    ($($ty:ty),*) => {$(
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    )*};
}

wire_string_serde!(Tif, Tpsl, Grouping);

/// Order type of a request. Exactly one of limit or trigger.
#[derive(Clone, Debug, PartialEq)]
pub enum OrderType {
    Limit {
        tif: Tif,
    },
    Trigger {
        trigger_px: f64,
        is_market: bool,
        tpsl: Tpsl,
    },
}

impl OrderType {
    pub fn limit(tif: Tif) -> Self {
        OrderType::Limit { tif }
    }

    pub fn trigger(trigger_px: f64, is_market: bool, tpsl: Tpsl) -> Self {
        OrderType::Trigger {
            trigger_px,
            is_market,
            tpsl,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitSpec {
    pub tif: Tif,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSpec {
    pub trigger_px: f64,
    pub is_market: bool,
    pub tpsl: Tpsl,
}

/// Loose order-type input, as it arrives from JSON or the command line.
/// Converting it into an `OrderType` rejects input that sets both or neither kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderTypeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerSpec>,
}

impl TryFrom<OrderTypeSpec> for OrderType {
    type Error = HyperliquidError;

    fn try_from(spec: OrderTypeSpec) -> Result<Self> {
        match (spec.limit, spec.trigger) {
            (Some(limit), None) => Ok(OrderType::Limit { tif: limit.tif }),
            (None, Some(trigger)) => Ok(OrderType::Trigger {
                trigger_px: trigger.trigger_px,
                is_market: trigger.is_market,
                tpsl: trigger.tpsl,
            }),
            (Some(_), Some(_)) => Err(HyperliquidError::EncodingError(
                "order type sets both limit and trigger".to_string(),
            )),
            (None, None) => Err(HyperliquidError::EncodingError(
                "order type sets neither limit nor trigger".to_string(),
            )),
        }
    }
}

/// 128-bit client order id, written as `0x` followed by 32 hex digits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cloid([u8; 16]);

impl Cloid {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Cloid(bytes)
    }

    pub fn random() -> Self {
        Cloid(*uuid::Uuid::new_v4().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Cloid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Cloid {
    type Err = HyperliquidError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| HyperliquidError::ParseError(format!("Invalid cloid {}: {}", s, e)))?;
        let bytes: [u8; 16] = bytes.try_into().map_err(|_| {
            HyperliquidError::ParseError(format!("Invalid cloid {}: expected 16 bytes", s))
        })?;
        Ok(Cloid(bytes))
    }
}

impl Serialize for Cloid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cloid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifies an existing order either by exchange id or by client id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderId {
    Oid(u64),
    Cloid(Cloid),
}

impl From<u64> for OrderId {
    fn from(oid: u64) -> Self {
        OrderId::Oid(oid)
    }
}

impl From<Cloid> for OrderId {
    fn from(cloid: Cloid) -> Self {
        OrderId::Cloid(cloid)
    }
}

/// Builder fee attribution attached to an order action
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderInfo {
    #[serde(rename = "b")]
    pub builder: String,
    #[serde(rename = "f")]
    pub fee: u64,
}

/// High-level order intent, before asset resolution and wire formatting
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub coin: String,
    pub is_buy: bool,
    pub limit_px: f64,
    pub sz: f64,
    pub reduce_only: bool,
    pub order_type: OrderType,
    pub cloid: Option<Cloid>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModifyRequest {
    pub oid: OrderId,
    pub order: OrderRequest,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CancelRequest {
    pub coin: String,
    pub oid: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CancelByCloidRequest {
    pub coin: String,
    pub cloid: Cloid,
}

/// Parameters of an IOC order that opens (or adds to) a position
#[derive(Clone, Debug, PartialEq)]
pub struct MarketOpenParams {
    pub coin: String,
    pub is_buy: bool,
    pub sz: f64,
    /// Reference price; the mid price is used when absent
    pub px: Option<f64>,
    pub slippage: f64,
    pub cloid: Option<Cloid>,
}

/// Parameters of a reduce-only IOC order that flattens a position
#[derive(Clone, Debug, PartialEq)]
pub struct MarketCloseParams {
    pub coin: String,
    /// Defaults to the full position size
    pub sz: Option<f64>,
    pub px: Option<f64>,
    pub slippage: f64,
    pub cloid: Option<Cloid>,
}

/// Exchange response envelope, normalized from `{"status", "response"}`
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub err: Option<String>,
}

#[derive(Deserialize)]
struct RawEnvelope {
    status: String,
    #[serde(default)]
    response: serde_json::Value,
}

#[derive(Deserialize)]
struct RawResponseBody<T> {
    data: Option<T>,
}

impl<T: serde::de::DeserializeOwned> ApiResponse<T> {
    pub fn from_json(body: &str) -> Result<Self> {
        let raw: RawEnvelope = serde_json::from_str(body)?;
        if raw.status != "ok" {
            let err = match raw.response {
                serde_json::Value::String(message) => message,
                other => other.to_string(),
            };
            return Ok(ApiResponse {
                ok: false,
                data: None,
                err: Some(err),
            });
        }

        let data = match raw.response {
            serde_json::Value::Null => None,
            value => serde_json::from_value::<RawResponseBody<T>>(value)?.data,
        };
        Ok(ApiResponse {
            ok: true,
            data,
            err: None,
        })
    }
}

/// Per-order outcome reported by the exchange
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Resting(RestingOrder),
    Filled(FilledOrder),
    Error(String),
    Success,
    WaitingForFill,
    WaitingForTrigger,
}

impl OrderStatus {
    pub fn error(&self) -> Option<&str> {
        match self {
            OrderStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub oid: u64,
    #[serde(default)]
    pub cloid: Option<Cloid>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledOrder {
    pub total_sz: String,
    pub avg_px: String,
    pub oid: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusesData {
    #[serde(default)]
    pub statuses: Vec<OrderStatus>,
}

/// Perpetuals universe returned by the `meta` info request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Meta {
    pub universe: Vec<AssetMeta>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMeta {
    pub name: String,
    pub sz_decimals: u32,
}

/// Spot universe returned by the `spotMeta` info request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpotMeta {
    pub universe: Vec<SpotAssetMeta>,
    pub tokens: Vec<SpotTokenMeta>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpotAssetMeta {
    pub name: String,
    pub tokens: Vec<usize>,
    pub index: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotTokenMeta {
    pub name: String,
    pub sz_decimals: u32,
    pub index: usize,
}

/// Mid prices keyed by coin, as strings
pub type AllMids = HashMap<String, String>;

/// Account state returned by the `clearinghouseState` info request
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(default)]
    pub asset_positions: Vec<AssetPosition>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetPosition {
    pub position: Position,
}

/// Open perpetual position. `szi` is signed: negative for shorts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub coin: String,
    pub szi: String,
    #[serde(default)]
    pub entry_px: Option<String>,
}

impl UserState {
    pub fn position(&self, coin: &str) -> Option<&Position> {
        self.asset_positions
            .iter()
            .map(|p| &p.position)
            .find(|p| p.coin == coin)
    }
}
