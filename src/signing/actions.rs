//! Wire representation of exchange actions and their canonical encoding.
//!
//! Field order in every struct below is the order the exchange re-hashes.
//! Serde emits struct fields in declaration order, so the declarations are the
//! contract; do not reorder them. Optional fields are skipped when unset, never
//! written as nil.

use crate::errors::{HyperliquidError, Result};
use crate::models::{BuilderInfo, Cloid, Grouping, OrderId, Tif, Tpsl};
use serde::{Deserialize, Serialize};

/// One authenticated exchange instruction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Order(OrderAction),
    Modify(ModifyAction),
    BatchModify(BatchModifyAction),
    Cancel(CancelAction),
    CancelByCloid(CancelByCloidAction),
    ScheduleCancel(ScheduleCancelAction),
    UpdateLeverage(UpdateLeverageAction),
    UpdateIsolatedMargin(UpdateIsolatedMarginAction),
    UsdClassTransfer(UsdClassTransferAction),
}

/// Discriminant of an [`Action`], used by payload assembly rules
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Order,
    Modify,
    BatchModify,
    Cancel,
    CancelByCloid,
    ScheduleCancel,
    UpdateLeverage,
    UpdateIsolatedMargin,
    UsdClassTransfer,
}

impl ActionKind {
    pub const ALL: [ActionKind; 9] = [
        ActionKind::Order,
        ActionKind::Modify,
        ActionKind::BatchModify,
        ActionKind::Cancel,
        ActionKind::CancelByCloid,
        ActionKind::ScheduleCancel,
        ActionKind::UpdateLeverage,
        ActionKind::UpdateIsolatedMargin,
        ActionKind::UsdClassTransfer,
    ];

    /// The `type` tag written on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            ActionKind::Order => "order",
            ActionKind::Modify => "modify",
            ActionKind::BatchModify => "batchModify",
            ActionKind::Cancel => "cancel",
            ActionKind::CancelByCloid => "cancelByCloid",
            ActionKind::ScheduleCancel => "scheduleCancel",
            ActionKind::UpdateLeverage => "updateLeverage",
            ActionKind::UpdateIsolatedMargin => "updateIsolatedMargin",
            ActionKind::UsdClassTransfer => "usdClassTransfer",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderAction {
    pub orders: Vec<OrderWire>,
    pub grouping: Grouping,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder: Option<BuilderInfo>,
}

/// Order after asset resolution and numeric formatting
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWire {
    pub asset: u32,
    pub is_buy: bool,
    pub limit_px: String,
    pub sz: String,
    pub reduce_only: bool,
    pub order_type: OrderTypeWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloid: Option<Cloid>,
}

/// Exactly one of `{"limit": …}` or `{"trigger": …}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderTypeWire {
    Limit(LimitWire),
    Trigger(TriggerWire),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitWire {
    pub tif: Tif,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerWire {
    pub is_market: bool,
    pub tpsl: Tpsl,
    pub trigger_px: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifyAction {
    pub oid: OrderId,
    pub order: OrderWire,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchModifyAction {
    pub modifies: Vec<ModifyWire>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifyWire {
    pub oid: OrderId,
    pub order: OrderWire,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CancelAction {
    pub cancels: Vec<CancelWire>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CancelWire {
    #[serde(rename = "a")]
    pub asset: u32,
    #[serde(rename = "o")]
    pub oid: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CancelByCloidAction {
    pub cancels: Vec<CancelByCloidWire>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CancelByCloidWire {
    pub asset: u32,
    pub cloid: Cloid,
}

/// Dead man's switch. Without `time` the scheduled cancel is cleared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleCancelAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeverageAction {
    pub asset: u32,
    pub is_cross: bool,
    pub leverage: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIsolatedMarginAction {
    pub asset: u32,
    pub is_buy: bool,
    pub ntli: i64,
}

/// Moves USDC between the spot and perp balances of the main account
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdClassTransferAction {
    pub amount: String,
    pub to_perp: bool,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Order(_) => ActionKind::Order,
            Action::Modify(_) => ActionKind::Modify,
            Action::BatchModify(_) => ActionKind::BatchModify,
            Action::Cancel(_) => ActionKind::Cancel,
            Action::CancelByCloid(_) => ActionKind::CancelByCloid,
            Action::ScheduleCancel(_) => ActionKind::ScheduleCancel,
            Action::UpdateLeverage(_) => ActionKind::UpdateLeverage,
            Action::UpdateIsolatedMargin(_) => ActionKind::UpdateIsolatedMargin,
            Action::UsdClassTransfer(_) => ActionKind::UsdClassTransfer,
        }
    }

    /// Canonical MessagePack bytes: a map per struct, keys in declared order.
    pub fn encode(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self)
            .map_err(|e| HyperliquidError::EncodingError(format!("msgpack encode failed: {}", e)))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes)
            .map_err(|e| HyperliquidError::EncodingError(format!("msgpack decode failed: {}", e)))
    }

    /// Same layout as [`Action::encode`], rendered as JSON for the request body.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
