use crate::errors::{HyperliquidError, Result};
use crate::exchange::assets::AssetTable;
use crate::models::{
    BuilderInfo, CancelByCloidRequest, CancelRequest, Grouping, MarketCloseParams,
    MarketOpenParams, ModifyRequest, OrderRequest, OrderType, Tif, UserState,
};
use crate::signing::actions::{
    Action, BatchModifyAction, CancelAction, CancelByCloidAction, CancelByCloidWire, CancelWire,
    LimitWire, ModifyAction, ModifyWire, OrderAction, OrderTypeWire, OrderWire,
    ScheduleCancelAction, TriggerWire, UpdateIsolatedMarginAction, UpdateLeverageAction,
    UsdClassTransferAction,
};
use crate::signing::float_wire::float_to_wire;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

const SLIPPAGE_SIGNIFICANT_FIGURES: u32 = 5;

/// Turns trading intents into typed actions, resolving coins against an asset table.
pub struct ActionBuilder<'a> {
    assets: &'a AssetTable,
}

impl<'a> ActionBuilder<'a> {
    pub fn new(assets: &'a AssetTable) -> Self {
        Self { assets }
    }

    pub fn order_wire(&self, order: &OrderRequest) -> Result<OrderWire> {
        let asset = self.assets.index(&order.coin)?;
        let order_type = match order.order_type {
            OrderType::Limit { tif } => OrderTypeWire::Limit(LimitWire { tif }),
            OrderType::Trigger {
                trigger_px,
                is_market,
                tpsl,
            } => OrderTypeWire::Trigger(TriggerWire {
                is_market,
                tpsl,
                trigger_px: float_to_wire(trigger_px)?,
            }),
        };

        Ok(OrderWire {
            asset,
            is_buy: order.is_buy,
            limit_px: float_to_wire(order.limit_px)?,
            sz: float_to_wire(order.sz)?,
            reduce_only: order.reduce_only,
            order_type,
            cloid: order.cloid,
        })
    }

    /// One `order` action for all requests, in request order
    pub fn orders(
        &self,
        orders: &[OrderRequest],
        grouping: Grouping,
        builder: Option<BuilderInfo>,
    ) -> Result<Action> {
        let orders = orders
            .iter()
            .enumerate()
            .map(|(index, order)| self.order_wire(order).map_err(|e| batch_error("order", index, e)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Action::Order(OrderAction {
            orders,
            grouping,
            builder,
        }))
    }

    pub fn modify(&self, request: &ModifyRequest) -> Result<Action> {
        Ok(Action::Modify(ModifyAction {
            oid: request.oid,
            order: self.order_wire(&request.order)?,
        }))
    }

    pub fn bulk_modify(&self, requests: &[ModifyRequest]) -> Result<Action> {
        let modifies = requests
            .iter()
            .enumerate()
            .map(|(index, request)| {
                self.order_wire(&request.order)
                    .map(|order| ModifyWire {
                        oid: request.oid,
                        order,
                    })
                    .map_err(|e| batch_error("modify", index, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Action::BatchModify(BatchModifyAction { modifies }))
    }

    pub fn cancel(&self, requests: &[CancelRequest]) -> Result<Action> {
        let cancels = requests
            .iter()
            .enumerate()
            .map(|(index, request)| {
                self.assets
                    .index(&request.coin)
                    .map(|asset| CancelWire {
                        asset,
                        oid: request.oid,
                    })
                    .map_err(|e| batch_error("cancel", index, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Action::Cancel(CancelAction { cancels }))
    }

    pub fn cancel_by_cloid(&self, requests: &[CancelByCloidRequest]) -> Result<Action> {
        let cancels = requests
            .iter()
            .enumerate()
            .map(|(index, request)| {
                self.assets
                    .index(&request.coin)
                    .map(|asset| CancelByCloidWire {
                        asset,
                        cloid: request.cloid,
                    })
                    .map_err(|e| batch_error("cancel", index, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Action::CancelByCloid(CancelByCloidAction { cancels }))
    }

    pub fn schedule_cancel(&self, time: Option<u64>) -> Action {
        Action::ScheduleCancel(ScheduleCancelAction { time })
    }

    pub fn update_leverage(&self, coin: &str, is_cross: bool, leverage: u32) -> Result<Action> {
        if leverage == 0 {
            return Err(HyperliquidError::EncodingError(
                "leverage must be at least 1".to_string(),
            ));
        }
        Ok(Action::UpdateLeverage(UpdateLeverageAction {
            asset: self.assets.index(coin)?,
            is_cross,
            leverage,
        }))
    }

    /// `amount` is in USD; the wire carries it in micro-units.
    pub fn update_isolated_margin(&self, coin: &str, is_buy: bool, amount: f64) -> Result<Action> {
        let asset = self.assets.index(coin)?;
        let ntli = Decimal::from_f64(amount)
            .filter(|_| amount.is_finite())
            .and_then(|d| d.checked_mul(Decimal::from(1_000_000)))
            .and_then(|d| d.round().to_i64())
            .ok_or_else(|| {
                HyperliquidError::InvalidNumber(format!("{} is not a valid margin amount", amount))
            })?;

        Ok(Action::UpdateIsolatedMargin(UpdateIsolatedMarginAction {
            asset,
            is_buy,
            ntli,
        }))
    }

    pub fn usd_class_transfer(&self, amount: f64, to_perp: bool) -> Result<Action> {
        Ok(Action::UsdClassTransfer(UsdClassTransferAction {
            amount: float_to_wire(amount)?,
            to_perp,
        }))
    }

    /// Aggressive limit price for an IOC order: `px · (1 ± slippage)`, rounded to
    /// 5 significant figures and then to the asset's price decimals.
    pub fn slippage_price(&self, coin: &str, is_buy: bool, slippage: f64, px: f64) -> Result<f64> {
        let info = self.assets.get(coin)?;
        let px = to_decimal(px, "reference price")?;
        let slippage = to_decimal(slippage, "slippage")?;

        let factor = if is_buy {
            Decimal::ONE.checked_add(slippage)
        } else {
            Decimal::ONE.checked_sub(slippage)
        }
        .filter(|f| f.is_sign_positive() && !f.is_zero())
        .ok_or_else(|| {
            HyperliquidError::InvalidNumber(format!(
                "slippage {} leaves no positive price for {}",
                slippage, coin
            ))
        })?;

        px.checked_mul(factor)
            .and_then(|p| p.round_sf(SLIPPAGE_SIGNIFICANT_FIGURES))
            .map(|p| p.round_dp(info.max_price_decimals()))
            .and_then(|p| p.to_f64())
            .ok_or_else(|| {
                HyperliquidError::InvalidNumber(format!("slippage price for {} out of range", coin))
            })
    }

    /// IOC limit order at the slippage-adjusted price. `mid` is used when no price is given.
    pub fn market_open(&self, params: &MarketOpenParams, mid: f64) -> Result<Action> {
        let px = params.px.unwrap_or(mid);
        let limit_px = self.slippage_price(&params.coin, params.is_buy, params.slippage, px)?;

        self.orders(
            &[OrderRequest {
                coin: params.coin.clone(),
                is_buy: params.is_buy,
                limit_px,
                sz: params.sz,
                reduce_only: false,
                order_type: OrderType::limit(Tif::Ioc),
                cloid: params.cloid,
            }],
            Grouping::Na,
            None,
        )
    }

    /// Reduce-only IOC order against the open position in `params.coin`
    pub fn market_close(
        &self,
        params: &MarketCloseParams,
        user_state: &UserState,
        mid: f64,
    ) -> Result<Action> {
        let position = user_state
            .position(&params.coin)
            .ok_or_else(|| HyperliquidError::PositionNotFound(params.coin.clone()))?;
        let szi: f64 = position.szi.parse().map_err(|e| {
            HyperliquidError::ParseError(format!("Invalid position size {}: {}", position.szi, e))
        })?;
        if szi == 0.0 {
            return Err(HyperliquidError::PositionNotFound(params.coin.clone()));
        }

        let is_buy = szi < 0.0;
        let sz = params.sz.unwrap_or(szi.abs());
        let px = params.px.unwrap_or(mid);
        let limit_px = self.slippage_price(&params.coin, is_buy, params.slippage, px)?;

        self.orders(
            &[OrderRequest {
                coin: params.coin.clone(),
                is_buy,
                limit_px,
                sz,
                reduce_only: true,
                order_type: OrderType::limit(Tif::Ioc),
                cloid: params.cloid,
            }],
            Grouping::Na,
            None,
        )
    }
}

fn batch_error(kind: &'static str, index: usize, source: HyperliquidError) -> HyperliquidError {
    HyperliquidError::BatchItem {
        kind,
        index,
        source: Box::new(source),
    }
}

fn to_decimal(value: f64, what: &str) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(HyperliquidError::InvalidNumber(format!("{} {} is not finite", what, value)));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| HyperliquidError::InvalidNumber(format!("{} {} out of range", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cloid, OrderId, Tpsl};
    use rust_decimal_macros::dec;

    fn assets() -> AssetTable {
        AssetTable::new()
            .with_asset("BTC", 0, 5)
            .with_asset("ETH", 1, 4)
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

    fn user_state(json: &str) -> UserState {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_limit_order_canonical_json() {
        let table: AssetTable = [("BTC", 0)].into_iter().collect();
        let action = ActionBuilder::new(&table)
            .orders(&[btc_buy(65000.5)], Grouping::Na, None)
            .unwrap();
        assert_eq!(
            serde_json::to_string(&action).unwrap(),
            r#"{"type":"order","orders":[{"asset":0,"isBuy":true,"limitPx":"65000.5","sz":"0.01","reduceOnly":false,"orderType":{"limit":{"tif":"Gtc"}}}],"grouping":"na"}"#
        );
    }

    #[test]
    fn test_trigger_order_wire() {
        let table = assets();
        let request = OrderRequest {
            coin: "ETH".to_string(),
            is_buy: false,
            limit_px: 2900.0,
            sz: 1.5,
            reduce_only: true,
            order_type: OrderType::trigger(2950.0, true, Tpsl::Sl),
            cloid: None,
        };
        let wire = ActionBuilder::new(&table).order_wire(&request).unwrap();
        assert_eq!(wire.asset, 1);
        assert_eq!(
            wire.order_type,
            OrderTypeWire::Trigger(TriggerWire {
                is_market: true,
                tpsl: Tpsl::Sl,
                trigger_px: "2950".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_coin() {
        let table = assets();
        let request = OrderRequest {
            coin: "DOGE".to_string(),
            ..btc_buy(0.1)
        };
        assert!(matches!(
            ActionBuilder::new(&table).order_wire(&request),
            Err(HyperliquidError::UnknownAsset(_))
        ));
    }

    #[test]
    fn test_batch_error_names_failing_index() {
        let table = assets();
        let orders = vec![btc_buy(65000.0), btc_buy(f64::NAN), btc_buy(64000.0)];
        let err = ActionBuilder::new(&table)
            .orders(&orders, Grouping::Na, None)
            .unwrap_err();

        assert_eq!(err.batch_index(), Some(1));
        assert!(err.to_string().starts_with("failed to build order 1: "));
        match err {
            HyperliquidError::BatchItem { source, .. } => {
                assert!(matches!(*source, HyperliquidError::InvalidNumber(_)));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_bulk_modify_preserves_order_and_ids() {
        let table = assets();
        let cloid = Cloid::from_bytes([7; 16]);
        let requests = vec![
            ModifyRequest {
                oid: OrderId::Oid(11),
                order: btc_buy(64000.0),
            },
            ModifyRequest {
                oid: OrderId::Cloid(cloid),
                order: btc_buy(63000.0),
            },
        ];
        let action = ActionBuilder::new(&table).bulk_modify(&requests).unwrap();
        match action {
            Action::BatchModify(batch) => {
                assert_eq!(batch.modifies.len(), 2);
                assert_eq!(batch.modifies[0].oid, OrderId::Oid(11));
                assert_eq!(batch.modifies[0].order.limit_px, "64000");
                assert_eq!(batch.modifies[1].oid, OrderId::Cloid(cloid));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_bulk_modify_error_names_index() {
        let table = assets();
        let requests = vec![
            ModifyRequest {
                oid: OrderId::Oid(1),
                order: btc_buy(64000.0),
            },
            ModifyRequest {
                oid: OrderId::Oid(2),
                order: OrderRequest {
                    coin: "XYZ".to_string(),
                    ..btc_buy(1.0)
                },
            },
        ];
        let err = ActionBuilder::new(&table).bulk_modify(&requests).unwrap_err();
        assert!(err.to_string().starts_with("failed to build modify 1: Unknown asset: XYZ"));
    }

    #[test]
    fn test_single_modify() {
        let table = assets();
        let action = ActionBuilder::new(&table)
            .modify(&ModifyRequest {
                oid: OrderId::Oid(99),
                order: btc_buy(64500.0),
            })
            .unwrap();
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.starts_with(r#"{"type":"modify","oid":99,"order":{"asset":0"#));
    }

    #[test]
    fn test_cancel_resolves_assets() {
        let table = assets();
        let action = ActionBuilder::new(&table)
            .cancel(&[CancelRequest {
                coin: "ETH".to_string(),
                oid: 123,
            }])
            .unwrap();
        assert_eq!(
            action,
            Action::Cancel(CancelAction {
                cancels: vec![CancelWire { asset: 1, oid: 123 }],
            })
        );
    }

    #[test]
    fn test_cancel_by_cloid_wire() {
        let table = assets();
        let cloid: Cloid = "0x000000000000000000000000000000ab".parse().unwrap();
        let action = ActionBuilder::new(&table)
            .cancel_by_cloid(&[CancelByCloidRequest {
                coin: "ETH".to_string(),
                cloid,
            }])
            .unwrap();
        assert_eq!(
            serde_json::to_string(&action).unwrap(),
            r#"{"type":"cancelByCloid","cancels":[{"asset":1,"cloid":"0x000000000000000000000000000000ab"}]}"#
        );
    }

    #[test]
    fn test_cancel_by_cloid_error_names_index() {
        let table = assets();
        let requests: Vec<CancelByCloidRequest> = ["BTC", "DOGE"]
            .iter()
            .map(|coin| CancelByCloidRequest {
                coin: coin.to_string(),
                cloid: Cloid::from_bytes([7; 16]),
            })
            .collect();
        let err = ActionBuilder::new(&table).cancel_by_cloid(&requests).unwrap_err();
        assert_eq!(err.batch_index(), Some(1));
        assert!(err.to_string().starts_with("failed to build cancel 1:"));
    }

    #[test]
    fn test_grouped_orders_carry_grouping() {
        let table = assets();
        let take_profit = OrderRequest {
            coin: "BTC".to_string(),
            is_buy: false,
            limit_px: 70000.0,
            sz: 0.01,
            reduce_only: true,
            order_type: OrderType::trigger(70000.0, true, Tpsl::Tp),
            cloid: None,
        };
        let action = ActionBuilder::new(&table)
            .orders(&[btc_buy(65000.0), take_profit], Grouping::NormalTpsl, None)
            .unwrap();
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.ends_with(
            r#"{"asset":0,"isBuy":false,"limitPx":"70000","sz":"0.01","reduceOnly":true,"orderType":{"trigger":{"isMarket":true,"tpsl":"tp","triggerPx":"70000"}}}],"grouping":"normalTpsl"}"#
        ));
    }

    #[test]
    fn test_slippage_price() {
        let table = assets();
        let builder = ActionBuilder::new(&table);
        assert_eq!(builder.slippage_price("BTC", true, 0.05, 65000.0).unwrap(), 68250.0);
        assert_eq!(builder.slippage_price("BTC", false, 0.05, 65000.0).unwrap(), 61750.0);
        // 3030.12423 -> 5 significant figures -> 3030.1
        assert_eq!(builder.slippage_price("ETH", true, 0.01, 3000.123).unwrap(), 3030.1);
        assert!(matches!(
            builder.slippage_price("BTC", true, 0.05, f64::NAN),
            Err(HyperliquidError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_slippage_price_overflow_is_an_error() {
        let table = assets();
        let builder = ActionBuilder::new(&table);
        assert!(matches!(
            builder.slippage_price("BTC", true, 0.05, 7.9e28),
            Err(HyperliquidError::InvalidNumber(_))
        ));
        assert!(matches!(
            builder.slippage_price("BTC", true, 1e20, 1e20),
            Err(HyperliquidError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_slippage_price_rejects_non_positive_factor() {
        let table = assets();
        let builder = ActionBuilder::new(&table);
        for slippage in [1.0, 1.5] {
            assert!(matches!(
                builder.slippage_price("BTC", false, slippage, 65000.0),
                Err(HyperliquidError::InvalidNumber(_))
            ));
        }
        assert!(matches!(
            builder.slippage_price("BTC", true, -1.0, 65000.0),
            Err(HyperliquidError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_spot_price_keeps_more_decimals() {
        let table = assets().with_asset("PURR/USDC", 10_000, 0);
        let builder = ActionBuilder::new(&table);
        let px = builder.slippage_price("PURR/USDC", true, 0.01, 0.123456).unwrap();
        assert_eq!(Decimal::from_f64(px).unwrap(), dec!(0.12469));
        assert_eq!(to_decimal(0.5, "px").unwrap(), dec!(0.5));
    }

    #[test]
    fn test_market_open_is_ioc_at_slippage_price() {
        let table = assets();
        let params = MarketOpenParams {
            coin: "BTC".to_string(),
            is_buy: true,
            sz: 0.02,
            px: None,
            slippage: 0.05,
            cloid: None,
        };
        let action = ActionBuilder::new(&table).market_open(&params, 65000.0).unwrap();
        match action {
            Action::Order(order) => {
                let wire = &order.orders[0];
                assert_eq!(wire.limit_px, "68250");
                assert_eq!(wire.sz, "0.02");
                assert!(!wire.reduce_only);
                assert_eq!(wire.order_type, OrderTypeWire::Limit(LimitWire { tif: Tif::Ioc }));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_market_close_flattens_short() {
        let table = assets();
        let state = user_state(r#"{"assetPositions":[{"position":{"coin":"ETH","szi":"-1.5"}}]}"#);
        let params = MarketCloseParams {
            coin: "ETH".to_string(),
            sz: None,
            px: Some(3000.0),
            slippage: 0.01,
            cloid: None,
        };
        let action = ActionBuilder::new(&table)
            .market_close(&params, &state, 0.0)
            .unwrap();
        match action {
            Action::Order(order) => {
                let wire = &order.orders[0];
                assert!(wire.is_buy);
                assert!(wire.reduce_only);
                assert_eq!(wire.sz, "1.5");
                assert_eq!(wire.limit_px, "3030");
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_market_close_without_position() {
        let table = assets();
        let state = user_state(r#"{"assetPositions":[{"position":{"coin":"ETH","szi":"2.0"}}]}"#);
        let params = MarketCloseParams {
            coin: "BTC".to_string(),
            sz: None,
            px: None,
            slippage: 0.05,
            cloid: None,
        };
        assert!(matches!(
            ActionBuilder::new(&table).market_close(&params, &state, 65000.0),
            Err(HyperliquidError::PositionNotFound(coin)) if coin == "BTC"
        ));
    }

    #[test]
    fn test_update_isolated_margin_micro_units() {
        let table = assets();
        let action = ActionBuilder::new(&table)
            .update_isolated_margin("BTC", true, 12.5)
            .unwrap();
        assert_eq!(
            action,
            Action::UpdateIsolatedMargin(UpdateIsolatedMarginAction {
                asset: 0,
                is_buy: true,
                ntli: 12_500_000,
            })
        );
        assert!(matches!(
            ActionBuilder::new(&table).update_isolated_margin("BTC", true, 7.9e28),
            Err(HyperliquidError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_update_leverage_rejects_zero() {
        let table = assets();
        assert!(ActionBuilder::new(&table).update_leverage("BTC", true, 0).is_err());
        assert!(ActionBuilder::new(&table).update_leverage("BTC", false, 10).is_ok());
    }

    #[test]
    fn test_usd_class_transfer() {
        let table = AssetTable::new();
        let action = ActionBuilder::new(&table).usd_class_transfer(100.0, false).unwrap();
        assert_eq!(
            serde_json::to_string(&action).unwrap(),
            r#"{"type":"usdClassTransfer","amount":"100","toPerp":false}"#
        );
    }
}
