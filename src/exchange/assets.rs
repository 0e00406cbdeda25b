use crate::errors::{HyperliquidError, Result};
use crate::models::{Meta, SpotMeta};
use std::collections::HashMap;

/// Spot asset indices start here on the wire
pub const SPOT_ASSET_OFFSET: u32 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetInfo {
    pub index: u32,
    pub sz_decimals: u32,
}

impl AssetInfo {
    pub fn is_spot(&self) -> bool {
        self.index >= SPOT_ASSET_OFFSET
    }

    /// Decimal places a price may carry for this asset
    pub fn max_price_decimals(&self) -> u32 {
        let base = if self.is_spot() { 8 } else { 6 };
        base - self.sz_decimals.min(base)
    }
}

/// Coin symbol to asset index, fixed for the lifetime of a client
#[derive(Clone, Debug, Default)]
pub struct AssetTable {
    assets: HashMap<String, AssetInfo>,
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_meta(meta: &Meta, spot_meta: Option<&SpotMeta>) -> Self {
        let mut table = Self::new();
        for (index, asset) in meta.universe.iter().enumerate() {
            table.insert(&asset.name, index as u32, asset.sz_decimals);
        }

        if let Some(spot) = spot_meta {
            for pair in &spot.universe {
                // Base token decides size precision.
                let sz_decimals = pair
                    .tokens
                    .first()
                    .and_then(|base| spot.tokens.iter().find(|t| t.index == *base))
                    .map(|t| t.sz_decimals)
                    .unwrap_or(0);
                table.insert(&pair.name, SPOT_ASSET_OFFSET + pair.index, sz_decimals);
            }
        }

        table
    }

    pub fn with_asset(mut self, coin: &str, index: u32, sz_decimals: u32) -> Self {
        self.insert(coin, index, sz_decimals);
        self
    }

    fn insert(&mut self, coin: &str, index: u32, sz_decimals: u32) {
        self.assets
            .insert(coin.to_string(), AssetInfo { index, sz_decimals });
    }

    pub fn get(&self, coin: &str) -> Result<AssetInfo> {
        self.assets
            .get(coin)
            .copied()
            .ok_or_else(|| HyperliquidError::UnknownAsset(coin.to_string()))
    }

    pub fn index(&self, coin: &str) -> Result<u32> {
        self.get(coin).map(|info| info.index)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, u32)> for AssetTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, u32)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (coin, index) in iter {
            table.insert(coin, index, 0);
        }
        table
    }
}
