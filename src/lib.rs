//! Client for the Hyperliquid exchange API.
//!
//! Actions are built from trading intents ([`exchange::ActionBuilder`]),
//! encoded canonically as MessagePack ([`signing::Action::encode`]), hashed
//! together with a nonce, vault and optional expiry, and signed as an EIP-712
//! phantom agent bound to mainnet or testnet ([`signing::ActionSigner`]).
//! [`exchange::Exchange`] posts the assembled payload.

pub mod config;
pub mod errors;
pub mod exchange;
pub mod models;
pub mod signing;

pub use errors::{HyperliquidError, Result};
