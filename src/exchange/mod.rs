pub mod assets;
pub mod builder;
pub mod client;
pub mod info;
pub mod payload;

pub use assets::{AssetInfo, AssetTable};
pub use builder::ActionBuilder;
pub use client::{Exchange, SignedAction};
pub use info::InfoClient;
pub use payload::{assemble_payload, vault_field, ExchangePayload, VaultField};
