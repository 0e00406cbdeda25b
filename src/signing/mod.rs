pub mod actions;
pub mod domain;
pub mod float_wire;
pub mod signer;

pub use actions::{Action, ActionKind};
pub use domain::{Network, SigningDomain, MAINNET_API_URL, TESTNET_API_URL};
pub use float_wire::float_to_wire;
pub use signer::{
    action_hash, connection_id, recover_action_signer, verify_action, ActionSigner, SignatureWire,
    SigningEnvelope,
};
