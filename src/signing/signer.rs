use crate::errors::{HyperliquidError, Result};
use crate::signing::actions::Action;
use crate::signing::domain::Network;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Signature, H256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const NO_VAULT: u8 = 0x00;
const VAULT_PRESENT: u8 = 0x01;
const EXPIRES_TAG: u8 = 0x00;

/// Authentication data signed together with an action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigningEnvelope {
    /// Wall-clock milliseconds; should increase per signer
    pub nonce: u64,
    /// Sub-account or vault acting through the signer; `None` for the main account
    pub vault_address: Option<Address>,
    pub expires_after: Option<u64>,
}

impl SigningEnvelope {
    pub fn new(nonce: u64) -> Self {
        Self {
            nonce,
            vault_address: None,
            expires_after: None,
        }
    }

    pub fn with_vault(mut self, vault_address: Option<Address>) -> Self {
        self.vault_address = vault_address;
        self
    }

    pub fn with_expires_after(mut self, expires_after: Option<u64>) -> Self {
        self.expires_after = expires_after;
        self
    }
}

/// Hash of already-encoded action bytes plus the envelope.
///
/// Layout: `action ‖ nonce(u64 BE) ‖ 0x00` without a vault, or
/// `action ‖ nonce ‖ 0x01 ‖ vault(20 bytes)` with one, then `0x00 ‖ expires(u64 BE)`
/// only when an expiry is set.
pub fn connection_id(encoded_action: &[u8], envelope: &SigningEnvelope) -> H256 {
    let mut data = Vec::with_capacity(encoded_action.len() + 8 + 21 + 9);
    data.extend_from_slice(encoded_action);
    data.extend_from_slice(&envelope.nonce.to_be_bytes());
    match envelope.vault_address {
        Some(vault) => {
            data.push(VAULT_PRESENT);
            data.extend_from_slice(vault.as_bytes());
        }
        None => data.push(NO_VAULT),
    }
    if let Some(expires_after) = envelope.expires_after {
        data.push(EXPIRES_TAG);
        data.extend_from_slice(&expires_after.to_be_bytes());
    }
    H256::from(keccak256(data))
}

pub fn action_hash(action: &Action, envelope: &SigningEnvelope) -> Result<H256> {
    Ok(connection_id(&action.encode()?, envelope))
}

/// Signature in the shape the exchange expects: hex `r`/`s`, numeric `v`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureWire {
    pub r: String,
    pub s: String,
    pub v: u64,
}

impl From<&Signature> for SignatureWire {
    fn from(signature: &Signature) -> Self {
        Self {
            r: format!("0x{:x}", signature.r),
            s: format!("0x{:x}", signature.s),
            v: signature.v,
        }
    }
}

/// Signs L1 actions with a local secp256k1 key
#[derive(Clone)]
pub struct ActionSigner {
    wallet: Arc<LocalWallet>,
}

impl ActionSigner {
    /// Create a new action signer from a hex private key
    pub fn new(private_key: &str) -> Result<Self> {
        let wallet = private_key
            .parse::<LocalWallet>()
            .map_err(|e| HyperliquidError::SigningError(format!("Invalid private key: {}", e)))?;

        Ok(Self {
            wallet: Arc::new(wallet),
        })
    }

    /// Get the wallet address
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Encode, hash and sign an action for the given network
    pub fn sign_action(
        &self,
        action: &Action,
        envelope: &SigningEnvelope,
        network: Network,
    ) -> Result<Signature> {
        let connection_id = action_hash(action, envelope)?;
        debug!(
            "Signing {} action, nonce {}, connection id {:?}",
            action.kind().wire_name(),
            envelope.nonce,
            connection_id
        );
        self.sign_connection_id(connection_id, network)
    }

    /// Sign the phantom agent wrapping an action hash
    pub fn sign_connection_id(&self, connection_id: H256, network: Network) -> Result<Signature> {
        let digest = network.domain().signing_digest(connection_id);
        self.wallet
            .sign_hash(digest)
            .map_err(|e| HyperliquidError::SigningError(format!("Failed to sign action: {}", e)))
    }
}

impl std::fmt::Debug for ActionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSigner")
            .field("address", &self.address())
            .finish()
    }
}

/// Recover the address that produced `signature` over a connection id
pub fn recover_signer(
    signature: &Signature,
    connection_id: H256,
    network: Network,
) -> Result<Address> {
    let digest = network.domain().signing_digest(connection_id);
    signature
        .recover(digest)
        .map_err(|e| HyperliquidError::SigningError(format!("Failed to recover signer: {}", e)))
}

pub fn recover_action_signer(
    signature: &Signature,
    action: &Action,
    envelope: &SigningEnvelope,
    network: Network,
) -> Result<Address> {
    recover_signer(signature, action_hash(action, envelope)?, network)
}

/// True when `signature` over `action` was produced by `expected`
pub fn verify_action(
    signature: &Signature,
    action: &Action,
    envelope: &SigningEnvelope,
    network: Network,
    expected: Address,
) -> Result<bool> {
    Ok(recover_action_signer(signature, action, envelope, network)? == expected)
}
