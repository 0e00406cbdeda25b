use crate::errors::Result;
use crate::signing::actions::{Action, ActionKind};
use crate::signing::signer::{SignatureWire, SigningEnvelope};
use ethers::types::{Address, Signature};
use serde::{Serialize, Serializer};

/// How `vaultAddress` appears in the request body
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultField {
    Omit,
    Null,
    Address(Address),
}

impl VaultField {
    pub fn is_omitted(&self) -> bool {
        matches!(self, VaultField::Omit)
    }

    /// Vault the signature must commit to, consistent with the body
    pub fn signed_vault(&self) -> Option<Address> {
        match self {
            VaultField::Address(address) => Some(*address),
            VaultField::Omit | VaultField::Null => None,
        }
    }
}

impl Serialize for VaultField {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            VaultField::Address(address) => serializer.serialize_str(&format!("{:?}", address)),
            VaultField::Omit | VaultField::Null => serializer.serialize_none(),
        }
    }
}

/// Decision table for the vault address, by action kind and vault presence.
///
/// | kind             | no vault | vault   |
/// |------------------|----------|---------|
/// | usdClassTransfer | null     | null    |
/// | any other        | omitted  | address |
pub fn vault_field(kind: ActionKind, vault: Option<Address>) -> VaultField {
    match (kind, vault) {
        (ActionKind::UsdClassTransfer, _) => VaultField::Null,
        (_, Some(address)) => VaultField::Address(address),
        (_, None) => VaultField::Omit,
    }
}

/// Envelope for an action given the client's configured vault and expiry
pub fn envelope_for(
    kind: ActionKind,
    nonce: u64,
    vault: Option<Address>,
    expires_after: Option<u64>,
) -> SigningEnvelope {
    SigningEnvelope::new(nonce)
        .with_vault(vault_field(kind, vault).signed_vault())
        .with_expires_after(expires_after)
}

/// Request body posted to `/exchange`
#[derive(Clone, Debug, Serialize)]
pub struct ExchangePayload<'a> {
    pub action: &'a Action,
    pub nonce: u64,
    pub signature: SignatureWire,
    #[serde(rename = "vaultAddress", skip_serializing_if = "VaultField::is_omitted")]
    pub vault_address: VaultField,
    #[serde(rename = "expiresAfter", skip_serializing_if = "Option::is_none")]
    pub expires_after: Option<u64>,
}

impl<'a> ExchangePayload<'a> {
    /// `vault` is the client's configured vault; the table decides what is written.
    pub fn new(
        action: &'a Action,
        signature: &Signature,
        nonce: u64,
        vault: Option<Address>,
        expires_after: Option<u64>,
    ) -> Self {
        Self {
            action,
            nonce,
            signature: SignatureWire::from(signature),
            vault_address: vault_field(action.kind(), vault),
            expires_after,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Serialized request body for a signed action
pub fn assemble_payload(
    action: &Action,
    signature: &Signature,
    nonce: u64,
    vault: Option<Address>,
    expires_after: Option<u64>,
) -> Result<Vec<u8>> {
    ExchangePayload::new(action, signature, nonce, vault, expires_after).to_bytes()
}
