use ethers::abi::{encode, Token};
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;

pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";

const DOMAIN_NAME: &str = "Exchange";
const DOMAIN_VERSION: &str = "1";
const DOMAIN_CHAIN_ID: u64 = 1337;

const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const AGENT_TYPE: &str = "Agent(string source,bytes32 connectionId)";

/// Network an action is signed for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Only the exact production URL counts as mainnet.
    pub fn from_base_url(base_url: &str) -> Self {
        if base_url.trim_end_matches('/') == MAINNET_API_URL {
            Network::Mainnet
        } else {
            Network::Testnet
        }
    }

    pub fn default_api_url(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_API_URL,
            Network::Testnet => TESTNET_API_URL,
        }
    }

    pub fn domain(&self) -> SigningDomain {
        SigningDomain {
            name: DOMAIN_NAME,
            version: DOMAIN_VERSION,
            chain_id: DOMAIN_CHAIN_ID,
            verifying_contract: Address::zero(),
            source: match self {
                Network::Mainnet => "a",
                Network::Testnet => "b",
            },
        }
    }
}

/// EIP-712 domain plus the phantom-agent source that binds a signature to one network
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigningDomain {
    pub name: &'static str,
    pub version: &'static str,
    pub chain_id: u64,
    pub verifying_contract: Address,
    pub source: &'static str,
}

impl SigningDomain {
    pub fn separator(&self) -> H256 {
        let encoded = encode(&[
            Token::FixedBytes(keccak256(EIP712_DOMAIN_TYPE).to_vec()),
            Token::FixedBytes(keccak256(self.name).to_vec()),
            Token::FixedBytes(keccak256(self.version).to_vec()),
            Token::Uint(U256::from(self.chain_id)),
            Token::Address(self.verifying_contract),
        ]);
        H256::from(keccak256(encoded))
    }

    /// Struct hash of `Agent { source, connectionId }`
    pub fn agent_hash(&self, connection_id: H256) -> H256 {
        let encoded = encode(&[
            Token::FixedBytes(keccak256(AGENT_TYPE).to_vec()),
            Token::FixedBytes(keccak256(self.source).to_vec()),
            Token::FixedBytes(connection_id.as_bytes().to_vec()),
        ]);
        H256::from(keccak256(encoded))
    }

    /// The digest actually signed: `keccak256(0x1901 ‖ separator ‖ agent_hash)`
    pub fn signing_digest(&self, connection_id: H256) -> H256 {
        let mut data = Vec::with_capacity(66);
        data.extend_from_slice(&[0x19, 0x01]);
        data.extend_from_slice(self.separator().as_bytes());
        data.extend_from_slice(self.agent_hash(connection_id).as_bytes());
        H256::from(keccak256(data))
    }
}
