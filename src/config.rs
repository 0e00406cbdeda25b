use crate::errors::{HyperliquidError, Result};
use crate::signing::domain::Network;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub private_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Sub-account or vault to trade on behalf of
    #[serde(default)]
    pub vault_address: Option<String>,
    /// Account whose positions are read, when it differs from the signer
    #[serde(default)]
    pub account_address: Option<String>,
}

impl GeneralConfig {
    pub fn vault(&self) -> Result<Option<Address>> {
        parse_optional_address(self.vault_address.as_deref())
    }

    pub fn account(&self) -> Result<Option<Address>> {
        parse_optional_address(self.account_address.as_deref())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Slippage applied to market orders, as a fraction
    pub default_slippage: f64,
    /// Actions expire this many milliseconds after signing
    #[serde(default)]
    pub expires_in_ms: Option<u64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_slippage: 0.05,
            expires_in_ms: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn default_api_url() -> String {
    Network::Testnet.default_api_url().to_string()
}

fn parse_optional_address(value: Option<&str>) -> Result<Option<Address>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(addr) => addr
            .parse::<Address>()
            .map(Some)
            .map_err(|e| HyperliquidError::ParseError(format!("Invalid address {}: {}", addr, e))),
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HyperliquidError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.general.api_url.trim().is_empty() {
            return Err(HyperliquidError::ConfigError(
                "api_url must not be empty".to_string(),
            ));
        }

        let slippage = self.execution.default_slippage;
        if !(slippage > 0.0 && slippage < 1.0) {
            return Err(HyperliquidError::ConfigError(
                "default_slippage must be between 0 and 1".to_string(),
            ));
        }

        // Validate addresses
        self.general.vault()?;
        self.general.account()?;

        Ok(())
    }

    /// Expand environment variables in configuration
    pub fn expand_env_vars(&mut self) -> Result<()> {
        self.general.private_key = expand_var(&self.general.private_key)?;
        if let Some(vault) = &self.general.vault_address {
            self.general.vault_address = Some(expand_var(vault)?);
        }
        Ok(())
    }
}

fn expand_var(value: &str) -> Result<String> {
    match value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name).map_err(|_| {
            HyperliquidError::ConfigError(format!("Environment variable {} not set", var_name))
        }),
        None => Ok(value.to_string()),
    }
}
