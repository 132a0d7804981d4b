use clap::Parser;
use reqwest::Url;
use thiserror::Error;

use std::time::Duration;

use crate::service::DEFAULT_KEYSTORE_CAPACITY;

pub const DEFAULT_GATEWAY: &str = "http://127.0.0.1:5002";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid gateway URL {url}: {reason}")]
    InvalidGateway { url: String, reason: String },

    #[error("Gateway timeout must be at least one second")]
    ZeroTimeout,

    #[error("Keystore capacity must be at least one wallet")]
    ZeroCapacity,
}

/// Wallet server settings, read from flags or the environment at startup
#[derive(Debug, Clone, Parser)]
#[clap(name = "wallet-server", version, about = "Wallet relay server")]
pub struct WalletServerConfig {
    /// Address to bind the HTTP server to
    #[clap(long, env = "WALLET_SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[clap(long, env = "WALLET_SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Base URL of the blockchain node
    #[clap(long, env = "WALLET_SERVER_GATEWAY_TO_BLOCKCHAIN", default_value = DEFAULT_GATEWAY)]
    pub gateway: String,

    /// Upper bound for every request to the node, in seconds
    #[clap(long, env = "WALLET_SERVER_GATEWAY_TIMEOUT_SECS", default_value_t = 10)]
    pub gateway_timeout_secs: u64,

    /// Most wallets the server keeps keys for
    #[clap(
        long,
        env = "WALLET_SERVER_KEYSTORE_CAPACITY",
        default_value_t = DEFAULT_KEYSTORE_CAPACITY
    )]
    pub keystore_capacity: usize,
}

impl WalletServerConfig {
    /// Parses settings and validates them
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.gateway).map_err(|e| ConfigError::InvalidGateway {
            url: self.gateway.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidGateway {
                url: self.gateway.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        if self.gateway_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.keystore_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        Ok(())
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> WalletServerConfig {
        let mut argv = vec!["wallet-server"];
        argv.extend_from_slice(args);
        WalletServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--port",
            "9090",
            "--gateway",
            "http://node:5001",
            "--gateway-timeout-secs",
            "3",
        ]);

        assert_eq!(config.port, 9090);
        assert_eq!(config.gateway, "http://node:5001");
        assert_eq!(config.gateway_timeout(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_gateway() {
        let config = parse(&["--gateway", "ftp://node"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGateway { .. })
        ));

        let config = parse(&["--gateway", "node:5002:"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = parse(&["--gateway", DEFAULT_GATEWAY, "--gateway-timeout-secs", "0"]);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn test_keystore_capacity() {
        let config = parse(&[]);
        assert_eq!(config.keystore_capacity, DEFAULT_KEYSTORE_CAPACITY);

        let config = parse(&["--keystore-capacity", "0"]);
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    }
}
