use std::{env, str::FromStr};

use strum::{Display, EnumString};
use thiserror::Error;

use crate::{
    constants::{
        BLOCKCHAIN, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RPC_TIMEOUT_SECONDS, DEVNET_GENESIS_HASH,
        DEVNET_NETWORK, DEVNET_RPC_URL, MAINNET_GENESIS_HASH, MAINNET_NETWORK, MAINNET_RPC_URL,
        TESTNET_GENESIS_HASH, TESTNET_NETWORK, TESTNET_RPC_URL,
    },
    models::NetworkIdentifier,
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// Whether the server may talk to a Solana node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Mode {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum NetworkKind {
    Mainnet,
    Testnet,
    Devnet,
}

impl NetworkKind {
    pub fn name(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => MAINNET_NETWORK,
            NetworkKind::Testnet => TESTNET_NETWORK,
            NetworkKind::Devnet => DEVNET_NETWORK,
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => MAINNET_RPC_URL,
            NetworkKind::Testnet => TESTNET_RPC_URL,
            NetworkKind::Devnet => DEVNET_RPC_URL,
        }
    }

    pub fn genesis_hash(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => MAINNET_GENESIS_HASH,
            NetworkKind::Testnet => TESTNET_GENESIS_HASH,
            NetworkKind::Devnet => DEVNET_GENESIS_HASH,
        }
    }

    pub fn identifier(&self) -> NetworkIdentifier {
        NetworkIdentifier {
            blockchain: BLOCKCHAIN.to_string(),
            network: self.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub mode: Mode,
    pub network: NetworkKind,
    pub host: String,
    pub port: u16,
    pub rpc_url: String,
    pub rpc_timeout_seconds: u64,
}

fn required_var<T: FromStr>(name: &str) -> Result<T, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::MissingField(name.to_string()))?;
    parse_var(name, value)
}

fn parse_var<T: FromStr>(name: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: name.to_string(),
        value,
    })
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// `MODE` and `NETWORK` are required; `PORT` is required online only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode: Mode = required_var("MODE")?;
        let network: NetworkKind = required_var("NETWORK")?;

        let port = match (env::var("PORT"), mode) {
            (Ok(port), _) => parse_var("PORT", port)?,
            (Err(_), Mode::Offline) => DEFAULT_PORT,
            (Err(_), Mode::Online) => return Err(ConfigError::MissingField("PORT".to_string())),
        };
        let rpc_timeout_seconds = match env::var("RPC_TIMEOUT_SECONDS") {
            Ok(timeout) => parse_var("RPC_TIMEOUT_SECONDS", timeout)?,
            Err(_) => DEFAULT_RPC_TIMEOUT_SECONDS,
        };

        Ok(Self {
            mode,
            network,
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port,
            rpc_url: env::var("RPC_URL")
                .unwrap_or_else(|_| network.default_rpc_url().to_string()),
            rpc_timeout_seconds,
        })
    }

    pub fn is_offline(&self) -> bool {
        self.mode == Mode::Offline
    }
}
