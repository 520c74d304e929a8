use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator};
use thiserror::Error;

use super::RosettaError;
use crate::services::provider::SolanaProviderError;

/// Stable error catalogue of every Rosetta endpoint.
#[derive(Error, Debug, Clone, Serialize, PartialEq, EnumIter)]
pub enum ConstructionError {
    #[error("Endpoint unavailable offline")]
    UnavailableOffline,

    #[error("Solana node error: {message}")]
    UpstreamRpc { message: String, retriable: bool },

    #[error("Unclear intent: {0}")]
    UnclearIntent(String),

    #[error("Unable to parse intermediate result: {0}")]
    UnableToParseIntermediateResult(String),

    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("Unable to broadcast transaction: {message}")]
    BroadcastFailed { message: String, retriable: bool },

    #[error("Call method not allowed: {0}")]
    CallMethodNotAllowed(String),

    #[error("Invalid network identifier: {0}")]
    InvalidNetwork(String),

    #[error("Invalid block identifier: {0}")]
    InvalidBlockIdentifier(String),
}

impl ConstructionError {
    pub fn code(&self) -> u32 {
        match self {
            ConstructionError::UnavailableOffline => 1,
            ConstructionError::UpstreamRpc { .. } => 2,
            ConstructionError::UnclearIntent(_) => 3,
            ConstructionError::UnableToParseIntermediateResult(_) => 4,
            ConstructionError::SignatureInvalid(_) => 5,
            ConstructionError::BroadcastFailed { .. } => 6,
            ConstructionError::CallMethodNotAllowed(_) => 7,
            ConstructionError::InvalidNetwork(_) => 8,
            ConstructionError::InvalidBlockIdentifier(_) => 9,
        }
    }

    /// Message shared by every instance of the variant, without context.
    pub fn summary(&self) -> &'static str {
        match self {
            ConstructionError::UnavailableOffline => "Endpoint unavailable offline",
            ConstructionError::UpstreamRpc { .. } => "Solana node error",
            ConstructionError::UnclearIntent(_) => "Unable to parse intent",
            ConstructionError::UnableToParseIntermediateResult(_) => {
                "Unable to parse intermediate result"
            }
            ConstructionError::SignatureInvalid(_) => "Signature invalid",
            ConstructionError::BroadcastFailed { .. } => "Unable to broadcast transaction",
            ConstructionError::CallMethodNotAllowed(_) => "Call method not allowed",
            ConstructionError::InvalidNetwork(_) => "Invalid network identifier",
            ConstructionError::InvalidBlockIdentifier(_) => "Invalid block identifier",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retriable(&self) -> bool {
        match self {
            ConstructionError::UpstreamRpc { retriable, .. }
            | ConstructionError::BroadcastFailed { retriable, .. } => *retriable,
            _ => false,
        }
    }

    /// Whether some instances of the variant are retriable.
    fn may_be_retriable(&self) -> bool {
        matches!(
            self,
            ConstructionError::UpstreamRpc { .. } | ConstructionError::BroadcastFailed { .. }
        )
    }

    fn context(&self) -> Option<&str> {
        match self {
            ConstructionError::UnavailableOffline => None,
            ConstructionError::UpstreamRpc { message: msg, .. }
            | ConstructionError::BroadcastFailed { message: msg, .. }
            | ConstructionError::UnclearIntent(msg)
            | ConstructionError::UnableToParseIntermediateResult(msg)
            | ConstructionError::SignatureInvalid(msg)
            | ConstructionError::CallMethodNotAllowed(msg)
            | ConstructionError::InvalidNetwork(msg)
            | ConstructionError::InvalidBlockIdentifier(msg) => Some(msg.as_str()),
        }
    }

    /// Every error kind, rendered without context, for `/network/options`.
    pub fn catalogue() -> Vec<RosettaError> {
        ConstructionError::iter()
            .map(|e| RosettaError {
                code: e.code(),
                message: e.summary().to_string(),
                retriable: e.may_be_retriable(),
                details: None,
            })
            .collect()
    }

    pub fn unparseable(err: impl std::fmt::Display) -> Self {
        ConstructionError::UnableToParseIntermediateResult(err.to_string())
    }

    /// A failed node call; retriable only when the node error is transient.
    pub fn upstream(err: SolanaProviderError) -> Self {
        ConstructionError::UpstreamRpc {
            retriable: err.is_transient(),
            message: err.to_string(),
        }
    }

    pub fn broadcast(err: SolanaProviderError) -> Self {
        ConstructionError::BroadcastFailed {
            retriable: err.is_transient(),
            message: err.to_string(),
        }
    }
}

impl From<&ConstructionError> for RosettaError {
    fn from(error: &ConstructionError) -> Self {
        let details = error.context().map(|context| {
            let mut details = serde_json::Map::new();
            details.insert("context".to_string(), context.into());
            details
        });
        RosettaError {
            code: error.code(),
            message: error.summary().to_string(),
            retriable: error.is_retriable(),
            details,
        }
    }
}
