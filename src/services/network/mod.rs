//! Network identity checks and the `/network/*` endpoints.
//!
//! Both are answered from configuration alone and work offline.

use crate::{
    config::{NetworkKind, ServerConfig},
    constants::{
        CALL_METHODS, FAILURE_STATUS, MIDDLEWARE_VERSION, NODE_VERSION, ROSETTA_VERSION,
        SUCCESS_STATUS,
    },
    domain::OperationType,
    models::{
        Allow, BlockIdentifier, ConstructionError, NetworkIdentifier, NetworkListResponse, NetworkOptionsResponse,
        OperationStatus, Version,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkService {
    network: NetworkKind,
    offline: bool,
}

impl NetworkService {
    pub fn new(network: NetworkKind, offline: bool) -> Self {
        Self { network, offline }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.network, config.is_offline())
    }

    pub fn identifier(&self) -> NetworkIdentifier {
        self.network.identifier()
    }

    /// Slot zero under the cluster's genesis hash.
    pub fn genesis_block(&self) -> BlockIdentifier {
        BlockIdentifier {
            index: 0,
            hash: self.network.genesis_hash().to_string(),
        }
    }

    /// Rejects identifiers naming another chain or network.
    pub fn validate(&self, identifier: &NetworkIdentifier) -> Result<(), ConstructionError> {
        let expected = self.identifier();
        if *identifier != expected {
            log::warn!(
                "rejected request for {}/{}, serving {}/{}",
                identifier.blockchain,
                identifier.network,
                expected.blockchain,
                expected.network
            );
            return Err(ConstructionError::InvalidNetwork(format!(
                "{}/{} is not served here",
                identifier.blockchain, identifier.network
            )));
        }
        Ok(())
    }

    /// Fails endpoints that need the node while running offline.
    pub fn require_online(&self) -> Result<(), ConstructionError> {
        if self.offline {
            return Err(ConstructionError::UnavailableOffline);
        }
        Ok(())
    }

    pub fn list(&self) -> NetworkListResponse {
        NetworkListResponse {
            network_identifiers: vec![self.identifier()],
        }
    }

    pub fn options(
        &self,
        identifier: &NetworkIdentifier,
    ) -> Result<NetworkOptionsResponse, ConstructionError> {
        self.validate(identifier)?;
        Ok(NetworkOptionsResponse {
            version: Version {
                rosetta_version: ROSETTA_VERSION.to_string(),
                node_version: NODE_VERSION.to_string(),
                middleware_version: MIDDLEWARE_VERSION.to_string(),
            },
            allow: Allow {
                operation_statuses: vec![
                    OperationStatus {
                        status: SUCCESS_STATUS.to_string(),
                        successful: true,
                    },
                    OperationStatus {
                        status: FAILURE_STATUS.to_string(),
                        successful: false,
                    },
                ],
                operation_types: OperationType::names(),
                errors: ConstructionError::catalogue(),
                historical_balance_lookup: false,
                call_methods: CALL_METHODS.iter().map(|m| m.to_string()).collect(),
                mempool_coins: false,
            },
        })
    }
}
