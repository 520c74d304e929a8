use std::sync::Arc;

use crate::{
    config::ServerConfig,
    services::{
        CallService, ConstructionService, DataService, NetworkService, SolanaProvider, SolanaProviderError,
        SolanaProviderTrait,
    },
};

/// Services shared by every request handler. Immutable after startup.
pub struct AppState<P = SolanaProvider> {
    pub network: NetworkService,
    pub construction: ConstructionService<P>,
    pub data: DataService<P>,
    pub call: CallService<P>,
}

impl<P: SolanaProviderTrait> AppState<P> {
    pub fn new(network: NetworkService, provider: Arc<P>) -> Self {
        Self {
            construction: ConstructionService::new(network.clone(), provider.clone()),
            data: DataService::new(network.clone(), provider.clone()),
            call: CallService::new(network.clone(), provider),
            network,
        }
    }
}

impl AppState {
    /// Builds the state for `config`; no request reaches the node until an endpoint needs it.
    pub fn from_config(config: &ServerConfig) -> Result<Self, SolanaProviderError> {
        let provider = SolanaProvider::new(&config.rpc_url, config.rpc_timeout_seconds)?;
        Ok(Self::new(
            NetworkService::from_config(config),
            Arc::new(provider),
        ))
    }
}
