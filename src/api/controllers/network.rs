//! # Network Controller
//!
//! Handles the `/network/list`, `/network/options` and `/network/status` endpoints.

use actix_web::HttpResponse;

use crate::{
    models::{ApiError, AppState, NetworkRequest},
    services::SolanaProviderTrait,
};

/// Lists the single network this instance serves.
pub async fn list_networks<P: SolanaProviderTrait>(
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.network.list()))
}

/// Versions, operation types, statuses, errors and call methods of the network.
pub async fn network_options<P: SolanaProviderTrait>(
    request: NetworkRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let options = state.network.options(&request.network_identifier)?;
    Ok(HttpResponse::Ok().json(options))
}

/// Latest block, genesis block and peers as seen by the node.
pub async fn network_status<P: SolanaProviderTrait>(
    request: NetworkRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let status = state.data.network_status(request).await?;
    Ok(HttpResponse::Ok().json(status))
}
