//! # Construction Controller
//!
//! Handles the `/construction/*` endpoints. Each handler delegates to the
//! construction service and renders its result as JSON.

use actix_web::HttpResponse;

use crate::{
    models::{
        ApiError, AppState, ConstructionCombineRequest, ConstructionDeriveRequest,
        ConstructionHashRequest, ConstructionMetadataRequest, ConstructionParseRequest,
        ConstructionPayloadsRequest, ConstructionPreprocessRequest, ConstructionSubmitRequest,
    },
    services::SolanaProviderTrait,
};

pub async fn derive<P: SolanaProviderTrait>(
    request: ConstructionDeriveRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.construction.derive(request)?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn preprocess<P: SolanaProviderTrait>(
    request: ConstructionPreprocessRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.construction.preprocess(request)?;
    Ok(HttpResponse::Ok().json(response))
}

/// Fetches block hash or nonce state, fees and token accounts from the node.
pub async fn metadata<P: SolanaProviderTrait>(
    request: ConstructionMetadataRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.construction.metadata(request).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn payloads<P: SolanaProviderTrait>(
    request: ConstructionPayloadsRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.construction.payloads(request)?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn combine<P: SolanaProviderTrait>(
    request: ConstructionCombineRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.construction.combine(request)?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn hash<P: SolanaProviderTrait>(
    request: ConstructionHashRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.construction.hash(request)?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn parse<P: SolanaProviderTrait>(
    request: ConstructionParseRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.construction.parse(request)?;
    Ok(HttpResponse::Ok().json(response))
}

/// Broadcasts a signed transaction.
pub async fn submit<P: SolanaProviderTrait>(
    request: ConstructionSubmitRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.construction.submit(request).await?;
    Ok(HttpResponse::Ok().json(response))
}
