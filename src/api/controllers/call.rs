//! # Call Controller
//!
//! Forwards allow-listed JSON-RPC methods to the node.

use actix_web::HttpResponse;

use crate::{
    models::{ApiError, AppState, CallRequest},
    services::SolanaProviderTrait,
};

pub async fn call<P: SolanaProviderTrait>(
    request: CallRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.call.call(request).await?;
    Ok(HttpResponse::Ok().json(response))
}
