//! # Data Controller
//!
//! Handles the `/block`, `/block/transaction` and `/account/balance` endpoints.

use actix_web::HttpResponse;

use crate::{
    models::{AccountBalanceRequest, ApiError, AppState, BlockRequest, BlockTransactionRequest},
    services::SolanaProviderTrait,
};

pub async fn block<P: SolanaProviderTrait>(
    request: BlockRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.data.block(request).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn block_transaction<P: SolanaProviderTrait>(
    request: BlockTransactionRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.data.block_transaction(request).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn account_balance<P: SolanaProviderTrait>(
    request: AccountBalanceRequest,
    state: &AppState<P>,
) -> Result<HttpResponse, ApiError> {
    let response = state.data.account_balance(request).await?;
    Ok(HttpResponse::Ok().json(response))
}
