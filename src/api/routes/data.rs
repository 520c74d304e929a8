//! This module defines the HTTP routes for confirmed chain data.
use crate::{
    api::controllers::data,
    models::{AccountBalanceRequest, AppState, BlockRequest, BlockTransactionRequest},
};
use actix_web::{post, web, Responder};

/// Returns a block with every transaction rendered as operations.
#[post("/block")]
async fn block(request: web::Json<BlockRequest>, state: web::Data<AppState>) -> impl Responder {
    data::block(request.into_inner(), state.get_ref()).await
}

#[post("/block/transaction")]
async fn block_transaction(
    request: web::Json<BlockTransactionRequest>,
    state: web::Data<AppState>,
) -> impl Responder {
    data::block_transaction(request.into_inner(), state.get_ref()).await
}

/// Returns native and SPL Token balances at the latest slot.
#[post("/account/balance")]
async fn account_balance(
    request: web::Json<AccountBalanceRequest>,
    state: web::Data<AppState>,
) -> impl Responder {
    data::account_balance(request.into_inner(), state.get_ref()).await
}

/// Initializes the routes for the data module.
pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(block);
    cfg.service(block_transaction);
    cfg.service(account_balance);
}
