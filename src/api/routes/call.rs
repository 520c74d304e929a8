//! This module defines the HTTP route of the JSON-RPC passthrough.
use crate::{
    api::controllers::call,
    models::{AppState, CallRequest},
};
use actix_web::{post, web, Responder};

/// Invokes an allow-listed Solana JSON-RPC method.
#[post("/call")]
async fn call_method(request: web::Json<CallRequest>, data: web::Data<AppState>) -> impl Responder {
    call::call(request.into_inner(), data.get_ref()).await
}

/// Initializes the routes for the call module.
pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(call_method);
}
