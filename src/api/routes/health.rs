//! Liveness endpoint.
//!
//! `GET /health` answers from configuration alone, so it stays up offline and
//! while the Solana node is unreachable.
use actix_web::{get, web, HttpResponse};
use serde_json::json;

use crate::models::AppState;

/// Reports that the server is up and which network it serves.
#[get("/health")]
async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "network_identifier": state.network.identifier(),
    }))
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
}
