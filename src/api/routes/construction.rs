//! This module defines the HTTP routes of the construction flow.
//! Every route is a JSON `POST` delegating to the construction controller.
use crate::{
    api::controllers::construction,
    models::{
        AppState, ConstructionCombineRequest, ConstructionDeriveRequest, ConstructionHashRequest,
        ConstructionMetadataRequest, ConstructionParseRequest, ConstructionPayloadsRequest,
        ConstructionPreprocessRequest, ConstructionSubmitRequest,
    },
};
use actix_web::{post, web, Responder};

/// Derives an address from a public key.
#[post("/construction/derive")]
async fn derive(
    request: web::Json<ConstructionDeriveRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    construction::derive(request.into_inner(), data.get_ref()).await
}

/// Resolves operations into the options needed to fetch metadata.
#[post("/construction/preprocess")]
async fn preprocess(
    request: web::Json<ConstructionPreprocessRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    construction::preprocess(request.into_inner(), data.get_ref()).await
}

/// Fetches the online state required to build a transaction.
#[post("/construction/metadata")]
async fn metadata(
    request: web::Json<ConstructionMetadataRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    construction::metadata(request.into_inner(), data.get_ref()).await
}

/// Builds the unsigned transaction and its signing payloads.
#[post("/construction/payloads")]
async fn payloads(
    request: web::Json<ConstructionPayloadsRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    construction::payloads(request.into_inner(), data.get_ref()).await
}

/// Places signatures into an unsigned transaction.
#[post("/construction/combine")]
async fn combine(
    request: web::Json<ConstructionCombineRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    construction::combine(request.into_inner(), data.get_ref()).await
}

/// Returns the identifier of a signed transaction.
#[post("/construction/hash")]
async fn hash(
    request: web::Json<ConstructionHashRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    construction::hash(request.into_inner(), data.get_ref()).await
}

/// Decodes a transaction back into operations.
#[post("/construction/parse")]
async fn parse(
    request: web::Json<ConstructionParseRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    construction::parse(request.into_inner(), data.get_ref()).await
}

/// Broadcasts a signed transaction.
#[post("/construction/submit")]
async fn submit(
    request: web::Json<ConstructionSubmitRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    construction::submit(request.into_inner(), data.get_ref()).await
}

/// Initializes the routes for the construction module.
pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(derive);
    cfg.service(preprocess);
    cfg.service(metadata);
    cfg.service(payloads);
    cfg.service(combine);
    cfg.service(hash);
    cfg.service(parse);
    cfg.service(submit);
}
