//! This module defines the HTTP routes for network discovery.
use crate::{
    api::controllers::network,
    models::{AppState, MetadataRequest, NetworkRequest},
};
use actix_web::{post, web, Responder};

/// Lists the networks served by this instance.
#[post("/network/list")]
async fn list_networks(
    _request: web::Json<MetadataRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    network::list_networks(data.get_ref()).await
}

/// Describes the supported operation types, statuses, errors and call methods.
#[post("/network/options")]
async fn network_options(
    request: web::Json<NetworkRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    network::network_options(request.into_inner(), data.get_ref()).await
}

/// Reports the latest block, the genesis block and the node's peers.
#[post("/network/status")]
async fn network_status(
    request: web::Json<NetworkRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    network::network_status(request.into_inner(), data.get_ref()).await
}

/// Initializes the routes for the network module.
pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(list_networks);
    cfg.service(network_options);
    cfg.service(network_status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Mode, NetworkKind, ServerConfig},
        models::{NetworkListResponse, NetworkOptionsResponse},
    };
    use actix_web::{test, App};
    use serde_json::json;

    fn offline_state() -> web::Data<AppState> {
        let config = ServerConfig {
            mode: Mode::Offline,
            network: NetworkKind::Devnet,
            host: "127.0.0.1".to_string(),
            port: 8080,
            rpc_url: NetworkKind::Devnet.default_rpc_url().to_string(),
            rpc_timeout_seconds: 1,
        };
        web::Data::new(AppState::from_config(&config).unwrap())
    }

    #[actix_web::test]
    async fn test_network_list_route() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(init)).await;

        let req = test::TestRequest::post()
            .uri("/network/list")
            .set_json(json!({}))
            .to_request();
        let list: NetworkListResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.network_identifiers[0].blockchain, "solana");
        assert_eq!(list.network_identifiers[0].network, "devnet");
    }

    #[actix_web::test]
    async fn test_network_options_route() {
        let app = test::init_service(App::new().app_data(offline_state()).configure(init)).await;

        let req = test::TestRequest::post()
            .uri("/network/options")
            .set_json(json!({"network_identifier": {"blockchain": "solana", "network": "devnet"}}))
            .to_request();
        let options: NetworkOptionsResponse = test::call_and_read_body_json(&app, req).await;
        assert!(options
            .allow
            .operation_types
            .contains(&"Stake__CreateStakeAndDelegate".to_string()));
    }
}
