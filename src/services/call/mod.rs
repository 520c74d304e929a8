//! `/call`: JSON-RPC passthrough restricted to an allow-list of methods.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    constants::CALL_METHODS,
    models::{CallRequest, CallResponse, ConstructionError, ObjectMap},
    services::{network::NetworkService, provider::SolanaProviderTrait},
};

/// Key of the forwarded parameters inside `parameters`.
const PARAM_KEY: &str = "param";

/// Static name of an allow-listed method.
fn allowed_method(method: &str) -> Option<&'static str> {
    CALL_METHODS.iter().copied().find(|allowed| *allowed == method)
}

/// JSON-RPC params for the request: arrays as-is, scalars wrapped, absent as `[]`.
fn rpc_params(parameters: &ObjectMap) -> Value {
    match parameters.get(PARAM_KEY) {
        None | Some(Value::Null) => Value::Array(Vec::new()),
        Some(Value::Array(values)) => Value::Array(values.clone()),
        Some(other) => Value::Array(vec![other.clone()]),
    }
}

fn into_result(value: Value) -> ObjectMap {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = ObjectMap::new();
            map.insert("result".to_string(), other);
            map
        }
    }
}

pub struct CallService<P> {
    network: NetworkService,
    provider: Arc<P>,
}

impl<P: SolanaProviderTrait> CallService<P> {
    pub fn new(network: NetworkService, provider: Arc<P>) -> Self {
        Self { network, provider }
    }

    pub async fn call(&self, request: CallRequest) -> Result<CallResponse, ConstructionError> {
        self.network.validate(&request.network_identifier)?;
        self.network.require_online()?;

        let method = allowed_method(&request.method)
            .ok_or_else(|| ConstructionError::CallMethodNotAllowed(request.method.clone()))?;
        log::debug!("forwarding {method} to the node");

        let value = self
            .provider
            .raw_request(method, rpc_params(&request.parameters))
            .await
            .map_err(|e| {
                log::warn!("call {method} failed: {e}");
                ConstructionError::upstream(e)
            })?;

        Ok(CallResponse {
            result: into_result(value),
            idempotent: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::NetworkKind,
        models::NetworkIdentifier,
        services::provider::{MockSolanaProviderTrait, SolanaProviderError},
    };
    use serde_json::json;

    fn request(method: &str, parameters: Value) -> CallRequest {
        CallRequest {
            network_identifier: NetworkIdentifier {
                blockchain: "solana".to_string(),
                network: "devnet".to_string(),
            },
            method: method.to_string(),
            parameters: parameters.as_object().cloned().unwrap_or_default(),
        }
    }

    fn service(
        provider: MockSolanaProviderTrait,
        offline: bool,
    ) -> CallService<MockSolanaProviderTrait> {
        CallService::new(
            NetworkService::new(NetworkKind::Devnet, offline),
            Arc::new(provider),
        )
    }

    #[test]
    fn test_rpc_params_shapes() {
        assert_eq!(rpc_params(&ObjectMap::new()), json!([]));
        let params = json!({"param": ["a", {"encoding": "json"}]});
        assert_eq!(
            rpc_params(params.as_object().unwrap()),
            json!(["a", {"encoding": "json"}])
        );
        let params = json!({"param": "address"});
        assert_eq!(rpc_params(params.as_object().unwrap()), json!(["address"]));
    }

    #[tokio::test]
    async fn test_scalar_result_is_wrapped() {
        let mut provider = MockSolanaProviderTrait::new();
        provider
            .expect_raw_request()
            .withf(|method, params| method.to_string() == "getSlot" && *params == json!([]))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(json!(42)) }));

        let response = service(provider, false)
            .call(request("getSlot", json!({})))
            .await
            .unwrap();
        assert_eq!(response.result["result"], json!(42));
        assert!(!response.idempotent);
    }

    #[tokio::test]
    async fn test_object_result_is_returned_as_is() {
        let mut provider = MockSolanaProviderTrait::new();
        provider
            .expect_raw_request()
            .withf(|method, params| method.to_string() == "getBalance" && *params == json!(["addr"]))
            .returning(|_, _| {
                Box::pin(async { Ok(json!({"context": {"slot": 1}, "value": 10})) })
            });

        let response = service(provider, false)
            .call(request("getBalance", json!({"param": "addr"})))
            .await
            .unwrap();
        assert_eq!(response.result["value"], json!(10));
        assert!(response.result.get("result").is_none());
    }

    #[tokio::test]
    async fn test_method_outside_allow_list() {
        let mut provider = MockSolanaProviderTrait::new();
        provider.expect_raw_request().never();

        let result = service(provider, false)
            .call(request("setLogFilter", json!({})))
            .await;
        assert!(matches!(
            result,
            Err(ConstructionError::CallMethodNotAllowed(m)) if m == "setLogFilter"
        ));
    }

    #[tokio::test]
    async fn test_offline_never_reaches_node() {
        let mut provider = MockSolanaProviderTrait::new();
        provider.expect_raw_request().never();

        let result = service(provider, true)
            .call(request("getSlot", json!({})))
            .await;
        assert_eq!(result, Err(ConstructionError::UnavailableOffline));
    }

    #[tokio::test]
    async fn test_node_error_is_upstream() {
        let mut provider = MockSolanaProviderTrait::new();
        provider.expect_raw_request().returning(|_, _| {
            Box::pin(async { Err(SolanaProviderError::NetworkError("refused".to_string())) })
        });

        let result = service(provider, false)
            .call(request("getSlot", json!({})))
            .await;
        assert!(matches!(
            result,
            Err(ConstructionError::UpstreamRpc {
                retriable: true,
                ..
            })
        ));
    }
}
