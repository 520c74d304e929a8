use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ConstructionError;

/// Error body returned by every Rosetta endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosettaError {
    pub code: u32,
    pub message: String,
    pub retriable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("Internal Server Error: {0}")]
    InternalError(String),
}

impl ResponseError for ApiError {
    // Rosetta clients expect every error as a 500 carrying a structured body.
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Construction(err) => {
                HttpResponse::InternalServerError().json(RosettaError::from(err))
            }
            ApiError::InternalError(msg) => HttpResponse::InternalServerError().json(RosettaError {
                code: 0,
                message: format!("Internal Server Error: {msg}"),
                retriable: false,
                details: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_rt::test]
    async fn test_construction_error_renders_rosetta_body() {
        let error = ApiError::from(ConstructionError::UnclearIntent("missing credit".into()));
        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let rendered: RosettaError = serde_json::from_slice(&body).unwrap();
        assert_eq!(rendered.code, 3);
        assert_eq!(rendered.message, "Unable to parse intent");
        assert!(!rendered.retriable);
    }

    #[actix_rt::test]
    async fn test_internal_error_renders_code_zero() {
        let response = ApiError::InternalError("boom".into()).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let rendered: RosettaError = serde_json::from_slice(&body).unwrap();
        assert_eq!(rendered.code, 0);
        assert!(rendered.message.contains("boom"));
    }
}
