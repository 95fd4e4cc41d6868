use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::{LedgerError, PageError, TradeError};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NoOpenPosition { .. } => ApiError::Conflict(err.to_string()),
            LedgerError::MarketCapUnavailable { .. } | LedgerError::InvalidAmount(_) => {
                ApiError::BadRequest(err.to_string())
            }
            LedgerError::Arithmetic(_) | LedgerError::Store(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl From<PageError> for ApiError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::Missing { .. } => ApiError::NotFound(err.to_string()),
            PageError::Fetch { .. } | PageError::Status { .. } => {
                ApiError::BadGateway(err.to_string())
            }
        }
    }
}

impl From<TradeError> for ApiError {
    fn from(err: TradeError) -> Self {
        match err {
            TradeError::MissingMint | TradeError::ResetNotConfirmed => {
                ApiError::BadRequest(err.to_string())
            }
            TradeError::Ledger(e) => e.into(),
            TradeError::Page(e) => e.into(),
        }
    }
}
