// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::address::{AddressError, AmountError};
use crate::chain::ChainError;
use crate::signature::SignatureError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Backend unavailable: missing {}", .0.join(", "))]
    BackendUnavailable(Vec<&'static str>),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<SignatureError> for ApiError {
    fn from(e: SignatureError) -> Self {
        ApiError::Unauthorized(e.to_string())
    }
}

impl From<AddressError> for ApiError {
    fn from(e: AddressError) -> Self {
        ApiError::BadRequest(format!("Invalid address: {}", e))
    }
}

impl From<AmountError> for ApiError {
    fn from(e: AmountError) -> Self {
        ApiError::BadRequest(format!("Invalid amount: {}", e))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BackendUnavailable(_)
            | ApiError::Store(_)
            | ApiError::Chain(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::MissingFields(fields) => json!({
                "error": "Missing required fields",
                "missing": fields,
            }),
            ApiError::BackendUnavailable(settings) => json!({
                "error": "Database not configured",
                "missing": settings,
            }),
            ApiError::Store(e) => {
                error!("Database error: {}", e);
                json!({ "error": "Database error" })
            }
            ApiError::Chain(e) => {
                error!("Chain error: {}", e);
                json!({ "error": e.to_string() })
            }
            ApiError::Internal(e) => {
                error!("System error: {:?}", e);
                json!({ "error": "Something went wrong" })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Collects the names of absent fields so a handler can report all of them at once
#[derive(Debug, Default)]
pub struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a present, non-blank value or record `name` as missing
    pub fn take(&mut self, name: &'static str, value: Option<String>) -> String {
        match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::MissingFields(self.missing))
        }
    }
}
