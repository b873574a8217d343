// File: src/error.rs
// Error taxonomy for lookups, external sources and the static catalogs

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Operation-level failures of the mint lookup.
///
/// Only configuration and not-found problems abort a lookup. Failures of
/// individual external calls are absorbed where they happen.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Missing required API keys: {0}")]
    Configuration(String),

    #[error("Block not found")]
    NotFound(u64),

    #[error("Invalid block index: {0}")]
    InvalidIndex(String),

    #[error("Failed to search mint information")]
    Catalog(#[from] CatalogError),
}

impl LookupError {
    pub fn status(&self) -> StatusCode {
        match self {
            LookupError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LookupError::NotFound(_) => StatusCode::NOT_FOUND,
            LookupError::InvalidIndex(_) => StatusCode::BAD_REQUEST,
            LookupError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(target: "magic_mint::web", error = ?self, "Lookup failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Failure of a single call to an external source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("{provider} rejected the request: {message}")]
    Rejected {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} refused input: {message}")]
    InvalidInput {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} is not configured: {message}")]
    NotConfigured {
        provider: &'static str,
        message: String,
    },
}

/// Problems reading the static block catalog or cached mint table
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate catalog index {0}")]
    DuplicateIndex(u64),

    #[error("block {index} has a malformed hash {hash:?}")]
    InvalidHash { index: u64, hash: String },
}
