//! Error types for the ari_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ari_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure (connection refused, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// No token in client storage
    #[error("Token de autenticação não encontrado")]
    NotAuthenticated,

    /// Backend rejected the token (401/403)
    #[error("Não autorizado (HTTP {status}). Faça login novamente.")]
    Unauthorized { status: u16 },

    /// Any other non-success response
    #[error("Erro da API (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Token present but not decodable
    #[error("Token inválido: {0}")]
    InvalidToken(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record missing from the currently loaded list
    #[error("Registro {0} não encontrado")]
    NotFound(i64),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the failures that end the session (missing or rejected token)
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::NotAuthenticated | Error::Unauthorized { .. })
    }
}
