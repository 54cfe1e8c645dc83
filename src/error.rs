//! Error types for Booking Assist.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Business directory (snapshot provider) errors.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Failed to read business file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse business file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid business snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Directory backend unavailable: {0}")]
    Unavailable(String),
}

/// Customer-ledger errors. Every variant is a handled, reportable failure.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Airtable credentials not configured")]
    NotConfigured,

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors raised inside a pipeline step or run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Business not found")]
    BusinessNotFound { business_id: String },

    #[error("Failed to load business {business_id}: {reason}")]
    SnapshotUnavailable { business_id: String, reason: String },

    #[error("Date parsing failed: {0}")]
    DateParse(String),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
