//! Errors surfaced by the command line tool.

/// Top-level error for the `idset` binary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The library rejected an input buffer or value
    #[error("idset error: {0}")]
    Idset(#[from] idset::Error),

    /// An argument was not valid hex
    #[error("invalid hex input: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The result could not be rendered as JSON
    #[error("could not serialize output: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration could not be loaded or failed validation
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A GLOBCNT argument was not a decimal integer
    #[error("invalid GLOBCNT value '{0}': expected a decimal integer")]
    InvalidValue(String),
}
