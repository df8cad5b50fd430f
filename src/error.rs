//! Error types for conversion and configuration.

use thiserror::Error;

/// Errors surfaced by [`crate::convert`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    /// The target name is not one of the registered formats
    #[error("unknown format `{0}`, expected one of: markdown, asciidoc, latex")]
    UnknownFormat(String),
}

/// Errors raised while reading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
