//! Error types for tonetrim.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TonetrimError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Input errors
    #[error("Unsupported audio input {path}: {message}")]
    UnsupportedFormat { path: String, message: String },

    #[error("Audio read failed: {message}")]
    AudioRead { message: String },

    // Output errors
    #[error("Audio write failed: {message}")]
    AudioWrite { message: String },

    #[error("Audio playback failed: {message}")]
    Playback { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TonetrimError>;
