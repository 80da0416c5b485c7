// MIT License - Copyright (c) 2026 Peter Wright
// Error types

use crate::sensors::SensorState;

/// All errors that can occur in the simon-says library.
#[derive(Debug, thiserror::Error)]
pub enum SimonError {
    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("Invalid timestamp '{value}': {reason}")]
    TimestampParse { value: String, reason: String },

    #[error("Unknown event code: {code:03}")]
    UnknownCode { code: u16 },

    #[error("Invalid field kind '{kind}' for code {code:03} (expected zone or user)")]
    InvalidCodeKind { code: u16, kind: String },

    #[error("Event record found before {field} header")]
    MissingHeader { field: &'static str },

    #[error("Sensor {number} already exists")]
    DuplicateSensor { number: u32 },

    #[error("Sensor {number} not found")]
    SensorNotFound { number: u32 },

    #[error("Sensor {number} cannot be bypassed while {from}")]
    InvalidTransition { number: u32, from: SensorState },

    #[error("Event with uid {uid} already in store")]
    DuplicateUid { uid: String },

    #[error("Event with uid {uid} not found")]
    EventNotFound { uid: String },

    #[error("Invalid action: {action}")]
    InvalidAction { action: String },

    #[error("Invalid access code (must be 1-8 digits)")]
    InvalidAccessCode,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SimonError {
    /// Whether this error was caused by the content of a report rather than
    /// by the environment. A report that fails this way will fail the same
    /// way on every retry.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            SimonError::UnsupportedProtocol { .. }
                | SimonError::TimestampParse { .. }
                | SimonError::UnknownCode { .. }
                | SimonError::InvalidCodeKind { .. }
                | SimonError::MissingHeader { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SimonError>;
