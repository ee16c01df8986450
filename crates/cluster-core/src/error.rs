//! Error types for frames, transports and configuration.

use core::fmt;

/// A CAN frame could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Identifier does not fit in 11 bits
    #[error("CAN identifier 0x{0:X} exceeds the 11-bit range")]
    IdentifierOutOfRange(u32),

    /// Payload longer than a classic CAN frame
    #[error("CAN payload of {0} bytes exceeds 8")]
    PayloadTooLong(usize),
}

/// A transport refused or failed to deliver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Controller transmit queue is full
    #[error("transmit queue full")]
    QueueFull,

    /// Driver-specific failure
    #[error("transport driver error: {0}")]
    Driver(String),
}

impl TransportError {
    /// Wrap a driver error with its display text.
    pub fn driver(context: impl fmt::Display) -> Self {
        TransportError::Driver(context.to_string())
    }

    /// A later attempt may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::QueueFull)
    }
}

/// Configuration could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Platform name not recognised
    #[error("unknown platform '{0}'")]
    UnknownPlatform(String),

    /// A value is outside what the platform accepts
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        assert_eq!(
            FrameError::IdentifierOutOfRange(0x800).to_string(),
            "CAN identifier 0x800 exceeds the 11-bit range"
        );
        assert_eq!(
            ConfigError::UnknownPlatform("e30".into()).to_string(),
            "unknown platform 'e30'"
        );
    }

    #[test]
    fn only_queue_full_is_transient() {
        assert!(TransportError::QueueFull.is_transient());
        assert!(!TransportError::driver("bus off").is_transient());
    }
}
