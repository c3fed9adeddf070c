//! Error types for the driver
//!
//! This module defines error types for configuration building ([`BuilderError`])
//! and display operations ([`Error`]).
//!
//! ## Error Types
//!
//! - [`BuilderError`] - Errors during configuration construction
//! - [`Error`] - Runtime errors during display operations
//!
//! Out-of-range cell coordinates are programming errors and panic instead of
//! returning an error. Text of the wrong length is normalized, never rejected.
//!
//! ## Example
//!
//! ```
//! use lcd2004::{Builder, BuilderError};
//!
//! // Not a 7-bit address
//! let result = Builder::new().address(0x9C).build();
//! assert!(matches!(result, Err(BuilderError::InvalidAddress(0x9C))));
//!
//! // Shorter than the controller's clear execution time
//! let result = Builder::new().clear_us(500).build();
//! assert!(result.is_err());
//! ```

use crate::interface::DisplayInterface;

/// Errors that can occur when interacting with the display
///
/// Generic over the interface type to preserve the specific error type.
/// This allows error handling code to match on the underlying bus error.
#[derive(Debug)]
pub enum Error<I: DisplayInterface> {
    /// Interface error (I2C NACK, arbitration loss, bus timeout)
    ///
    /// Wraps the underlying transport error from the [`DisplayInterface`]
    /// implementation. The controller may be left mid-byte; run
    /// [`Display::recover`](crate::Display::recover) before continuing.
    Interface(I::Error),
    /// Configuration rejected before anything was sent
    Config(BuilderError),
}

impl<I: DisplayInterface> core::fmt::Display for Error<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Interface(e) => write!(f, "Interface error: {e:?}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl<I: DisplayInterface> From<BuilderError> for Error<I> {
    fn from(e: BuilderError) -> Self {
        Self::Config(e)
    }
}

impl<I: DisplayInterface + core::fmt::Debug> core::error::Error for Error<I> {}

/// Errors that can occur when building configuration
///
/// These errors occur during the builder pattern before the display is created.
#[derive(Debug, PartialEq, Eq)]
pub enum BuilderError {
    /// Address does not fit in 7 bits
    InvalidAddress(u8),
    /// A command delay is shorter than the controller needs
    ///
    /// Issuing the next instruction early corrupts controller state.
    DelayTooShort {
        /// Minimum delay in microseconds
        required: u32,
        /// Configured delay in microseconds
        provided: u32,
    },
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidAddress(address) => {
                write!(f, "Invalid I2C address {address:#04x} (must be 7-bit)")
            }
            Self::DelayTooShort { required, provided } => write!(
                f,
                "Delay too short: required {required}us, provided {provided}us"
            ),
        }
    }
}

impl core::error::Error for BuilderError {}
