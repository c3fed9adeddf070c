//! 20x4 Character LCD Driver
//!
//! A driver for HD44780-compatible 20x4 character displays wired through an
//! 8-bit I2C port expander (PCF8574 backpack), with a minimal-diff refresh
//! engine.
//!
//! ## Features
//!
//! - `no_std` compatible, no allocator required
//! - `embedded-hal` v1.0 support
//! - In-memory mirror of display RAM; only changed cells are rewritten
//! - Typed instruction encoder for the full HD44780 command set
//! - Configurable controller timing
//!
//! ## How Refresh Works
//!
//! [`Display::set_row`] compares the new text against the mirror and queues
//! only the cells that differ. [`Display::refresh`] then sends, for each queued
//! cell, one set-DDRAM-address instruction and one data byte. Updating a
//! counter from `0099` to `0100` costs three cell writes, not eighty.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
//! use lcd2004::{Builder, Display, Interface};
//!
//! # struct MockI2c;
//! # impl ErrorType for MockI2c { type Error = ErrorKind; }
//! # impl I2c for MockI2c {
//! #     fn transaction(
//! #         &mut self,
//! #         _address: u8,
//! #         _operations: &mut [Operation<'_>],
//! #     ) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! # }
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let i2c = MockI2c;
//! # let mut delay = MockDelay;
//! let config = match Builder::new().address(0x27).build() {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//! let interface = Interface::new(i2c, config.address);
//!
//! let mut display = Display::new(interface, config);
//! let _ = display.init(&mut delay);
//!
//! display.set_row(0, "Temp: 21.5C", false);
//! display.set_row(1, "Fan:  auto", false);
//! let _ = display.refresh();
//!
//! // Only the changed digits go out
//! display.set_row(0, "Temp: 21.7C", false);
//! let _ = display.refresh();
//! ```

#![no_std]

#[cfg(test)]
extern crate alloc;
#[cfg(test)]
extern crate std;

/// HD44780 command definitions
pub mod command;
/// Display configuration types and builder
pub mod config;
/// Core display operations
pub mod display;
/// Error types for the driver
pub mod error;
/// Hardware interface abstraction
pub mod interface;
/// Display memory model
pub mod memory;

pub use config::{
    Builder, CLEAR_EXECUTION_TIME_US, ClearPolicy, Config, DEFAULT_CLEAR_US, DEFAULT_HOME_US,
    DEFAULT_POWER_ON_MS, Timing,
};
pub use display::{Display, InitState};
pub use error::{BuilderError, Error};
pub use interface::{DEFAULT_ADDRESS, DisplayInterface, Interface, Mode};
pub use memory::{COLS, Cell, ROW_ADDRESS, ROWS};
