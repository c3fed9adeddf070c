//! Hardware interface abstraction
//!
//! This module provides the [`DisplayInterface`] trait and the [`Interface`] struct
//! for talking to an HD44780 controller through an 8-bit I2C port expander
//! (the PCF8574 "backpack" found on most 20x4 modules).
//!
//! ## Hardware Requirements
//!
//! Only four of the controller's data lines are wired. The expander's output
//! port maps to the controller as follows:
//!
//! | Bit | Signal                         |
//! |-----|--------------------------------|
//! | 0   | RS (register select)           |
//! | 1   | RW (always low, write only)    |
//! | 2   | EN (enable strobe)             |
//! | 3   | Backlight                      |
//! | 4-7 | D4-D7                          |
//!
//! A byte therefore travels as two nibbles, high first. Each nibble is
//! presented on the port and latched by pulsing EN high then low, so one byte
//! costs six bus writes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
//! use lcd2004::{DisplayInterface, Interface, Mode};
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
//! let mut interface = Interface::new(MockI2c, 0x27);
//!
//! // Write the character 'A' at the current DDRAM address
//! let _ = interface.send(b'A', Mode::Data);
//!
//! // Turn the backlight off (takes effect on the next bus write)
//! interface.set_backlight(false);
//! ```

use core::fmt::Debug;
use embedded_hal::i2c::I2c;

type InterfaceResult<T, E> = core::result::Result<T, E>;

/// Register select bit (P0)
pub const REGISTER_SELECT: u8 = 0x01;
/// Read/write bit (P1), held low
pub const READ_WRITE: u8 = 0x02;
/// Enable strobe bit (P2)
pub const ENABLE: u8 = 0x04;
/// Backlight bit (P3)
pub const BACKLIGHT: u8 = 0x08;
/// Data lines D4-D7 (P4-P7)
pub const DATA_MASK: u8 = 0xF0;

/// Default I2C address of PCF8574-based backpacks
pub const DEFAULT_ADDRESS: u8 = 0x27;

/// Register targeted by a byte transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// Instruction register (RS low)
    Command = 0x00,
    /// Data register (RS high)
    Data = REGISTER_SELECT,
}

/// Trait for the 4-bit transport to an HD44780 controller
///
/// This trait abstracts over the wiring between the host and the controller,
/// allowing the [`Display`](crate::display::Display) to work with any
/// transport that can present a nibble and strobe it in.
///
/// ## Implementing
///
/// For the usual I2C backpack, use the provided [`Interface`] struct. Only
/// [`write4bits`](DisplayInterface::write4bits) and the backlight accessors
/// need implementing; [`send`](DisplayInterface::send) is provided.
pub trait DisplayInterface {
    /// Error type for interface operations
    ///
    /// Must implement [`Debug`] for error reporting.
    type Error: Debug;

    /// Present one nibble and latch it
    ///
    /// `bits` carries the nibble in its upper four bits; the lower four are
    /// ignored. The implementation must:
    /// 1. Put the nibble and RS (from `mode`) on the port with EN low
    /// 2. Raise EN
    /// 3. Drop EN (the controller latches on this falling edge)
    ///
    /// The persistent backlight state is merged into every write.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged. The controller is then in an
    /// unknown nibble phase; no retry is attempted.
    #[allow(clippy::type_complexity)]
    fn write4bits(&mut self, bits: u8, mode: Mode) -> InterfaceResult<(), Self::Error>;

    /// Send a full byte as two nibbles, high nibble first
    ///
    /// # Errors
    ///
    /// Returns the first transport error. A failure between the two nibbles
    /// leaves the controller expecting the second half.
    #[allow(clippy::type_complexity)]
    fn send(&mut self, byte: u8, mode: Mode) -> InterfaceResult<(), Self::Error> {
        self.write4bits(byte & DATA_MASK, mode)?;
        self.write4bits((byte << 4) & DATA_MASK, mode)
    }

    /// Set the persistent backlight bit
    ///
    /// Nothing is written to the bus; the new state rides along with the
    /// next write.
    fn set_backlight(&mut self, on: bool);

    /// Current backlight bit
    fn backlight(&self) -> bool;
}

/// I2C backpack interface for HD44780 controllers
///
/// Implements [`DisplayInterface`] for an embedded-hal v1.0 [`I2c`] bus.
///
/// ## Example
///
/// ```rust,no_run
/// use lcd2004::{Config, Display, Interface};
/// # use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
/// # struct MockI2c;
/// # impl ErrorType for MockI2c { type Error = ErrorKind; }
/// # impl I2c for MockI2c {
/// #     fn transaction(
/// #         &mut self,
/// #         _address: u8,
/// #         _operations: &mut [Operation<'_>],
/// #     ) -> Result<(), Self::Error> {
/// #         Ok(())
/// #     }
/// # }
/// let interface = Interface::new(MockI2c, 0x27);
///
/// // Use with Display
/// let _display = Display::new(interface, Config::default());
/// ```
#[derive(Debug)]
pub struct Interface<I2C> {
    /// I2C bus
    i2c: I2C,
    /// 7-bit device address of the expander
    address: u8,
    /// Backlight bit OR'd into every write
    backlight: bool,
}

impl<I2C> Interface<I2C>
where
    I2C: I2c,
{
    /// Create a new Interface with the backlight on
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            backlight: true,
        }
    }

    /// 7-bit device address of the expander
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release the underlying bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Write the port, merging in the backlight bit
    fn write(&mut self, bits: u8) -> InterfaceResult<(), I2C::Error> {
        let backlight = if self.backlight { BACKLIGHT } else { 0 };
        self.i2c.write(self.address, &[bits | backlight])
    }

    /// Strobe EN while holding the other lines steady
    fn pulse_enable(&mut self, bits: u8) -> InterfaceResult<(), I2C::Error> {
        self.write(bits | ENABLE)?;
        self.write(bits & !ENABLE)
    }
}

impl<I2C> DisplayInterface for Interface<I2C>
where
    I2C: I2c,
{
    type Error = I2C::Error;

    fn write4bits(&mut self, bits: u8, mode: Mode) -> InterfaceResult<(), Self::Error> {
        let bits = (bits & DATA_MASK) | mode as u8;
        self.write(bits)?;
        self.pulse_enable(bits)
    }

    fn set_backlight(&mut self, on: bool) {
        self.backlight = on;
    }

    fn backlight(&self) -> bool {
        self.backlight
    }
}
