//! Display configuration types and builder

pub use crate::error::BuilderError;
use crate::interface::DEFAULT_ADDRESS;

/// Power-on settle time before the first nibble, in milliseconds
pub const DEFAULT_POWER_ON_MS: u32 = 1_000;

/// Datasheet execution time of clear display and return home, in microseconds
///
/// Configured delays below this are rejected by [`Builder::build`].
pub const CLEAR_EXECUTION_TIME_US: u32 = 1_520;

/// Default wait after clear display, in microseconds
pub const DEFAULT_CLEAR_US: u32 = 10_000;

/// Default wait after return home, in microseconds
pub const DEFAULT_HOME_US: u32 = 10_000;

/// Character code written for chars that do not fit in one byte
pub const DEFAULT_SUBSTITUTE: u8 = b'?';

/// Controller timing
///
/// Every blocking delay the driver performs comes from here, so a panel
/// variant with slower execution times only needs different numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Wait after power-on before forcing 4-bit mode (ms)
    pub power_on_ms: u32,
    /// Wait after clear display (us)
    pub clear_us: u32,
    /// Wait after return home (us)
    pub home_us: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            power_on_ms: DEFAULT_POWER_ON_MS,
            clear_us: DEFAULT_CLEAR_US,
            home_us: DEFAULT_HOME_US,
        }
    }
}

/// What clear display does to the in-memory mirror
///
/// The controller fills DDRAM with spaces on clear. The mirror can follow it,
/// or be left alone as older drivers did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClearPolicy {
    /// Reset the mirror to all spaces so it matches the controller
    #[default]
    ResetMirror,
    /// Keep the last written text in the mirror
    ///
    /// Rewriting a row with unchanged text after a clear then writes nothing
    /// and the row stays blank on the panel.
    KeepMirror,
}

/// Display configuration
///
/// Use `Builder` to create a Config, or `Config::default()` for a standard
/// PCF8574 backpack at 0x27.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// 7-bit I2C address of the expander
    pub address: u8,
    /// Backlight state after initialization
    pub backlight: bool,
    /// Controller timing
    pub timing: Timing,
    /// Mirror handling on clear display
    pub clear_policy: ClearPolicy,
    /// Code written for chars outside 0..=255
    pub substitute: u8,
}

impl Config {
    /// Check the address and command delays
    ///
    /// # Errors
    ///
    /// Same as [`Builder::build`].
    pub fn validate(&self) -> Result<(), BuilderError> {
        if self.address > 0x7F {
            return Err(BuilderError::InvalidAddress(self.address));
        }
        for provided in [self.timing.clear_us, self.timing.home_us] {
            if provided < CLEAR_EXECUTION_TIME_US {
                return Err(BuilderError::DelayTooShort {
                    required: CLEAR_EXECUTION_TIME_US,
                    provided,
                });
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            backlight: true,
            timing: Timing::default(),
            clear_policy: ClearPolicy::default(),
            substitute: DEFAULT_SUBSTITUTE,
        }
    }
}

/// Builder for constructing display configuration
///
/// # Example
///
/// ```rust
/// use lcd2004::{Builder, ClearPolicy};
///
/// let config = match Builder::new()
///     .address(0x3F)
///     .clear_us(2_000)
///     .clear_policy(ClearPolicy::KeepMirror)
///     .build()
/// {
///     Ok(config) => config,
///     Err(_) => return,
/// };
/// assert_eq!(config.address, 0x3F);
/// ```
#[must_use]
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the I2C address of the expander
    pub fn address(mut self, address: u8) -> Self {
        self.config.address = address;
        self
    }

    /// Set the backlight state applied at initialization
    pub fn backlight(mut self, on: bool) -> Self {
        self.config.backlight = on;
        self
    }

    /// Set all timing values at once
    pub fn timing(mut self, timing: Timing) -> Self {
        self.config.timing = timing;
        self
    }

    /// Set the power-on settle time in milliseconds
    pub fn power_on_ms(mut self, ms: u32) -> Self {
        self.config.timing.power_on_ms = ms;
        self
    }

    /// Set the wait after clear display in microseconds
    pub fn clear_us(mut self, us: u32) -> Self {
        self.config.timing.clear_us = us;
        self
    }

    /// Set the wait after return home in microseconds
    pub fn home_us(mut self, us: u32) -> Self {
        self.config.timing.home_us = us;
        self
    }

    /// Set how clear display treats the mirror
    pub fn clear_policy(mut self, policy: ClearPolicy) -> Self {
        self.config.clear_policy = policy;
        self
    }

    /// Set the substitute code for unrepresentable chars
    pub fn substitute(mut self, code: u8) -> Self {
        self.config.substitute = code;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidAddress` if the address does not fit in
    /// 7 bits, and `BuilderError::DelayTooShort` if the clear or home delay is
    /// below [`CLEAR_EXECUTION_TIME_US`].
    pub fn build(self) -> Result<Config, BuilderError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
