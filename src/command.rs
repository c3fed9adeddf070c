//! HD44780 command definitions
//!
//! This module defines the instruction set of the HD44780 character LCD
//! controller and pure encoder functions that turn a logical command and its
//! flags into the single control byte the controller expects.
//!
//! ## Command Structure
//!
//! Every instruction is one byte. The highest set bit selects the
//! instruction and the bits below it carry its parameters:
//!
//! | Instruction            | Select bit | Parameters                  |
//! |------------------------|------------|-----------------------------|
//! | Clear display          | `0x01`     | none                        |
//! | Return home            | `0x02`     | none                        |
//! | Entry mode set         | `0x04`     | direction, display shift    |
//! | Display control        | `0x08`     | display, cursor, blink      |
//! | Cursor/display shift   | `0x10`     | target, direction           |
//! | Function set           | `0x20`     | bit mode, lines, font       |
//! | Set CGRAM address      | `0x40`     | 6-bit address               |
//! | Set DDRAM address      | `0x80`     | 7-bit address               |
//!
//! Instructions are sent with RS low ([`Mode::Command`](crate::Mode::Command)).
//!
//! ## Example
//!
//! ```
//! use lcd2004::command::{self, Blink, Cursor, Power};
//!
//! assert_eq!(command::clear_display(), 0x01);
//! assert_eq!(command::display_control(Power::On, Cursor::Hidden, Blink::Off), 0x0C);
//! assert_eq!(command::set_ddram_address(0x14), 0x94);
//! ```

// Instruction select bits

/// Clear display instruction (0x01)
///
/// Fills DDRAM with spaces and resets the address counter to 0.
/// Takes up to 1.52ms to execute.
pub const CLEAR_DISPLAY: u8 = 0x01;

/// Return home instruction (0x02)
///
/// Resets the address counter and any display shift. DDRAM is untouched.
pub const RETURN_HOME: u8 = 0x02;

/// Entry mode set instruction (0x04)
pub const ENTRY_MODE: u8 = 0x04;

/// Display on/off control instruction (0x08)
pub const DISPLAY_CONTROL: u8 = 0x08;

/// Cursor or display shift instruction (0x10)
pub const CURSOR_SHIFT: u8 = 0x10;

/// Function set instruction (0x20)
pub const FUNCTION_SET: u8 = 0x20;

/// Set CGRAM address instruction (0x40)
///
/// Subsequent data writes go to character generator RAM.
pub const SET_CGRAM_ADDRESS: u8 = 0x40;

/// Set DDRAM address instruction (0x80)
///
/// Subsequent data writes go to display data RAM.
pub const SET_DDRAM_ADDRESS: u8 = 0x80;

/// Direction the address counter moves after a data write
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryDirection {
    /// Decrement the address counter (text runs right to left)
    Decrement = 0x00,
    /// Increment the address counter (text runs left to right)
    #[default]
    Increment = 0x02,
}

/// Whether the whole display shifts on each data write
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum DisplayShift {
    /// Display stays put
    #[default]
    Disabled = 0x00,
    /// Display shifts with every write
    Enabled = 0x01,
}

/// Display power
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Power {
    /// Display blanked, DDRAM retained
    Off = 0x00,
    /// Display visible
    #[default]
    On = 0x04,
}

/// Underline cursor visibility
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Cursor {
    /// No cursor
    #[default]
    Hidden = 0x00,
    /// Underline cursor at the address counter
    Visible = 0x02,
}

/// Blinking block cursor
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Blink {
    /// No blinking
    #[default]
    Off = 0x00,
    /// Character at the cursor blinks
    On = 0x01,
}

/// What a shift instruction moves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ShiftTarget {
    /// Move the cursor only
    Cursor = 0x00,
    /// Shift the entire display
    Display = 0x08,
}

/// Direction of a shift instruction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ShiftDirection {
    /// Shift left
    Left = 0x00,
    /// Shift right
    Right = 0x04,
}

/// Data bus width
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BitMode {
    /// 4-bit bus (the only mode usable behind an I2C expander)
    Four = 0x00,
    /// 8-bit bus
    Eight = 0x10,
}

/// Number of display lines as seen by the controller
///
/// A 20x4 panel is driven as a two-line controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Lines {
    /// One line
    One = 0x00,
    /// Two lines
    Two = 0x08,
}

/// Character font
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Font {
    /// 5x8 dots
    Dots5x8 = 0x00,
    /// 5x10 dots (one-line mode only)
    Dots5x10 = 0x04,
}

/// Encode the clear display instruction
pub const fn clear_display() -> u8 {
    CLEAR_DISPLAY
}

/// Encode the return home instruction
pub const fn return_home() -> u8 {
    RETURN_HOME
}

/// Encode the entry mode set instruction
pub const fn entry_mode(direction: EntryDirection, shift: DisplayShift) -> u8 {
    ENTRY_MODE | direction as u8 | shift as u8
}

/// Encode the display on/off control instruction
pub const fn display_control(power: Power, cursor: Cursor, blink: Blink) -> u8 {
    DISPLAY_CONTROL | power as u8 | cursor as u8 | blink as u8
}

/// Encode the cursor or display shift instruction
pub const fn cursor_or_display_shift(target: ShiftTarget, direction: ShiftDirection) -> u8 {
    CURSOR_SHIFT | target as u8 | direction as u8
}

/// Encode the function set instruction
pub const fn function_control(bit_mode: BitMode, lines: Lines, font: Font) -> u8 {
    FUNCTION_SET | bit_mode as u8 | lines as u8 | font as u8
}

/// Encode the set CGRAM address instruction
///
/// The address is not range checked. Bits above the 6-bit CGRAM range bleed
/// into the instruction select bits, exactly as on the wire.
pub const fn set_cgram_address(address: u8) -> u8 {
    SET_CGRAM_ADDRESS | address
}

/// Encode the set DDRAM address instruction
///
/// Addresses that already carry the select bit (such as the values in
/// [`ROW_ADDRESS`](crate::memory::ROW_ADDRESS)) encode to themselves.
pub const fn set_ddram_address(address: u8) -> u8 {
    SET_DDRAM_ADDRESS | address
}
