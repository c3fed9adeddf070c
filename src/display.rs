//! Core display operations

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, trace, warn};

use crate::command::{
    self, BitMode, Blink, Cursor, DisplayShift, EntryDirection, Font, Lines, Power,
    ShiftDirection, ShiftTarget,
};
use crate::config::{Builder, ClearPolicy, Config};
use crate::error::Error;
use crate::interface::{DisplayInterface, Interface, Mode};
use crate::memory::{COLS, Cell, Memory};

type DisplayResult<I> = core::result::Result<(), Error<I>>;

/// Raw nibbles that switch a freshly powered controller to 4-bit mode
///
/// The controller powers up in 8-bit mode and latches every strobe as a
/// whole instruction, so these go out as single nibbles.
const FORCE_4BIT_NIBBLES: [u8; 2] = [0x00, 0x20];

/// Instruction byte sent only to push a new backlight bit onto the bus
const BACKLIGHT_LATCH: u8 = 0x00;

/// Initialization progress of the controller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InitState {
    /// Nothing sent yet; the controller may still be in 8-bit mode
    #[default]
    Uninitialized,
    /// Power-on handshake in progress (or interrupted by a bus error)
    Forcing4Bit,
    /// 4-bit mode established, display on
    Ready,
}

/// Core display driver for a 20x4 HD44780 panel
///
/// Holds the only copy of the panel's memory mirror, the pending write set,
/// the logical cursor and the transport. Construct one per physical display.
///
/// Row writes only touch the mirror; [`refresh`](Self::refresh) then sends
/// the cells that changed, one address command and one data byte per cell.
pub struct Display<I>
where
    I: DisplayInterface,
{
    /// Hardware interface
    interface: I,
    /// Display configuration
    config: Config,
    /// DDRAM mirror and pending writes
    memory: Memory,
    /// Logical cursor, reset by clear and home
    cursor: Cell,
    /// Initialization progress
    state: InitState,
}

impl<I> Display<I>
where
    I: DisplayInterface,
{
    /// Create a new Display instance
    ///
    /// Nothing is sent until [`init`](Self::init).
    pub fn new(mut interface: I, config: Config) -> Self {
        interface.set_backlight(config.backlight);
        Self {
            interface,
            config,
            memory: Memory::new(),
            cursor: Cell::ORIGIN,
            state: InitState::Uninitialized,
        }
    }

    /// Run the power-on sequence
    ///
    /// Waits for the controller to settle, forces 4-bit mode with two raw
    /// nibbles, clears the display and turns it on with the cursor hidden.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        debug!("waiting {}ms for controller power-on", self.config.timing.power_on_ms);
        delay.delay_ms(self.config.timing.power_on_ms);
        self.force_4bit()?;
        self.clear(delay)?;
        self.send(
            command::display_control(Power::On, Cursor::Hidden, Blink::Off),
            Mode::Command,
        )?;
        self.state = InitState::Ready;
        debug!("controller ready");
        Ok(())
    }

    /// Bring the controller back after a transport error
    ///
    /// A failed write can leave the controller halfway through a byte. This
    /// replays the 4-bit handshake, clears the panel and turns it on, then
    /// queues every cell whose desired text is not blank so the next
    /// [`refresh`](Self::refresh) repaints the screen. Desired text survives.
    pub fn recover<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        debug!("recovering controller");
        self.force_4bit()?;
        self.send(command::clear_display(), Mode::Command)?;
        delay.delay_us(self.config.timing.clear_us);
        self.cursor = Cell::ORIGIN;
        self.memory.clear_dirty();
        self.memory.forget_shown();
        self.memory.resync();
        self.send(
            command::display_control(Power::On, Cursor::Hidden, Blink::Off),
            Mode::Command,
        )?;
        self.state = InitState::Ready;
        debug!("recovered, {} cells to repaint", self.memory.dirty().len());
        Ok(())
    }

    fn force_4bit(&mut self) -> DisplayResult<I> {
        self.state = InitState::Forcing4Bit;
        for bits in FORCE_4BIT_NIBBLES {
            self.interface
                .write4bits(bits, Mode::Command)
                .map_err(Error::Interface)?;
        }
        Ok(())
    }

    /// Set the desired text of a row
    ///
    /// `text` is space-padded or truncated to 20 characters. Characters
    /// outside `0..=255` become the configured substitute code. Cells whose
    /// code changes are queued for the next [`refresh`](Self::refresh).
    ///
    /// Wrapping onto the next row is not supported; `wrap = true` truncates
    /// like `wrap = false`.
    ///
    /// # Panics
    ///
    /// Panics if `row` is greater than 3.
    pub fn set_row(&mut self, row: u8, text: &str, wrap: bool) {
        if wrap {
            warn!("row wrapping is not supported, truncating row {row}");
        }
        let substitute = self.config.substitute;
        let changed = self.memory.set_row(
            row,
            text.chars()
                .map(|ch| u8::try_from(ch).unwrap_or(substitute)),
        );
        trace!("row {row}: {changed} cells changed");
    }

    /// Set the desired character codes of a row
    ///
    /// Same as [`set_row`](Self::set_row) but takes raw codes, so CGRAM
    /// glyphs (codes 0 to 7) can be placed directly.
    ///
    /// # Panics
    ///
    /// Panics if `row` is greater than 3.
    pub fn set_row_bytes(&mut self, row: u8, codes: &[u8]) {
        let changed = self.memory.set_row(row, codes.iter().copied());
        trace!("row {row}: {changed} cells changed");
    }

    /// Write every queued cell to the controller
    ///
    /// Cells go out in the order they changed, each as a set-DDRAM-address
    /// command followed by the character code. Only changed cells are sent.
    ///
    /// # Errors
    ///
    /// Stops at the first transport error. Cells written before it are
    /// recorded as shown; the failed cell and the rest stay queued.
    pub fn refresh(&mut self) -> DisplayResult<I> {
        self.check_ready("refresh");
        let mut written = 0;
        let result = loop {
            let Some(&cell) = self.memory.dirty().get(written) else {
                break Ok(());
            };
            if let Err(e) = self.write_cell(cell) {
                warn!(
                    "refresh stopped at row {} col {} after {written} cells",
                    cell.row(),
                    cell.col()
                );
                break Err(e);
            }
            written += 1;
        };
        self.memory.complete(written);
        result
    }

    fn write_cell(&mut self, cell: Cell) -> DisplayResult<I> {
        let code = self.memory.desired(cell);
        trace!("cell ({}, {}) <- {code:#04x}", cell.row(), cell.col());
        self.send(command::set_ddram_address(cell.ddram_address()), Mode::Command)?;
        self.send(code, Mode::Data)
    }

    /// Queue every cell for rewrite on the next refresh
    pub fn invalidate(&mut self) {
        self.memory.invalidate();
    }

    /// Clear the display
    ///
    /// Sends clear display, resets the cursor, drops pending writes and
    /// blocks for the configured clear time. With
    /// [`ClearPolicy::ResetMirror`] the mirror is blanked to match the panel;
    /// with [`ClearPolicy::KeepMirror`] it keeps the last requested text.
    pub fn clear_display<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.check_ready("clear display");
        self.clear(delay)
    }

    fn clear<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.send(command::clear_display(), Mode::Command)?;
        self.cursor = Cell::ORIGIN;
        match self.config.clear_policy {
            ClearPolicy::ResetMirror => self.memory.reset(),
            ClearPolicy::KeepMirror => self.memory.commit(),
        }
        debug!("cleared, waiting {}us", self.config.timing.clear_us);
        delay.delay_us(self.config.timing.clear_us);
        Ok(())
    }

    /// Return the cursor and any display shift to the origin
    ///
    /// Blocks for the configured home time.
    pub fn return_home<D: DelayNs>(&mut self, delay: &mut D) -> DisplayResult<I> {
        self.command(command::return_home())?;
        self.cursor = Cell::ORIGIN;
        debug!("returned home, waiting {}us", self.config.timing.home_us);
        delay.delay_us(self.config.timing.home_us);
        Ok(())
    }

    /// Turn the backlight on or off
    ///
    /// Issues a zero instruction purely to carry the new bit to the expander.
    /// The mirror and pending writes are untouched.
    pub fn set_backlight(&mut self, enabled: bool) -> DisplayResult<I> {
        self.interface.set_backlight(enabled);
        self.command(BACKLIGHT_LATCH)
    }

    /// Set text direction and display shift on write
    pub fn set_entry_mode(
        &mut self,
        direction: EntryDirection,
        shift: DisplayShift,
    ) -> DisplayResult<I> {
        self.command(command::entry_mode(direction, shift))
    }

    /// Set display power, cursor visibility and blink
    pub fn set_display_control(
        &mut self,
        power: Power,
        cursor: Cursor,
        blink: Blink,
    ) -> DisplayResult<I> {
        self.command(command::display_control(power, cursor, blink))
    }

    /// Shift the cursor or the whole display by one position
    pub fn set_cursor_or_display_shift(
        &mut self,
        target: ShiftTarget,
        direction: ShiftDirection,
    ) -> DisplayResult<I> {
        self.command(command::cursor_or_display_shift(target, direction))
    }

    /// Set bus width, line count and font
    ///
    /// Only [`BitMode::Four`] works behind an I2C expander.
    pub fn set_function_control(
        &mut self,
        bit_mode: BitMode,
        lines: Lines,
        font: Font,
    ) -> DisplayResult<I> {
        self.command(command::function_control(bit_mode, lines, font))
    }

    /// Point the address counter at a CGRAM location
    ///
    /// Follow with [`write_custom_character_data`](Self::write_custom_character_data)
    /// to define glyph rows. The address is not range checked.
    pub fn set_cgram_address(&mut self, address: u8) -> DisplayResult<I> {
        self.command(command::set_cgram_address(address))
    }

    /// Point the address counter at a DDRAM location
    ///
    /// The address is not range checked.
    pub fn set_ddram_address(&mut self, address: u8) -> DisplayResult<I> {
        self.command(command::set_ddram_address(address))
    }

    /// Write one byte at the current address counter
    ///
    /// Intended for CGRAM glyph data. Writing DDRAM this way bypasses the
    /// mirror.
    pub fn write_custom_character_data(&mut self, data: u8) -> DisplayResult<I> {
        self.write_data(data)
    }

    fn command(&mut self, byte: u8) -> DisplayResult<I> {
        self.check_ready("command");
        self.send(byte, Mode::Command)
    }

    fn write_data(&mut self, byte: u8) -> DisplayResult<I> {
        self.check_ready("data write");
        self.send(byte, Mode::Data)
    }

    fn send(&mut self, byte: u8, mode: Mode) -> DisplayResult<I> {
        trace!("{mode:?} {byte:#04x}");
        self.interface.send(byte, mode).map_err(Error::Interface)
    }

    /// Warn once per operation that drives the bus outside [`InitState::Ready`]
    fn check_ready(&self, op: &str) {
        if self.state != InitState::Ready {
            warn!("{op} issued while {:?}, controller mode is unknown", self.state);
        }
    }

    /// Initialization progress
    pub fn state(&self) -> InitState {
        self.state
    }

    /// Logical cursor location
    ///
    /// Reset by clear and home; row writes do not move it.
    pub fn cursor(&self) -> Cell {
        self.cursor
    }

    /// Current backlight state
    pub fn backlight(&self) -> bool {
        self.interface.backlight()
    }

    /// Desired character codes of a row, or `None` past row 3
    pub fn row(&self, row: u8) -> Option<&[u8; COLS]> {
        self.memory.row(row)
    }

    /// Cells waiting for the next refresh, in write order
    pub fn dirty_cells(&self) -> &[Cell] {
        self.memory.dirty()
    }

    /// Number of cells the next refresh will write
    pub fn pending_writes(&self) -> usize {
        self.memory.dirty().len()
    }

    /// The memory mirror
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Release the interface
    pub fn release(self) -> I {
        self.interface
    }
}

impl<I2C> Display<Interface<I2C>>
where
    I2C: I2c,
{
    /// Create and initialize a display on an I2C backpack
    ///
    /// Uses the default [`Config`] with the given 7-bit address.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use lcd2004::Display;
    /// # use embedded_hal::delay::DelayNs;
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
    /// # struct MockDelay;
    /// # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
    /// # let mut delay = MockDelay;
    /// let mut display = match Display::initialize(MockI2c, 0x27, &mut delay) {
    ///     Ok(display) => display,
    ///     Err(_) => return,
    /// };
    /// display.set_row(0, "Hello, world!", false);
    /// let _ = display.refresh();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] without touching the bus if `address` does
    /// not fit in 7 bits.
    pub fn initialize<D: DelayNs>(
        i2c: I2C,
        address: u8,
        delay: &mut D,
    ) -> core::result::Result<Self, Error<Interface<I2C>>> {
        let config = Builder::new().address(address).build()?;
        Self::with_config(i2c, config, delay)
    }

    /// Create and initialize a display with an explicit configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` fails [`Config::validate`].
    pub fn with_config<D: DelayNs>(
        i2c: I2C,
        config: Config,
        delay: &mut D,
    ) -> core::result::Result<Self, Error<Interface<I2C>>> {
        config.validate()?;
        let interface = Interface::new(i2c, config.address);
        let mut display = Self::new(interface, config);
        display.init(delay)?;
        Ok(display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BLANK, CELLS};
    use alloc::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct MockError;

    #[derive(Debug, Default)]
    struct MockInterface {
        nibbles: Vec<(u8, Mode)>,
        backlight: bool,
        /// Fail the nibble write with this index
        fail_at: Option<usize>,
    }

    impl MockInterface {
        /// Pair logged nibbles back into (byte, mode)
        fn bytes(&self) -> Vec<(u8, Mode)> {
            self.nibbles
                .chunks(2)
                .map(|pair| (pair[0].0 | (pair[1].0 >> 4), pair[0].1))
                .collect()
        }

        fn reset_log(&mut self) {
            self.nibbles.clear();
        }
    }

    impl DisplayInterface for MockInterface {
        type Error = MockError;

        fn write4bits(&mut self, bits: u8, mode: Mode) -> Result<(), Self::Error> {
            if self.fail_at == Some(self.nibbles.len()) {
                return Err(MockError);
            }
            self.nibbles.push((bits & 0xF0, mode));
            Ok(())
        }

        fn set_backlight(&mut self, on: bool) {
            self.backlight = on;
        }

        fn backlight(&self) -> bool {
            self.backlight
        }
    }

    /// Records every wait in microseconds
    #[derive(Default)]
    struct MockDelay {
        waits_us: Vec<u64>,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.waits_us.push(u64::from(ns) / 1_000);
        }

        fn delay_us(&mut self, us: u32) {
            self.waits_us.push(u64::from(us));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.waits_us.push(u64::from(ms) * 1_000);
        }
    }

    fn ready_display_with(config: Config) -> Display<MockInterface> {
        let mut display = Display::new(MockInterface::default(), config);
        display.init(&mut MockDelay::default()).unwrap();
        display.interface.reset_log();
        display
    }

    fn ready_display() -> Display<MockInterface> {
        ready_display_with(Config::default())
    }

    fn sent(display: &Display<MockInterface>) -> Vec<(u8, Mode)> {
        display.interface.bytes()
    }

    #[test]
    fn test_new_display_is_uninitialized_and_blank() {
        let display = Display::new(MockInterface::default(), Config::default());
        assert_eq!(display.state(), InitState::Uninitialized);
        assert_eq!(display.cursor(), Cell::ORIGIN);
        assert_eq!(display.pending_writes(), 0);
        assert!(display.backlight());
        for row in 0..4 {
            assert_eq!(display.row(row), Some(&[BLANK; COLS]));
        }
        assert!(display.interface.nibbles.is_empty());
    }

    #[test]
    fn test_init_sequence() {
        let mut display = Display::new(MockInterface::default(), Config::default());
        let mut delay = MockDelay::default();
        display.init(&mut delay).unwrap();

        let nibbles = &display.interface.nibbles;
        assert_eq!(nibbles[0], (0x00, Mode::Command));
        assert_eq!(nibbles[1], (0x20, Mode::Command));

        let rest = MockInterface {
            nibbles: nibbles[2..].to_vec(),
            ..MockInterface::default()
        };
        assert_eq!(
            rest.bytes(),
            [(0x01, Mode::Command), (0x0C, Mode::Command)]
        );
        assert_eq!(delay.waits_us, [1_000_000, 10_000]);
        assert_eq!(display.state(), InitState::Ready);
    }

    #[test]
    fn test_init_failure_leaves_forcing_state() {
        let interface = MockInterface {
            fail_at: Some(1),
            ..MockInterface::default()
        };
        let mut display = Display::new(interface, Config::default());
        let result = display.init(&mut MockDelay::default());
        assert!(matches!(result, Err(Error::Interface(MockError))));
        assert_eq!(display.state(), InitState::Forcing4Bit);
    }

    #[test]
    fn test_config_backlight_applied_on_new() {
        let config = Builder::new().backlight(false).build().unwrap();
        let display = Display::new(MockInterface::default(), config);
        assert!(!display.backlight());
    }

    #[test]
    fn test_refresh_writes_only_changed_cells() {
        let mut display = ready_display();
        display.set_row(0, "hi", false);
        assert_eq!(display.pending_writes(), 2);
        display.refresh().unwrap();
        assert_eq!(
            sent(&display),
            [
                (0x80, Mode::Command),
                (b'h', Mode::Data),
                (0x81, Mode::Command),
                (b'i', Mode::Data),
            ]
        );
        assert_eq!(display.pending_writes(), 0);
    }

    #[test]
    fn test_refresh_uses_row_address_map() {
        let mut display = ready_display();
        display.set_row(2, "  x", false);
        display.set_row(1, "y", false);
        display.set_row(3, &"z".repeat(20), false);
        display.refresh().unwrap();
        let addresses: Vec<u8> = sent(&display)
            .iter()
            .filter(|(_, mode)| *mode == Mode::Command)
            .map(|(byte, _)| *byte)
            .collect();
        assert_eq!(addresses[0], 0x96);
        assert_eq!(addresses[1], 0xC0);
        assert_eq!(addresses[2], 0xD4);
        assert_eq!(addresses[21], 0xE7);
        assert_eq!(addresses.len(), 22);
    }

    #[test]
    fn test_second_write_sends_only_differences() {
        let mut display = ready_display();
        display.set_row(1, "Count: 0099", false);
        display.refresh().unwrap();
        display.interface.reset_log();

        display.set_row(1, "Count: 0100", false);
        let cols: Vec<u8> = display.dirty_cells().iter().map(|c| c.col()).collect();
        assert_eq!(cols, [8, 9, 10]);
        display.refresh().unwrap();
        assert_eq!(sent(&display).len(), 6);
    }

    #[test]
    fn test_identical_row_twice_sends_nothing() {
        let mut display = ready_display();
        display.set_row(0, "steady", false);
        display.refresh().unwrap();
        display.interface.reset_log();

        display.set_row(0, "steady", false);
        assert_eq!(display.pending_writes(), 0);
        display.refresh().unwrap();
        assert!(display.interface.nibbles.is_empty());
    }

    #[test]
    fn test_reverted_row_sends_nothing() {
        let mut display = ready_display();
        display.set_row(0, "a", false);
        display.refresh().unwrap();
        display.interface.reset_log();

        display.set_row(0, "b", false);
        display.set_row(0, "a", false);
        assert_eq!(display.pending_writes(), 0);
        display.refresh().unwrap();
        assert!(display.interface.nibbles.is_empty());
    }

    #[test]
    fn test_refresh_converges_mirror() {
        let mut display = ready_display();
        display.set_row(3, "first", false);
        display.set_row(3, "second", false);
        display.set_row(0, "top", false);
        display.refresh().unwrap();
        for row in 0..4 {
            assert_eq!(display.memory().shown_row(row), display.row(row));
        }
        assert_eq!(display.row(3).unwrap(), b"second              ");
    }

    #[test]
    fn test_empty_and_long_rows_are_normalized() {
        let mut display = ready_display();
        display.set_row(0, "", false);
        display.set_row(1, "this text is over twenty chars", false);
        assert_eq!(display.row(0), Some(&[BLANK; COLS]));
        assert_eq!(display.row(1).unwrap(), b"this text is over tw");
    }

    #[test]
    fn test_wrap_behaves_like_truncate() {
        let mut wrapped = ready_display();
        let mut truncated = ready_display();
        let text = "0123456789abcdefghijKLMNO";
        wrapped.set_row(0, text, true);
        truncated.set_row(0, text, false);
        assert_eq!(wrapped.row(0), truncated.row(0));
        assert_eq!(wrapped.row(1), Some(&[BLANK; COLS]));
    }

    #[test]
    fn test_wide_chars_use_substitute() {
        let mut display = ready_display();
        display.set_row(0, "a\u{2192}b\u{e9}", false);
        assert_eq!(&display.row(0).unwrap()[..4], &[b'a', b'?', b'b', 0xE9]);

        let config = Builder::new().substitute(0xFF).build().unwrap();
        let mut display = ready_display_with(config);
        display.set_row(0, "\u{2588}", false);
        assert_eq!(display.row(0).unwrap()[0], 0xFF);
    }

    #[test]
    fn test_set_row_bytes_places_glyph_codes() {
        let mut display = ready_display();
        display.set_row_bytes(2, &[0x00, b'O', b'K', 0x01]);
        display.refresh().unwrap();
        assert_eq!(
            sent(&display)[1],
            (0x00, Mode::Data)
        );
        assert_eq!(sent(&display)[7], (0x01, Mode::Data));
    }

    #[test]
    #[should_panic(expected = "invalid coordinate")]
    fn test_row_four_panics() {
        let mut display = ready_display();
        display.set_row(4, "nope", false);
    }

    #[test]
    fn test_clear_resets_cursor_and_pending() {
        let mut display = ready_display();
        display.set_row(0, "pending", false);
        let mut delay = MockDelay::default();
        display.clear_display(&mut delay).unwrap();
        assert_eq!(display.cursor(), Cell::ORIGIN);
        assert_eq!(display.pending_writes(), 0);
        assert_eq!(sent(&display), [(0x01, Mode::Command)]);
        assert_eq!(delay.waits_us, [10_000]);
    }

    #[test]
    fn test_clear_reset_mirror_rewrites_same_text() {
        let mut display = ready_display();
        display.set_row(0, "menu", false);
        display.refresh().unwrap();
        display.clear_display(&mut MockDelay::default()).unwrap();
        assert_eq!(display.row(0), Some(&[BLANK; COLS]));

        display.set_row(0, "menu", false);
        assert_eq!(display.pending_writes(), 4);
    }

    #[test]
    fn test_clear_keep_mirror_skips_same_text() {
        let config = Builder::new()
            .clear_policy(ClearPolicy::KeepMirror)
            .build()
            .unwrap();
        let mut display = ready_display_with(config);
        display.set_row(0, "menu", false);
        display.refresh().unwrap();
        display.clear_display(&mut MockDelay::default()).unwrap();
        assert_eq!(&display.row(0).unwrap()[..4], b"menu");

        display.set_row(0, "menu", false);
        assert_eq!(display.pending_writes(), 0);
    }

    #[test]
    fn test_return_home() {
        let config = Builder::new().home_us(2_000).build().unwrap();
        let mut display = ready_display_with(config);
        display.set_row(0, "x", false);
        let mut delay = MockDelay::default();
        display.return_home(&mut delay).unwrap();
        assert_eq!(sent(&display), [(0x02, Mode::Command)]);
        assert_eq!(delay.waits_us, [2_000]);
        assert_eq!(display.cursor(), Cell::ORIGIN);
        // Home leaves pending writes alone
        assert_eq!(display.pending_writes(), 1);
    }

    #[test]
    fn test_backlight_toggle_leaves_memory_alone() {
        let mut display = ready_display();
        display.set_row(1, "lit", false);
        let before: Vec<Cell> = display.dirty_cells().to_vec();
        let row_before = *display.row(1).unwrap();

        display.set_backlight(false).unwrap();
        assert!(!display.backlight());
        assert_eq!(sent(&display), [(0x00, Mode::Command)]);
        assert_eq!(display.dirty_cells(), before.as_slice());
        assert_eq!(display.row(1), Some(&row_before));

        display.set_backlight(true).unwrap();
        assert!(display.backlight());
    }

    #[test]
    fn test_passthrough_commands() {
        let mut display = ready_display();
        display
            .set_entry_mode(EntryDirection::Increment, DisplayShift::Disabled)
            .unwrap();
        display
            .set_display_control(Power::On, Cursor::Visible, Blink::On)
            .unwrap();
        display
            .set_cursor_or_display_shift(ShiftTarget::Display, ShiftDirection::Left)
            .unwrap();
        display
            .set_function_control(BitMode::Four, Lines::Two, Font::Dots5x8)
            .unwrap();
        display.set_cgram_address(0x08).unwrap();
        display.write_custom_character_data(0b1_0101).unwrap();
        display.set_ddram_address(0x40).unwrap();
        assert_eq!(
            sent(&display),
            [
                (0x06, Mode::Command),
                (0x0F, Mode::Command),
                (0x18, Mode::Command),
                (0x28, Mode::Command),
                (0x48, Mode::Command),
                (0x15, Mode::Data),
                (0xC0, Mode::Command),
            ]
        );
    }

    #[test]
    fn test_refresh_error_keeps_unwritten_cells() {
        let mut display = ready_display();
        display.set_row(0, "abc", false);
        // Each cell is four nibbles; fail inside the second cell's data byte
        display.interface.fail_at = Some(6);
        let result = display.refresh();
        assert!(matches!(result, Err(Error::Interface(MockError))));

        let cols: Vec<u8> = display.dirty_cells().iter().map(|c| c.col()).collect();
        assert_eq!(cols, [1, 2]);
        assert_eq!(&display.memory().shown_row(0).unwrap()[..3], b"a  ");
    }

    #[test]
    fn test_recover_repaints_desired_text() {
        let mut display = ready_display();
        display.set_row(0, "abc", false);
        display.set_row(2, "z", false);
        display.interface.fail_at = Some(6);
        assert!(display.refresh().is_err());

        display.interface.fail_at = None;
        display.interface.reset_log();
        let mut delay = MockDelay::default();
        display.recover(&mut delay).unwrap();
        assert_eq!(display.state(), InitState::Ready);
        assert_eq!(display.interface.nibbles[..2], [(0x00, Mode::Command), (0x20, Mode::Command)]);
        assert_eq!(delay.waits_us, [10_000]);

        // Previously written 'a' is gone from the panel and must be redrawn
        let cells: Vec<(u8, u8)> = display
            .dirty_cells()
            .iter()
            .map(|c| (c.row(), c.col()))
            .collect();
        assert_eq!(cells, [(0, 0), (0, 1), (0, 2), (2, 0)]);

        display.refresh().unwrap();
        assert_eq!(display.memory().shown_row(0), display.row(0));
    }

    #[test]
    fn test_invalidate_rewrites_whole_panel() {
        let mut display = ready_display();
        display.invalidate();
        assert_eq!(display.pending_writes(), CELLS);
        display.refresh().unwrap();
        assert_eq!(sent(&display).len(), CELLS * 2);
    }

    /// Collects warnings logged on the current test thread
    mod warnings {
        use alloc::string::{String, ToString};
        use alloc::vec::Vec;
        use core::cell::RefCell;
        use log::{Level, LevelFilter, Log, Metadata, Record};

        struct Capture;

        static CAPTURE: Capture = Capture;

        std::thread_local! {
            static SEEN: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
        }

        impl Log for Capture {
            fn enabled(&self, metadata: &Metadata<'_>) -> bool {
                metadata.level() <= Level::Warn
            }

            fn log(&self, record: &Record<'_>) {
                if self.enabled(record.metadata()) {
                    SEEN.with(|seen| seen.borrow_mut().push(record.args().to_string()));
                }
            }

            fn flush(&self) {}
        }

        pub(super) fn start() {
            let _ = log::set_logger(&CAPTURE);
            log::set_max_level(LevelFilter::Warn);
            SEEN.with(|seen| seen.borrow_mut().clear());
        }

        pub(super) fn take() -> Vec<String> {
            SEEN.with(|seen| seen.borrow_mut().split_off(0))
        }
    }

    #[test]
    fn test_commands_before_init_still_sent_with_warning() {
        warnings::start();
        let mut display = Display::new(MockInterface::default(), Config::default());
        display.set_backlight(false).unwrap();
        display.write_custom_character_data(0x1F).unwrap();
        assert_eq!(
            display.interface.bytes(),
            [(0x00, Mode::Command), (0x1F, Mode::Data)]
        );
        assert_eq!(display.state(), InitState::Uninitialized);
        assert_eq!(warnings::take().len(), 2);
    }

    #[test]
    fn test_commands_after_failed_init_warn() {
        warnings::start();
        let interface = MockInterface {
            fail_at: Some(2),
            ..MockInterface::default()
        };
        let mut display = Display::new(interface, Config::default());
        assert!(display.init(&mut MockDelay::default()).is_err());
        assert_eq!(display.state(), InitState::Forcing4Bit);

        display.interface.fail_at = None;
        display.return_home(&mut MockDelay::default()).unwrap();
        let seen = warnings::take();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("Forcing4Bit"));
    }

    #[test]
    fn test_refresh_before_init_warns_once() {
        warnings::start();
        let mut display = Display::new(MockInterface::default(), Config::default());
        display.set_row(0, "abcd", false);
        display.refresh().unwrap();
        assert_eq!(sent(&display).len(), 8);
        assert_eq!(warnings::take().len(), 1);
    }

    #[test]
    fn test_init_and_ready_operations_do_not_warn() {
        warnings::start();
        let mut display = ready_display();
        display.set_row(1, "ok", false);
        display.refresh().unwrap();
        display.clear_display(&mut MockDelay::default()).unwrap();
        display.recover(&mut MockDelay::default()).unwrap();
        assert!(warnings::take().is_empty());
    }

    #[test]
    fn test_release_returns_interface() {
        let display = ready_display();
        let interface = display.release();
        assert!(interface.nibbles.is_empty());
    }

    mod i2c {
        use super::*;
        use crate::error::BuilderError;
        use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

        #[derive(Debug, Default)]
        struct MockI2c {
            writes: Vec<(u8, u8)>,
        }

        impl ErrorType for MockI2c {
            type Error = ErrorKind;
        }

        impl I2c for MockI2c {
            fn transaction(
                &mut self,
                address: u8,
                operations: &mut [Operation<'_>],
            ) -> Result<(), Self::Error> {
                for op in operations {
                    if let Operation::Write(bytes) = op {
                        self.writes
                            .extend(bytes.iter().map(|byte| (address, *byte)));
                    }
                }
                Ok(())
            }
        }

        #[test]
        fn test_initialize_over_i2c() {
            let mut delay = MockDelay::default();
            let display = Display::initialize(MockI2c::default(), 0x3F, &mut delay).unwrap();
            assert_eq!(display.state(), InitState::Ready);

            let bus = display.release().release();
            // 2 forcing nibbles + 2 bytes, three writes per nibble
            assert_eq!(bus.writes.len(), (2 + 2 * 2) * 3);
            assert!(bus.writes.iter().all(|(addr, _)| *addr == 0x3F));
            let bytes: Vec<u8> = bus.writes.iter().map(|(_, b)| *b).collect();
            assert_eq!(bytes[..6], [0x08, 0x0C, 0x08, 0x28, 0x2C, 0x28]);
        }

        #[test]
        fn test_initialize_rejects_eight_bit_address() {
            let mut delay = MockDelay::default();
            let result = Display::initialize(MockI2c::default(), 0x9C, &mut delay);
            assert!(matches!(
                result,
                Err(Error::Config(BuilderError::InvalidAddress(0x9C)))
            ));
            // Rejected before the power-on wait, so nothing reached the bus
            assert!(delay.waits_us.is_empty());
        }

        #[test]
        fn test_with_config_validates_hand_built_config() {
            let config = Config {
                address: 0x80,
                ..Config::default()
            };
            let result = Display::with_config(MockI2c::default(), config, &mut MockDelay::default());
            assert!(matches!(
                result,
                Err(Error::Config(BuilderError::InvalidAddress(0x80)))
            ));
        }

        #[test]
        fn test_refresh_over_i2c_is_six_writes_per_byte() {
            let mut delay = MockDelay::default();
            let config = Builder::new().address(0x27).build().unwrap();
            let mut display =
                Display::with_config(MockI2c::default(), config, &mut delay).unwrap();
            display.set_row(0, "A", false);
            display.refresh().unwrap();

            let bus = display.release().release();
            let init_writes = (2 + 2 * 2) * 3;
            assert_eq!(bus.writes.len() - init_writes, 2 * 6);
            // Address 0x80 then 'A' (0x41) with RS set
            let refresh: Vec<u8> = bus.writes[init_writes..].iter().map(|(_, b)| *b).collect();
            assert_eq!(
                refresh,
                [0x88, 0x8C, 0x88, 0x08, 0x0C, 0x08, 0x49, 0x4D, 0x49, 0x19, 0x1D, 0x19]
            );
        }
    }
}
