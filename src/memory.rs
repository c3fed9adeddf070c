//! Display memory model
//!
//! This module mirrors the controller's display data RAM (DDRAM) for a 20x4
//! panel and records which cells have diverged from what the controller
//! holds.
//!
//! ## Address Map
//!
//! A 20x4 panel is a two-line controller whose 40-character lines are each
//! split across two screen rows. Row order on screen is therefore not address
//! order:
//!
//! | Row | DDRAM command bytes |
//! |-----|---------------------|
//! | 0   | 128 - 147 (`0x80`)  |
//! | 1   | 192 - 211 (`0xC0`)  |
//! | 2   | 148 - 167 (`0x94`)  |
//! | 3   | 212 - 231 (`0xD4`)  |
//!
//! ## Example
//!
//! ```
//! use lcd2004::memory::{Cell, Memory};
//!
//! let mut memory = Memory::new();
//! memory.set_row(2, "hi".bytes());
//! assert_eq!(memory.dirty(), &[Cell::new(2, 0).unwrap(), Cell::new(2, 1).unwrap()]);
//! assert_eq!(Cell::new(2, 1).unwrap().ddram_address(), 149);
//! ```

use heapless::Vec;

/// Number of character rows
pub const ROWS: usize = 4;
/// Number of character columns
pub const COLS: usize = 20;
/// Total number of cells
pub const CELLS: usize = ROWS * COLS;

/// Set-DDRAM-address command byte for column 0 of each row
///
/// Values already include the select bit, so they can be sent as-is.
/// Column `c` of a row lives at `ROW_ADDRESS[row] + c`.
pub const ROW_ADDRESS: [u8; ROWS] = [0x80, 0xC0, 0x94, 0xD4];

/// Character code of an empty cell
pub const BLANK: u8 = b' ';

/// A (row, column) coordinate on the panel
///
/// Only valid coordinates can be constructed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    row: u8,
    col: u8,
}

impl Cell {
    /// Top-left cell
    pub const ORIGIN: Self = Self { row: 0, col: 0 };

    /// Create a cell, or `None` if the coordinate is off the panel
    pub const fn new(row: u8, col: u8) -> Option<Self> {
        if (row as usize) < ROWS && (col as usize) < COLS {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// Row index, 0 to 3
    pub const fn row(self) -> u8 {
        self.row
    }

    /// Column index, 0 to 19
    pub const fn col(self) -> u8 {
        self.col
    }

    /// Set-DDRAM-address command byte for this cell
    pub const fn ddram_address(self) -> u8 {
        ROW_ADDRESS[self.row as usize] + self.col
    }
}

type Grid<T> = [[T; COLS]; ROWS];

/// In-memory mirror of DDRAM plus the pending write set
///
/// `shown` is what the controller is believed to hold and only changes when a
/// cell write succeeds. `desired` is what the caller last asked for. Cells
/// whose desired value changed are queued in the order they changed; each
/// cell is queued at most once until it is written.
#[derive(Clone, Debug)]
pub struct Memory {
    shown: Grid<u8>,
    desired: Grid<u8>,
    pending: Grid<bool>,
    dirty: Vec<Cell, CELLS>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Create an all-blank mirror with nothing pending
    pub const fn new() -> Self {
        Self {
            shown: [[BLANK; COLS]; ROWS],
            desired: [[BLANK; COLS]; ROWS],
            pending: [[false; COLS]; ROWS],
            dirty: Vec::new(),
        }
    }

    /// Set the desired contents of a row
    ///
    /// `codes` is space-padded or truncated to exactly [`COLS`] cells. Every
    /// cell whose desired code changes is queued. Returns the number of cells
    /// whose desired code changed.
    ///
    /// # Panics
    ///
    /// Panics if `row` is not below [`ROWS`].
    pub fn set_row<C>(&mut self, row: u8, codes: C) -> usize
    where
        C: IntoIterator<Item = u8>,
    {
        assert!(
            (row as usize) < ROWS,
            "invalid coordinate: row {row} is off the panel"
        );
        let padded = codes
            .into_iter()
            .chain(core::iter::repeat(BLANK))
            .take(COLS);

        let mut changed = 0;
        for (col, code) in (0u8..).zip(padded) {
            if let Some(cell) = Cell::new(row, col) {
                if self.set_cell(cell, code) {
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Set the desired code of one cell, returning whether it changed
    ///
    /// A queued cell set back to its shown code leaves the queue.
    pub fn set_cell(&mut self, cell: Cell, code: u8) -> bool {
        let slot = &mut self.desired[cell.row as usize][cell.col as usize];
        if *slot == code {
            return false;
        }
        *slot = code;
        if code == self.shown(cell) {
            self.dequeue(cell);
        } else {
            self.queue(cell);
        }
        true
    }

    /// Queue every cell for rewrite, row by row
    pub fn invalidate(&mut self) {
        for row in 0..ROWS as u8 {
            for col in 0..COLS as u8 {
                if let Some(cell) = Cell::new(row, col) {
                    self.queue(cell);
                }
            }
        }
    }

    /// Queue every cell whose desired code differs from the shown one
    pub fn resync(&mut self) {
        for row in 0..ROWS as u8 {
            for col in 0..COLS as u8 {
                if let Some(cell) = Cell::new(row, col) {
                    if self.desired(cell) != self.shown(cell) {
                        self.queue(cell);
                    }
                }
            }
        }
    }

    /// Cells awaiting write-back, in write order
    pub fn dirty(&self) -> &[Cell] {
        &self.dirty
    }

    /// Whether nothing is awaiting write-back
    pub fn is_clean(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Desired code at a cell
    pub fn desired(&self, cell: Cell) -> u8 {
        self.desired[cell.row as usize][cell.col as usize]
    }

    /// Code the controller is believed to hold at a cell
    pub fn shown(&self, cell: Cell) -> u8 {
        self.shown[cell.row as usize][cell.col as usize]
    }

    /// Desired codes of a row, or `None` if the row is off the panel
    pub fn row(&self, row: u8) -> Option<&[u8; COLS]> {
        self.desired.get(row as usize)
    }

    /// Shown codes of a row, or `None` if the row is off the panel
    pub fn shown_row(&self, row: u8) -> Option<&[u8; COLS]> {
        self.shown.get(row as usize)
    }

    /// Record that the first `written` queued cells reached the controller
    ///
    /// Their desired codes become shown and they leave the queue. The rest
    /// stay queued in the order they were queued.
    pub fn complete(&mut self, written: usize) {
        let written = written.min(self.dirty.len());
        for cell in &self.dirty[..written] {
            let (r, c) = (cell.row as usize, cell.col as usize);
            self.shown[r][c] = self.desired[r][c];
            self.pending[r][c] = false;
        }
        let pending = &self.pending;
        self.dirty
            .retain(|cell| pending[cell.row as usize][cell.col as usize]);
    }

    /// Forget pending writes without touching either grid
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
        self.pending = [[false; COLS]; ROWS];
    }

    /// Blank both grids and forget pending writes
    ///
    /// Matches the controller after clear display.
    pub fn reset(&mut self) {
        self.shown = [[BLANK; COLS]; ROWS];
        self.desired = [[BLANK; COLS]; ROWS];
        self.clear_dirty();
    }

    /// Treat every desired code as shown and forget pending writes
    pub fn commit(&mut self) {
        self.shown = self.desired;
        self.clear_dirty();
    }

    /// Blank the shown grid, keeping desired codes
    ///
    /// Used when the controller was cleared behind the mirror's back.
    pub fn forget_shown(&mut self) {
        self.shown = [[BLANK; COLS]; ROWS];
    }

    fn queue(&mut self, cell: Cell) {
        let flag = &mut self.pending[cell.row as usize][cell.col as usize];
        if !*flag {
            *flag = true;
            let pushed = self.dirty.push(cell).is_ok();
            debug_assert!(pushed, "dirty queue holds each cell at most once");
        }
    }

    fn dequeue(&mut self, cell: Cell) {
        let flag = &mut self.pending[cell.row as usize][cell.col as usize];
        if *flag {
            *flag = false;
            if let Some(index) = self.dirty.iter().position(|&queued| queued == cell) {
                self.dirty.remove(index);
            }
        }
    }
}
