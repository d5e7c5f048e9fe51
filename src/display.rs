//! # Display Sinks
//!
//! A [`DisplaySink`] takes a complete [`BoardGrid`] and puts it on a screen.
//! There is no partial update: every commit sends the whole grid.
//!
//! - [`TerminalSink`]: development output to stdout (`--stdout`)
//! - `lcd_i2c::Hd44780Lcd`: I2C character LCD (`hardware` feature)

use crate::grid::BoardGrid;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DisplayCommitError {
    /// Grid size does not match the display
    #[error("grid is {got_rows}x{got_columns}, display is {rows}x{columns}")]
    Dimensions {
        rows: usize,
        columns: usize,
        got_rows: usize,
        got_columns: usize,
    },

    /// Hardware bus failure (e.g. LCD disconnected)
    #[error("display bus error: {0}")]
    Bus(String),

    #[error("display IO: {0}")]
    Io(#[from] io::Error),
}

impl DisplayCommitError {
    /// Fail unless `grid` is exactly `rows` × `columns`.
    pub fn check(grid: &BoardGrid, rows: usize, columns: usize) -> Result<(), Self> {
        if grid.rows() == rows && grid.columns() == columns {
            Ok(())
        } else {
            Err(DisplayCommitError::Dimensions {
                rows,
                columns,
                got_rows: grid.rows(),
                got_columns: grid.columns(),
            })
        }
    }
}

/// A character display that shows whole grids.
pub trait DisplaySink {
    /// Display dimensions as (rows, columns).
    fn dimensions(&self) -> (usize, usize);

    /// Show `grid`, replacing everything currently displayed.
    fn commit(&mut self, grid: &BoardGrid) -> Result<(), DisplayCommitError>;
}

/// Draws each committed grid to a writer inside a border.
pub struct TerminalSink<W: Write = io::Stdout> {
    out: W,
    rows: usize,
    columns: usize,
}

impl TerminalSink {
    pub fn stdout(rows: usize, columns: usize) -> Self {
        Self::new(io::stdout(), rows, columns)
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, rows: usize, columns: usize) -> Self {
        Self { out, rows, columns }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DisplaySink for TerminalSink<W> {
    fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    fn commit(&mut self, grid: &BoardGrid) -> Result<(), DisplayCommitError> {
        DisplayCommitError::check(grid, self.rows, self.columns)?;

        let border = format!("+{}+", "-".repeat(self.columns));
        writeln!(self.out, "{border}")?;
        for line in grid.lines() {
            writeln!(self.out, "|{line}|")?;
        }
        writeln!(self.out, "{border}")?;
        self.out.flush()?;
        Ok(())
    }
}
