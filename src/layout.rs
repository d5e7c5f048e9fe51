//! # Board Layout
//!
//! Maps departure information onto cells of the character display. A board
//! is a list of *slots* (one per departure shown) and each slot is a set of
//! fields, each field drawing one [`FieldKind`] of its departure into a
//! horizontal run of cells.
//!
//! The default layout reproduces the classic 20×4 LCD board:
//!
//! ```text
//! col  0    4     10
//!      EXP 08:15 JIYUGAOKA
//!      Loc 08:19 OIMACHI
//! ```
//!
//! Layouts are validated once at startup; an overlapping or out-of-bounds
//! field is a configuration bug and is reported as [`LayoutConfigError`].

use crate::Departure;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Layout validation failures. All of these are fatal at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayoutConfigError {
    #[error("display must have at least one row and one column (got {rows}x{columns})")]
    EmptyDisplay { rows: usize, columns: usize },

    #[error("field {index} has zero width")]
    ZeroWidth { index: usize },

    #[error("field {index} (row {row}, columns {start}..{end}) is outside the {rows}x{columns} display")]
    OutOfBounds {
        index: usize,
        row: usize,
        start: usize,
        end: usize,
        rows: usize,
        columns: usize,
    },

    #[error("fields {first} and {second} overlap on row {row}")]
    Overlap {
        first: usize,
        second: usize,
        row: usize,
    },
}

/// Which piece of a departure a field shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Destination,
    Time,
    TrainType,
    Delay,
    Platform,
}

impl FieldKind {
    /// Text this field shows for `departure`.
    pub fn text(self, departure: &Departure) -> String {
        match self {
            FieldKind::Destination => departure.destination.to_uppercase(),
            FieldKind::Time => departure.effective_time().format("%H:%M").to_string(),
            FieldKind::TrainType => departure.train_type.short_code().to_string(),
            FieldKind::Delay if departure.delay_minutes > 0 => {
                format!("+{}m", departure.delay_minutes)
            }
            FieldKind::Delay => String::new(),
            FieldKind::Platform => departure
                .platform
                .as_ref()
                .map(|p| format!("P{p}"))
                .unwrap_or_default(),
        }
    }
}

/// Position of one field on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub row: usize,
    pub start_column: usize,
    /// Characters visible at once
    pub width: usize,
}

impl FieldLayout {
    pub fn new(row: usize, start_column: usize, width: usize) -> Self {
        Self {
            row,
            start_column,
            width,
        }
    }

    fn end_column(&self) -> usize {
        self.start_column + self.width
    }

    fn overlaps(&self, other: &FieldLayout) -> bool {
        self.row == other.row
            && self.start_column < other.end_column()
            && other.start_column < self.end_column()
    }
}

/// The fields that together show one departure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotLayout {
    pub fields: Vec<(FieldKind, FieldLayout)>,
}

/// A validated board: display dimensions plus slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardLayout {
    rows: usize,
    columns: usize,
    slots: Vec<SlotLayout>,
}

impl BoardLayout {
    /// Validate `slots` against a `rows` × `columns` display.
    pub fn new(
        rows: usize,
        columns: usize,
        slots: Vec<SlotLayout>,
    ) -> Result<Self, LayoutConfigError> {
        if rows == 0 || columns == 0 {
            return Err(LayoutConfigError::EmptyDisplay { rows, columns });
        }

        let all: Vec<&FieldLayout> = slots
            .iter()
            .flat_map(|s| s.fields.iter().map(|(_, f)| f))
            .collect();

        for (index, field) in all.iter().enumerate() {
            if field.width == 0 {
                return Err(LayoutConfigError::ZeroWidth { index });
            }
            if field.row >= rows || field.end_column() > columns {
                return Err(LayoutConfigError::OutOfBounds {
                    index,
                    row: field.row,
                    start: field.start_column,
                    end: field.end_column(),
                    rows,
                    columns,
                });
            }
        }

        for (first, a) in all.iter().enumerate() {
            if let Some(second) = all[first + 1..].iter().position(|b| a.overlaps(b)) {
                return Err(LayoutConfigError::Overlap {
                    first,
                    second: first + 1 + second,
                    row: a.row,
                });
            }
        }

        Ok(Self {
            rows,
            columns,
            slots,
        })
    }

    /// One slot per row with train type, time and destination, sized so
    /// the destination takes the rest of the row after column 10.
    pub fn classic(rows: usize, columns: usize) -> Result<Self, LayoutConfigError> {
        let slots = (0..rows)
            .map(|row| SlotLayout {
                fields: vec![
                    (FieldKind::TrainType, FieldLayout::new(row, 0, 3)),
                    (FieldKind::Time, FieldLayout::new(row, 4, 5)),
                    (
                        FieldKind::Destination,
                        FieldLayout::new(row, 10, columns.saturating_sub(10)),
                    ),
                ],
            })
            .collect();
        Self::new(rows, columns, slots)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn slots(&self) -> &[SlotLayout] {
        &self.slots
    }
}
