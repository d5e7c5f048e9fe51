//! Fixed-size character grid handed to a display sink.

use std::fmt;

/// A complete rows × columns snapshot of the display.
///
/// Every cell always holds a character; a grid is built whole and never
/// mutated after [`crate::board::BoardRenderer::frame`] returns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardGrid {
    rows: usize,
    columns: usize,
    cells: Vec<char>,
}

impl BoardGrid {
    /// Grid with every cell set to `blank`.
    pub fn blank(rows: usize, columns: usize, blank: char) -> Self {
        Self {
            rows,
            columns,
            cells: vec![blank; rows * columns],
        }
    }

    /// Blank grid with `text` centred on the first row, truncated to fit.
    pub fn message(rows: usize, columns: usize, blank: char, text: &str) -> Self {
        let mut grid = Self::blank(rows, columns, blank);
        if rows > 0 {
            let chars: Vec<char> = text.chars().take(columns).collect();
            let start = (columns - chars.len()) / 2;
            grid.write(0, start, &chars);
        }
        grid
    }

    /// Copy `chars` into row `row` from column `column`, clipping at the edge.
    pub(crate) fn write(&mut self, row: usize, column: usize, chars: &[char]) {
        if row >= self.rows || column >= self.columns {
            return;
        }
        let base = row * self.columns;
        for (i, &ch) in chars.iter().take(self.columns - column).enumerate() {
            self.cells[base + column + i] = ch;
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<char> {
        if row < self.rows && column < self.columns {
            Some(self.cells[row * self.columns + column])
        } else {
            None
        }
    }

    /// Row `row` as a string of exactly `columns` characters.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.rows()`. Use [`BoardGrid::cell`] for a
    /// checked lookup.
    pub fn row(&self, row: usize) -> String {
        let start = row * self.columns;
        self.cells[start..start + self.columns].iter().collect()
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.rows).map(|r| self.row(r))
    }
}

impl fmt::Display for BoardGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_grid_dimensions() {
        let grid = BoardGrid::blank(4, 20, ' ');
        assert_eq!(grid.rows(), 4);
        assert_eq!(grid.columns(), 20);
        assert!(grid.lines().all(|l| l == " ".repeat(20)));
        assert_eq!(grid.cell(4, 0), None);
    }

    #[test]
    fn test_message_is_centred_and_truncated() {
        let grid = BoardGrid::message(2, 20, ' ', "< NO DATA >");
        assert_eq!(grid.row(0), "    < NO DATA >     ");
        assert_eq!(grid.row(1), " ".repeat(20));

        let narrow = BoardGrid::message(1, 5, '.', "LOADING");
        assert_eq!(narrow.row(0), "LOADI");
    }

    #[test]
    fn test_write_clips_at_right_edge() {
        let mut grid = BoardGrid::blank(1, 6, ' ');
        grid.write(0, 4, &['A', 'B', 'C']);
        assert_eq!(grid.row(0), "    AB");
        grid.write(3, 0, &['Z']);
        assert_eq!(grid.to_string(), "    AB\n");
    }

    #[test]
    fn test_out_of_range_lookups() {
        let grid = BoardGrid::blank(2, 3, '.');
        assert_eq!(grid.cell(1, 2), Some('.'));
        assert_eq!(grid.cell(2, 0), None);
        assert_eq!(grid.cell(0, 3), None);
        assert_eq!(grid.lines().count(), 2);
    }

    #[test]
    #[should_panic]
    fn test_row_past_the_last_panics() {
        BoardGrid::blank(2, 3, '.').row(2);
    }
}
