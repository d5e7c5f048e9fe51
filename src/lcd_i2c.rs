//! HD44780 character LCD behind a PCF8574 I2C backpack
//!
//! This is the common 16x2 / 20x4 module with the blue I2C adapter board.
//! The PCF8574 drives the LCD in 4-bit mode with this pin mapping:
//!
//! ```text
//! P0 RS   P1 RW   P2 EN   P3 backlight   P4-P7 D4-D7
//! ```

use crate::display::{DisplayCommitError, DisplaySink};
use crate::grid::BoardGrid;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// Default backpack address (0x3F on some boards)
pub const DEFAULT_ADDRESS: u8 = 0x27;

const RS: u8 = 0b0000_0001;
const EN: u8 = 0b0000_0100;
const BACKLIGHT: u8 = 0b0000_1000;

// HD44780 instruction set
const CLEAR_DISPLAY: u8 = 0x01;
const ENTRY_MODE_INCREMENT: u8 = 0x06;
const DISPLAY_ON_CURSOR_OFF: u8 = 0x0C;
const FUNCTION_4BIT_2LINE_5X8: u8 = 0x28;
const SET_DDRAM_ADDR: u8 = 0x80;

// Display RAM holds two 40-character lines; 4-line modules split each in half
const MAX_ROWS: usize = 4;
const LINE_LENGTH: usize = 40;

pub struct Hd44780Lcd<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    rows: usize,
    columns: usize,
}

impl<I2C: I2c, D: DelayNs> Hd44780Lcd<I2C, D> {
    /// Run the 4-bit initialisation sequence and clear the screen.
    pub fn new(
        i2c: I2C,
        delay: D,
        address: u8,
        rows: usize,
        columns: usize,
    ) -> Result<Self, DisplayCommitError> {
        Self::check_size(rows, columns)?;
        let mut lcd = Self {
            i2c,
            delay,
            address,
            rows,
            columns,
        };
        lcd.init()?;
        Ok(lcd)
    }

    /// Reject sizes whose rows would not get distinct display RAM.
    fn check_size(rows: usize, columns: usize) -> Result<(), DisplayCommitError> {
        let max_columns = if rows > 2 { LINE_LENGTH / 2 } else { LINE_LENGTH };
        if rows == 0 || rows > MAX_ROWS || columns == 0 || columns > max_columns {
            return Err(DisplayCommitError::Dimensions {
                rows: rows.clamp(1, MAX_ROWS),
                columns: max_columns,
                got_rows: rows,
                got_columns: columns,
            });
        }
        Ok(())
    }

    fn init(&mut self) -> Result<(), DisplayCommitError> {
        // Power-on wait, then force 8-bit mode three times before switching to 4-bit
        self.delay.delay_ms(50);
        for wait_us in [4_500, 4_500, 150] {
            self.write_nibble(0x30, false)?;
            self.delay.delay_us(wait_us);
        }
        self.write_nibble(0x20, false)?;

        self.command(FUNCTION_4BIT_2LINE_5X8)?;
        self.command(DISPLAY_ON_CURSOR_OFF)?;
        self.clear()?;
        self.command(ENTRY_MODE_INCREMENT)
    }

    pub fn clear(&mut self) -> Result<(), DisplayCommitError> {
        self.command(CLEAR_DISPLAY)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    /// DDRAM address of the first cell of `row`.
    ///
    /// Rows 2 and 3 of a 4-line module continue rows 0 and 1 in memory.
    /// `row` is below [`MAX_ROWS`] and `columns` at most 20 for four rows,
    /// both checked in [`Hd44780Lcd::new`].
    fn row_address(&self, row: usize) -> u8 {
        let offsets = [0x00, 0x40, self.columns, 0x40 + self.columns];
        offsets[row] as u8
    }

    fn expander_write(&mut self, byte: u8) -> Result<(), DisplayCommitError> {
        self.i2c
            .write(self.address, &[byte | BACKLIGHT])
            .map_err(|e| DisplayCommitError::Bus(format!("{e:?}")))
    }

    /// Latch the upper four bits of `data` into the LCD.
    fn write_nibble(&mut self, data: u8, register_select: bool) -> Result<(), DisplayCommitError> {
        let byte = (data & 0xF0) | if register_select { RS } else { 0 };
        self.expander_write(byte | EN)?;
        self.delay.delay_us(1);
        self.expander_write(byte)?;
        self.delay.delay_us(50);
        Ok(())
    }

    fn send(&mut self, value: u8, register_select: bool) -> Result<(), DisplayCommitError> {
        self.write_nibble(value, register_select)?;
        self.write_nibble(value << 4, register_select)
    }

    fn command(&mut self, value: u8) -> Result<(), DisplayCommitError> {
        self.send(value, false)
    }

    /// Map a character onto the HD44780 A00 character ROM.
    fn rom_code(ch: char) -> u8 {
        if (' '..='}').contains(&ch) {
            ch as u8
        } else {
            b'?'
        }
    }
}

impl<I2C: I2c, D: DelayNs> DisplaySink for Hd44780Lcd<I2C, D> {
    fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    fn commit(&mut self, grid: &BoardGrid) -> Result<(), DisplayCommitError> {
        DisplayCommitError::check(grid, self.rows, self.columns)?;

        for row in 0..self.rows {
            self.command(SET_DDRAM_ADDR | self.row_address(row))?;
            for ch in grid.row(row).chars() {
                self.send(Self::rom_code(ch), true)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, Operation};
    use std::convert::Infallible;

    #[derive(Default)]
    struct RecordingBus {
        bytes: Vec<u8>,
    }

    impl ErrorType for RecordingBus {
        type Error = Infallible;
    }

    impl I2c for RecordingBus {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                if let Operation::Write(data) = op {
                    self.bytes.extend_from_slice(data);
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Rebuild the bytes sent with RS high from latched nibbles.
    fn data_bytes(bus: &RecordingBus) -> Vec<u8> {
        let latched: Vec<u8> = bus
            .bytes
            .iter()
            .copied()
            .filter(|b| b & EN != 0 && b & RS != 0)
            .map(|b| b & 0xF0)
            .collect();
        latched.chunks(2).map(|p| p[0] | (p[1] >> 4)).collect()
    }

    #[test]
    fn test_commit_writes_every_cell() {
        let mut lcd = Hd44780Lcd::new(RecordingBus::default(), NoDelay, DEFAULT_ADDRESS, 2, 4)
            .unwrap();
        lcd.i2c.bytes.clear();

        lcd.commit(&BoardGrid::message(2, 4, ' ', "AB")).unwrap();
        assert_eq!(data_bytes(&lcd.i2c), b" AB     ");
        assert!(lcd.i2c.bytes.iter().all(|b| b & BACKLIGHT != 0));
    }

    #[test]
    fn test_row_addresses_for_four_lines() {
        let lcd = Hd44780Lcd::new(RecordingBus::default(), NoDelay, DEFAULT_ADDRESS, 4, 20)
            .unwrap();
        let addrs: Vec<u8> = (0..4).map(|r| lcd.row_address(r)).collect();
        assert_eq!(addrs, [0x00, 0x40, 0x14, 0x54]);
    }

    #[test]
    fn test_sizes_beyond_display_ram_are_rejected() {
        for (rows, columns) in [(5, 20), (4, 21), (2, 41), (0, 16), (2, 0), (3, 300)] {
            let result = Hd44780Lcd::new(
                RecordingBus::default(),
                NoDelay,
                DEFAULT_ADDRESS,
                rows,
                columns,
            );
            match result {
                Err(DisplayCommitError::Dimensions {
                    got_rows,
                    got_columns,
                    ..
                }) => assert_eq!((got_rows, got_columns), (rows, columns)),
                _ => panic!("{rows}x{columns} should be rejected"),
            }
        }

        let lcd = Hd44780Lcd::new(RecordingBus::default(), NoDelay, DEFAULT_ADDRESS, 2, 40)
            .unwrap();
        assert_eq!(lcd.dimensions(), (2, 40));
    }

    #[test]
    fn test_rejected_size_never_touches_the_bus() {
        let mut bus = RecordingBus::default();
        assert!(Hd44780Lcd::new(&mut bus, NoDelay, DEFAULT_ADDRESS, 8, 20).is_err());
        assert!(bus.bytes.is_empty());
    }

    #[test]
    fn test_unsupported_characters_become_question_marks() {
        type Lcd = Hd44780Lcd<RecordingBus, NoDelay>;
        assert_eq!(Lcd::rom_code('A'), b'A');
        assert_eq!(Lcd::rom_code('駅'), b'?');
        assert_eq!(Lcd::rom_code('~'), b'?');
    }
}
