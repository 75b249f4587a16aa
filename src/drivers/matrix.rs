//! Slot switch matrix over `embedded-hal` pins.
//!
//! Rows are open-drain style outputs held high; the selected row is driven
//! low.  Columns are inputs with pull-ups, so a closed switch on the
//! selected row reads low.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::SlotMatrix;
use crate::error::{Error, Result};

pub struct GpioMatrix<R, C, const ROWS: usize, const COLS: usize> {
    rows: [R; ROWS],
    cols: [C; COLS],
}

impl<R: OutputPin, C: InputPin, const ROWS: usize, const COLS: usize> GpioMatrix<R, C, ROWS, COLS> {
    /// Releases every row.
    pub fn new(mut rows: [R; ROWS], cols: [C; COLS]) -> Result<Self> {
        for row in &mut rows {
            row.set_high().map_err(|_| Error::Gpio(-1))?;
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> &[R; ROWS] {
        &self.rows
    }
}

impl<R: OutputPin, C: InputPin, const ROWS: usize, const COLS: usize> SlotMatrix
    for GpioMatrix<R, C, ROWS, COLS>
{
    fn select_row(&mut self, row: usize, selected: bool) -> Result<()> {
        let pin = self.rows.get_mut(row).ok_or(Error::Gpio(-1))?;
        let res = if selected { pin.set_low() } else { pin.set_high() };
        res.map_err(|_| Error::Gpio(-1))
    }

    fn column_closed(&mut self, col: usize) -> Result<bool> {
        let pin = self.cols.get_mut(col).ok_or(Error::Gpio(-1))?;
        pin.is_low().map_err(|_| Error::Gpio(-1))
    }
}
