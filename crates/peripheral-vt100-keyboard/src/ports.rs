//! Collaborators wired to the keyboard at construction.

/// Number of rows driven by the scan counter.
pub const MATRIX_ROWS: usize = 16;

/// Switch sampling for the key matrix.
///
/// Bit `n` of a row is column `n`; a set bit is a closed (pressed) switch.
pub trait KeyMatrix {
    fn row(&self, row: u8) -> u8;
}

impl<F: Fn(u8) -> u8> KeyMatrix for F {
    fn row(&self, row: u8) -> u8 {
        self(row)
    }
}

/// The keyboard side of the UART that carries scan bytes to the host.
///
/// The framer reports completion back through
/// [`Vt100Keyboard::on_framer_byte_sent`](crate::Vt100Keyboard::on_framer_byte_sent)
/// and its serial output through
/// [`Vt100Keyboard::serial_out`](crate::Vt100Keyboard::serial_out).
pub trait SerialFramer {
    fn transmit(&mut self, byte: u8);
}

impl<F: FnMut(u8)> SerialFramer for F {
    fn transmit(&mut self, byte: u8) {
        self(byte);
    }
}

/// The key-click speaker.
pub trait ToneGenerator {
    fn set_enabled(&mut self, on: bool);
}

impl<F: FnMut(bool)> ToneGenerator for F {
    fn set_enabled(&mut self, on: bool) {
        self(on);
    }
}

/// A plain switch matrix, for frontends that track key state themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyMatrixState {
    rows: [u8; MATRIX_ROWS],
}

impl KeyMatrixState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: [0; MATRIX_ROWS],
        }
    }

    /// Close or open the switch at `row`, `column`. Out-of-range positions wrap.
    pub fn set(&mut self, row: u8, column: u8, pressed: bool) {
        let bit = 1 << (column & 7);
        let slot = &mut self.rows[(row & 0x0F) as usize];
        if pressed {
            *slot |= bit;
        } else {
            *slot &= !bit;
        }
    }

    pub fn press(&mut self, row: u8, column: u8) {
        self.set(row, column, true);
    }

    pub fn release(&mut self, row: u8, column: u8) {
        self.set(row, column, false);
    }

    pub fn release_all(&mut self) {
        self.rows = [0; MATRIX_ROWS];
    }

    #[must_use]
    pub fn is_pressed(&self, row: u8, column: u8) -> bool {
        self.rows[(row & 0x0F) as usize] & (1 << (column & 7)) != 0
    }
}

impl KeyMatrix for KeyMatrixState {
    fn row(&self, row: u8) -> u8 {
        self.rows[(row & 0x0F) as usize]
    }
}
