//! Keyboard configuration, builder and error type.

use std::fmt;

use emu_core::{LineProbe, MasterClock, SignalSink, Ticks};

use crate::ports::{KeyMatrix, SerialFramer, ToneGenerator};
use crate::Vt100Keyboard;

/// VT100 master crystal.
pub const VT100_CRYSTAL_HZ: u64 = 24_883_200;

/// Nominal keyboard link rate.
pub const LINK_BAUD: u64 = 8_000;

/// Key-click length in scan ticks: one full pass over the matrix.
pub const CLICK_SCAN_TICKS: u16 = 16;

/// Narrowest bit period that still leaves a usable quarter-bit tolerance.
const MIN_BIT_PERIOD: Ticks = Ticks::new(4);

/// Timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vt100KeyboardConfig {
    /// One bit cell on the host-to-keyboard line, in master ticks.
    pub bit_period: Ticks,
    /// Scan ticks the tone stays on for a key click.
    pub click_scan_ticks: u16,
}

impl Vt100KeyboardConfig {
    /// Timing for a link running at `baud` on `clock`.
    #[must_use]
    pub const fn from_baud(clock: MasterClock, baud: u64) -> Self {
        Self {
            bit_period: clock.ticks_per_period(baud),
            click_scan_ticks: CLICK_SCAN_TICKS,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.bit_period < MIN_BIT_PERIOD {
            return Err(Error::InvalidBitPeriod(self.bit_period));
        }
        Ok(())
    }
}

impl Default for Vt100KeyboardConfig {
    fn default() -> Self {
        Self::from_baud(MasterClock::new(VT100_CRYSTAL_HZ), LINK_BAUD)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required collaborator was not supplied to the builder.
    MissingCollaborator(&'static str),
    /// Bit period too short to time pulses against.
    InvalidBitPeriod(Ticks),
    /// A saved state that cannot belong to this keyboard.
    InvalidState(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCollaborator(name) => write!(f, "VT100 keyboard has no {name} attached"),
            Self::InvalidBitPeriod(period) => write!(
                f,
                "bit period of {period} is too short (minimum {MIN_BIT_PERIOD})"
            ),
            Self::InvalidState(reason) => write!(f, "invalid VT100 keyboard state: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

/// Wires a [`Vt100Keyboard`] to its collaborators.
///
/// The key matrix and serial framer are required. The tone generator
/// defaults to silence and the signal output to an unconnected line.
#[derive(Default)]
pub struct Vt100KeyboardBuilder {
    config: Vt100KeyboardConfig,
    matrix: Option<Box<dyn KeyMatrix>>,
    framer: Option<Box<dyn SerialFramer>>,
    tone: Option<Box<dyn ToneGenerator>>,
    signal_out: Option<Box<dyn SignalSink>>,
}

impl Vt100KeyboardBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, config: Vt100KeyboardConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn matrix(mut self, matrix: impl KeyMatrix + 'static) -> Self {
        self.matrix = Some(Box::new(matrix));
        self
    }

    #[must_use]
    pub fn framer(mut self, framer: impl SerialFramer + 'static) -> Self {
        self.framer = Some(Box::new(framer));
        self
    }

    #[must_use]
    pub fn tone(mut self, tone: impl ToneGenerator + 'static) -> Self {
        self.tone = Some(Box::new(tone));
        self
    }

    #[must_use]
    pub fn signal_out(mut self, sink: impl SignalSink + 'static) -> Self {
        self.signal_out = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> Result<Vt100Keyboard, Error> {
        self.config.validate()?;
        let matrix = self.matrix.ok_or(Error::MissingCollaborator("key matrix"))?;
        let framer = self.framer.ok_or(Error::MissingCollaborator("serial framer"))?;
        let tone = self.tone.unwrap_or_else(|| Box::new(|_on: bool| {}));
        let signal_out = self
            .signal_out
            .unwrap_or_else(|| Box::new(LineProbe::new()));
        Ok(Vt100Keyboard::new(self.config, matrix, framer, tone, signal_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timing() {
        let config = Vt100KeyboardConfig::default();
        assert_eq!(config.bit_period, Ticks::new(3_110));
        assert_eq!(config.click_scan_ticks, CLICK_SCAN_TICKS);
    }

    #[test]
    fn requires_matrix_and_framer() {
        let err = Vt100KeyboardBuilder::new()
            .framer(|_byte: u8| {})
            .build()
            .err();
        assert_eq!(err, Some(Error::MissingCollaborator("key matrix")));

        let err = Vt100KeyboardBuilder::new()
            .matrix(|_row: u8| 0)
            .build()
            .err();
        assert_eq!(err, Some(Error::MissingCollaborator("serial framer")));
    }

    #[test]
    fn rejects_degenerate_bit_period() {
        let config = Vt100KeyboardConfig::from_baud(MasterClock::new(1_000), 8_000);
        let err = Vt100KeyboardBuilder::new()
            .config(config)
            .matrix(|_row: u8| 0)
            .framer(|_byte: u8| {})
            .build()
            .err();
        assert_eq!(err, Some(Error::InvalidBitPeriod(Ticks::ZERO)));
        assert!(err.is_some_and(|e| e.to_string().contains("too short")));
    }

    #[test]
    fn builds_with_defaults() {
        let kbd = Vt100KeyboardBuilder::new()
            .matrix(|_row: u8| 0)
            .framer(|_byte: u8| {})
            .build();
        assert!(kbd.is_ok());
    }
}
