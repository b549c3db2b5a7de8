//! Host-to-keyboard line decoding.
//!
//! The host drives the line with 8N1 asynchronous frames, LSB first. The
//! keyboard only sees level changes, so each transition closes a pulse
//! whose width, in whole bit cells, says how many cells the previous level
//! held. Cell 0 is the start bit (low), cells 1-8 are data, cell 9 is the
//! stop bit (high). The line idles high.

use emu_core::Ticks;
use serde::{Deserialize, Serialize};

/// Bit cells in one frame, start and stop bits included.
pub const FRAME_CELLS: u8 = 10;

const STOP_CELL: u8 = FRAME_CELLS - 1;

/// A measured pulse: the level the line held and for how many bit cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub level: bool,
    /// Whole bit cells covered, rounding within a quarter bit.
    pub cells: u64,
    /// Whether the width lands within a quarter bit of `cells` periods.
    pub aligned: bool,
}

/// Measure the pulse closed by a transition from `previous_level` at
/// `previous` to `new_level` at `now`.
///
/// Returns `None` when nothing was decoded: no level change, a zero bit
/// period, or a pulse shorter than three quarters of a bit.
#[must_use]
pub fn decode_pulse(
    previous: Ticks,
    now: Ticks,
    previous_level: bool,
    new_level: bool,
    bit_period: Ticks,
) -> Option<Pulse> {
    if previous_level == new_level || bit_period == Ticks::ZERO {
        return None;
    }
    let period = bit_period.get();
    let tolerance = period / 4;
    let elapsed = now.since(previous).get();
    let cells = elapsed.saturating_add(tolerance) / period;
    if cells == 0 {
        return None;
    }
    let aligned = elapsed <= cells.saturating_mul(period).saturating_add(tolerance);
    Some(Pulse {
        level: previous_level,
        cells,
        aligned,
    })
}

/// Receive shift register state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RxState {
    /// Waiting for a start bit.
    #[default]
    Idle,
    /// A frame is in progress: `cells` bit cells consumed since the start edge.
    Frame { cells: u8, shift: u8 },
}

/// Frame assembler fed by measured pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Receiver {
    state: RxState,
}

impl Receiver {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RxState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> RxState {
        self.state
    }

    pub fn set_state(&mut self, state: RxState) {
        self.state = state;
    }

    pub fn reset(&mut self) {
        self.state = RxState::Idle;
    }

    /// Feed the line transition to `new_level` that closed `pulse`.
    ///
    /// Returns a byte when the transition completes a frame. Any pulse that
    /// does not fit the framing drops the frame and returns to idle.
    pub fn edge(&mut self, pulse: Option<Pulse>, new_level: bool) -> Option<u8> {
        match self.state {
            RxState::Idle => {
                // Falling edge after a plausible idle run: start bit.
                if !new_level && pulse.is_some() {
                    self.state = RxState::Frame { cells: 0, shift: 0 };
                }
                None
            }
            RxState::Frame { cells, shift } => {
                let Some(pulse) = pulse else {
                    self.state = RxState::Idle;
                    return None;
                };
                if pulse.level {
                    self.high_run(cells, shift, pulse, new_level)
                } else {
                    self.low_run(cells, shift, pulse)
                }
            }
        }
    }

    /// Complete a frame whose last data bits are high, given the high run
    /// measured so far. Such a frame has no edge of its own at the stop bit.
    /// The line stays high, so the receiver goes idle.
    pub fn poll(&mut self, pending: Option<Pulse>) -> Option<u8> {
        let RxState::Frame { cells, shift } = self.state else {
            return None;
        };
        let pulse = pending.filter(|p| p.level)?;
        if pulse.cells < u64::from(FRAME_CELLS - cells) {
            return None;
        }
        self.state = RxState::Idle;
        Some(fill_ones(shift, cells, STOP_CELL))
    }

    fn low_run(&mut self, cells: u8, shift: u8, pulse: Pulse) -> Option<u8> {
        let end = u64::from(cells) + pulse.cells;
        if !pulse.aligned || end > u64::from(STOP_CELL) {
            // A low run reaching into the stop cell is a framing error (or a break).
            self.state = RxState::Idle;
            return None;
        }
        if end == u64::from(STOP_CELL) {
            // Rising into the stop bit: every data bit is known.
            self.state = RxState::Idle;
            return Some(shift);
        }
        self.state = RxState::Frame {
            cells: end as u8,
            shift,
        };
        None
    }

    fn high_run(&mut self, cells: u8, shift: u8, pulse: Pulse, new_level: bool) -> Option<u8> {
        if cells == 0 {
            // The start cell is low by definition.
            self.state = RxState::Idle;
            return None;
        }
        if pulse.cells >= u64::from(FRAME_CELLS - cells) {
            // The run covered the stop bit; any excess is idle line. The
            // falling edge that ended it is the next start bit.
            self.state = if new_level {
                RxState::Idle
            } else {
                RxState::Frame { cells: 0, shift: 0 }
            };
            return Some(fill_ones(shift, cells, STOP_CELL));
        }
        if !pulse.aligned {
            self.state = RxState::Idle;
            return None;
        }
        let end = cells + pulse.cells as u8;
        self.state = RxState::Frame {
            cells: end,
            shift: fill_ones(shift, cells, end),
        };
        None
    }
}

/// Set the data bits for cells `from..to` (cells 1-8 map to bits 0-7).
fn fill_ones(mut shift: u8, from: u8, to: u8) -> u8 {
    for cell in from.max(1)..to.min(STOP_CELL) {
        shift |= 1 << (cell - 1);
    }
    shift
}

/// Line transitions a host sends for one frame starting at `start`.
///
/// Only level changes are listed; the final entry returns the line high
/// for the stop bit unless the last data bit was already high.
#[must_use]
pub fn frame_edges(byte: u8, start: Ticks, bit_period: Ticks) -> heapless::Vec<(Ticks, bool), 10> {
    let mut edges = heapless::Vec::new();
    let mut level = true;
    for cell in 0..FRAME_CELLS {
        let bit = match cell {
            0 => false,
            STOP_CELL => true,
            data => byte & (1 << (data - 1)) != 0,
        };
        if bit != level {
            level = bit;
            // At most one edge per cell, so this never overflows.
            let _ = edges.push((start + bit_period * u64::from(cell), bit));
        }
    }
    edges
}
