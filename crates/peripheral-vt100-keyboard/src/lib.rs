//! DEC VT100 keyboard controller.
//!
//! The VT100 keyboard scans a 16-row switch matrix with a ripple counter
//! and talks to the terminal over a single bidirectional serial line
//! through a UART. Matrix changes go out as scan bytes; the terminal sends
//! status bytes back, one of which fires the key-click speaker.
//!
//! The counter, the UART shifter and the speaker are collaborators: the
//! machine ticks [`Vt100Keyboard::on_scan_tick`] once per row period,
//! relays framer events, and delivers host line transitions with their
//! virtual timestamps. Scan ticks carry the time as well, which lets a
//! host byte ending in high bits complete once its stop bit has passed.
//!
//! # Scan byte
//!
//! | Bit | Meaning                  |
//! |-----|--------------------------|
//! | 7   | 1 = pressed, 0 = released|
//! | 6-3 | Row (0-15)               |
//! | 2-0 | Column (0-7)             |
//!
//! Each tick reports at most one changed switch of the scanned row (the
//! lowest column); further changes in that row go out on later passes.
//!
//! # Host status byte
//!
//! Bit 7 set requests a key click. Other bytes are ignored.

mod config;
mod ports;
mod receiver;
mod state;

pub use config::{
    CLICK_SCAN_TICKS, Error, LINK_BAUD, VT100_CRYSTAL_HZ, Vt100KeyboardBuilder,
    Vt100KeyboardConfig,
};
pub use ports::{KeyMatrix, KeyMatrixState, MATRIX_ROWS, SerialFramer, ToneGenerator};
pub use receiver::{FRAME_CELLS, Pulse, Receiver, RxState, decode_pulse, frame_edges};
pub use state::Vt100KeyboardState;

use emu_core::{Observable, SignalSink, Ticks, Value, parse_index};
use log::{debug, trace, warn};

/// Status byte bit requesting a key click.
pub const CLICK_REQUEST: u8 = 0x80;

/// Scan bytes that can wait behind the one in flight.
pub const PENDING_CAPACITY: usize = 32;

/// One matrix change, as carried by a scan byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCode {
    pub row: u8,
    pub column: u8,
    pub pressed: bool,
}

impl ScanCode {
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        ((self.pressed as u8) << 7) | ((self.row & 0x0F) << 3) | (self.column & 0x07)
    }

    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            row: (byte >> 3) & 0x0F,
            column: byte & 0x07,
            pressed: byte & 0x80 != 0,
        }
    }
}

/// VT100 keyboard controller.
pub struct Vt100Keyboard {
    config: Vt100KeyboardConfig,
    matrix: Box<dyn KeyMatrix>,
    framer: Box<dyn SerialFramer>,
    tone: Box<dyn ToneGenerator>,
    signal_out: Box<dyn SignalSink>,

    /// Row most recently delivered by the scan counter.
    scan_position: u8,
    /// Last reported switch state of every row.
    last_scan: [u8; MATRIX_ROWS],

    /// Host-to-keyboard line level and the time it last changed.
    signal_line: bool,
    last_signal_change: Ticks,
    receiver: Receiver,

    /// A scan byte is being shifted out by the framer.
    byte_in_flight: bool,
    pending: heapless::Deque<u8, PENDING_CAPACITY>,
    /// The queue has refused a byte and no slot has freed since.
    overflowing: bool,

    /// Scan ticks left before the click tone is switched off.
    click_remaining: u16,
}

impl Vt100Keyboard {
    /// Use [`Vt100KeyboardBuilder`] to wire collaborators.
    fn new(
        config: Vt100KeyboardConfig,
        matrix: Box<dyn KeyMatrix>,
        framer: Box<dyn SerialFramer>,
        tone: Box<dyn ToneGenerator>,
        signal_out: Box<dyn SignalSink>,
    ) -> Self {
        Self {
            config,
            matrix,
            framer,
            tone,
            signal_out,
            scan_position: 0,
            last_scan: [0; MATRIX_ROWS],
            signal_line: true,
            last_signal_change: Ticks::ZERO,
            receiver: Receiver::new(),
            byte_in_flight: false,
            pending: heapless::Deque::new(),
            overflowing: false,
            click_remaining: 0,
        }
    }

    #[must_use]
    pub fn builder() -> Vt100KeyboardBuilder {
        Vt100KeyboardBuilder::new()
    }

    /// Return to power-on state at virtual time `now`.
    ///
    /// Any half-received frame and any queued scan bytes are discarded.
    pub fn reset(&mut self, now: Ticks) {
        debug!("vt100 kbd: reset at {now}");
        self.scan_position = 0;
        self.last_scan = [0; MATRIX_ROWS];
        self.signal_line = true;
        self.last_signal_change = now;
        self.receiver.reset();
        self.byte_in_flight = false;
        self.pending.clear();
        self.overflowing = false;
        if self.click_remaining > 0 {
            self.click_remaining = 0;
            self.tone.set_enabled(false);
        }
    }

    /// Scan counter output at virtual time `now`: sample `row` and report
    /// a change, if any.
    ///
    /// Also finishes a host byte whose stop bit has elapsed by `now`.
    pub fn on_scan_tick(&mut self, row: u8, now: Ticks) {
        let row = row & 0x0F;
        self.scan_position = row;

        if self.click_remaining > 0 {
            self.click_remaining -= 1;
            if self.click_remaining == 0 {
                self.tone.set_enabled(false);
            }
        }
        self.poll_receiver(now);

        let sample = self.matrix.row(row);
        let changed = sample ^ self.last_scan[row as usize];
        if changed == 0 {
            return;
        }
        let column = changed.trailing_zeros() as u8;
        let code = ScanCode {
            row,
            column,
            pressed: sample & (1 << column) != 0,
        };
        // A change that cannot be queued stays unreported and is seen
        // again on the next pass.
        if self.submit(code.to_byte()) {
            self.last_scan[row as usize] ^= 1 << column;
        }
    }

    fn submit(&mut self, byte: u8) -> bool {
        if !self.byte_in_flight {
            trace!("vt100 kbd: send {byte:#04X}");
            self.byte_in_flight = true;
            self.framer.transmit(byte);
            return true;
        }
        if self.pending.push_back(byte).is_err() {
            if self.overflowing {
                trace!("vt100 kbd: scan queue still full, deferring {byte:#04X}");
            } else {
                warn!("vt100 kbd: scan queue full, deferring {byte:#04X}");
                self.overflowing = true;
            }
            return false;
        }
        self.overflowing = false;
        true
    }

    /// The framer finished shifting out the byte in flight.
    pub fn on_framer_byte_sent(&mut self) {
        self.overflowing = false;
        match self.pending.pop_front() {
            Some(byte) => {
                trace!("vt100 kbd: send {byte:#04X}");
                self.framer.transmit(byte);
            }
            None => self.byte_in_flight = false,
        }
    }

    /// The framer's serial output, forwarded onto the line to the host.
    pub fn serial_out(&mut self, level: bool) {
        self.signal_out.set_level(level);
    }

    /// The host drove the input line to `level` at virtual time `now`.
    pub fn on_signal_line_change(&mut self, level: bool, now: Ticks) {
        if level == self.signal_line {
            return;
        }
        let pulse = decode_pulse(
            self.last_signal_change,
            now,
            self.signal_line,
            level,
            self.config.bit_period,
        );
        if pulse.is_none() {
            trace!(
                "vt100 kbd: line glitch, {} after last edge",
                now.since(self.last_signal_change)
            );
        }
        if let Some(byte) = self.receiver.edge(pulse, level) {
            self.execute(byte);
        }
        self.last_signal_change = now;
        self.signal_line = level;
    }

    /// Complete a frame that ended on high bits once its stop bit has
    /// elapsed. Every scan tick does this; it is a no-op otherwise.
    pub fn poll_receiver(&mut self, now: Ticks) {
        if !self.signal_line {
            return;
        }
        let pending = decode_pulse(
            self.last_signal_change,
            now,
            true,
            false,
            self.config.bit_period,
        );
        if let Some(byte) = self.receiver.poll(pending) {
            self.execute(byte);
        }
    }

    fn execute(&mut self, byte: u8) {
        if byte & CLICK_REQUEST == 0 {
            debug!("vt100 kbd: ignored host byte {byte:#04X}");
            return;
        }
        debug!("vt100 kbd: key click");
        if self.click_remaining == 0 {
            self.tone.set_enabled(true);
        }
        self.click_remaining = self.config.click_scan_ticks;
        if self.click_remaining == 0 {
            self.tone.set_enabled(false);
        }
    }

    #[must_use]
    pub fn config(&self) -> Vt100KeyboardConfig {
        self.config
    }

    #[must_use]
    pub fn scan_position(&self) -> u8 {
        self.scan_position
    }

    #[must_use]
    pub fn signal_line(&self) -> bool {
        self.signal_line
    }

    #[must_use]
    pub fn receiver_state(&self) -> RxState {
        self.receiver.state()
    }

    #[must_use]
    pub fn byte_in_flight(&self) -> bool {
        self.byte_in_flight
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn clicking(&self) -> bool {
        self.click_remaining > 0
    }
}

impl Observable for Vt100Keyboard {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("last_scan.") {
            let row = parse_index(rest).filter(|&r| r < MATRIX_ROWS)?;
            return Some(self.last_scan[row].into());
        }
        match path {
            "scan_position" => Some(self.scan_position.into()),
            "signal_line" => Some(self.signal_line.into()),
            "last_signal_change" => Some(self.last_signal_change.get().into()),
            "rx.idle" => Some((self.receiver.state() == RxState::Idle).into()),
            "rx.cells" => match self.receiver.state() {
                RxState::Frame { cells, .. } => Some(cells.into()),
                RxState::Idle => None,
            },
            "rx.shift" => match self.receiver.state() {
                RxState::Frame { shift, .. } => Some(shift.into()),
                RxState::Idle => None,
            },
            "byte_in_flight" => Some(self.byte_in_flight.into()),
            "pending" => {
                let bytes: Vec<u8> = self.pending.iter().copied().collect();
                Some(Value::from(bytes.as_slice()))
            }
            "click_remaining" => Some(u32::from(self.click_remaining).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "last_scan.<row>",
            "scan_position",
            "signal_line",
            "last_signal_change",
            "rx.idle",
            "rx.cells",
            "rx.shift",
            "byte_in_flight",
            "pending",
            "click_remaining",
        ]
    }
}
