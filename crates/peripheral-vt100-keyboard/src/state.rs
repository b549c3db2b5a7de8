//! Save state support.

use emu_core::Ticks;
use serde::{Deserialize, Serialize};

use crate::receiver::{FRAME_CELLS, RxState};
use crate::{Error, MATRIX_ROWS, PENDING_CAPACITY, Vt100Keyboard};

/// Complete keyboard state. Collaborators and timing configuration are
/// wiring, not state, and are not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vt100KeyboardState {
    pub scan_position: u8,
    pub last_scan: [u8; MATRIX_ROWS],
    pub signal_line: bool,
    pub last_signal_change: Ticks,
    pub receiver: RxState,
    pub byte_in_flight: bool,
    pub pending: Vec<u8>,
    pub click_remaining: u16,
}

impl Vt100Keyboard {
    #[must_use]
    pub fn save_state(&self) -> Vt100KeyboardState {
        Vt100KeyboardState {
            scan_position: self.scan_position,
            last_scan: self.last_scan,
            signal_line: self.signal_line,
            last_signal_change: self.last_signal_change,
            receiver: self.receiver.state(),
            byte_in_flight: self.byte_in_flight,
            pending: self.pending.iter().copied().collect(),
            click_remaining: self.click_remaining,
        }
    }

    /// Restore a previously captured state.
    ///
    /// The tone generator is driven to match the restored click. The
    /// keyboard is left untouched if the state is rejected.
    pub fn load_state(&mut self, state: &Vt100KeyboardState) -> Result<(), Error> {
        if usize::from(state.scan_position) >= MATRIX_ROWS {
            return Err(Error::InvalidState("scan position out of range"));
        }
        if state.pending.len() > PENDING_CAPACITY {
            return Err(Error::InvalidState("too many pending scan bytes"));
        }
        if !state.pending.is_empty() && !state.byte_in_flight {
            return Err(Error::InvalidState("pending scan bytes with none in flight"));
        }
        if let RxState::Frame { cells, .. } = state.receiver {
            if cells >= FRAME_CELLS {
                return Err(Error::InvalidState("receiver past the stop bit"));
            }
        }

        self.scan_position = state.scan_position;
        self.last_scan = state.last_scan;
        self.signal_line = state.signal_line;
        self.last_signal_change = state.last_signal_change;
        self.receiver.set_state(state.receiver);
        self.byte_in_flight = state.byte_in_flight;
        self.pending.clear();
        self.overflowing = false;
        for &byte in &state.pending {
            // Length checked above.
            let _ = self.pending.push_back(byte);
        }
        self.click_remaining = state.click_remaining;
        self.tone.set_enabled(self.click_remaining > 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyMatrix, KeyMatrixState, frame_edges};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn keyboard(matrix: &Rc<RefCell<KeyMatrixState>>, sent: &Rc<RefCell<Vec<u8>>>) -> Vt100Keyboard {
        let matrix = Rc::clone(matrix);
        let sent = Rc::clone(sent);
        Vt100Keyboard::builder()
            .matrix(move |row: u8| matrix.borrow().row(row))
            .framer(move |byte: u8| sent.borrow_mut().push(byte))
            .build()
            .expect("keyboard")
    }

    #[test]
    fn round_trip_mid_frame_with_queue() {
        let matrix = Rc::new(RefCell::new(KeyMatrixState::new()));
        let sent = Rc::new(RefCell::new(Vec::new()));
        let mut kbd = keyboard(&matrix, &sent);
        matrix.borrow_mut().press(1, 2);
        matrix.borrow_mut().press(6, 7);
        for row in 0..16 {
            kbd.on_scan_tick(row, Ticks::ZERO);
        }
        let period = kbd.config().bit_period;
        let start = Ticks::new(50_000);
        let edges = frame_edges(0x80, start, period);
        kbd.on_signal_line_change(edges[0].1, edges[0].0);

        let state = kbd.save_state();
        let bytes = rmp_serde::to_vec(&state).expect("serialize");
        let decoded: Vt100KeyboardState = rmp_serde::from_slice(&bytes).expect("deserialize");
        assert_eq!(decoded, state);

        let other_sent = Rc::new(RefCell::new(Vec::new()));
        let mut restored = keyboard(&matrix, &other_sent);
        restored.load_state(&decoded).expect("load");
        assert_eq!(restored.save_state(), state);

        // The restored keyboard finishes the frame and drains the queue.
        restored.on_signal_line_change(edges[1].1, edges[1].0);
        restored.poll_receiver(start + period * 10);
        assert!(restored.clicking());
        restored.on_framer_byte_sent();
        assert_eq!(*other_sent.borrow(), vec![0xB7]);
    }

    #[test]
    fn rejects_overfull_queue() {
        let matrix = Rc::new(RefCell::new(KeyMatrixState::new()));
        let sent = Rc::new(RefCell::new(Vec::new()));
        let mut kbd = keyboard(&matrix, &sent);
        let mut state = kbd.save_state();
        state.byte_in_flight = true;
        state.pending = vec![0; PENDING_CAPACITY + 1];
        assert!(matches!(kbd.load_state(&state), Err(Error::InvalidState(_))));
        assert_eq!(kbd.pending_len(), 0);
    }

    #[test]
    fn rejects_receiver_past_stop_bit() {
        let matrix = Rc::new(RefCell::new(KeyMatrixState::new()));
        let sent = Rc::new(RefCell::new(Vec::new()));
        let mut kbd = keyboard(&matrix, &sent);
        let mut state = kbd.save_state();
        state.receiver = RxState::Frame { cells: 10, shift: 0 };
        assert!(kbd.load_state(&state).is_err());
    }
}
