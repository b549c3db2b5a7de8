//! Core traits and types for peripheral chip emulation.
//!
//! Every chip is stepped by the owning machine's scheduler. Time is a count
//! of master clock ticks and only ever moves forward.

mod bus;
mod clock;
mod observable;
mod signal;
mod ticks;

pub use bus::Bus;
pub use clock::MasterClock;
pub use observable::{Observable, Value, parse_index};
pub use signal::{LineProbe, SignalSink};
pub use ticks::Ticks;
