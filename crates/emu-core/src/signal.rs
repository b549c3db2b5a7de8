//! Single-wire signal lines between chips and the outside world.

/// Receiver end of a boolean signal line.
///
/// A chip holds its output lines as sinks bound at construction, so it
/// never needs to know what sits on the other end of the wire.
pub trait SignalSink {
    /// Drive the line to `level` (`true` = high / mark).
    fn set_level(&mut self, level: bool);
}

impl<F: FnMut(bool)> SignalSink for F {
    fn set_level(&mut self, level: bool) {
        self(level);
    }
}

/// A sink that records the line instead of forwarding it.
///
/// Useful as a terminator for an unconnected output, and for inspecting
/// what a chip drove onto a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineProbe {
    level: bool,
    transitions: u64,
}

impl LineProbe {
    /// A probe on an idle (high) line.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            level: true,
            transitions: 0,
        }
    }

    #[must_use]
    pub const fn level(&self) -> bool {
        self.level
    }

    /// Number of level changes seen since construction.
    #[must_use]
    pub const fn transitions(&self) -> u64 {
        self.transitions
    }
}

impl Default for LineProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSink for LineProbe {
    fn set_level(&mut self, level: bool) {
        if level != self.level {
            self.level = level;
            self.transitions += 1;
        }
    }
}
