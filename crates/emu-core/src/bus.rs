//! Register-port bus interface.

/// A chip's register port as seen from the host bus.
///
/// The host's address decoder has already selected the chip; `address` is
/// the offset within the chip's register window. Implementations mask the
/// offset to their own window instead of rejecting it, so every access
/// produces a defined byte.
pub trait Bus {
    /// Read a register. Reads may have side effects (auto-incrementing ports).
    fn read(&mut self, address: u16) -> u8;

    /// Write a register.
    fn write(&mut self, address: u16, value: u8);
}
