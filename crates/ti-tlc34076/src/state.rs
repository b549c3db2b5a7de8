//! Save state support.

use serde::{Deserialize, Serialize};

use crate::{DacBits, Error, PALETTE_ENTRIES, Tlc34076};

/// Complete TLC34076 state.
///
/// The pen table is derived data and is rebuilt on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tlc34076State {
    pub regs: [u8; 16],
    pub red: Vec<u8>,
    pub green: Vec<u8>,
    pub blue: Vec<u8>,
    pub write_index: u8,
    pub read_index: u8,
    pub write_slot: u8,
    pub read_slot: u8,
    pub staging: [u8; 3],
    pub read_latch: [u8; 3],
    pub dac_bits: u8,
}

impl Tlc34076 {
    /// Capture the chip's state.
    #[must_use]
    pub fn save_state(&self) -> Tlc34076State {
        Tlc34076State {
            regs: self.regs,
            red: self.palette[0].to_vec(),
            green: self.palette[1].to_vec(),
            blue: self.palette[2].to_vec(),
            write_index: self.write_index,
            read_index: self.read_index,
            write_slot: self.write_slot,
            read_slot: self.read_slot,
            staging: self.staging,
            read_latch: self.read_latch,
            dac_bits: self.dac_bits.bits(),
        }
    }

    /// Restore a previously captured state.
    ///
    /// The chip is left untouched if the state is rejected.
    pub fn load_state(&mut self, state: &Tlc34076State) -> Result<(), Error> {
        let dac_bits = DacBits::try_from(state.dac_bits)?;
        let channels = [&state.red, &state.green, &state.blue];
        if channels.iter().any(|c| c.len() != PALETTE_ENTRIES) {
            return Err(Error::InvalidState("palette channel is not 256 entries"));
        }
        if state.write_slot > 2 || state.read_slot > 2 {
            return Err(Error::InvalidState("triplet slot out of range"));
        }

        self.regs = state.regs;
        for (dst, src) in self.palette.iter_mut().zip(channels) {
            dst.copy_from_slice(src);
        }
        self.write_index = state.write_index;
        self.read_index = state.read_index;
        self.write_slot = state.write_slot;
        self.read_slot = state.read_slot;
        self.staging = state.staging;
        self.read_latch = state.read_latch;
        self.set_dac_bits(dac_bits);
        Ok(())
    }
}
