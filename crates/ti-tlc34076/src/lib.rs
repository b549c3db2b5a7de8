//! Texas Instruments TLC34076 video interface palette.
//!
//! A RAMDAC: 256 entries of 24-bit colour, loaded and read back through an
//! auto-incrementing triplet port, plus a small bank of control registers.
//! The same register interface is shared with the Brooktree Bt47x family.
//!
//! # Register map (16 registers, offset masked to 4 bits)
//!
//! | Reg | Name               | Reset |
//! |-----|--------------------|-------|
//! | 0x0 | Palette write addr | 0x00  |
//! | 0x1 | Palette data       | -     |
//! | 0x2 | Pixel read mask    | 0xFF  |
//! | 0x3 | Palette read addr  | 0x00  |
//! | 0x8 | General control    | 0x03  |
//! | 0x9 | Input clock select | 0x00  |
//! | 0xA | Output clock select| 0x3F  |
//! | 0xB | Mux control        | 0x2D  |
//! | 0xC | Palette page       | 0x00  |
//! | 0xE | Test register      | 0x00  |
//! | 0xF | Reset state        | 0x00  |
//!
//! Offsets 0x4-0x7 and 0xD are plain storage and read back the last value
//! written. The control registers are stored but do not alter the colour
//! path here, except the pixel read mask used by [`Tlc34076::lookup`].
//!
//! # Palette port
//!
//! Writing the write address selects an entry and restarts the triplet.
//! Three writes to the data port (red, green, blue) commit the entry and
//! advance the write address. Reads work the same way from the read
//! address: the entry is latched on the first byte, and the read address
//! advances after the third.

mod config;
mod state;

pub use config::{DacBits, Error};
pub use state::Tlc34076State;

use emu_core::{Bus, Observable, Value, parse_index};
use log::{debug, trace};

pub const PALETTE_WRITE_ADDR: u8 = 0x00;
pub const PALETTE_DATA: u8 = 0x01;
pub const PIXEL_MASK: u8 = 0x02;
pub const PALETTE_READ_ADDR: u8 = 0x03;
pub const GENERAL_CONTROL: u8 = 0x08;
pub const INPUT_CLOCK_SEL: u8 = 0x09;
pub const OUTPUT_CLOCK_SEL: u8 = 0x0A;
pub const MUX_CONTROL: u8 = 0x0B;
pub const PALETTE_PAGE: u8 = 0x0C;
pub const TEST_REGISTER: u8 = 0x0E;
pub const RESET_STATE: u8 = 0x0F;

/// Number of palette entries.
pub const PALETTE_ENTRIES: usize = 256;

/// Register file contents after reset.
const RESET_REGS: [u8; 16] = [
    0x00, 0x00, 0xFF, 0x00, // write addr, data, pixel mask, read addr
    0x00, 0x00, 0x00, 0x00, // overlay / reserved
    0x03, 0x00, 0x3F, 0x2D, // general control, input clock, output clock, mux
    0x00, 0x00, 0x00, 0x00, // palette page, reserved, test, reset state
];

/// Pack one colour into the ARGB32 format used by the framebuffers.
#[must_use]
pub const fn pack_argb(r: u8, g: u8, b: u8) -> u32 {
    0xFF00_0000 | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// TLC34076 palette chip.
pub struct Tlc34076 {
    regs: [u8; 16],
    /// Red, green and blue palette RAM, indexed by entry.
    palette: [[u8; PALETTE_ENTRIES]; 3],
    /// Rendering-facing colours, kept in step with `palette` and `dac_bits`.
    pens: [u32; PALETTE_ENTRIES],
    write_index: u8,
    read_index: u8,
    /// Next channel (0-2) of the triplet being written.
    write_slot: u8,
    /// Next channel (0-2) of the triplet being read.
    read_slot: u8,
    staging: [u8; 3],
    read_latch: [u8; 3],
    dac_bits: DacBits,
    /// Set whenever a pen changes; cleared by the renderer.
    dirty: bool,
}

impl Tlc34076 {
    #[must_use]
    pub fn new(dac_bits: DacBits) -> Self {
        Self {
            regs: RESET_REGS,
            palette: [[0; PALETTE_ENTRIES]; 3],
            pens: [pack_argb(0, 0, 0); PALETTE_ENTRIES],
            write_index: 0,
            read_index: 0,
            write_slot: 0,
            read_slot: 0,
            staging: [0; 3],
            read_latch: [0; 3],
            dac_bits,
            dirty: true,
        }
    }

    /// Return the register file and both cursors to their power-on values.
    ///
    /// Palette RAM is not cleared, matching the hardware.
    pub fn reset(&mut self) {
        debug!("tlc34076: reset");
        self.set_pixel_mask(RESET_REGS[PIXEL_MASK as usize]);
        self.regs = RESET_REGS;
        self.write_index = 0;
        self.read_index = 0;
        self.write_slot = 0;
        self.read_slot = 0;
        self.staging = [0; 3];
        self.read_latch = [0; 3];
    }

    pub fn read(&mut self, offset: u8) -> u8 {
        match offset & 0x0F {
            PALETTE_WRITE_ADDR => self.write_index,
            PALETTE_READ_ADDR => self.read_index,
            PALETTE_DATA => self.read_palette_data(),
            reg => self.regs[reg as usize],
        }
    }

    pub fn write(&mut self, offset: u8, value: u8) {
        let reg = offset & 0x0F;
        match reg {
            PALETTE_WRITE_ADDR => {
                self.write_index = value;
                self.write_slot = 0;
            }
            PALETTE_READ_ADDR => {
                self.read_index = value;
                self.read_slot = 0;
            }
            PALETTE_DATA => {
                self.regs[reg as usize] = value;
                self.write_palette_data(value);
            }
            PIXEL_MASK => self.set_pixel_mask(value),
            RESET_STATE => self.reset(),
            _ => self.regs[reg as usize] = value,
        }
    }

    /// Store the pixel read mask, marking the output dirty if it changed.
    fn set_pixel_mask(&mut self, mask: u8) {
        let slot = &mut self.regs[PIXEL_MASK as usize];
        if *slot != mask {
            *slot = mask;
            self.dirty = true;
        }
    }

    fn read_palette_data(&mut self) -> u8 {
        if self.read_slot == 0 {
            let entry = self.read_index as usize;
            self.read_latch = [
                self.palette[0][entry],
                self.palette[1][entry],
                self.palette[2][entry],
            ];
        }
        let value = self.read_latch[self.read_slot as usize];
        self.read_slot += 1;
        if self.read_slot == 3 {
            self.read_slot = 0;
            self.read_index = self.read_index.wrapping_add(1);
        }
        value
    }

    fn write_palette_data(&mut self, value: u8) {
        self.staging[self.write_slot as usize] = value;
        self.write_slot += 1;
        if self.write_slot == 3 {
            let entry = self.write_index;
            for (channel, &byte) in self.palette.iter_mut().zip(&self.staging) {
                channel[entry as usize] = byte;
            }
            trace!(
                "tlc34076: entry {entry:#04X} = ({:#04X}, {:#04X}, {:#04X})",
                self.staging[0],
                self.staging[1],
                self.staging[2]
            );
            self.update_pen(entry);
            self.write_slot = 0;
            self.write_index = entry.wrapping_add(1);
        }
    }

    /// Recompute the rendering-facing colour of one entry.
    pub fn update_pen(&mut self, entry: u8) {
        let i = entry as usize;
        let mask = self.dac_bits.channel_mask();
        self.pens[i] = pack_argb(
            self.palette[0][i] & mask,
            self.palette[1][i] & mask,
            self.palette[2][i] & mask,
        );
        self.dirty = true;
    }

    /// Change the DAC depth and rebuild the whole pen table.
    pub fn set_dac_bits(&mut self, dac_bits: DacBits) {
        debug!("tlc34076: {}-bit DAC", dac_bits.bits());
        self.dac_bits = dac_bits;
        for entry in 0..=u8::MAX {
            self.update_pen(entry);
        }
    }

    #[must_use]
    pub fn dac_bits(&self) -> DacBits {
        self.dac_bits
    }

    #[must_use]
    pub fn write_index(&self) -> u8 {
        self.write_index
    }

    #[must_use]
    pub fn read_index(&self) -> u8 {
        self.read_index
    }

    /// Stored (untruncated) colour of an entry.
    #[must_use]
    pub fn entry(&self, entry: u8) -> (u8, u8, u8) {
        let i = entry as usize;
        (self.palette[0][i], self.palette[1][i], self.palette[2][i])
    }

    /// Rendering-facing ARGB32 colour of an entry.
    #[must_use]
    pub fn pen(&self, entry: u8) -> u32 {
        self.pens[entry as usize]
    }

    #[must_use]
    pub fn pens(&self) -> &[u32; PALETTE_ENTRIES] {
        &self.pens
    }

    /// Returns whether any pen or the pixel mask changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Colour output for a pixel value, after the pixel read mask.
    #[must_use]
    pub fn lookup(&self, pixel: u8) -> u32 {
        self.pens[(pixel & self.regs[PIXEL_MASK as usize]) as usize]
    }
}

impl Default for Tlc34076 {
    fn default() -> Self {
        Self::new(DacBits::default())
    }
}

impl Bus for Tlc34076 {
    fn read(&mut self, address: u16) -> u8 {
        Tlc34076::read(self, address as u8)
    }

    fn write(&mut self, address: u16, value: u8) {
        Tlc34076::write(self, address as u8, value);
    }
}

impl Observable for Tlc34076 {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("regs.") {
            let reg = parse_index(rest).filter(|&r| r < 16)?;
            let value = match reg as u8 {
                PALETTE_WRITE_ADDR => self.write_index,
                PALETTE_READ_ADDR => self.read_index,
                _ => self.regs[reg],
            };
            return Some(value.into());
        }
        if let Some(rest) = path.strip_prefix("palette.") {
            let entry = parse_index(rest).filter(|&e| e < PALETTE_ENTRIES)?;
            let (r, g, b) = self.entry(entry as u8);
            return Some(Value::from(&[r, g, b][..]));
        }
        if let Some(rest) = path.strip_prefix("pen.") {
            let entry = parse_index(rest).filter(|&e| e < PALETTE_ENTRIES)?;
            return Some(self.pens[entry].into());
        }
        match path {
            "write_index" => Some(self.write_index.into()),
            "read_index" => Some(self.read_index.into()),
            "write_slot" => Some(self.write_slot.into()),
            "read_slot" => Some(self.read_slot.into()),
            "pixel_mask" => Some(self.regs[PIXEL_MASK as usize].into()),
            "dac_bits" => Some(self.dac_bits.bits().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "regs.<0-15>",
            "palette.<entry>",
            "pen.<entry>",
            "write_index",
            "read_index",
            "write_slot",
            "read_slot",
            "pixel_mask",
            "dac_bits",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(chip: &mut Tlc34076, entry: u8, rgb: [u8; 3]) {
        chip.write(PALETTE_WRITE_ADDR, entry);
        for byte in rgb {
            chip.write(PALETTE_DATA, byte);
        }
    }

    #[test]
    fn triplet_commits_on_third_byte() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        chip.write(PALETTE_DATA, 0x10);
        chip.write(PALETTE_DATA, 0x20);
        assert_eq!(chip.entry(0), (0, 0, 0), "entry must not change mid-triplet");
        assert_eq!(chip.write_index(), 0);

        chip.write(PALETTE_DATA, 0x30);
        assert_eq!(chip.entry(0), (0x10, 0x20, 0x30));
        assert_eq!(chip.pen(0), 0xFF10_2030);
        assert_eq!(chip.write_index(), 1);
    }

    #[test]
    fn write_address_restarts_triplet() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        chip.write(PALETTE_DATA, 0xAA);
        chip.write(PALETTE_WRITE_ADDR, 0x40);
        load(&mut chip, 0x40, [1, 2, 3]);
        assert_eq!(chip.entry(0x40), (1, 2, 3));
        assert_eq!(chip.entry(0), (0, 0, 0));
    }

    #[test]
    fn read_back_advances_read_index() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        load(&mut chip, 7, [0x11, 0x22, 0x33]);
        chip.write(PALETTE_READ_ADDR, 7);
        assert_eq!(chip.read(PALETTE_DATA), 0x11);
        assert_eq!(chip.read_index(), 7);
        assert_eq!(chip.read(PALETTE_DATA), 0x22);
        assert_eq!(chip.read(PALETTE_DATA), 0x33);
        assert_eq!(chip.read_index(), 8);
    }

    #[test]
    fn read_latches_whole_entry() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        load(&mut chip, 0, [0x11, 0x22, 0x33]);
        chip.write(PALETTE_READ_ADDR, 0);
        assert_eq!(chip.read(PALETTE_DATA), 0x11);
        // Rewriting the entry mid-read does not tear the latched triplet.
        load(&mut chip, 0, [0x44, 0x55, 0x66]);
        assert_eq!(chip.read(PALETTE_DATA), 0x22);
        assert_eq!(chip.read(PALETTE_DATA), 0x33);
    }

    #[test]
    fn six_bit_dac_drops_low_bits() {
        let mut chip = Tlc34076::new(DacBits::Six);
        load(&mut chip, 3, [0xFF, 0x81, 0x02]);
        assert_eq!(chip.pen(3), pack_argb(0xFC, 0x80, 0x00));
        assert_eq!(chip.entry(3), (0xFF, 0x81, 0x02));
    }

    #[test]
    fn changing_depth_rebuilds_pens() {
        let mut chip = Tlc34076::new(DacBits::Six);
        load(&mut chip, 0, [0x13, 0x57, 0x9B]);
        load(&mut chip, 255, [0x03, 0x03, 0x03]);
        chip.set_dac_bits(DacBits::Eight);
        assert_eq!(chip.pen(0), pack_argb(0x13, 0x57, 0x9B));
        assert_eq!(chip.pen(255), pack_argb(0x03, 0x03, 0x03));
        chip.set_dac_bits(DacBits::Six);
        assert_eq!(chip.pen(255), pack_argb(0, 0, 0));
    }

    #[test]
    fn commit_marks_pens_dirty() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        assert!(chip.take_dirty());
        assert!(!chip.take_dirty());
        chip.write(PALETTE_DATA, 1);
        chip.write(PALETTE_DATA, 2);
        assert!(!chip.take_dirty());
        chip.write(PALETTE_DATA, 3);
        assert!(chip.take_dirty());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        for reg in 0..16 {
            chip.write(reg, 0x5A);
        }
        chip.reset();
        assert_eq!(chip.write_index(), 0);
        assert_eq!(chip.read_index(), 0);
        assert_eq!(chip.read(PIXEL_MASK), 0xFF);
        assert_eq!(chip.read(GENERAL_CONTROL), 0x03);
        assert_eq!(chip.read(INPUT_CLOCK_SEL), 0x00);
        assert_eq!(chip.read(OUTPUT_CLOCK_SEL), 0x3F);
        assert_eq!(chip.read(MUX_CONTROL), 0x2D);
        assert_eq!(chip.read(PALETTE_PAGE), 0x00);
        assert_eq!(chip.read(TEST_REGISTER), 0x00);
        assert_eq!(chip.read(RESET_STATE), 0x00);
    }

    #[test]
    fn reset_register_write_resets_chip() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        chip.write(MUX_CONTROL, 0x00);
        chip.write(PALETTE_DATA, 0x77);
        chip.write(RESET_STATE, 0xA5);
        assert_eq!(chip.read(MUX_CONTROL), 0x2D);
        assert_eq!(chip.read(RESET_STATE), 0x00);
        // The partial triplet was discarded: three fresh bytes commit entry 0.
        for byte in [1, 2, 3] {
            chip.write(PALETTE_DATA, byte);
        }
        assert_eq!(chip.entry(0), (1, 2, 3));
    }

    #[test]
    fn reset_keeps_palette_ram() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        load(&mut chip, 9, [9, 8, 7]);
        chip.reset();
        assert_eq!(chip.entry(9), (9, 8, 7));
        assert_eq!(chip.pen(9), pack_argb(9, 8, 7));
    }

    #[test]
    fn undefined_registers_read_back_last_write() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        chip.write(0x05, 0xC3);
        chip.write(0x0D, 0x3C);
        assert_eq!(chip.read(0x05), 0xC3);
        assert_eq!(chip.read(0x0D), 0x3C);
    }

    #[test]
    fn offset_is_masked_to_four_bits() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        chip.write(0x12, 0x0F); // pixel mask
        assert_eq!(chip.read(PIXEL_MASK), 0x0F);
        assert_eq!(chip.read(0xF2), 0x0F);
    }

    #[test]
    fn lookup_applies_pixel_mask() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        load(&mut chip, 0x05, [0x50, 0x50, 0x50]);
        load(&mut chip, 0x35, [0x35, 0x35, 0x35]);
        assert_eq!(chip.lookup(0x35), pack_argb(0x35, 0x35, 0x35));
        chip.write(PIXEL_MASK, 0x0F);
        assert_eq!(chip.lookup(0x35), pack_argb(0x50, 0x50, 0x50));
    }

    #[test]
    fn pixel_mask_change_marks_output_dirty() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        load(&mut chip, 0x35, [0x35, 0x35, 0x35]);
        chip.take_dirty();

        chip.write(PIXEL_MASK, 0x0F);
        assert_eq!(chip.lookup(0x35), pack_argb(0, 0, 0));
        assert!(chip.take_dirty());

        chip.write(PIXEL_MASK, 0x0F);
        assert!(!chip.take_dirty(), "same mask rewritten");

        chip.write(RESET_STATE, 0);
        assert_eq!(chip.lookup(0x35), pack_argb(0x35, 0x35, 0x35));
        assert!(chip.take_dirty());

        chip.reset();
        assert!(!chip.take_dirty(), "mask already at its reset value");
    }

    #[test]
    fn bus_trait_routes_to_registers() {
        let mut chip = Tlc34076::new(DacBits::Eight);
        let bus: &mut dyn Bus = &mut chip;
        bus.write(0x0001, 0x10);
        bus.write(0x0011, 0x20);
        bus.write(0xFFF1, 0x30);
        assert_eq!(bus.read(0x0000), 1);
        assert_eq!(chip.entry(0), (0x10, 0x20, 0x30));
    }

    #[test]
    fn observable_paths() {
        let mut chip = Tlc34076::new(DacBits::Six);
        load(&mut chip, 0x11, [0xAB, 0xCD, 0xEF]);
        assert_eq!(chip.query("write_index"), Some(Value::U8(0x12)));
        assert_eq!(chip.query("dac_bits"), Some(Value::U8(6)));
        assert_eq!(chip.query("regs.0xB"), Some(Value::U8(0x2D)));
        assert_eq!(
            chip.query("palette.0x11"),
            Some(Value::Array(vec![Value::U8(0xAB), Value::U8(0xCD), Value::U8(0xEF)]))
        );
        assert_eq!(chip.query("pen.17"), Some(Value::U32(pack_argb(0xA8, 0xCC, 0xEC))));
        assert_eq!(chip.query("regs.16"), None);

        chip.write(PALETTE_READ_ADDR, 0x40);
        assert_eq!(chip.query("regs.0"), Some(Value::U8(0x12)));
        assert_eq!(chip.query("regs.3"), Some(Value::U8(0x40)));
        assert_eq!(chip.query("nonsense"), None);
    }
}
