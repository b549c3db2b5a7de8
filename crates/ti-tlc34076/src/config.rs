//! DAC configuration and error type.

use std::fmt;

/// Significant bits per colour channel at the DAC outputs.
///
/// Selected by a board strap on the real part; fixed at machine
/// configuration here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DacBits {
    /// 6-bit DACs (VGA compatible). The two low bits of each channel are dropped.
    Six,
    /// Full 8-bit DACs.
    #[default]
    Eight,
}

impl DacBits {
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Six => 6,
            Self::Eight => 8,
        }
    }

    /// Mask applied to each stored channel byte before it reaches the pen table.
    #[must_use]
    pub const fn channel_mask(self) -> u8 {
        match self {
            Self::Six => 0xFC,
            Self::Eight => 0xFF,
        }
    }
}

impl TryFrom<u8> for DacBits {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            6 => Ok(Self::Six),
            8 => Ok(Self::Eight),
            other => Err(Error::InvalidDacBits(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// DAC depth other than 6 or 8.
    InvalidDacBits(u8),
    /// A saved state that cannot belong to this chip.
    InvalidState(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDacBits(bits) => {
                write!(f, "invalid DAC depth: {bits} bits (expected 6 or 8)")
            }
            Self::InvalidState(reason) => write!(f, "invalid TLC34076 state: {reason}"),
        }
    }
}

impl std::error::Error for Error {}
