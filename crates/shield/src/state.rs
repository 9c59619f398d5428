//! The per-region shield state word.

use core::fmt;

use crate::ProtectionMode;

/// Packed shield state for one region.
///
/// The word holds two fields:
/// - Bits 0-1: the requested mode, the union of all outstanding raises.
/// - Bits 2-63: the exposure depth, the number of exposes not yet matched by a cover.
///
/// A zero word means nothing is requested and nothing is exposed, which is the state of a
/// freshly registered region.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ShieldState(usize);

impl ShieldState {
    /// Width of the mode field in bits.
    const MODE_BITS: u32 = 2;

    /// Mode field mask (bits 0-1).
    const MODE_MASK: usize = (1 << Self::MODE_BITS) - 1;

    /// Value of one level of exposure in the packed word.
    const DEPTH_UNIT: usize = 1 << Self::MODE_BITS;

    /// Creates a state with no requested mode and no exposure.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Creates a state from its packed representation.
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Returns the packed representation of this state.
    pub const fn to_raw(self) -> usize {
        self.0
    }

    /// Returns the requested mode.
    pub const fn mode(self) -> ProtectionMode {
        ProtectionMode::from_bits_truncate((self.0 & Self::MODE_MASK) as u8)
    }

    /// Returns the exposure depth.
    pub const fn depth(self) -> usize {
        self.0 >> Self::MODE_BITS
    }

    /// Returns whether at least one expose is outstanding.
    pub const fn is_exposed(self) -> bool {
        self.depth() != 0
    }

    /// Returns the state with `mode` added to the requested mode.
    ///
    /// # Panics
    ///
    /// Panics if any flag of `mode` is already requested.
    pub fn raised(self, mode: ProtectionMode) -> Self {
        assert!(
            !self.mode().intersects(mode),
            "protection mode already raised: requested {}, raising {}",
            self.mode(),
            mode
        );
        Self(self.0 | mode.bits() as usize)
    }

    /// Returns the state with `mode` removed from the requested mode.
    ///
    /// # Panics
    ///
    /// Panics if any flag of `mode` is not currently requested.
    pub fn lowered(self, mode: ProtectionMode) -> Self {
        assert!(
            self.mode().contains(mode),
            "protection mode not raised: requested {}, lowering {}",
            self.mode(),
            mode
        );
        Self(self.0 & !(mode.bits() as usize))
    }

    /// Returns the state with one more level of exposure.
    ///
    /// # Panics
    ///
    /// Panics if the depth no longer fits in the word.
    pub fn exposed(self) -> Self {
        match self.0.checked_add(Self::DEPTH_UNIT) {
            Some(raw) => Self(raw),
            None => panic!("exposure depth overflow"),
        }
    }

    /// Returns the state with one level of exposure removed.
    ///
    /// # Panics
    ///
    /// Panics if the region is not exposed.
    pub fn covered(self) -> Self {
        assert!(self.is_exposed(), "cover without matching expose");
        Self(self.0 - Self::DEPTH_UNIT)
    }
}

impl fmt::Debug for ShieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShieldState")
            .field("mode", &self.mode())
            .field("depth", &self.depth())
            .finish()
    }
}
