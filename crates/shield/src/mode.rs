//! Protection modes.
//!
//! A protection mode names the kinds of access that should trap when the mutator touches a
//! region. It is the complement of the usual "permission" view: `NONE` means the region is
//! fully accessible, `READ` means every access traps.

use core::fmt;
use core::ops::{BitAnd, BitOr, Sub};

/// A kind of memory access performed by the mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// A load from memory.
    Read,
    /// A store to memory.
    Write,
}

/// The set of access kinds that trap for a region.
///
/// Stored in the low two bits of a [`ShieldState`](crate::ShieldState), so the set never
/// holds more than the two flags defined here.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ProtectionMode(u8);

impl ProtectionMode {
    /// Read trap bit (bit 0).
    const READ_BIT: u8 = 1 << 0;

    /// Write trap bit (bit 1).
    const WRITE_BIT: u8 = 1 << 1;

    /// Mask of all valid bits.
    const MASK: u8 = Self::READ_BIT | Self::WRITE_BIT;

    /// No access traps.
    pub const NONE: Self = Self(0);

    /// Reads trap.
    pub const READ: Self = Self(Self::READ_BIT);

    /// Writes trap.
    pub const WRITE: Self = Self(Self::WRITE_BIT);

    /// Both reads and writes trap.
    pub const ALL: Self = Self(Self::MASK);

    /// Creates a mode from raw bits, or `None` if any bit outside the mode field is set.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::MASK == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Creates a mode from raw bits, discarding bits outside the mode field.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    /// Returns the raw bits of this mode.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns whether no access traps.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns whether every flag of `other` is present in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns whether `self` and `other` share any flag.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns the flags present in either mode.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns the flags of `self` that are not in `other`.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Returns the flags present in both modes.
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Returns whether the given access traps under this mode.
    ///
    /// Page protection hardware cannot trap reads while letting writes through, so a read
    /// trap covers writes as well.
    pub const fn traps(self, access: Access) -> bool {
        match access {
            Access::Read => self.0 & Self::READ_BIT != 0,
            Access::Write => self.0 != 0,
        }
    }
}

impl BitOr for ProtectionMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitAnd for ProtectionMode {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(rhs)
    }
}

impl Sub for ProtectionMode {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self.difference(rhs)
    }
}

impl fmt::Debug for ProtectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtectionMode({})", self)
    }
}

impl fmt::Display for ProtectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => write!(f, "-"),
            Self::READ => write!(f, "R"),
            Self::WRITE => write!(f, "W"),
            _ => write!(f, "RW"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bits_rejects_out_of_field_bits() {
        assert_eq!(ProtectionMode::from_bits(0b11), Some(ProtectionMode::ALL));
        assert_eq!(ProtectionMode::from_bits(0b100), None);
        assert_eq!(
            ProtectionMode::from_bits_truncate(0b101),
            ProtectionMode::READ
        );
    }

    #[test]
    fn set_operations() {
        let rw = ProtectionMode::READ | ProtectionMode::WRITE;
        assert_eq!(rw, ProtectionMode::ALL);
        assert!(rw.contains(ProtectionMode::WRITE));
        assert!(!ProtectionMode::READ.contains(ProtectionMode::WRITE));
        assert!(ProtectionMode::READ.contains(ProtectionMode::NONE));
        assert_eq!(rw - ProtectionMode::READ, ProtectionMode::WRITE);
        assert_eq!(rw & ProtectionMode::READ, ProtectionMode::READ);
        assert!(!ProtectionMode::READ.intersects(ProtectionMode::WRITE));
    }

    #[test]
    fn read_trap_also_traps_writes() {
        assert!(ProtectionMode::READ.traps(Access::Read));
        assert!(ProtectionMode::READ.traps(Access::Write));
        assert!(!ProtectionMode::WRITE.traps(Access::Read));
        assert!(ProtectionMode::WRITE.traps(Access::Write));
        assert!(!ProtectionMode::NONE.traps(Access::Write));
    }

    #[test]
    fn display_format() {
        assert_eq!(format!("{}", ProtectionMode::NONE), "-");
        assert_eq!(format!("{}", ProtectionMode::READ), "R");
        assert_eq!(format!("{}", ProtectionMode::WRITE), "W");
        assert_eq!(format!("{}", ProtectionMode::ALL), "RW");
        assert_eq!(format!("{:?}", ProtectionMode::ALL), "ProtectionMode(RW)");
    }
}
