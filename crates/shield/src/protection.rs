//! The page protection primitive consumed by the shield.

use crate::{ProtectionMode, Region};

/// A mechanism that changes the hardware protection of memory and arms trap delivery.
///
/// The shield calls [`apply`](Protection::apply) only when the mode it wants differs from
/// the mode recorded in the region store, and records the new mode itself once `apply`
/// returns. Implementations are expected to succeed; a failure to change page permissions
/// leaves the shield unable to uphold its invariants and should panic.
pub trait Protection {
    /// Makes every access kind in `mode` trap for the pages of `region`, and lets every
    /// other kind through.
    fn apply(&self, region: Region, mode: ProtectionMode);

    /// Arms trap delivery for the whole address space at the start of a working section.
    fn enter_section(&self);

    /// Disarms trap delivery at the end of a working section.
    fn leave_section(&self);
}

impl<P: Protection + ?Sized> Protection for &P {
    fn apply(&self, region: Region, mode: ProtectionMode) {
        (**self).apply(region, mode)
    }

    fn enter_section(&self) {
        (**self).enter_section()
    }

    fn leave_section(&self) {
        (**self).leave_section()
    }
}
