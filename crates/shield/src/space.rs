//! Managed address spaces.
//!
//! An address space pairs the region store that records per-region protection with the
//! primitive that enforces it. A [`Shield`](crate::Shield) borrows the space it mediates.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::{Protection, RegionStore};

/// A managed address space.
///
/// At most one shield may be bound to an address space at a time.
pub struct AddressSpace<S, P> {
    /// The store holding applied modes and shield states for every region.
    arena: S,
    /// The primitive that changes hardware protection.
    protection: P,
    /// Whether a shield is currently bound to this space.
    shielded: AtomicBool,
}

impl<S: RegionStore, P: Protection> AddressSpace<S, P> {
    /// Creates a new address space from a region store and a protection primitive.
    pub fn new(arena: S, protection: P) -> Self {
        Self {
            arena,
            protection,
            shielded: AtomicBool::new(false),
        }
    }

    /// Returns the region store for this address space.
    pub fn arena(&self) -> &S {
        &self.arena
    }

    /// Returns the protection primitive for this address space.
    pub fn protection(&self) -> &P {
        &self.protection
    }

    /// Returns whether a shield is currently bound to this address space.
    pub fn is_shielded(&self) -> bool {
        self.shielded.load(Ordering::Acquire)
    }

    /// Consumes the address space, returning its store and protection primitive.
    pub fn into_parts(self) -> (S, P) {
        (self.arena, self.protection)
    }

    /// Binds a shield to this address space.
    ///
    /// # Panics
    ///
    /// Panics if a shield is already bound.
    pub(crate) fn bind(&self) {
        let bound = self
            .shielded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        assert!(bound, "address space already has a shield");
    }

    /// Releases the shield binding.
    pub(crate) fn unbind(&self) {
        self.shielded.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::PAGE_SIZE;
    use crate::{Address, Arena, PageProtection, ProtectionMode, Region, Shield};

    #[test]
    fn region_state_outlives_shield() {
        let region = Region::from_pages(Address::new(PAGE_SIZE), 1);
        let arena = Arena::new();
        arena.register(region).unwrap();
        let space = AddressSpace::new(arena, PageProtection::new());

        let mut shield = Shield::init(&space);
        shield.raise(region, ProtectionMode::WRITE);
        shield.finish();

        let (arena, protection) = space.into_parts();
        assert_eq!(arena.shield_state(region).mode(), ProtectionMode::WRITE);
        assert_eq!(arena.applied_mode(region), ProtectionMode::WRITE);
        assert_eq!(protection.mode_at(region.base()), ProtectionMode::WRITE);
    }

    #[test]
    fn borrowed_primitive_is_shared() {
        let region = Region::from_pages(Address::new(PAGE_SIZE), 1);
        let arena = Arena::new();
        arena.register(region).unwrap();
        let protection = PageProtection::new();
        let space = AddressSpace::new(arena, &protection);

        let mut shield = Shield::init(&space);
        shield.enter();
        shield.raise(region, ProtectionMode::READ);
        shield.leave();
        shield.finish();

        assert_eq!(protection.apply_count(), 1);
        assert!(!protection.is_armed());
    }
}
