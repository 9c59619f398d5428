//! The shield: reconciles requested protection with applied protection.
//!
//! The collector asks for protection with [`Shield::raise`] and withdraws it with
//! [`Shield::lower`]. Inside a working section ([`Shield::enter`] .. [`Shield::leave`]) it
//! may temporarily strip protection from a region with [`Shield::expose`] to read or write
//! it directly, and put it back with [`Shield::cover`]. Exposes nest.
//!
//! # Invariant
//!
//! For every region, the applied mode is a subset of the requested mode. Whenever a region
//! has no outstanding exposes, the two are equal.
//!
//! # Lazy cover
//!
//! [`Shield::leave`] does not walk the arena to re-protect regions left exposed. Such a
//! region stays unprotected (which only weakens trapping, so the invariant holds) until the
//! next raise, lower or cover on it, or until [`Shield::synchronize`] is called.

use crate::{AddressSpace, Protection, ProtectionMode, Region, RegionStore};

/// The shield for one address space.
///
/// Every contract violation (double enter, cover without expose, raising a flag twice, ...)
/// is a bug in the collector and panics.
pub struct Shield<'a, S: RegionStore, P: Protection> {
    /// The address space whose regions this shield mediates.
    space: &'a AddressSpace<S, P>,
    /// Whether a working section is active.
    inside: bool,
}

impl<'a, S: RegionStore, P: Protection> Shield<'a, S, P> {
    /// Binds a new shield to `space`, outside any working section.
    ///
    /// Region state is left untouched.
    ///
    /// # Panics
    ///
    /// Panics if another shield is bound to `space`.
    pub fn init(space: &'a AddressSpace<S, P>) -> Self {
        space.bind();
        log::debug!("shield: init");
        Self {
            space,
            inside: false,
        }
    }

    /// Unbinds the shield from its address space.
    ///
    /// # Panics
    ///
    /// Panics if a working section is still active.
    pub fn finish(self) {
        assert!(!self.inside, "shield finished inside a working section");
        log::debug!("shield: finish");
    }

    /// Returns the address space this shield is bound to.
    pub fn space(&self) -> &'a AddressSpace<S, P> {
        self.space
    }

    /// Returns whether a working section is active.
    pub fn is_inside(&self) -> bool {
        self.inside
    }

    /// Adds `mode` to the protection requested for `region`.
    ///
    /// Hardware protection follows immediately unless the region is exposed, in which case
    /// it is applied by the cover that ends the exposure.
    ///
    /// # Panics
    ///
    /// Panics if any flag of `mode` is already requested for `region`.
    pub fn raise(&mut self, region: Region, mode: ProtectionMode) {
        let arena = self.space.arena();
        let state = arena.shield_state(region).raised(mode);
        arena.set_shield_state(region, state);
        log::trace!("shield: raise {} +{} -> {:?}", region, mode, state);

        if !state.is_exposed() {
            self.protect(region, state.mode());
        }
        self.check_subset(region);
    }

    /// Removes `mode` from the protection requested for `region`.
    ///
    /// # Panics
    ///
    /// Panics if any flag of `mode` is not currently requested for `region`.
    pub fn lower(&mut self, region: Region, mode: ProtectionMode) {
        let arena = self.space.arena();
        let state = arena.shield_state(region).lowered(mode);
        arena.set_shield_state(region, state);
        log::trace!("shield: lower {} -{} -> {:?}", region, mode, state);

        // Only ever relaxes protection.
        if !state.is_exposed() {
            self.protect(region, state.mode());
        }
        self.check_subset(region);
    }

    /// Begins a working section, arming trap delivery for the address space.
    ///
    /// # Panics
    ///
    /// Panics if a working section is already active.
    pub fn enter(&mut self) {
        assert!(!self.inside, "shield entered while already inside");
        self.space.protection().enter_section();
        self.inside = true;
        log::debug!("shield: enter");
    }

    /// Ends the working section.
    ///
    /// Regions still exposed are not re-protected here; see the module documentation.
    ///
    /// # Panics
    ///
    /// Panics if no working section is active.
    pub fn leave(&mut self) {
        assert!(self.inside, "shield left while not inside");
        self.inside = false;
        self.space.protection().leave_section();
        log::debug!("shield: leave");
    }

    /// Strips hardware protection from `region` so the collector can access it directly.
    ///
    /// # Panics
    ///
    /// Panics outside a working section, or if the exposure depth overflows.
    pub fn expose(&mut self, region: Region) {
        assert!(self.inside, "expose outside a working section");

        let arena = self.space.arena();
        let state = arena.shield_state(region).exposed();
        arena.set_shield_state(region, state);
        log::trace!("shield: expose {} -> {:?}", region, state);

        self.protect(region, ProtectionMode::NONE);
    }

    /// Ends one level of exposure of `region`.
    ///
    /// When the last level ends, hardware protection is restored to the requested mode.
    ///
    /// # Panics
    ///
    /// Panics outside a working section, if `region` has no outstanding expose, or if its
    /// applied protection is not `NONE`.
    pub fn cover(&mut self, region: Region) {
        assert!(self.inside, "cover outside a working section");

        let arena = self.space.arena();
        let state = arena.shield_state(region).covered();
        assert!(
            arena.applied_mode(region).is_empty(),
            "cover of region {} whose protection is applied",
            region
        );
        arena.set_shield_state(region, state);
        log::trace!("shield: cover {} -> {:?}", region, state);

        if !state.is_exposed() {
            self.protect(region, state.mode());
        }
        self.check_subset(region);
    }

    /// Re-applies the requested mode of every region that is not exposed.
    ///
    /// This is the eager counterpart of the lazy cover policy. Returns the number of regions
    /// whose hardware protection changed.
    pub fn synchronize(&mut self) -> usize {
        let arena = self.space.arena();
        let mut changed = 0;
        for region in arena.regions() {
            let state = arena.shield_state(region);
            if !state.is_exposed() && self.protect(region, state.mode()) {
                changed += 1;
            }
        }
        log::debug!("shield: synchronized {} regions", changed);
        changed
    }

    /// Applies `mode` to `region` unless it is already applied.
    ///
    /// Returns whether the protection primitive was called.
    fn protect(&self, region: Region, mode: ProtectionMode) -> bool {
        let arena = self.space.arena();
        if arena.applied_mode(region) == mode {
            return false;
        }

        #[cfg(feature = "detailed-logging")]
        log::trace!(
            "shield: apply {} {} -> {}",
            region,
            arena.applied_mode(region),
            mode
        );

        self.space.protection().apply(region, mode);
        arena.set_applied_mode(region, mode);
        true
    }

    fn check_subset(&self, region: Region) {
        if cfg!(debug_assertions) {
            let arena = self.space.arena();
            let requested = arena.shield_state(region).mode();
            assert!(
                requested.contains(arena.applied_mode(region)),
                "applied protection of {} exceeds requested protection",
                region
            );
        }
    }
}

impl<S: RegionStore, P: Protection> Drop for Shield<'_, S, P> {
    fn drop(&mut self) {
        if self.inside {
            log::error!("shield dropped inside a working section");
            self.inside = false;
            self.space.protection().leave_section();
        }
        self.space.unbind();
    }
}
