//! Per-region protection bookkeeping.
//!
//! The shield does not own any per-region state. It reads and writes two values for each
//! region through the [`RegionStore`] trait:
//! - the *applied* mode, the protection the hardware currently enforces, and
//! - the *shield state*, the requested mode and exposure depth packed into a
//!   [`ShieldState`].
//!
//! [`Arena`] is the in-memory store used by this crate: a registry of non-overlapping
//! regions keyed by base address.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use spin::Mutex;

use crate::{Address, ProtectionMode, Region, ShieldState};

/// Storage for the protection state of every shieldable region.
///
/// Each call reads or replaces one value of one region atomically. Passing a region that is
/// not registered is a contract violation and may panic.
pub trait RegionStore {
    /// Returns the protection currently applied to `region`.
    fn applied_mode(&self, region: Region) -> ProtectionMode;

    /// Records the protection currently applied to `region`.
    fn set_applied_mode(&self, region: Region, mode: ProtectionMode);

    /// Returns the shield state of `region`.
    fn shield_state(&self, region: Region) -> ShieldState;

    /// Replaces the shield state of `region`.
    fn set_shield_state(&self, region: Region, state: ShieldState);

    /// Returns every registered region, ordered by base address.
    fn regions(&self) -> Vec<Region>;
}

/// Errors returned by [`Arena`] registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// The region intersects a region that is already registered.
    Overlap,
    /// No region with this exact extent is registered.
    NotRegistered,
    /// The region is still raised or exposed and cannot be removed.
    Shielded,
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlap => write!(f, "region overlaps a registered region"),
            Self::NotRegistered => write!(f, "region is not registered"),
            Self::Shielded => write!(f, "region is still shielded"),
        }
    }
}

/// Bookkeeping for one registered region.
#[derive(Debug, Clone, Copy)]
struct Segment {
    region: Region,
    applied: ProtectionMode,
    shield: ShieldState,
}

/// An in-memory registry of shieldable regions.
#[derive(Default)]
pub struct Arena {
    segments: Mutex<BTreeMap<Address, Segment>>,
}

impl Arena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `region` with no requested protection and no exposure.
    ///
    /// The region is assumed to be unprotected in hardware when it is registered.
    pub fn register(&self, region: Region) -> Result<(), ArenaError> {
        let mut segments = self.segments.lock();

        let below = segments.range(..region.limit()).next_back();
        if below.is_some_and(|(_, segment)| segment.region.overlaps(&region)) {
            return Err(ArenaError::Overlap);
        }

        segments.insert(
            region.base(),
            Segment {
                region,
                applied: ProtectionMode::NONE,
                shield: ShieldState::new(),
            },
        );
        log::trace!("arena: registered {}", region);
        Ok(())
    }

    /// Removes `region` from the arena.
    ///
    /// The region must have been registered with exactly this extent, and must have no
    /// outstanding raises or exposes.
    pub fn deregister(&self, region: Region) -> Result<(), ArenaError> {
        let mut segments = self.segments.lock();

        let segment = match segments.get(&region.base()) {
            Some(segment) if segment.region == region => segment,
            _ => return Err(ArenaError::NotRegistered),
        };
        if segment.shield != ShieldState::new() {
            return Err(ArenaError::Shielded);
        }

        segments.remove(&region.base());
        log::trace!("arena: deregistered {}", region);
        Ok(())
    }

    /// Returns the registered region containing `addr`, if any.
    pub fn region_containing(&self, addr: Address) -> Option<Region> {
        let segments = self.segments.lock();
        segments
            .range(..=addr)
            .next_back()
            .map(|(_, segment)| segment.region)
            .filter(|region| region.contains(addr))
    }

    /// Returns the number of registered regions.
    pub fn len(&self) -> usize {
        self.segments.lock().len()
    }

    /// Returns whether no region is registered.
    pub fn is_empty(&self) -> bool {
        self.segments.lock().is_empty()
    }

    /// Runs `f` on the segment for `region` while holding the arena lock.
    fn with_segment<R>(&self, region: Region, f: impl FnOnce(&mut Segment) -> R) -> R {
        let mut segments = self.segments.lock();
        match segments.get_mut(&region.base()) {
            Some(segment) if segment.region == region => f(segment),
            _ => panic!("region {} is not registered with the arena", region),
        }
    }
}

impl RegionStore for Arena {
    fn applied_mode(&self, region: Region) -> ProtectionMode {
        self.with_segment(region, |segment| segment.applied)
    }

    fn set_applied_mode(&self, region: Region, mode: ProtectionMode) {
        self.with_segment(region, |segment| segment.applied = mode)
    }

    fn shield_state(&self, region: Region) -> ShieldState {
        self.with_segment(region, |segment| segment.shield)
    }

    fn set_shield_state(&self, region: Region, state: ShieldState) {
        self.with_segment(region, |segment| segment.shield = state)
    }

    fn regions(&self) -> Vec<Region> {
        self.segments
            .lock()
            .values()
            .map(|segment| segment.region)
            .collect()
    }
}
