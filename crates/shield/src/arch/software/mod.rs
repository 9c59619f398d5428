//! Software emulation of page protection for testing and development.
//!
//! This backend never touches real page permissions. It is a "scale model" of a paged
//! address space:
//! - 16-byte pages (vs 4 KiB on most hosts)
//! - a sparse per-page protection table
//! - an event log of every primitive call, so tests can assert on exactly which
//!   protection changes the shield asked for
//!
//! [`PageProtection::check_access`] stands in for a mutator load or store: it reports a
//! trap whenever the emulated protection of the touched page would fault.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use spin::Mutex;

use crate::{Access, Address, Protection, ProtectionMode, Region};

/// Page size in bytes (16 bytes = 2^4).
pub const PAGE_SIZE: usize = 16;

/// Returns the page size of the emulated address space.
#[inline]
pub const fn page_size() -> usize {
    PAGE_SIZE
}

/// A call made to the emulated protection primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionEvent {
    /// `apply` changed the protection of a region.
    Apply {
        region: Region,
        mode: ProtectionMode,
    },
    /// A working section was armed.
    EnterSection,
    /// A working section was disarmed.
    LeaveSection,
}

/// An emulated access trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFault {
    /// The address that was touched.
    pub address: Address,
    /// The kind of access that trapped.
    pub access: Access,
    /// The protection of the page at the time of the access.
    pub mode: ProtectionMode,
    /// Whether a working section was armed when the trap fired.
    pub in_section: bool,
}

#[derive(Default)]
struct EmulatedState {
    /// Protection per page number. Pages without an entry are unprotected.
    pages: BTreeMap<usize, ProtectionMode>,
    armed: bool,
    events: Vec<ProtectionEvent>,
}

/// Emulated page protection.
#[derive(Default)]
pub struct PageProtection {
    state: Mutex<EmulatedState>,
}

impl PageProtection {
    /// Creates an emulated address space with every page unprotected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every call made to this primitive, oldest first.
    pub fn events(&self) -> Vec<ProtectionEvent> {
        self.state.lock().events.clone()
    }

    /// Returns the number of `apply` calls made to this primitive.
    pub fn apply_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, ProtectionEvent::Apply { .. }))
            .count()
    }

    /// Forgets all recorded events. Page protection is unaffected.
    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Returns the emulated protection of the page containing `addr`.
    pub fn mode_at(&self, addr: Address) -> ProtectionMode {
        let page = addr.as_usize() / PAGE_SIZE;
        self.state
            .lock()
            .pages
            .get(&page)
            .copied()
            .unwrap_or(ProtectionMode::NONE)
    }

    /// Returns whether a working section is currently armed.
    pub fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    /// Emulates a mutator access to `addr`.
    ///
    /// Returns the trap that real hardware would deliver, if any.
    pub fn check_access(&self, addr: Address, access: Access) -> Result<(), AccessFault> {
        let state = self.state.lock();
        let page = addr.as_usize() / PAGE_SIZE;
        let mode = state
            .pages
            .get(&page)
            .copied()
            .unwrap_or(ProtectionMode::NONE);

        if mode.traps(access) {
            Err(AccessFault {
                address: addr,
                access,
                mode,
                in_section: state.armed,
            })
        } else {
            Ok(())
        }
    }
}

impl Protection for PageProtection {
    fn apply(&self, region: Region, mode: ProtectionMode) {
        let mut state = self.state.lock();
        let first = region.base().as_usize() / PAGE_SIZE;
        for page in first..first + region.pages() {
            if mode.is_empty() {
                state.pages.remove(&page);
            } else {
                state.pages.insert(page, mode);
            }
        }
        state.events.push(ProtectionEvent::Apply { region, mode });
    }

    fn enter_section(&self) {
        let mut state = self.state.lock();
        state.armed = true;
        state.events.push(ProtectionEvent::EnterSection);
    }

    fn leave_section(&self) {
        let mut state = self.state.lock();
        state.armed = false;
        state.events.push(ProtectionEvent::LeaveSection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(page: usize, pages: usize) -> Region {
        Region::from_pages(Address::new(page * PAGE_SIZE), pages)
    }

    #[test]
    fn starts_unprotected() {
        let prot = PageProtection::new();
        assert_eq!(prot.mode_at(Address::new(0x40)), ProtectionMode::NONE);
        assert!(prot.check_access(Address::new(0x40), Access::Write).is_ok());
        assert!(prot.events().is_empty());
    }

    #[test]
    fn apply_covers_every_page_of_region() {
        let prot = PageProtection::new();
        prot.apply(region(2, 3), ProtectionMode::WRITE);

        assert_eq!(prot.mode_at(Address::new(PAGE_SIZE)), ProtectionMode::NONE);
        assert_eq!(prot.mode_at(Address::new(2 * PAGE_SIZE)), ProtectionMode::WRITE);
        assert_eq!(
            prot.mode_at(Address::new(5 * PAGE_SIZE - 1)),
            ProtectionMode::WRITE
        );
        assert_eq!(prot.mode_at(Address::new(5 * PAGE_SIZE)), ProtectionMode::NONE);
        assert_eq!(prot.apply_count(), 1);
    }

    #[test]
    fn write_protection_lets_reads_through() {
        let prot = PageProtection::new();
        prot.apply(region(1, 1), ProtectionMode::WRITE);

        let addr = Address::new(PAGE_SIZE + 4);
        assert!(prot.check_access(addr, Access::Read).is_ok());
        let fault = prot.check_access(addr, Access::Write).unwrap_err();
        assert_eq!(fault.address, addr);
        assert_eq!(fault.mode, ProtectionMode::WRITE);
        assert!(!fault.in_section);
    }

    #[test]
    fn faults_record_armed_section() {
        let prot = PageProtection::new();
        prot.apply(region(1, 1), ProtectionMode::READ);
        prot.enter_section();

        let fault = prot
            .check_access(Address::new(PAGE_SIZE), Access::Read)
            .unwrap_err();
        assert!(fault.in_section);
        assert!(prot.is_armed());

        prot.leave_section();
        assert!(!prot.is_armed());
    }

    #[test]
    fn records_events_in_order() {
        let prot = PageProtection::new();
        prot.enter_section();
        prot.apply(region(0, 1), ProtectionMode::READ);
        prot.apply(region(0, 1), ProtectionMode::NONE);
        prot.leave_section();

        assert_eq!(
            prot.events(),
            [
                ProtectionEvent::EnterSection,
                ProtectionEvent::Apply {
                    region: region(0, 1),
                    mode: ProtectionMode::READ
                },
                ProtectionEvent::Apply {
                    region: region(0, 1),
                    mode: ProtectionMode::NONE
                },
                ProtectionEvent::LeaveSection,
            ]
        );
        assert_eq!(prot.mode_at(Address::new(0)), ProtectionMode::NONE);

        prot.clear_events();
        assert!(prot.events().is_empty());
    }
}
