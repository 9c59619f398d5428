//! Host page protection for unix targets.
//!
//! Protection is changed with `mprotect(2)`. A protection mode lists the accesses that
//! should trap, so it maps onto the complementary permission set:
//!
//! | Mode          | Permissions              |
//! |---------------|--------------------------|
//! | `NONE`        | `PROT_READ \| PROT_WRITE` |
//! | `WRITE`       | `PROT_READ`              |
//! | `READ`, `ALL` | `PROT_NONE`              |
//!
//! Installing the fault handler that decodes traps is the embedder's job. The working
//! section hooks only publish whether such traps are currently expected, through
//! [`section_armed`].

use core::sync::atomic::{AtomicBool, Ordering};

use spin::Once;

use crate::{Protection, ProtectionMode, Region};

static PAGE_SIZE: Once<usize> = Once::new();
static SECTION_ARMED: AtomicBool = AtomicBool::new(false);

/// Returns the host page size.
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    *PAGE_SIZE.call_once(|| unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize)
}

/// Returns whether a working section is armed in this process.
///
/// A fault handler consults this to tell a shield trap from a genuine segmentation fault.
pub fn section_armed() -> bool {
    SECTION_ARMED.load(Ordering::Acquire)
}

/// Page protection backed by `mprotect(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageProtection;

impl PageProtection {
    /// Creates a handle to the host page protection.
    pub const fn new() -> Self {
        Self
    }
}

const fn permissions(mode: ProtectionMode) -> libc::c_int {
    if mode.contains(ProtectionMode::READ) {
        libc::PROT_NONE
    } else if mode.contains(ProtectionMode::WRITE) {
        libc::PROT_READ
    } else {
        libc::PROT_READ | libc::PROT_WRITE
    }
}

impl Protection for PageProtection {
    fn apply(&self, region: Region, mode: ProtectionMode) {
        // SAFETY: the region describes memory owned by the arena, and changing its
        // permissions cannot invalidate any reference held by this crate.
        let result = unsafe {
            libc::mprotect(
                region.base().as_mut_ptr::<libc::c_void>(),
                region.size(),
                permissions(mode),
            )
        };
        assert!(
            result == 0,
            "mprotect failed for region {} with mode {}",
            region,
            mode
        );
    }

    fn enter_section(&self) {
        SECTION_ARMED.store(true, Ordering::Release);
    }

    fn leave_section(&self) {
        SECTION_ARMED.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Address;

    /// Maps `pages` fresh read-write pages from the host.
    fn map_pages(pages: usize) -> Region {
        let size = pages * page_size();
        // SAFETY: anonymous private mapping with no address hint.
        let ptr = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        assert_ne!(ptr, libc::MAP_FAILED, "mmap failed");
        let base = Address::from_ptr(ptr as *const u8);
        Region::new(base, base + size)
    }

    fn unmap(region: Region) {
        // SAFETY: the region was returned by map_pages and is not referenced afterwards.
        unsafe {
            libc::munmap(region.base().as_mut_ptr(), region.size());
        }
    }

    #[test]
    fn maps_modes_to_complementary_permissions() {
        assert_eq!(
            permissions(ProtectionMode::NONE),
            libc::PROT_READ | libc::PROT_WRITE
        );
        assert_eq!(permissions(ProtectionMode::WRITE), libc::PROT_READ);
        assert_eq!(permissions(ProtectionMode::READ), libc::PROT_NONE);
        assert_eq!(permissions(ProtectionMode::ALL), libc::PROT_NONE);
    }

    #[test]
    fn page_size_is_a_power_of_two() {
        assert!(page_size().is_power_of_two());
    }

    #[test]
    fn write_protected_pages_stay_readable() {
        let region = map_pages(2);
        let ptr = region.base().as_mut_ptr::<u8>();
        // SAFETY: the mapping is read-write at this point.
        unsafe { ptr.write(42) };

        let prot = PageProtection::new();
        prot.apply(region, ProtectionMode::WRITE);
        // SAFETY: reads remain permitted under a write trap.
        assert_eq!(unsafe { ptr.read() }, 42);

        prot.apply(region, ProtectionMode::NONE);
        // SAFETY: permissions restored to read-write.
        unsafe { ptr.write(7) };
        assert_eq!(unsafe { ptr.read() }, 7);

        unmap(region);
    }

    #[test]
    fn section_hooks_toggle_armed_flag() {
        let prot = PageProtection::new();
        prot.enter_section();
        assert!(section_armed());
        prot.leave_section();
        assert!(!section_armed());
    }
}
