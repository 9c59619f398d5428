//! Shieldable memory regions.

use core::fmt;

use crate::{Address, arch};

/// A contiguous, page-aligned span of managed memory, `[base, limit)`.
///
/// Regions are the unit of shielding: each one carries its own shield state and applied
/// protection in the [`RegionStore`](crate::RegionStore).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Region {
    base: Address,
    limit: Address,
}

impl Region {
    /// Creates a new region covering `[base, limit)`.
    ///
    /// # Panics
    ///
    /// Panics if the region is empty or if either bound is not aligned to the page size of
    /// the active protection backend.
    pub fn new(base: Address, limit: Address) -> Self {
        let page_size = arch::page_size();
        assert!(base < limit, "region must not be empty");
        assert!(
            base.is_aligned(page_size) && limit.is_aligned(page_size),
            "region bounds must be page-aligned"
        );
        Self { base, limit }
    }

    /// Creates a region of `pages` pages starting at `base`.
    pub fn from_pages(base: Address, pages: usize) -> Self {
        Self::new(base, base + pages * arch::page_size())
    }

    /// Returns the first address of the region.
    #[inline]
    pub const fn base(&self) -> Address {
        self.base
    }

    /// Returns the first address past the end of the region.
    #[inline]
    pub const fn limit(&self) -> Address {
        self.limit
    }

    /// Returns the size of the region in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.limit - self.base
    }

    /// Returns the number of pages spanned by the region.
    #[inline]
    pub fn pages(&self) -> usize {
        self.size() / arch::page_size()
    }

    /// Returns whether `addr` lies within the region.
    #[inline]
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.base && addr < self.limit
    }

    /// Returns whether the two regions share any address.
    #[inline]
    pub fn overlaps(&self, other: &Region) -> bool {
        self.base < other.limit && other.base < self.limit
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Region[{:#x}, {:#x})", self.base.as_usize(), self.limit.as_usize())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.base, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: usize = arch::PAGE_SIZE;

    #[test]
    fn size_and_pages() {
        let region = Region::from_pages(Address::new(4 * PAGE), 3);
        assert_eq!(region.base(), Address::new(4 * PAGE));
        assert_eq!(region.limit(), Address::new(7 * PAGE));
        assert_eq!(region.size(), 3 * PAGE);
        assert_eq!(region.pages(), 3);
    }

    #[test]
    fn contains_is_half_open() {
        let region = Region::from_pages(Address::new(PAGE), 1);
        assert!(region.contains(Address::new(PAGE)));
        assert!(region.contains(Address::new(2 * PAGE - 1)));
        assert!(!region.contains(Address::new(2 * PAGE)));
        assert!(!region.contains(Address::new(PAGE - 1)));
    }

    #[test]
    fn overlap_detection() {
        let a = Region::from_pages(Address::new(0), 2);
        let b = Region::from_pages(Address::new(PAGE), 2);
        let c = Region::from_pages(Address::new(2 * PAGE), 1);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    #[should_panic(expected = "region must not be empty")]
    fn rejects_empty_region() {
        Region::new(Address::new(PAGE), Address::new(PAGE));
    }

    #[test]
    #[should_panic(expected = "region bounds must be page-aligned")]
    fn rejects_unaligned_bounds() {
        Region::new(Address::new(PAGE + 1), Address::new(3 * PAGE));
    }

    #[test]
    fn display_format() {
        let region = Region::from_pages(Address::new(0x100), 4);
        assert_eq!(format!("{}", region), "[0x100, 0x140)");
    }
}
