#![cfg_attr(not(any(test, feature = "software-emulation")), no_std)]

//! # Polaris Memory Shield
//!
//! The shield sits between a garbage collector and the page protection hardware. It lets
//! the collector:
//!
//! - Request that accesses to a region trap (`raise`) and withdraw the request (`lower`).
//! - Open a working section (`enter` .. `leave`) during which traps are expected.
//! - Temporarily strip protection from a region to access it directly (`expose`), with
//!   nesting, and restore it (`cover`).
//!
//! Throughout, the protection actually applied to a region never exceeds what was
//! requested for it. Per-region state lives in a [`RegionStore`]; hardware is driven
//! through a [`Protection`] primitive. A host backend built on `mprotect` and a software
//! emulation for testing are provided.

extern crate alloc;

mod address;
mod arch;
mod arena;
#[cfg(any(test, feature = "software-emulation"))]
mod console;
mod mode;
mod protection;
mod region;
mod shield;
mod space;
mod state;

pub use address::Address;
pub use arena::{Arena, ArenaError, RegionStore};
pub use mode::{Access, ProtectionMode};
pub use protection::Protection;
pub use region::Region;
pub use shield::Shield;
pub use space::AddressSpace;
pub use state::ShieldState;

pub use arch::{PageProtection, page_size};

#[cfg(all(unix, not(test), not(feature = "software-emulation")))]
pub use arch::section_armed;

#[cfg(any(test, feature = "software-emulation"))]
pub use arch::{AccessFault, PAGE_SIZE, ProtectionEvent};
#[cfg(any(test, feature = "software-emulation"))]
pub use console::{CONSOLE_CAPACITY, Console};
