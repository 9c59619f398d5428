//! Platform page protection backends.
//!
//! This module conditionally imports either the host operating system's page protection
//! or a software emulation, based on the target and features.

// Use host mprotect when we're on a unix target and not testing or emulating.
// NOTE: We DO include the module even during tests so its own tests run against the host.
#[cfg(unix)]
mod unix;
#[cfg(all(unix, not(test), not(feature = "software-emulation")))]
pub use unix::*;

// Use software emulation ONLY when:
// - Running tests, OR
// - software-emulation feature is explicitly enabled
#[cfg(any(test, feature = "software-emulation"))]
mod software;
#[cfg(any(test, feature = "software-emulation"))]
pub use software::*;

#[cfg(not(any(unix, test, feature = "software-emulation")))]
compile_error!(
    "no page protection backend for this target: build on a unix host or enable the \
     `software-emulation` feature"
);
