//! Feature-gated tracing macros.
//!
//! With the `tracing` feature enabled this module re-exports the tracing
//! crate's macros; without it, every macro compiles down to nothing.

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace};

/// No-op trace macro
#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($tt:tt)*) => {};
}

/// No-op debug macro
#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($tt:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use {debug, trace};
