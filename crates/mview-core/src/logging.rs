#![forbid(unsafe_code)]

//! Logging facade for the arbitration core.
//!
//! With the `tracing` feature the macros below are plain re-exports of the
//! `tracing` macros. Without it they expand to nothing, so the core can log
//! generation decisions without forcing a subscriber stack on embedders.
//!
//! Call sites use the crate-root path (`crate::debug!`), which resolves in
//! both configurations.

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// No-op debug macro when tracing is disabled.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// No-op trace macro when tracing is disabled.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// No-op warn macro when tracing is disabled.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }
}
