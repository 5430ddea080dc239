//! Logging facade used across the rinoo workspace.
//!
//! Re-exports [`tracing`] under the `enable_log` feature. When the feature
//! is off, the `instrument!`/`trace!`/`debug!`/... macros compile to
//! nothing, so the scheduler's hot path never pays for a disabled
//! subscriber.

#[cfg_attr(not(feature = "enable_log"), doc(hidden))]
pub use tracing::*;

#[cfg(not(feature = "enable_log"))]
pub mod dummy;

#[cfg(feature = "enable_log")]
#[macro_export]
macro_rules! instrument {
    ($lvl:expr, $name:expr, $($fields:tt)*) => {
        let _guard = $crate::span!(target: module_path!(), $lvl, $name, $($fields)*).entered();
    };
    ($lvl:expr, $name:expr) => {
        let _guard = $crate::span!(target: module_path!(), $lvl, $name).entered();
    };
}

#[cfg(not(feature = "enable_log"))]
#[macro_export]
macro_rules! instrument {
    ($lvl:expr, $name:expr, $($fields:tt)*) => {};
    ($lvl:expr, $name:expr) => {};
}
