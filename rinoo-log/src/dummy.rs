//! No-op stand-ins for the `tracing` macros, used when `enable_log` is off.

#[macro_export]
macro_rules! trace {
    ($($args:tt)*) => {};
}

#[macro_export]
macro_rules! debug {
    ($($args:tt)*) => {};
}

#[macro_export]
macro_rules! info {
    ($($args:tt)*) => {};
}

#[macro_export]
macro_rules! warn {
    ($($args:tt)*) => {};
}

#[macro_export]
macro_rules! error {
    ($($args:tt)*) => {};
}

#[macro_export]
macro_rules! span {
    ($($args:tt)*) => {
        $crate::Span::none()
    };
}
