#[cfg(feature = "tracing")]
pub(crate) const TARGET: &str = "tycho_relay";

#[cfg(feature = "tracing")]
macro_rules! relay_log_trace {
    ($($tt:tt)*) => {
        tracing::trace!(
            target: $crate::log::TARGET,
            $($tt)*
        )
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! relay_log_trace {
    ($($tt:tt)*) => {{}};
}

#[cfg(feature = "tracing")]
macro_rules! relay_log_debug {
    ($($tt:tt)*) => {
        tracing::debug!(
            target: $crate::log::TARGET,
            $($tt)*
        )
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! relay_log_debug {
    ($($tt:tt)*) => {{}};
}

#[cfg(feature = "tracing")]
macro_rules! relay_log_body {
    ($body:expr) => {
        tracing::trace!(
            target: $crate::log::TARGET,
            body = ::tycho_types::boc::Boc::encode_base64($body),
        )
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! relay_log_body {
    ($body:expr) => {{}};
}
