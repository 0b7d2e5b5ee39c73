/// Domain-aware logging macros.
///
/// Each macro injects a `domain` field so callers never spell the string
/// literal. Domains in use: `sys` (process lifecycle), `conn` (store and
/// query calls), `pipe` (record flow through the engine), `res` (dedup
/// memory, eviction), `conf` (configuration and provisioning).
///
/// # Usage
///
/// ```ignore
/// lt_info!(sys, source = %source, "tail session started");
/// lt_warn!(conn, attempt = 2, error = %e, "query throttled, retrying");
/// lt_debug!(res, evicted = 12, "dedup eviction");
/// ```
///
/// The domain is a bare identifier, not a string; the macro stringifies it.

/// Internal helper. Do not call directly; use `lt_error!` … `lt_trace!`.
#[doc(hidden)]
macro_rules! lt_log {
    ($level:ident, $domain:ident, $($field:tt)*) => {
        tracing::$level!(domain = stringify!($domain), $($field)*)
    };
}

/// Log at ERROR level with an automatic `domain` field.
macro_rules! lt_error {
    ($domain:ident, $($rest:tt)*) => {
        lt_log!(error, $domain, $($rest)*)
    };
}

/// Log at WARN level with an automatic `domain` field.
macro_rules! lt_warn {
    ($domain:ident, $($rest:tt)*) => {
        lt_log!(warn, $domain, $($rest)*)
    };
}

/// Log at INFO level with an automatic `domain` field.
macro_rules! lt_info {
    ($domain:ident, $($rest:tt)*) => {
        lt_log!(info, $domain, $($rest)*)
    };
}

/// Log at DEBUG level with an automatic `domain` field.
macro_rules! lt_debug {
    ($domain:ident, $($rest:tt)*) => {
        lt_log!(debug, $domain, $($rest)*)
    };
}

/// Log at TRACE level with an automatic `domain` field.
macro_rules! lt_trace {
    ($domain:ident, $($rest:tt)*) => {
        lt_log!(trace, $domain, $($rest)*)
    };
}
