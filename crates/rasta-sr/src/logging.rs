// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compile-time gated trace logging.
//!
//! Lifecycle events (state changes, disconnects, configuration problems) go
//! through the `log` facade unconditionally. The chatty per-PDU paths use
//! [`sr_trace!`], which forwards to `log::trace!` only when the crate is
//! built with the `trace` feature and expands to nothing otherwise, so the
//! formatting cost disappears from release builds.

/// Per-PDU trace message.
///
/// Formatted the same as `log::trace!`. Compiled out unless the `trace`
/// feature is enabled.
///
/// # Example
/// ```ignore
/// sr_trace!("[SrCore::receive_message] conn={} event={:?}", conn_id, event);
/// ```
#[macro_export]
#[cfg(feature = "trace")]
macro_rules! sr_trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*);
    };
}

/// No-op trace message (crate built without the `trace` feature).
#[macro_export]
#[cfg(not(feature = "trace"))]
macro_rules! sr_trace {
    ($($arg:tt)*) => {};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_trace_macro_compiles() {
        // Verifies both expansion variants build; output is irrelevant here.
        sr_trace!("plain message");
        sr_trace!("with args: {} {:?}", 42, [1, 2, 3]);
    }
}
