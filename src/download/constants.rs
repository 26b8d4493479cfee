//! Constants for the download module (timeouts).

/// Default HTTP connect timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default hard cap for one transfer attempt, in seconds.
///
/// Applied per request; the TLS fallback retry gets its own budget.
pub const ATTEMPT_TIMEOUT_SECS: u64 = 30;
