//! Domain constants
//!
//! Defaults shared by configuration, the dispatcher and the transports.

/// Retries granted by the default retry policy (attempts = retries + 1).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// How long `shutdown` waits for the dispatch worker to exit.
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 5_000;

/// Per-request timeout applied by the HTTP transport.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Upper bound for exponential backoff between attempts.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Bodies longer than this are truncated in diagnostic logs.
pub const MAX_LOGGED_BODY_BYTES: usize = 2_048;
