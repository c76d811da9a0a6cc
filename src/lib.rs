// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod analytics;
pub mod app_dirs;
pub mod config;
pub mod cues;
pub mod history;
pub mod metrics;
pub mod runtime;
pub mod session;
pub mod util;

/// Event loop tick interval; the session ingests measured elapsed time, so
/// this only bounds UI refresh latency, not timer accuracy.
pub const TICK_RATE_MS: u64 = 100;
