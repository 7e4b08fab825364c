//! Constants for ASPECTRA
//!
//! Defaults shared by the descriptor, configuration and interceptor layers.

// ============================================================================
// CACHING
// ============================================================================

/// Default time-to-live for cached results in seconds (5 minutes)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default interval between expiry sweeps in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

// ============================================================================
// LOG RENDERING
// ============================================================================

/// Maximum rendered length of a single argument in log records
pub const DEFAULT_ARG_RENDER_LIMIT: usize = 50;

/// Maximum rendered length of a result in log records
pub const DEFAULT_RESULT_RENDER_LIMIT: usize = 100;

/// Marker appended to truncated renderings
pub const TRUNCATION_MARKER: &str = "...";

/// Rendering used for operations that complete without a value
pub const NULL_RESULT_RENDERING: &str = "void/null";

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// Prefix for every environment variable read by ASPECTRA
pub const ENV_PREFIX: &str = "ASPECTRA_";
