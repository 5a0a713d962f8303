/*!
 * System Limits and Constants
 *
 * Centralized location for pipe sizing limits and tunables.
 */

// =============================================================================
// PIPE LIMITS
// =============================================================================

/// Default session buffer capacity (8KB)
/// Every session owns exactly one buffer of this size unless configured otherwise
pub const DEFAULT_PIPE_CAPACITY: usize = 8192;

/// Maximum session buffer capacity (1MB)
/// Lifted by the `custom_limits` feature
pub const MAX_PIPE_CAPACITY: usize = 1024 * 1024;

/// Largest contiguous run handed to a copy primitive in one call
/// [PERF] Bounds how much work a single faulting copy can discard
pub const COPY_CHUNK_SIZE: usize = 4096;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides the session buffer capacity
pub const ENV_CAPACITY: &str = "SYNCPIPE_CAPACITY";

/// Selects the pairing policy (`any` or `match`)
pub const ENV_PAIRING: &str = "SYNCPIPE_PAIRING";

/// Caps the total bytes of buffer storage live at once
pub const ENV_MEMORY_BUDGET: &str = "SYNCPIPE_MEMORY_BUDGET";

/// Enables JSON trace output
pub const ENV_TRACE_JSON: &str = "SYNCPIPE_TRACE_JSON";
