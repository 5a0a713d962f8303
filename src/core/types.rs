/*!
 * Core Types
 * Common types used across the crate
 */

/// Size type for buffer operations
pub type Size = usize;

/// Identifies a pipe session within one coordinator
pub type SessionId = u64;

/// Identifies an open handle within one coordinator
pub type HandleId = u64;
