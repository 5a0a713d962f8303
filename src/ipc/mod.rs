/*!
 * IPC Module
 * Inter-process communication through the session pipe
 */

pub mod pipe;

// Re-export for convenience
pub use pipe::{
    PipeConfig, PipeError, PipeFile, PipeHandle, PipeResult, PipeStats, Role, SessionCoordinator,
};
