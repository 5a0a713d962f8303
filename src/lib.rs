/*!
 * Sync Pipe Library
 * Singleton named-pipe-like byte channel: one writer, one reader, one
 * shared circular buffer, coordinated by a mutex and a condition variable
 */

pub mod core;
pub mod ipc;
pub mod monitoring;

// Re-exports
pub use crate::core::limits::DEFAULT_PIPE_CAPACITY;
pub use crate::core::types::{HandleId, SessionId, Size};
pub use ipc::pipe::{
    BudgetAllocator, BufferAllocator, CircularBuffer, CoordinatorStats, CopyFault, CopyIn,
    CopyOut, Interrupter, PairingPolicy, PipeConfig, PipeError, PipeFile, PipeHandle, PipeResult,
    PipeStats, Role, SessionCoordinator, SystemAllocator,
};
pub use monitoring::{init_tracing, span_operation};
