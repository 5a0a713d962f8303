/*!
 * Pipe Module
 * Singleton reader/writer byte channel over one shared circular buffer
 */

pub mod alloc;
pub mod buffer;
pub mod config;
pub mod coordinator;
pub mod copy;
pub mod file;
mod ops;
mod session;
pub mod types;

// Re-export public API
pub use alloc::{BudgetAllocator, BufferAllocator, SystemAllocator};
pub use buffer::CircularBuffer;
pub use config::{PairingPolicy, PipeConfig};
pub use coordinator::{Interrupter, SessionCoordinator};
pub use copy::{CopyFault, CopyIn, CopyOut};
pub use file::PipeFile;
pub use types::{
    CoordinatorStats, PipeError, PipeHandle, PipeResult, PipeStats, Role, DEFAULT_PIPE_CAPACITY,
    MAX_PIPE_CAPACITY,
};
