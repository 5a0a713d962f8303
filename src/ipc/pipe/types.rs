/*!
 * Pipe Types
 * Common types, constants, and errors for the session pipe
 */

use crate::core::limits;
use crate::core::serde::{is_false, is_zero_usize};
use crate::core::types::{HandleId, SessionId, Size};
use miette::Diagnostic;
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

// Pipe limits - centralized in core::limits
pub use limits::{DEFAULT_PIPE_CAPACITY, MAX_PIPE_CAPACITY};

/// Result type for pipe operations
pub type PipeResult<T> = Result<T, PipeError>;

/// Pipe error types
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum PipeError {
    #[error("Memory allocation failed: {0}")]
    #[diagnostic(
        code(pipe::allocation_failed),
        help("Backing storage for a new session could not be obtained. Close idle sessions or raise the memory budget.")
    )]
    AllocationFailed(String),

    #[error("No space left in pipe buffer")]
    #[diagnostic(
        code(pipe::no_space),
        help("Writes never block. Retry once the reader has drained the buffer.")
    )]
    NoSpace,

    #[error("Bad address: copy faulted after {transferred} bytes")]
    #[diagnostic(
        code(pipe::fault),
        help("The bytes transferred before the fault were committed.")
    )]
    Fault { transferred: Size },

    #[error("Interrupted while waiting for data")]
    #[diagnostic(code(pipe::interrupted), help("No data was consumed. The read may be retried."))]
    Interrupted,

    #[error("Broken pipe: reader has closed")]
    #[diagnostic(code(pipe::broken_pipe))]
    BrokenPipe,

    #[error("Pipe closed")]
    #[diagnostic(code(pipe::closed), help("The coordinator was shut down; open a fresh session."))]
    Closed,

    #[error("Would block: {0}")]
    #[diagnostic(code(pipe::would_block))]
    WouldBlock(String),

    #[error("Operation timed out after {timeout_ms}ms")]
    #[diagnostic(code(pipe::timeout))]
    Timeout { timeout_ms: u64 },

    #[error("A {0} already holds the pending session")]
    #[diagnostic(
        code(pipe::role_in_use),
        help("The coordinator enforces role matching. Open the opposite role to pair.")
    )]
    RoleInUse(Role),

    #[error("Handle is not open for {expected}")]
    #[diagnostic(code(pipe::wrong_role))]
    WrongRole { expected: Role },

    #[error("Session {0} is not managed by this coordinator")]
    #[diagnostic(code(pipe::stale_handle))]
    StaleHandle(SessionId),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(pipe::invalid_config))]
    InvalidConfig(String),
}

impl PipeError {
    /// Kernel errno a device adapter should hand back for this error
    pub fn errno(&self) -> Errno {
        match self {
            PipeError::AllocationFailed(_) => Errno::ENOMEM,
            PipeError::NoSpace => Errno::ENOSPC,
            PipeError::Fault { .. } => Errno::EFAULT,
            PipeError::Interrupted => Errno::EINTR,
            PipeError::BrokenPipe => Errno::EPIPE,
            PipeError::Closed | PipeError::WrongRole { .. } | PipeError::StaleHandle(_) => {
                Errno::EBADF
            }
            PipeError::WouldBlock(_) => Errno::EAGAIN,
            PipeError::Timeout { .. } => Errno::ETIMEDOUT,
            PipeError::RoleInUse(_) => Errno::EBUSY,
            PipeError::InvalidConfig(_) => Errno::EINVAL,
        }
    }
}

impl From<PipeError> for io::Error {
    fn from(err: PipeError) -> Self {
        let kind = match &err {
            PipeError::AllocationFailed(_) => io::ErrorKind::OutOfMemory,
            PipeError::NoSpace | PipeError::WouldBlock(_) => io::ErrorKind::WouldBlock,
            PipeError::Interrupted => io::ErrorKind::Interrupted,
            PipeError::BrokenPipe | PipeError::Closed => io::ErrorKind::BrokenPipe,
            PipeError::Timeout { .. } => io::ErrorKind::TimedOut,
            PipeError::RoleInUse(_) => io::ErrorKind::AddrInUse,
            PipeError::WrongRole { .. } | PipeError::InvalidConfig(_) => {
                io::ErrorKind::InvalidInput
            }
            PipeError::Fault { .. } | PipeError::StaleHandle(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Which side of a session a handle was opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Writer,
    Reader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Writer => f.write_str("writer"),
            Role::Reader => f.write_str("reader"),
        }
    }
}

/// An open end of a session
///
/// Handles are non-owning: the coordinator keeps the session itself and the
/// handle only names it. A handle is consumed by `close`, so it cannot be
/// closed twice.
#[derive(Debug, PartialEq, Eq)]
pub struct PipeHandle {
    pub(super) owner: u64,
    pub(super) id: HandleId,
    pub(super) session: SessionId,
    pub(super) role: Role,
}

impl PipeHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub(super) fn expect_role(&self, expected: Role) -> PipeResult<()> {
        if self.role == expected {
            Ok(())
        } else {
            Err(PipeError::WrongRole { expected })
        }
    }
}

/// Session statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipeStats {
    pub session_id: SessionId,
    pub capacity: Size,
    #[serde(skip_serializing_if = "is_zero_usize", default)]
    pub buffered: Size,
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub writer_present: bool,
    pub reader_present: bool,
    #[serde(skip_serializing_if = "is_false", default)]
    pub writer_closed: bool,
    #[serde(skip_serializing_if = "is_false", default)]
    pub reader_closed: bool,
    pub open_handles: usize,
    #[serde(skip_serializing_if = "is_false", default)]
    pub awaiting_partner: bool,
}

/// Coordinator-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CoordinatorStats {
    pub sessions_created: u64,
    pub pairings: u64,
    pub sessions_reclaimed: u64,
    pub live_sessions: usize,
    pub awaiting_partner: bool,
}
