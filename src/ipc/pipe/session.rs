/*!
 * Pipe Session
 * One writer and one reader paired around a single circular buffer
 */

use super::buffer::CircularBuffer;
use super::types::{PipeStats, Role};
use crate::core::types::{HandleId, SessionId};
use ahash::RandomState;
use std::collections::HashSet;

#[derive(Debug)]
pub(super) struct PipeSession {
    pub id: SessionId,
    pub buffer: CircularBuffer,
    /// Role of the open that created the session
    pub created_by: Role,
    pub writer_present: bool,
    pub reader_present: bool,
    /// End-of-stream; never resets for this session
    pub writer_closed: bool,
    pub reader_closed: bool,
    /// Torn down by `shutdown`; no further writes are accepted
    pub shut_down: bool,
    /// Handles opened on this session and not yet closed
    pub handles: HashSet<HandleId, RandomState>,
    pub bytes_written: u64,
    pub bytes_read: u64,
}

impl PipeSession {
    /// Every flag and counter starts cleared; the opener's side is marked by the caller
    pub fn new(id: SessionId, buffer: CircularBuffer, created_by: Role) -> Self {
        Self {
            id,
            buffer,
            created_by,
            writer_present: false,
            reader_present: false,
            writer_closed: false,
            reader_closed: false,
            shut_down: false,
            handles: HashSet::with_hasher(RandomState::new()),
            bytes_written: 0,
            bytes_read: 0,
        }
    }

    /// Record a successful open of `role` through `handle` on this session
    pub fn attach(&mut self, handle: HandleId, role: Role) {
        match role {
            Role::Writer => {
                // A writer open restarts the stream's write-side bookkeeping
                self.writer_present = true;
                self.reader_present = true;
                self.buffer.clear();
            }
            Role::Reader => {
                self.reader_present = true;
            }
        }
        self.handles.insert(handle);
    }

    /// Record a close of `role` through `handle`; returns true once no handle remains open
    pub fn detach(&mut self, handle: HandleId, role: Role) -> bool {
        match role {
            Role::Writer => self.writer_closed = true,
            Role::Reader => self.reader_closed = true,
        }
        self.handles.remove(&handle);
        self.handles.is_empty()
    }

    #[inline]
    pub fn is_open(&self, handle: HandleId) -> bool {
        self.handles.contains(&handle)
    }

    /// A reader has data to take or will never get more
    #[inline]
    pub fn readable(&self) -> bool {
        !self.buffer.is_empty() || self.writer_closed
    }

    pub fn stats(&self, awaiting_partner: bool) -> PipeStats {
        PipeStats {
            session_id: self.id,
            capacity: self.buffer.capacity(),
            buffered: self.buffer.len(),
            bytes_written: self.bytes_written,
            bytes_read: self.bytes_read,
            writer_present: self.writer_present,
            reader_present: self.reader_present,
            writer_closed: self.writer_closed,
            reader_closed: self.reader_closed,
            open_handles: self.handles.len(),
            awaiting_partner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_fully_initialized() {
        let session = PipeSession::new(1, CircularBuffer::with_capacity(8), Role::Reader);
        assert!(!session.writer_present);
        assert!(!session.reader_present);
        assert!(!session.writer_closed);
        assert!(!session.reader_closed);
        assert!(!session.shut_down);
        assert!(session.handles.is_empty());
        assert!(!session.readable());
    }

    #[test]
    fn test_writer_attach_resets_occupancy() {
        let mut session = PipeSession::new(1, CircularBuffer::with_capacity(8), Role::Writer);
        session.attach(1, Role::Writer);
        session.buffer.append(&b"abc"[..]).unwrap();

        session.attach(2, Role::Writer);
        assert!(session.buffer.is_empty());
        assert!(session.writer_present && session.reader_present);
        assert_eq!(session.handles.len(), 2);
    }

    #[test]
    fn test_writer_close_makes_readable() {
        let mut session = PipeSession::new(1, CircularBuffer::with_capacity(8), Role::Writer);
        session.attach(1, Role::Writer);
        assert!(!session.readable());
        assert!(session.detach(1, Role::Writer));
        assert!(session.readable());
    }

    #[test]
    fn test_detach_forgets_handle() {
        let mut session = PipeSession::new(1, CircularBuffer::with_capacity(8), Role::Writer);
        session.attach(1, Role::Writer);
        session.attach(2, Role::Reader);
        assert!(session.is_open(2));

        assert!(!session.detach(2, Role::Reader));
        assert!(!session.is_open(2));
        assert!(session.is_open(1));
    }
}
