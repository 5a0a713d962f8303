/*!
 * Pipe Operations
 * Read and write protocol on top of the session coordinator
 *
 * Writes never wait: a full buffer fails with `NoSpace` and a short write is
 * not an error. Reads wait only while the buffer is empty and the writer
 * has not closed, and always drain buffered bytes before reporting
 * end-of-stream.
 */

use super::coordinator::{CoordinatorState, SessionCoordinator};
use super::copy::{CopyIn, CopyOut};
use super::types::{PipeError, PipeHandle, PipeResult, Role};
use crate::core::types::Size;
use parking_lot::MutexGuard;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// When a read gives up waiting
#[derive(Debug, Clone, Copy)]
enum Wait {
    Forever,
    Until(Instant, Duration),
    Never,
}

impl SessionCoordinator {
    /// Write `data`; returns the number of bytes accepted
    pub fn write(&self, handle: &PipeHandle, data: &[u8]) -> PipeResult<Size> {
        self.write_from(handle, data)
    }

    /// Write through a fallible copy primitive
    ///
    /// On `Fault`, the bytes copied before the fault are committed and
    /// readers are woken for them.
    pub fn write_from<S: CopyIn + ?Sized>(&self, handle: &PipeHandle, src: &S) -> PipeResult<Size> {
        self.check_owner(handle)?;
        handle.expect_role(Role::Writer)?;

        let mut state = self.shared.state.lock();
        let session = state.session_mut(handle)?;

        if session.shut_down {
            return Err(PipeError::Closed);
        }
        if session.reader_closed {
            return Err(PipeError::BrokenPipe);
        }
        if session.buffer.is_full() {
            debug!(session = handle.session, "write rejected: buffer full");
            return Err(PipeError::NoSpace);
        }

        let result = session.buffer.append(src);
        let committed = match &result {
            Ok(written) => *written,
            Err(PipeError::Fault { transferred }) => *transferred,
            Err(_) => 0,
        };
        session.bytes_written += committed as u64;
        let buffered = session.buffer.len();
        drop(state);

        match &result {
            Ok(written) => debug!(
                session = handle.session,
                requested = src.len(),
                written,
                buffered,
                "pipe write"
            ),
            Err(e) => warn!(
                session = handle.session,
                committed,
                buffered,
                error = %e,
                "pipe write faulted"
            ),
        }

        if result.is_ok() || committed > 0 {
            self.shared.readable.notify_all();
        }
        result
    }

    /// Read up to `max_count` bytes, waiting while the buffer is empty
    ///
    /// An empty result means end-of-stream: the writer has closed and every
    /// byte written before the close has been delivered.
    pub fn read(&self, handle: &PipeHandle, max_count: Size) -> PipeResult<Vec<u8>> {
        self.read_vec(handle, max_count, Wait::Forever)
    }

    /// Like `read`, failing with `Timeout` if nothing is readable in time
    pub fn read_timeout(
        &self,
        handle: &PipeHandle,
        max_count: Size,
        timeout: Duration,
    ) -> PipeResult<Vec<u8>> {
        let wait = match Instant::now().checked_add(timeout) {
            Some(deadline) => Wait::Until(deadline, timeout),
            None => Wait::Forever,
        };
        self.read_vec(handle, max_count, wait)
    }

    /// Like `read`, failing with `WouldBlock` instead of waiting
    pub fn try_read(&self, handle: &PipeHandle, max_count: Size) -> PipeResult<Vec<u8>> {
        self.read_vec(handle, max_count, Wait::Never)
    }

    /// Read into caller memory through a fallible copy primitive
    ///
    /// Returns the number of bytes delivered, zero at end-of-stream. On
    /// `Fault`, only the delivered bytes are consumed.
    pub fn read_into<D: CopyOut + ?Sized>(
        &self,
        handle: &PipeHandle,
        dst: &mut D,
    ) -> PipeResult<Size> {
        self.check_owner(handle)?;
        handle.expect_role(Role::Reader)?;
        if dst.capacity() == 0 {
            return Ok(0);
        }

        let mut state = self.shared.state.lock();
        self.wait_readable(&mut state, handle, Wait::Forever)?;

        let session = state.session_mut(handle)?;
        let result = session.buffer.consume_into(dst);
        let delivered = match &result {
            Ok(n) => *n,
            Err(PipeError::Fault { transferred }) => *transferred,
            Err(_) => 0,
        };
        session.bytes_read += delivered as u64;
        let remaining = session.buffer.len();
        drop(state);

        match &result {
            Ok(_) => debug!(session = handle.session, delivered, remaining, "pipe read"),
            Err(e) => warn!(
                session = handle.session,
                delivered,
                remaining,
                error = %e,
                "pipe read faulted"
            ),
        }
        result
    }

    fn read_vec(&self, handle: &PipeHandle, max_count: Size, wait: Wait) -> PipeResult<Vec<u8>> {
        self.check_owner(handle)?;
        handle.expect_role(Role::Reader)?;
        if max_count == 0 {
            return Ok(Vec::new());
        }

        let mut state = self.shared.state.lock();
        self.wait_readable(&mut state, handle, wait)?;

        let session = state.session_mut(handle)?;
        let data = session.buffer.consume(max_count);
        session.bytes_read += data.len() as u64;
        let remaining = session.buffer.len();
        drop(state);

        if data.is_empty() {
            debug!(session = handle.session, "pipe read: end-of-stream");
        } else {
            debug!(
                session = handle.session,
                read = data.len(),
                remaining,
                "pipe read"
            );
        }
        Ok(data)
    }

    /// Wait until the handle's session is readable
    ///
    /// The predicate is re-tested after every wake; broadcasts reach every
    /// reader of every session.
    fn wait_readable(
        &self,
        state: &mut MutexGuard<'_, CoordinatorState>,
        handle: &PipeHandle,
        wait: Wait,
    ) -> PipeResult<()> {
        loop {
            if state.session(handle)?.readable() {
                // An interrupt that found nothing to cancel does not carry over
                state.interrupted.remove(&handle.id);
                return Ok(());
            }
            if state.interrupted.remove(&handle.id).is_some() {
                debug!(session = handle.session, handle = handle.id, "pipe read interrupted");
                return Err(PipeError::Interrupted);
            }

            match wait {
                Wait::Forever => self.shared.readable.wait(state),
                Wait::Until(deadline, timeout) => {
                    if Instant::now() >= deadline {
                        return Err(PipeError::Timeout {
                            timeout_ms: u64::try_from(timeout.as_millis())
                                .unwrap_or(u64::MAX),
                        });
                    }
                    let _ = self.shared.readable.wait_until(state, deadline);
                }
                Wait::Never => {
                    return Err(PipeError::WouldBlock("No data available".to_string()));
                }
            }
        }
    }
}
