/*!
 * Pipe File
 * `std::io` adapter over one open end of the channel
 */

use super::coordinator::{Interrupter, SessionCoordinator};
use super::types::{PipeHandle, PipeResult, PipeStats, Role};
use std::io;
use tracing::warn;

/// An open end of the channel that closes itself on drop
///
/// `Read` blocks like `SessionCoordinator::read` and returns `Ok(0)` at
/// end-of-stream. `Write` never blocks; a full buffer surfaces as
/// `io::ErrorKind::WouldBlock`.
#[derive(Debug)]
pub struct PipeFile {
    coordinator: SessionCoordinator,
    handle: Option<PipeHandle>,
}

impl PipeFile {
    pub fn open(coordinator: &SessionCoordinator, role: Role) -> PipeResult<Self> {
        let handle = coordinator.open(role)?;
        Ok(Self {
            coordinator: coordinator.clone(),
            handle: Some(handle),
        })
    }

    pub fn handle(&self) -> Option<&PipeHandle> {
        self.handle.as_ref()
    }

    pub fn interrupter(&self) -> Option<Interrupter> {
        self.handle
            .as_ref()
            .map(|handle| self.coordinator.interrupter(handle))
    }

    pub fn stats(&self) -> Option<PipeResult<PipeStats>> {
        self.handle
            .as_ref()
            .map(|handle| self.coordinator.stats(handle))
    }

    /// Close explicitly, surfacing any error that drop would only log
    pub fn close(mut self) -> PipeResult<()> {
        match self.handle.take() {
            Some(handle) => self.coordinator.close(handle),
            None => Ok(()),
        }
    }

    fn open_handle(&self) -> io::Result<&PipeHandle> {
        self.handle
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "pipe file closed"))
    }
}

impl io::Read for PipeFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let handle = self.open_handle()?;
        Ok(self.coordinator.read_into(handle, buf)?)
    }
}

impl io::Write for PipeFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let handle = self.open_handle()?;
        if buf.is_empty() {
            return Ok(0);
        }
        Ok(self.coordinator.write(handle, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PipeFile {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let session = handle.session_id();
            if let Err(e) = self.coordinator.close(handle) {
                warn!(session, error = %e, "failed to close pipe file on drop");
            }
        }
    }
}
