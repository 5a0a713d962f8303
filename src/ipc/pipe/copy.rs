/*!
 * Copy Capability
 * Fallible byte copies across the caller/pipe trust boundary
 *
 * The pipe never touches caller memory directly. Device glue supplies a
 * `CopyIn` for writes and a `CopyOut` for reads; a copy may fault part way
 * through a chunk and reports how much of the chunk made it across.
 */

use crate::core::types::Size;
use thiserror::Error;

/// A copy primitive faulted after `copied` bytes of the requested chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("copy faulted after {copied} bytes")]
pub struct CopyFault {
    pub copied: Size,
}

/// Source of bytes for a write
pub trait CopyIn {
    /// Total bytes the caller offers
    fn len(&self) -> Size;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `dst` with the caller's bytes starting at `offset`
    ///
    /// On a fault, `dst[..fault.copied]` holds valid bytes.
    fn copy_in(&self, offset: Size, dst: &mut [u8]) -> Result<(), CopyFault>;
}

/// Destination for the bytes of a read
pub trait CopyOut {
    /// Most bytes the caller can accept
    fn capacity(&self) -> Size;

    /// Write `src` into the caller's memory starting at `offset`
    ///
    /// On a fault, only `src[..fault.copied]` reached the caller.
    fn copy_out(&mut self, offset: Size, src: &[u8]) -> Result<(), CopyFault>;
}

impl CopyIn for [u8] {
    #[inline]
    fn len(&self) -> Size {
        <[u8]>::len(self)
    }

    #[inline]
    fn copy_in(&self, offset: Size, dst: &mut [u8]) -> Result<(), CopyFault> {
        dst.copy_from_slice(&self[offset..offset + dst.len()]);
        Ok(())
    }
}

impl CopyOut for [u8] {
    #[inline]
    fn capacity(&self) -> Size {
        self.len()
    }

    #[inline]
    fn copy_out(&mut self, offset: Size, src: &[u8]) -> Result<(), CopyFault> {
        self[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }
}
