/*!
 * Buffer Allocation
 * Injected source of backing storage for session buffers
 */

use super::types::{PipeError, PipeResult};
use crate::core::types::Size;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// Provides zeroed storage for a session's circular buffer
///
/// `release` is called with the same capacity once the coordinator reclaims
/// the session that owned the storage.
pub trait BufferAllocator: Send + Sync {
    fn allocate(&self, capacity: Size) -> PipeResult<Box<[u8]>>;

    fn release(&self, capacity: Size) {
        let _ = capacity;
    }

    /// Bytes currently handed out (for diagnostics)
    fn in_use(&self) -> Size {
        0
    }
}

fn zeroed(capacity: Size) -> PipeResult<Box<[u8]>> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(capacity)
        .map_err(|e| PipeError::AllocationFailed(e.to_string()))?;
    storage.resize(capacity, 0);
    Ok(storage.into_boxed_slice())
}

/// Heap allocation that reports failure instead of aborting
#[derive(Debug, Default)]
pub struct SystemAllocator;

impl BufferAllocator for SystemAllocator {
    fn allocate(&self, capacity: Size) -> PipeResult<Box<[u8]>> {
        zeroed(capacity)
    }
}

/// Heap allocation bounded by a global byte budget
#[derive(Debug)]
pub struct BudgetAllocator {
    budget: Size,
    used: AtomicUsize,
}

impl BudgetAllocator {
    pub fn new(budget: Size) -> Self {
        Self {
            budget,
            used: AtomicUsize::new(0),
        }
    }

    pub fn budget(&self) -> Size {
        self.budget
    }
}

impl BufferAllocator for BudgetAllocator {
    fn allocate(&self, capacity: Size) -> PipeResult<Box<[u8]>> {
        let reserved = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(capacity).filter(|&next| next <= self.budget)
            });

        if let Err(used) = reserved {
            warn!(
                requested = capacity,
                used,
                budget = self.budget,
                "pipe memory budget exhausted"
            );
            return Err(PipeError::AllocationFailed(format!(
                "budget exhausted: {} + {} > {} bytes",
                used, capacity, self.budget
            )));
        }

        zeroed(capacity).inspect_err(|_| {
            self.used.fetch_sub(capacity, Ordering::AcqRel);
        })
    }

    fn release(&self, capacity: Size) {
        let _ = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(capacity))
            });
    }

    fn in_use(&self) -> Size {
        self.used.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_allocator_zeroes() {
        let storage = SystemAllocator.allocate(64).unwrap();
        assert_eq!(storage.len(), 64);
        assert!(storage.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_budget_allocator_limits() {
        let allocator = BudgetAllocator::new(100);
        let _first = allocator.allocate(60).unwrap();
        assert_eq!(allocator.in_use(), 60);

        let result = allocator.allocate(60);
        assert!(matches!(result, Err(PipeError::AllocationFailed(_))));
        assert_eq!(allocator.in_use(), 60);

        allocator.release(60);
        assert_eq!(allocator.in_use(), 0);
        assert!(allocator.allocate(100).is_ok());
    }
}
