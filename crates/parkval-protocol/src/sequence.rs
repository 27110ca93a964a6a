//! Correlation sequence numbers.

use std::sync::atomic::{AtomicU32, Ordering};

/// Hands out correlation sequence numbers, one per request.
///
/// One allocator belongs to one client instance. Allocation is atomic, so a
/// client shared between tasks never issues the same number twice. The
/// first number handed out is 1; after `u32::MAX` the counter wraps to 0.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    last: AtomicU32,
}

impl SequenceAllocator {
    pub const fn new() -> Self {
        Self::starting_after(0)
    }

    /// Allocator whose next number is `last + 1`.
    pub const fn starting_after(last: u32) -> Self {
        Self {
            last: AtomicU32::new(last),
        }
    }

    /// Allocate the next sequence number.
    pub fn next(&self) -> u32 {
        self.last.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Most recently allocated number (0 if none yet).
    pub fn last(&self) -> u32 {
        self.last.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn starts_at_one_and_increments() {
        let seq = SequenceAllocator::new();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        assert_eq!(seq.last(), 2);
    }

    #[test]
    fn wraps_at_integer_width() {
        let seq = SequenceAllocator::starting_after(u32::MAX - 1);
        assert_eq!(seq.next(), u32::MAX);
        assert_eq!(seq.next(), 0);
        assert_eq!(seq.next(), 1);
    }

    #[test]
    fn concurrent_allocation_never_repeats() {
        let seq = Arc::new(SequenceAllocator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = Arc::clone(&seq);
                std::thread::spawn(move || (0..1000).map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for n in handle.join().unwrap_or_default() {
                assert!(seen.insert(n), "sequence {n} allocated twice");
            }
        }
        assert_eq!(seen.len(), 8000);
        assert_eq!(seq.last(), 8000);
    }
}
