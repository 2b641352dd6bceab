//! Rollback bookkeeping for decode-time constructions.
//!
//! Plain allocations made while decoding are rolled back by ownership: a
//! failed decode drops the partial value tree. What ownership cannot see
//! are the side effects of custom constructors (pool accounting, resource
//! acquisition), so every [`Construct::create`](crate::Construct::create)
//! call registers its `dismantle` here. On success the ledger is
//! discarded without running anything; on failure it is unwound in
//! insertion order, making decode all-or-nothing.
//!
//! The ledger never runs on the encode path.

/// Entries held inline before spilling to the heap.
const INLINE_ENTRIES: usize = 8;

type Finalizer = Box<dyn FnOnce()>;

/// Two-tier rollback ledger: a fixed inline tier covers the common case
/// without allocating the bookkeeping table, and an overflow `Vec` takes
/// the excess.
#[derive(Default)]
pub struct Ledger {
    inline: [Option<Finalizer>; INLINE_ENTRIES],
    spill: Vec<Finalizer>,
    len: usize,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Register a rollback action. O(1) amortized.
    pub fn add(&mut self, finalizer: impl FnOnce() + 'static) {
        if self.len < INLINE_ENTRIES {
            self.inline[self.len] = Some(Box::new(finalizer));
        } else {
            self.spill.push(Box::new(finalizer));
        }
        self.len += 1;
    }

    /// Success path: drop all bookkeeping without running any finalizer.
    /// Ownership of every registered object has transferred to the caller.
    pub fn discard(mut self) {
        self.forget_entries();
    }

    /// Failure path: run every finalizer in insertion order.
    pub fn unwind(mut self) {
        self.run_entries();
    }

    fn forget_entries(&mut self) {
        for slot in &mut self.inline {
            *slot = None;
        }
        self.spill.clear();
        self.len = 0;
    }

    fn run_entries(&mut self) {
        for slot in &mut self.inline {
            if let Some(finalizer) = slot.take() {
                finalizer();
            }
        }
        for finalizer in self.spill.drain(..) {
            finalizer();
        }
        self.len = 0;
    }
}

/// A context abandoned mid-decode still rolls back.
impl Drop for Ledger {
    fn drop(&mut self) {
        self.run_entries();
    }
}
