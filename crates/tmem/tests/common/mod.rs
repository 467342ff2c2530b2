// Common test utilities for integration tests
//
// Provides a memory provider that counts calls and can be told to refuse
// requests, so tests can observe how the arena behaves when the system
// allocator fails.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use tmem::{Arena, ArenaConfig, Block, Error, MemoryProvider, Result, SystemProvider};

/// Shared view of a [`FlakyProvider`]'s counters.
#[derive(Debug, Default)]
pub struct ProviderLog {
    pub allocations: Cell<usize>,
    pub releases: Cell<usize>,
    pub refused: Cell<usize>,
    pub live_bytes: Cell<usize>,
    /// Remaining allocations to grant; `None` means unlimited.
    pub budget: Cell<Option<usize>>,
    /// Requests to refuse before granting again.
    pub refuse_next: Cell<usize>,
}

impl ProviderLog {
    pub fn live_blocks(&self) -> usize {
        self.allocations.get() - self.releases.get()
    }

    /// Refuses every request after the next `n` have been granted.
    pub fn fail_after(&self, n: usize) {
        self.budget.set(Some(n));
    }

    pub fn fail_now(&self) {
        self.budget.set(Some(0));
    }

    /// Refuses the next `n` requests, then grants as before.
    pub fn fail_next(&self, n: usize) {
        self.refuse_next.set(n);
    }

    pub fn recover(&self) {
        self.budget.set(None);
        self.refuse_next.set(0);
    }
}

/// Wraps [`SystemProvider`], counting calls and refusing on demand.
#[derive(Debug, Default)]
pub struct FlakyProvider {
    inner: SystemProvider,
    log: Rc<ProviderLog>,
}

impl FlakyProvider {
    pub fn new() -> (Self, Rc<ProviderLog>) {
        let log = Rc::new(ProviderLog::default());
        (
            Self {
                inner: SystemProvider,
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

impl MemoryProvider for FlakyProvider {
    fn allocate(&mut self, size: usize) -> Result<Block> {
        let refuse = match (self.log.refuse_next.get(), self.log.budget.get()) {
            (0, Some(0)) => true,
            (0, Some(n)) => {
                self.log.budget.set(Some(n - 1));
                false
            }
            (0, None) => false,
            (n, _) => {
                self.log.refuse_next.set(n - 1);
                true
            }
        };
        if refuse {
            self.log.refused.set(self.log.refused.get() + 1);
            return Err(Error::AllocationFailed { size });
        }

        let block = self.inner.allocate(size)?;
        self.log.allocations.set(self.log.allocations.get() + 1);
        self.log.live_bytes.set(self.log.live_bytes.get() + block.len());
        Ok(block)
    }

    fn release(&mut self, block: Block) {
        self.log.releases.set(self.log.releases.get() + 1);
        self.log.live_bytes.set(self.log.live_bytes.get() - block.len());
        self.inner.release(block);
    }
}

/// An arena over a fresh [`FlakyProvider`].
pub fn flaky_arena(config: ArenaConfig) -> (Arena<FlakyProvider>, Rc<ProviderLog>) {
    let (provider, log) = FlakyProvider::new();
    (Arena::with_provider(config, provider), log)
}
