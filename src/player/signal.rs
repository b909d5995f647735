//! Level-triggered advance signal
//!
//! End-of-media notifications and schedule expiry both request an
//! autonomous advance through this flag. Raising an already raised signal is
//! a no-op, so bursts of triggers collapse into a single advance.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Flag {
    raised: bool,
    closed: bool,
}

/// Coalescing wake-up flag consumed by the advance worker
#[derive(Debug, Default)]
pub struct AdvanceSignal {
    flag: Mutex<Flag>,
    condvar: Condvar,
}

impl AdvanceSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an advance
    pub fn raise(&self) {
        let mut flag = self.flag.lock();
        if !flag.raised {
            flag.raised = true;
            self.condvar.notify_one();
        }
    }

    /// Drop a pending request
    pub fn clear(&self) {
        self.flag.lock().raised = false;
    }

    /// Consume a pending request, returning whether there was one
    pub fn take(&self) -> bool {
        std::mem::take(&mut self.flag.lock().raised)
    }

    pub fn is_raised(&self) -> bool {
        self.flag.lock().raised
    }

    /// Block until raised or closed. Returns false once closed.
    ///
    /// The request is left pending; the consumer takes it under its own lock.
    pub fn wait(&self) -> bool {
        let mut flag = self.flag.lock();
        while !flag.raised && !flag.closed {
            self.condvar.wait(&mut flag);
        }
        !flag.closed
    }

    /// Wake every waiter for good
    pub fn close(&self) {
        self.flag.lock().closed = true;
        self.condvar.notify_all();
    }
}
