//! Write credit for a connect stream.

use crate::error::Error;

/// Bytes the gateway may still write on a connection, and the per-write
/// framing overhead the destination charges for each write.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    credit: i64,
    padding: i32,
}

impl Budget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining credit. Never negative.
    pub fn credit(&self) -> i64 {
        self.credit
    }

    pub fn padding(&self) -> i32 {
        self.padding
    }

    /// Add `credit` from a window signal and adopt its padding.
    pub fn grant(&mut self, credit: i32, padding: i32) {
        self.credit += i64::from(credit);
        self.padding = padding;
    }

    /// Largest payload a single write may carry right now.
    pub fn writable(&self) -> usize {
        (self.credit - i64::from(self.padding)).max(0) as usize
    }

    /// Charge a write of `len` payload bytes plus padding.
    /// Returns error, leaving the budget untouched, if it would go negative.
    pub fn consume(&mut self, len: usize) -> Result<(), Error> {
        let new = self.credit - len as i64 - i64::from(self.padding);
        if new < 0 {
            return Err(Error::FlowControl);
        }
        self.credit = new;
        Ok(())
    }
}
