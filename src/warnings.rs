//! Sink for recoverable conditions.
//!
//! Parsing and resolution never log directly; they report through a
//! [`Warnings`] handle owned by the caller, which decides whether anything
//! reaches the `tracing` subscriber.

use rustc_hash::FxHashSet;
use std::cell::{Cell, RefCell};
use std::fmt;

#[derive(Debug, Default)]
pub struct Warnings {
    muted: bool,
    emitted: Cell<usize>,
    seen: RefCell<FxHashSet<String>>,
}

impl Warnings {
    /// A sink that forwards every warning to `tracing`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that only counts warnings.
    pub fn muted() -> Self {
        Self::with_muted(true)
    }

    pub fn with_muted(muted: bool) -> Self {
        Self {
            muted,
            ..Self::default()
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Report a recoverable condition.
    pub fn warn(&self, message: fmt::Arguments<'_>) {
        self.emitted.set(self.emitted.get() + 1);
        if !self.muted {
            tracing::warn!("{}", message);
        }
    }

    /// Report a condition at most once per `key`.
    pub fn warn_once(&self, key: &str, message: fmt::Arguments<'_>) {
        let first = self.seen.borrow_mut().insert(key.to_string());
        if first {
            self.warn(message);
        }
    }

    /// Number of warnings reported so far, muted or not.
    pub fn count(&self) -> usize {
        self.emitted.get()
    }
}
