//! Per-module compatibility patches.
//!
//! Some third-party tools need the value they load adjusted before use.
//! Rather than mutating already-loaded modules keyed by request name,
//! hosts register (caller predicate, transform) pairs during setup and
//! consult the registry exactly once per freshly loaded module.

use crate::graph::Locator;
use std::fmt;

type Predicate = Box<dyn Fn(&Locator) -> bool + Send + Sync>;

struct PatchEntry<T> {
    predicate: Predicate,
    transform: Box<dyn Fn(T) -> T + Send + Sync>,
}

/// Registry of caller-scoped module transforms.
///
/// Populated during setup through `&mut self`, read-only afterwards.
/// [`apply`](Self::apply) folds the transforms whose predicate accepts
/// the calling package, in registration order.
pub struct PatchRegistry<T> {
    entries: Vec<PatchEntry<T>>,
}

impl<T> Default for PatchRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PatchRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a transform for modules loaded by callers matching
    /// `predicate`.
    pub fn register(
        &mut self,
        predicate: impl Fn(&Locator) -> bool + Send + Sync + 'static,
        transform: impl Fn(T) -> T + Send + Sync + 'static,
    ) {
        self.entries.push(PatchEntry {
            predicate: Box::new(predicate),
            transform: Box::new(transform),
        });
    }

    /// Run `value` through every transform registered for `caller`.
    #[must_use]
    pub fn apply(&self, caller: &Locator, value: T) -> T {
        self.entries
            .iter()
            .filter(|entry| (entry.predicate)(caller))
            .fold(value, |value, entry| (entry.transform)(value))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T> fmt::Debug for PatchRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}
