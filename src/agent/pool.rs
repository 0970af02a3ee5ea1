//! Ordered pool of the contexts an agent keeps between turns.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::context::ConversationContext;

/// Mutex-guarded list of pooled contexts. The lock is never held across an
/// await; callers work on [`snapshot`](ContextPool::snapshot)s.
#[derive(Debug, Default)]
pub struct ContextPool {
    contexts: Mutex<Vec<ConversationContext>>,
}

impl ContextPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConversationContext>> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a context unless one with the same id is already pooled.
    ///
    /// Returns `true` when the context was inserted.
    pub fn add(&self, context: ConversationContext) -> bool {
        let mut contexts = self.lock();
        if contexts.iter().any(|c| c.id() == context.id()) {
            return false;
        }
        context.set_persisted(true);
        contexts.push(context);
        true
    }

    /// Remove the context with `id`, returning it if it was pooled.
    pub fn remove(&self, id: &str) -> Option<ConversationContext> {
        let mut contexts = self.lock();
        let index = contexts.iter().position(|c| c.id() == id)?;
        let context = contexts.remove(index);
        context.set_persisted(false);
        Some(context)
    }

    /// Point-in-time copy of the pool, in insertion order.
    pub fn snapshot(&self) -> Vec<ConversationContext> {
        self.lock().clone()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().iter().any(|c| c.id() == id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
