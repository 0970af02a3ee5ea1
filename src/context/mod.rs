//! Conversation contexts (remote threads) and their exclusive lease.
//!
//! A [`ConversationContext`] is a cheap shared handle. At most one session
//! drives it at a time: [`ConversationContext::acquire`] moves it from
//! `Ready` to `Running` and hands out a [`ContextLease`] that flips it back
//! when dropped.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{ParleyError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContextStatus {
    Ready,
    Running,
}

/// Lifetime class of a context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContextProperty {
    /// Kept in the recipient's pool after a successful turn.
    Persistent,
    /// Used for a single turn and then dropped.
    OneOff,
    /// Fork of a busy context; dropped like [`ContextProperty::OneOff`].
    CopyOnWrite,
}

/// Identity of the root caller of a delegation chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainOwner(pub String);

impl ChainOwner {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct ContextState {
    status: ContextStatus,
    properties: ContextProperty,
    task_description: String,
    chain_owner: Option<ChainOwner>,
    persisted: bool,
}

#[derive(Debug)]
struct ContextInner {
    id: String,
    created_at: DateTime<Utc>,
    forked_from: Option<String>,
    state: Mutex<ContextState>,
}

/// Handle to one remote conversation thread.
#[derive(Clone)]
pub struct ConversationContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for ConversationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ConversationContext")
            .field("id", &self.inner.id)
            .field("status", &state.status)
            .field("properties", &state.properties)
            .field("persisted", &state.persisted)
            .finish()
    }
}

impl PartialEq for ConversationContext {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ConversationContext {}

impl ConversationContext {
    /// Wrap a freshly created remote thread as a `Persistent` context.
    pub fn new(id: impl Into<String>) -> Self {
        Self::build(id.into(), ContextProperty::Persistent, None)
    }

    /// Wrap a new remote thread standing in for the busy context `source`.
    pub fn fork_of(id: impl Into<String>, source: &ConversationContext) -> Self {
        Self::build(
            id.into(),
            ContextProperty::CopyOnWrite,
            Some(source.id().to_string()),
        )
    }

    fn build(id: String, properties: ContextProperty, forked_from: Option<String>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id,
                created_at: Utc::now(),
                forked_from,
                state: Mutex::new(ContextState {
                    status: ContextStatus::Ready,
                    properties,
                    task_description: String::new(),
                    chain_owner: None,
                    persisted: false,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ContextState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remote thread id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Id of the busy context this one was forked from.
    pub fn forked_from(&self) -> Option<&str> {
        self.inner.forked_from.as_deref()
    }

    pub fn status(&self) -> ContextStatus {
        self.state().status
    }

    pub fn properties(&self) -> ContextProperty {
        self.state().properties
    }

    /// Whether the context is dropped after its turn instead of pooled.
    pub fn is_discardable(&self) -> bool {
        matches!(
            self.properties(),
            ContextProperty::OneOff | ContextProperty::CopyOnWrite
        )
    }

    pub fn task_description(&self) -> String {
        self.state().task_description.clone()
    }

    pub fn set_task_description(&self, description: impl Into<String>) {
        self.state().task_description = description.into();
    }

    pub fn chain_owner(&self) -> Option<ChainOwner> {
        self.state().chain_owner.clone()
    }

    /// Whether an agent's pool currently holds this context.
    pub fn is_persisted(&self) -> bool {
        self.state().persisted
    }

    pub(crate) fn set_persisted(&self, persisted: bool) {
        self.state().persisted = persisted;
    }

    /// Lock the context for one session.
    ///
    /// Fails with [`ParleyError::ContextBusy`] unless the context is `Ready`.
    /// A context that is neither requested as `persist` nor already held by a
    /// pool is demoted to `OneOff` for this turn.
    pub fn acquire(&self, owner: ChainOwner, persist: bool) -> Result<ContextLease> {
        let mut state = self.state();
        if state.status != ContextStatus::Ready {
            return Err(ParleyError::ContextBusy(self.inner.id.clone()));
        }
        state.status = ContextStatus::Running;
        state.chain_owner = Some(owner);
        if !persist && !state.persisted && state.properties != ContextProperty::CopyOnWrite {
            state.properties = ContextProperty::OneOff;
        }
        drop(state);

        tracing::debug!(thread_id = %self.inner.id, "context acquired");
        Ok(ContextLease {
            context: self.clone(),
        })
    }

    fn release(&self) {
        let mut state = self.state();
        state.status = ContextStatus::Ready;
        state.chain_owner = None;
        drop(state);
        tracing::debug!(thread_id = %self.inner.id, "context released");
    }
}

/// Exclusive hold on a `Running` context. Releases it on drop.
#[derive(Debug)]
pub struct ContextLease {
    context: ConversationContext,
}

impl ContextLease {
    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn id(&self) -> &str {
        self.context.id()
    }
}

impl Drop for ContextLease {
    fn drop(&mut self) {
        self.context.release();
    }
}
