//! Session event stream types.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Event category, as exposed to stream consumers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// The message a caller sent.
    Text,
    /// Incremental assistant text from a streamed run.
    Delta,
    FunctionCall,
    FunctionOutput,
    /// The final answer of a turn.
    ResponseText,
}

/// One observable step of a (possibly nested) session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEvent {
    pub kind: EventKind,
    pub sender: String,
    pub recipient: String,
    pub content: String,
    /// Thread the event belongs to, once a context is selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Delegation depth of the session that emitted the event; 0 for the root.
    pub depth: u32,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn is_final(&self) -> bool {
        self.kind == EventKind::ResponseText
    }
}

/// Callback receiving session events.
pub type EventSink = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Stamps events of one session and forwards them to an optional sink.
#[derive(Clone)]
pub(crate) struct EventEmitter {
    sink: Option<EventSink>,
    depth: u32,
}

impl EventEmitter {
    pub(crate) fn new(sink: Option<EventSink>, depth: u32) -> Self {
        Self { sink, depth }
    }

    pub(crate) fn sink(&self) -> Option<&EventSink> {
        self.sink.as_ref()
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn emit(
        &self,
        kind: EventKind,
        sender: &str,
        recipient: &str,
        thread_id: Option<&str>,
        content: impl Into<String>,
    ) {
        let Some(sink) = &self.sink else { return; };
        (sink)(SessionEvent {
            kind,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            content: content.into(),
            thread_id: thread_id.map(str::to_string),
            depth: self.depth,
            timestamp: Utc::now(),
        });
    }

    /// Forward an event produced elsewhere (e.g. by a nested session).
    pub(crate) fn forward(&self, event: SessionEvent) {
        if let Some(sink) = &self.sink {
            (sink)(event);
        }
    }
}
