//! Sessions: one logical turn between a caller and a recipient agent.
//!
//! A turn routes the message to a pooled context (or opens a new one),
//! locks it, drives the remote run to a terminal state, and then either
//! summarizes and pools the context or discards it.

pub mod dispatcher;
pub mod driver;
pub mod events;
pub mod router;
pub mod runtime;
pub mod summarizer;

pub use events::{EventKind, EventSink, SessionEvent};
pub use runtime::Runtime;

use std::fmt;
use std::sync::Arc;

use bon::Builder;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::context::{ChainOwner, ContextLease, ConversationContext};
use crate::error::{ParleyError, Result};
use crate::remote::Attachment;

use driver::RunDriver;
use events::EventEmitter;

/// Who sends the message of a session.
#[derive(Clone)]
pub enum Caller {
    /// A human user; `id` roots the delegation chain.
    User { id: String, name: String },
    /// Another agent, calling from the context it is currently driving.
    Agent {
        agent: Agent,
        context: ConversationContext,
    },
}

impl Caller {
    /// A user with a fresh random id.
    pub fn user() -> Self {
        Self::User {
            id: uuid::Uuid::new_v4().to_string(),
            name: "user".to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::User { name, .. } => name,
            Self::Agent { agent, .. } => agent.name(),
        }
    }

    /// Root caller id of the chain this session belongs to.
    pub fn chain_owner(&self) -> ChainOwner {
        match self {
            Self::User { id, .. } => ChainOwner::new(id.clone()),
            Self::Agent { context, .. } => context
                .chain_owner()
                .unwrap_or_else(|| ChainOwner::new(context.id())),
        }
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { id, name } => f.debug_struct("User").field("id", id).field("name", name).finish(),
            Self::Agent { agent, context } => f
                .debug_struct("Agent")
                .field("agent", &agent.name())
                .field("context", &context.id())
                .finish(),
        }
    }
}

/// Per-message options of [`Session::converse`].
#[derive(Debug, Clone, Builder)]
pub struct ConverseOptions {
    /// Attachments passed through as given.
    #[builder(default)]
    pub attachments: Vec<Attachment>,
    /// Uploaded file ids, attached for the recipient's hosted tools.
    #[builder(default)]
    pub message_files: Vec<String>,
    /// Keep a newly used context in the recipient's pool after the turn.
    #[builder(default = true)]
    pub persist: bool,
}

impl Default for ConverseOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// One caller-to-recipient conversation turn.
pub struct Session {
    runtime: Runtime,
    caller: Caller,
    recipient: Agent,
    retry_budget: u32,
    depth: u32,
    events: EventEmitter,
}

impl Session {
    pub fn new(runtime: Runtime, caller: Caller, recipient: Agent) -> Self {
        let retry_budget = runtime.settings().retry_budget;
        Self {
            runtime,
            caller,
            recipient,
            retry_budget,
            depth: 0,
            events: EventEmitter::new(None, 0),
        }
    }

    /// Delegation depth; 0 for a session started by a user.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self.events = EventEmitter::new(self.events.sink().cloned(), depth);
        self
    }

    /// Report events to `sink` and stream run output.
    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.events = EventEmitter::new(Some(sink), self.depth);
        self
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn recipient(&self) -> &Agent {
        &self.recipient
    }

    /// Failed or expired runs this session may still retry.
    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Run one turn and return the recipient's answer.
    pub async fn converse(&mut self, message: &str, options: ConverseOptions) -> Result<String> {
        let selected = router::select_context(
            &self.runtime,
            &self.recipient,
            self.caller.name(),
            message,
        )
        .await?;
        let lease = self.lock_context(selected, options.persist).await?;
        let thread_id = lease.id().to_string();

        self.events.emit(
            EventKind::Text,
            self.caller.name(),
            self.recipient.name(),
            Some(&thread_id),
            message,
        );

        let mut attachments = options.attachments;
        attachments.extend(self.recipient.attachments_for(&options.message_files));

        let response = RunDriver {
            runtime: &self.runtime,
            recipient: &self.recipient,
            caller_name: self.caller.name(),
            events: &self.events,
            depth: self.depth,
            retry_budget: &mut self.retry_budget,
        }
        .drive(&lease, message, &attachments)
        .await?;

        self.finish_turn(lease, message, &response).await;

        self.events.emit(
            EventKind::ResponseText,
            self.recipient.name(),
            self.caller.name(),
            Some(&thread_id),
            response.as_str(),
        );
        Ok(response)
    }

    /// Run one turn on its own task, yielding its events as they happen.
    ///
    /// The last item is the `response_text` event carrying the answer, or the
    /// error that ended the turn.
    pub fn converse_stream(
        mut self,
        message: impl Into<String>,
        options: ConverseOptions,
    ) -> BoxStream<'static, Result<SessionEvent>> {
        let (tx, rx) = mpsc::unbounded_channel::<Result<SessionEvent>>();
        let sink: EventSink = {
            let tx = tx.clone();
            Arc::new(move |event| {
                let _ = tx.send(Ok(event));
            })
        };
        self.events = EventEmitter::new(Some(sink), self.depth);
        let message = message.into();

        tokio::spawn(async move {
            if let Err(e) = self.converse(&message, options).await {
                let _ = tx.send(Err(e));
            }
        });

        UnboundedReceiverStream::new(rx).boxed()
    }

    /// Lock the routed context, or a new one when nothing fits or it is busy.
    async fn lock_context(
        &self,
        selected: Option<ConversationContext>,
        persist: bool,
    ) -> Result<ContextLease> {
        let owner = self.caller.chain_owner();
        let Some(context) = selected else {
            let context = self.open_context(None).await?;
            return context.acquire(owner, persist);
        };
        match context.acquire(owner.clone(), persist) {
            Ok(lease) => Ok(lease),
            Err(ParleyError::ContextBusy(id)) => {
                info!(thread_id = %id, agent = self.recipient.name(), "routed context is busy, forking");
                let fork = self.open_context(Some(&context)).await?;
                fork.acquire(owner, persist)
            }
            Err(e) => Err(e),
        }
    }

    async fn open_context(&self, busy: Option<&ConversationContext>) -> Result<ConversationContext> {
        let thread_id = self.runtime.backend().create_thread().await?;
        let context = match busy {
            Some(source) => ConversationContext::fork_of(thread_id, source),
            None => ConversationContext::new(thread_id),
        };
        info!(
            thread_id = context.id(),
            agent = self.recipient.name(),
            caller = self.caller.name(),
            properties = %context.properties(),
            "new context"
        );
        Ok(context)
    }

    /// Pool and summarize a persistent context, or discard a one-off one.
    async fn finish_turn(&self, lease: ContextLease, message: &str, response: &str) {
        let context = lease.context().clone();
        if context.is_discardable() {
            drop(lease);
            if self.runtime.settings().delete_discarded_contexts {
                if let Err(e) = self.runtime.backend().delete_thread(context.id()).await {
                    warn!(thread_id = context.id(), error = %e, "failed to delete discarded context");
                }
            }
            return;
        }

        let exchange = summarizer::exchange_text(message, response);
        summarizer::update(&self.runtime, &context, &exchange).await;
        self.recipient.add_context(context);
        drop(lease);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("caller", &self.caller)
            .field("recipient", &self.recipient.name())
            .field("retry_budget", &self.retry_budget)
            .field("depth", &self.depth)
            .finish()
    }
}
