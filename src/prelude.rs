//! Convenience re-exports for common use.

pub use crate::agent::Agent;
pub use crate::config::{ParleyConfig, SessionSettings};
pub use crate::context::{ContextProperty, ContextStatus, ConversationContext};
pub use crate::error::{ParleyError, Result};
pub use crate::llm::{CompletionRequest, LanguageService};
pub use crate::remote::{AssistantsBackend, Attachment, HostedTool};
pub use crate::session::{Caller, ConverseOptions, EventKind, Runtime, Session, SessionEvent};
pub use crate::tools::{AgentTool, SendMessage, Tool, ToolArguments, ToolContext, ToolOutput, ToolParameters};
