//! Tool system for assistant function calls.

pub mod arguments;
pub mod send_message;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use send_message::SendMessage;
pub use tool::{AgentTool, Tool, ToolContext, ToolOutput, ToolStreamItem};
pub use types::{ParameterBuilder, ToolParameters};
