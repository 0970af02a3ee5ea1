//! Agents: remote assistants with tools and a pool of conversation contexts.

pub mod agent;
pub mod pool;

pub use agent::{Agent, WeakAgent};
pub use pool::ContextPool;
