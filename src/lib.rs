//! parley: multi-agent conversation sessions over stateful assistant threads.
//!
//! A [`Session`](session::Session) carries one message from a caller (a user
//! or another agent) to a recipient [`Agent`](agent::Agent). It routes the
//! message to one of the recipient's pooled conversation contexts or opens a
//! new one, drives the remote run through tool calls and transient failures,
//! and keeps a summary of each pooled context for later routing. Agents can
//! delegate to each other through the [`SendMessage`](tools::SendMessage)
//! tool, which opens nested sessions.
//!
//! # Quick Start
//!
//! ```no_run
//! use parley::prelude::*;
//!
//! # async fn example() -> parley::Result<()> {
//! let config = ParleyConfig::load()?;
//! let runtime = Runtime::from_config(&config)?;
//! let planner = Agent::builder().id("asst_planner").name("Planner").build();
//!
//! let mut session = Session::new(runtime, Caller::user(), planner);
//! let answer = session.converse("Plan a trip to Lisbon", ConverseOptions::default()).await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod prelude;
pub mod remote;
pub mod session;
pub mod tools;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{ParleyError, Result};
