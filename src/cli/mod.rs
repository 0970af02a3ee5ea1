//! CLI entry point for parley.

use clap::{Parser, Subcommand};

use crate::error::{ParleyError, Result};

/// Parley multi-agent CLI
#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Talk to remote assistants through routed sessions")]
pub struct Cli {
    /// Config file (defaults to ~/.parley/config.toml)
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send messages to an assistant
    Chat(ChatArgs),
    /// Delete a remote thread
    DeleteThread(DeleteThreadArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Remote assistant id of the recipient
    #[arg(short, long)]
    pub assistant: String,

    /// Display name of the recipient
    #[arg(short, long, default_value = "Assistant")]
    pub name: String,

    /// Agents the recipient may message, as `<assistant_id>=<name>`
    #[arg(long = "delegate", value_parser = parse_delegate)]
    pub delegates: Vec<Delegate>,

    /// Uploaded file ids to attach to the first message
    #[arg(long = "file")]
    pub files: Vec<String>,

    /// Pool the contexts used, so follow-up messages can be routed back to them
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub persist: bool,

    /// Poll runs instead of streaming assistant output
    #[arg(long)]
    pub no_stream: bool,

    /// Message to send; without it, messages are read from stdin line by line
    pub message: Option<String>,
}

/// Arguments for the `delete-thread` subcommand.
#[derive(Parser, Debug)]
pub struct DeleteThreadArgs {
    pub thread_id: String,
}

/// A `--delegate` recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Delegate {
    pub assistant_id: String,
    pub name: String,
}

fn parse_delegate(raw: &str) -> std::result::Result<Delegate, String> {
    match raw.split_once('=') {
        Some((id, name)) if !id.trim().is_empty() && !name.trim().is_empty() => Ok(Delegate {
            assistant_id: id.trim().to_string(),
            name: name.trim().to_string(),
        }),
        _ => Err(format!("expected <assistant_id>=<name>, got '{raw}'")),
    }
}

/// Truncate tool output for terminal display on a char boundary.
pub fn truncate_for_display(output: &str, limit: usize) -> String {
    if output.len() <= limit {
        return output.to_string();
    }
    let mut end = limit;
    while end > 0 && !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &output[..end])
}

/// Load config from `path` (or the default chain).
pub fn load_config(path: Option<&std::path::Path>) -> Result<crate::config::ParleyConfig> {
    let config = match path {
        Some(path) => {
            let _ = dotenvy::dotenv();
            let mut config = crate::config::ParleyConfig::from_file(path)?;
            config.apply_env(|name| std::env::var(name).ok())?;
            config
        }
        None => crate::config::ParleyConfig::load()?,
    };
    if config.api_key().is_none() {
        return Err(ParleyError::Configuration(
            "no API key: set OPENAI_API_KEY or api_key in the config file".to_string(),
        ));
    }
    Ok(config)
}
