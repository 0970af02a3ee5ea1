//! parley CLI binary entry point.

use std::io::{BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use parley::agent::Agent;
use parley::cli::{truncate_for_display, ChatArgs, Cli, Commands};
use parley::config::ParleyConfig;
use parley::remote::AssistantsBackend;
use parley::session::{Caller, ConverseOptions, EventKind, EventSink, Runtime, Session, SessionEvent};
use parley::tools::SendMessage;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parley=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match parley::cli::load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Chat(args) => handle_chat(config, args).await,
            Commands::DeleteThread(args) => handle_delete(config, &args.thread_id).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_delete(config: ParleyConfig, thread_id: &str) -> parley::Result<()> {
    let backend = parley::remote::openai::OpenAiAssistants::from_config(&config)?;
    backend.delete_thread(thread_id).await?;
    println!("deleted {thread_id}");
    Ok(())
}

async fn handle_chat(config: ParleyConfig, args: ChatArgs) -> parley::Result<()> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }
    let runtime = Runtime::from_config(&config)?.with_cancellation(cancel);

    let delegates: Vec<Agent> = args
        .delegates
        .iter()
        .map(|d| Agent::builder().id(d.assistant_id.clone()).name(d.name.clone()).build())
        .collect();
    let recipient = Agent::builder()
        .id(args.assistant.clone())
        .name(args.name.clone())
        .build();
    if !delegates.is_empty() {
        recipient.add_tool(Arc::new(SendMessage::new(&delegates)));
    }

    let caller = Caller::user();
    let sink: Option<EventSink> = (!args.no_stream).then(|| Arc::new(print_event) as EventSink);
    let mut files = args.files.clone();

    let mut send = |message: String| {
        let options = ConverseOptions::builder()
            .message_files(std::mem::take(&mut files))
            .persist(args.persist)
            .build();
        let mut session = Session::new(runtime.clone(), caller.clone(), recipient.clone());
        let streaming = sink.is_some();
        if let Some(sink) = &sink {
            session = session.with_event_sink(sink.clone());
        }
        async move {
            let answer = session.converse(&message, options).await?;
            if streaming {
                println!();
            } else {
                println!("{answer}");
            }
            Ok::<_, parley::ParleyError>(())
        }
    };

    if let Some(message) = args.message.clone() {
        return send(message).await;
    }

    let stdin = std::io::stdin();
    loop {
        eprint!("> ");
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        send(line.to_string()).await?;
    }
}

fn print_event(event: SessionEvent) {
    let indent = "  ".repeat(event.depth as usize);
    match event.kind {
        EventKind::Delta if event.depth == 0 => {
            print!("{}", event.content);
            let _ = std::io::stdout().flush();
        }
        EventKind::Text if event.depth > 0 => {
            eprintln!("\n{indent}{} -> {}: {}", event.sender, event.recipient, event.content);
        }
        EventKind::FunctionCall => {
            eprintln!("\n{indent}{} calls {}", event.sender, event.content);
        }
        EventKind::FunctionOutput => {
            eprintln!("{indent}{} returned {}", event.sender, truncate_for_display(&event.content, 200));
        }
        _ => {}
    }
}
