//! Drives the remote runs of one turn to a terminal state.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::dispatcher::ToolDispatcher;
use super::events::{EventEmitter, EventKind};
use super::runtime::Runtime;
use crate::agent::Agent;
use crate::context::ContextLease;
use crate::error::{ParleyError, Result};
use crate::remote::{Attachment, DeltaSink, RemoteRun, RequiredToolCall, RunStatus, ToolOutputSubmission};
use crate::util::wait::pause;

/// A tool call whose output was computed but may not have reached the run.
#[derive(Debug, Serialize)]
struct ExecutedStep<'a> {
    tool_call: &'a RequiredToolCall,
    output: &'a str,
}

/// Message that replays tool results into a fresh run after their
/// submission was lost.
pub fn compensation_message(steps: &[(RequiredToolCall, String)]) -> Result<String> {
    let steps: Vec<ExecutedStep<'_>> = steps
        .iter()
        .map(|(call, output)| ExecutedStep {
            tool_call: call,
            output,
        })
        .collect();
    let json = serde_json::to_string(&steps)?;
    Ok(format!(
        "We have executed the following steps:\n---\n{json}\n---\nkeep going on."
    ))
}

pub(crate) struct RunDriver<'a> {
    pub(crate) runtime: &'a Runtime,
    pub(crate) recipient: &'a Agent,
    pub(crate) caller_name: &'a str,
    pub(crate) events: &'a EventEmitter,
    pub(crate) depth: u32,
    pub(crate) retry_budget: &'a mut u32,
}

impl RunDriver<'_> {
    /// Post `message` on the leased thread and run until the assistant answers.
    pub(crate) async fn drive(
        &mut self,
        lease: &ContextLease,
        message: &str,
        attachments: &[Attachment],
    ) -> Result<String> {
        let thread_id = lease.id();
        let mut run = self.start_run(thread_id, message, attachments).await?;

        loop {
            run = self.wait_until_settled(thread_id, run).await?;
            match run.status {
                RunStatus::RequiresAction => {
                    let steps = self.execute_tool_calls(lease, &run).await?;
                    let outputs: Vec<ToolOutputSubmission> = steps
                        .iter()
                        .map(|(call, output)| ToolOutputSubmission {
                            tool_call_id: call.id.clone(),
                            output: output.clone(),
                        })
                        .collect();
                    let submitted = self.submit(thread_id, &run.id, &outputs).await;
                    match submitted {
                        Ok(next) => run = next,
                        Err(e) => {
                            warn!(
                                thread_id,
                                run_id = %run.id,
                                error = %e,
                                "tool output submission failed, replaying results in a new run"
                            );
                            let replay = compensation_message(&steps)?;
                            run = self.start_run(thread_id, &replay, attachments).await?;
                        }
                    }
                }
                status if status.is_failure() => {
                    if *self.retry_budget == 0 {
                        return Err(ParleyError::RunFailed {
                            run_id: run.id.clone(),
                            status: run.status,
                            detail: run.failure_detail(),
                        });
                    }
                    *self.retry_budget -= 1;
                    info!(
                        thread_id,
                        run_id = %run.id,
                        status = %run.status,
                        detail = %run.failure_detail(),
                        remaining = *self.retry_budget,
                        agent = self.recipient.name(),
                        "run ended unsuccessfully, retrying"
                    );
                    pause(self.runtime.settings().retry_backoff, self.runtime.cancellation()).await?;
                    run = self.create_run(thread_id).await?;
                }
                _ => return self.latest_text(thread_id).await,
            }
        }
    }

    async fn start_run(
        &self,
        thread_id: &str,
        message: &str,
        attachments: &[Attachment],
    ) -> Result<RemoteRun> {
        self.runtime
            .backend()
            .add_message(thread_id, message, attachments)
            .await?;
        self.create_run(thread_id).await
    }

    async fn create_run(&self, thread_id: &str) -> Result<RemoteRun> {
        let backend = self.runtime.backend();
        let run = match self.delta_sink(thread_id) {
            Some(sink) => {
                backend
                    .create_run_streamed(thread_id, self.recipient.id(), sink)
                    .await?
            }
            None => backend.create_run(thread_id, self.recipient.id()).await?,
        };
        debug!(thread_id, run_id = %run.id, status = %run.status, "run created");
        Ok(run)
    }

    async fn submit(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutputSubmission],
    ) -> Result<RemoteRun> {
        let backend = self.runtime.backend();
        match self.delta_sink(thread_id) {
            Some(sink) => {
                backend
                    .submit_tool_outputs_streamed(thread_id, run_id, outputs, sink)
                    .await
            }
            None => backend.submit_tool_outputs(thread_id, run_id, outputs).await,
        }
    }

    /// Poll until the run leaves `queued`/`in_progress`.
    async fn wait_until_settled(&self, thread_id: &str, mut run: RemoteRun) -> Result<RemoteRun> {
        while run.status.is_pending() {
            pause(self.runtime.settings().poll_interval, self.runtime.cancellation()).await?;
            run = self.runtime.backend().retrieve_run(thread_id, &run.id).await?;
            debug!(thread_id, run_id = %run.id, status = %run.status, "run polled");
        }
        Ok(run)
    }

    async fn execute_tool_calls(
        &self,
        lease: &ContextLease,
        run: &RemoteRun,
    ) -> Result<Vec<(RequiredToolCall, String)>> {
        let dispatcher = ToolDispatcher {
            runtime: self.runtime,
            recipient: self.recipient,
            events: self.events,
            depth: self.depth,
        };
        let mut steps = Vec::with_capacity(run.tool_calls().len());
        for call in run.tool_calls() {
            self.events.emit(
                EventKind::FunctionCall,
                self.recipient.name(),
                self.caller_name,
                Some(lease.id()),
                serde_json::to_string(&call.function)?,
            );
            let output = dispatcher.execute(call, lease).await?;
            self.events.emit(
                EventKind::FunctionOutput,
                &call.function.name,
                self.recipient.name(),
                Some(lease.id()),
                output.as_str(),
            );
            steps.push((call.clone(), output));
        }
        Ok(steps)
    }

    async fn latest_text(&self, thread_id: &str) -> Result<String> {
        let messages = self.runtime.backend().list_messages(thread_id, 1).await?;
        Ok(messages
            .first()
            .map(|m| m.first_text().to_string())
            .unwrap_or_default())
    }

    /// Sink turning streamed assistant text into `delta` events.
    fn delta_sink(&self, thread_id: &str) -> Option<DeltaSink> {
        if !self.events.is_enabled() {
            return None;
        }
        let events = self.events.clone();
        let sender = self.recipient.name().to_string();
        let recipient = self.caller_name.to_string();
        let thread_id = thread_id.to_string();
        Some(Arc::new(move |text: &str| {
            events.emit(EventKind::Delta, &sender, &recipient, Some(&thread_id), text);
        }))
    }
}
