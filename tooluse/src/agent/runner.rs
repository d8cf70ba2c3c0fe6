//! Runner, the turn-loop engine.
//!
//! The [`Runner`] drives an [`Agent`] through its loop:
//!
//! 1. Request a completion for the conversation so far
//! 2. Parse the text into a [`ModelResult`]
//! 3. On `tool_use`, dispatch each call in order and append one
//!    assistant/user turn pair per call, then loop back to step 1
//! 4. On `stop`, return the answer
//!
//! The loop ends with an error when the output cannot be parsed, the
//! provider keeps failing, the run is cancelled, or the turn budget runs out
//! before the model stops.

use std::future::Future;
use std::pin::Pin;

use futures::future::{Either, select};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::callback::{NoopRunHooks, RunHooks};
use crate::completion::{Completion, CompletionClient, CompletionMode};
use crate::error::{Error, Result};
use crate::message::{Conversation, Turn};
use crate::parse::{ModelResult, ToolCall, parse_model_output};
use crate::usage::Usage;

use super::cancel::CancelSignal;
use super::config::Agent;
use super::result::{RunConfig, RunResult, StepInfo, ToolCallRecord};

/// The outcome of one step after tool calls (if any) have been dispatched.
enum StepOutcome {
    /// The model produced its final answer.
    Done {
        content: String,
        explanation: Option<String>,
    },
    /// Tool calls were dispatched; request another completion.
    Continue,
}

/// Mutable state of one run.
struct RunState<'a> {
    agent: &'a Agent,
    client: CompletionClient,
    hooks: &'a dyn RunHooks,
    cancel: Option<&'a CancelSignal>,
    mode: CompletionMode,
    conversation: Conversation,
    step_history: Vec<StepInfo>,
    usage: Usage,
}

/// Stateless turn-loop engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner;

impl Runner {
    /// Run the loop until the model stops.
    ///
    /// `conversation` is the starting history, normally a single user
    /// question. It is extended in place with the tool-call turn pairs and
    /// returned in the [`RunResult`].
    ///
    /// # Errors
    ///
    /// - [`Error::Llm`] when the provider fails after retries
    /// - [`Error::Parse`] when model output is not a valid result document
    /// - [`Error::Cancelled`] when the cancel signal fires
    /// - [`Error::BudgetExceeded`] when no `stop` arrives within the budget
    ///
    /// Tool failures are not errors; they are reported back to the model.
    pub fn run<'a>(
        agent: &'a Agent,
        conversation: Conversation,
        config: RunConfig,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        let max_turns = config.max_turns.unwrap_or(agent.max_turns);
        let span = info_span!(
            "run",
            provider = agent.provider.provider_name(),
            tools = agent.tools.len(),
            max_turns,
            streaming = config.mode.is_streaming(),
            steps = tracing::field::Empty,
            error = tracing::field::Empty,
        );
        Box::pin(Self::run_inner(agent, conversation, config, max_turns).instrument(span))
    }

    async fn run_inner(
        agent: &Agent,
        conversation: Conversation,
        config: RunConfig,
        max_turns: usize,
    ) -> Result<RunResult> {
        let noop = NoopRunHooks;
        let hooks: &dyn RunHooks = config.hooks.as_deref().unwrap_or(&noop);

        let mut state = RunState {
            agent,
            client: agent.completion_client(),
            hooks,
            cancel: config.cancel.as_ref(),
            mode: config.mode,
            conversation,
            step_history: Vec::new(),
            usage: Usage::zero(),
        };

        hooks.on_run_start(&state.conversation).await;
        info!(model = %state.client.model(), "Run started");

        match state.drive(max_turns).await {
            Ok(result) => {
                tracing::Span::current().record("steps", result.steps);
                info!(steps = result.steps, usage = %result.usage, "Run finished");
                hooks.on_run_end(&result.output, result.steps).await;
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "Run failed");
                tracing::Span::current().record("error", tracing::field::display(&e));
                hooks.on_error(&e).await;
                Err(e)
            }
        }
    }
}

impl RunState<'_> {
    async fn drive(&mut self, max_turns: usize) -> Result<RunResult> {
        for step in 1..=max_turns {
            self.check_cancelled()?;
            debug!(step, turns = self.conversation.len(), "Starting step");

            let completion = self.complete(step).await?;
            self.usage += completion.usage;

            let result = match parse_model_output(&completion.text) {
                Ok(result) => result,
                Err(e) => {
                    warn!(step, raw = %completion.text, reason = e.reason(), "Unparseable model output");
                    return Err(e.into());
                }
            };

            if let StepOutcome::Done {
                content,
                explanation,
            } = self.process_step(step, completion, result).await
            {
                return Ok(self.finish(step, content, explanation));
            }
        }

        warn!(max_turns, "Turn budget exhausted");
        Err(Error::budget_exceeded(max_turns))
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(cancel) if cancel.is_cancelled() => Err(cancelled(cancel)),
            _ => Ok(()),
        }
    }

    /// Request one completion, racing it against the cancel signal.
    async fn complete(&self, step: usize) -> Result<Completion> {
        self.hooks
            .on_completion_start(step, self.conversation.turns())
            .await;

        let request = self
            .client
            .complete(&self.conversation, self.mode, self.hooks);
        let completion = match self.cancel {
            None => request.await?,
            Some(cancel) => {
                let cancelled_fut = cancel.cancelled();
                futures::pin_mut!(request);
                futures::pin_mut!(cancelled_fut);
                match select(request, cancelled_fut).await {
                    Either::Left((completion, _)) => completion?,
                    Either::Right(((), _)) => {
                        debug!(step, "Completion abandoned on cancel");
                        return Err(cancelled(cancel));
                    }
                }
            }
        };

        self.hooks.on_completion_end(step, &completion).await;
        Ok(completion)
    }

    async fn process_step(
        &mut self,
        step: usize,
        completion: Completion,
        result: ModelResult,
    ) -> StepOutcome {
        let mut records = Vec::new();
        let outcome = match &result {
            ModelResult::Stop {
                content,
                explanation,
            } => {
                debug!(step, "Model stopped");
                StepOutcome::Done {
                    content: content.clone(),
                    explanation: explanation.clone(),
                }
            }
            ModelResult::ToolUse { calls, .. } => {
                debug!(step, calls = calls.len(), "Model requested tools");
                for call in calls {
                    records.push(self.dispatch(step, call).await);
                }
                StepOutcome::Continue
            }
        };

        self.step_history.push(StepInfo {
            step,
            raw_text: completion.text,
            result,
            tool_calls: records,
            usage: completion.usage,
        });
        outcome
    }

    /// Dispatch one call and append its turn pair.
    ///
    /// Failures are written into the conversation and never abort the
    /// remaining calls.
    async fn dispatch(&mut self, step: usize, call: &ToolCall) -> ToolCallRecord {
        let args = call.arguments_json();
        self.conversation.push(Turn::assistant(format!(
            "Should use {} tool with args: {args}",
            call.name
        )));
        self.hooks.on_tool_start(step, call).await;

        let span = info_span!("tool", tool = %call.name, step);
        let outcome = self.agent.tools.dispatch(call).instrument(span).await;

        let record = match outcome {
            Ok(output) => {
                debug!(step, tool = %call.name, output = %output, "Tool succeeded");
                self.conversation.push(Turn::user(format!(
                    "I have used the {} tool with args: {args} and the result is : {output}",
                    call.name
                )));
                ToolCallRecord {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    output,
                    success: true,
                }
            }
            Err(e) => {
                warn!(step, tool = %call.name, error = %e, "Tool failed");
                self.conversation.push(Turn::user(format!(
                    "I tried to use the {} tool with args: {args} but it failed: {e}",
                    call.name
                )));
                ToolCallRecord {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    output: e.to_string(),
                    success: false,
                }
            }
        };

        self.hooks.on_tool_end(step, &record).await;
        record
    }

    fn finish(&mut self, steps: usize, output: String, explanation: Option<String>) -> RunResult {
        self.conversation.push(Turn::assistant(output.clone()));
        RunResult {
            output,
            explanation,
            conversation: std::mem::take(&mut self.conversation),
            steps,
            step_history: std::mem::take(&mut self.step_history),
            usage: self.usage,
        }
    }
}

fn cancelled(cancel: &CancelSignal) -> Error {
    Error::cancelled(cancel.reason().map(str::to_owned))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::{Value, json};

    use crate::completion::RetryPolicy;
    use crate::error::{LlmError, ToolError};
    use crate::llms::scripted::{ScriptedProvider, ScriptedReply};
    use crate::message::Role;
    use crate::tool::{FunctionTool, ToolArgs};

    const STOP: &str = r#"{"result": "stop", "content": "done"}"#;

    fn agent(provider: &Arc<ScriptedProvider>) -> Agent {
        Agent::new(provider.clone())
            .retry(RetryPolicy::none())
            .tool(FunctionTool::new(
                "shout",
                "Upper-case the text",
                json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}),
                |args: &ToolArgs| {
                    let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
                    Ok(Value::String(text.to_uppercase()))
                },
            ))
            .tool(FunctionTool::new(
                "broken",
                "Always fails",
                json!({"type": "object", "properties": {}}),
                |_: &ToolArgs| Err(ToolError::execution("disk on fire")),
            ))
    }

    fn scripted(replies: Vec<ScriptedReply>) -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::new(replies))
    }

    mod stop {
        use super::*;

        #[tokio::test]
        async fn immediate_stop_returns_content() {
            let provider = scripted(vec![STOP.into()]);
            let result = agent(&provider)
                .run("hi", RunConfig::new())
                .await
                .unwrap();
            assert_eq!(result.output, "done");
            assert_eq!(result.steps, 1);
            assert_eq!(result.conversation.len(), 2);
            assert_eq!(result.conversation.last().unwrap().role, Role::Assistant);
        }

        #[tokio::test]
        async fn explanation_is_kept() {
            let provider = scripted(vec![
                r#"{"result": "stop", "content": "a", "explanation": "because"}"#.into(),
            ]);
            let result = agent(&provider).run("hi", RunConfig::new()).await.unwrap();
            assert_eq!(result.explanation.as_deref(), Some("because"));
        }
    }

    mod tools {
        use super::*;

        #[tokio::test]
        async fn turn_pair_per_call() {
            let provider = scripted(vec![
                r#"{"result": "tool_use", "tool_calls": [{"tool": "shout", "tool_input": {"text": "hey"}}]}"#.into(),
                STOP.into(),
            ]);
            let result = agent(&provider).run("go", RunConfig::new()).await.unwrap();
            let turns = result.conversation.turns();
            assert_eq!(turns[1].content, r#"Should use shout tool with args: {"text":"hey"}"#);
            assert_eq!(
                turns[2].content,
                r#"I have used the shout tool with args: {"text":"hey"} and the result is : HEY"#
            );
            assert_eq!(result.step_history[0].tool_calls[0].output, "HEY");
        }

        #[tokio::test]
        async fn failure_is_reported_and_later_calls_still_run() {
            let provider = scripted(vec![
                r#"{"result": "tool_use", "tool_calls": [
                    {"tool": "broken", "tool_input": {}},
                    {"tool": "shout", "tool_input": {"text": "b"}}
                ]}"#
                .into(),
                STOP.into(),
            ]);
            let result = agent(&provider).run("go", RunConfig::new()).await.unwrap();
            let turns = result.conversation.turns();
            assert_eq!(
                turns[2].content,
                "I tried to use the broken tool with args: {} but it failed: Execution error: disk on fire"
            );
            assert!(turns[4].content.ends_with("the result is : B"));
            let successes: Vec<bool> = result.tool_calls().map(|r| r.success).collect();
            assert_eq!(successes, [false, true]);
        }

        #[tokio::test]
        async fn missing_argument_is_reported() {
            let provider = scripted(vec![
                r#"{"result": "tool_use", "tool_calls": [{"tool": "shout", "tool_input": {}}]}"#.into(),
                STOP.into(),
            ]);
            let result = agent(&provider).run("go", RunConfig::new()).await.unwrap();
            assert!(result.conversation.turns()[2].content.contains("missing required parameter"));
        }
    }

    mod failures {
        use super::*;

        #[tokio::test]
        async fn parse_error_is_terminal() {
            let provider = scripted(vec!["not json".into(), STOP.into()]);
            let err = agent(&provider).run("go", RunConfig::new()).await.unwrap_err();
            assert!(err.is_parse());
            assert_eq!(provider.remaining(), 1);
        }

        #[tokio::test]
        async fn zero_budget_never_calls_the_provider() {
            let provider = scripted(vec![STOP.into()]);
            let err = agent(&provider)
                .run("go", RunConfig::new().max_turns(0))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::BudgetExceeded { max_turns: 0 }));
            assert!(provider.requests().is_empty());
        }

        #[tokio::test]
        async fn transport_error_propagates() {
            let provider = scripted(vec![ScriptedReply::Fail(LlmError::auth("scripted", "bad key"))]);
            let err = agent(&provider).run("go", RunConfig::new()).await.unwrap_err();
            assert!(matches!(err, Error::Llm(_)));
        }

        #[tokio::test]
        async fn pre_cancelled_run_stops_before_completion() {
            let provider = scripted(vec![STOP.into()]);
            let cancel = CancelSignal::new();
            cancel.cancel_with_reason("shutdown");
            let err = agent(&provider)
                .run("go", RunConfig::new().cancel(cancel))
                .await
                .unwrap_err();
            let Error::Cancelled { reason } = &err else {
                panic!("expected cancellation, got {err}");
            };
            assert_eq!(reason.as_deref(), Some("shutdown"));
            assert!(provider.requests().is_empty());
        }

        #[tokio::test]
        async fn cancel_interrupts_retry_backoff() {
            let provider = scripted(vec![
                ScriptedReply::Fail(LlmError::rate_limited("scripted")),
                STOP.into(),
            ]);
            let agent = agent(&provider).retry(
                RetryPolicy::default()
                    .with_initial_backoff(Duration::from_secs(30))
                    .with_max_backoff(Duration::from_secs(30)),
            );
            let cancel = CancelSignal::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                trigger.cancel();
            });
            let err = tokio::time::timeout(
                Duration::from_secs(5),
                agent.run("go", RunConfig::new().cancel(cancel)),
            )
            .await
            .unwrap()
            .unwrap_err();
            assert!(matches!(err, Error::Cancelled { reason: None }));
        }
    }
}
