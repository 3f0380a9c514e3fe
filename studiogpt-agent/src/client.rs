//! The agent client.
//!
//! Owns the conversation with the model: builds requests from history and
//! the bridge-command registry, executes requested tool calls, and loops
//! until the model answers in text, a guardrail trips, or the request is
//! cancelled. All completion is reported as typed events for the host main
//! thread to consume; nothing here mutates UI state.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use studiogpt_capability::error::CapabilityError;
use studiogpt_capability::http::{HttpClient, HttpRequest};
use studiogpt_capability::json;
use studiogpt_capability::retry::{ErrorClass, RetryPolicy};
use studiogpt_extension::commands::CommandRegistry;
use studiogpt_extension::settings::StudioGptSettings;

use crate::error::{AgentError, Result};
use crate::guardrails::ToolLoopGuard;
use crate::history::{ConversationHistory, truncate_tool_result};
use crate::protocol::{
    FunctionCall, InputItem, ResponsesReply, ResponsesRequest, ToolSpec, classify_agent_error,
    looks_like_stream, process_stream_body,
};

/// Events produced during one exchange with the model, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Assistant text for the chat transcript.
    AssistantText(String),
    /// A reasoning summary fragment.
    ReasoningSummary(String),
    /// The model requested a tool call.
    ToolCall { name: String, arguments: String },
    /// A tool call finished; `result` is JSON text, possibly truncated.
    ToolResult { call_id: String, result: String },
    /// The exchange finished normally.
    Completed { response_id: Option<String> },
    /// The exchange was cancelled mid-flight.
    Cancelled,
    /// A guardrail vetoed the next tool call and ended the exchange.
    GuardrailStop(String),
}

/// Client driving the Responses endpoint and the tool loop.
#[derive(Debug)]
pub struct AgentClient {
    http: HttpClient,
    settings: StudioGptSettings,
    history: ConversationHistory,
    guard: ToolLoopGuard,
    retry: RetryPolicy,
    cancel: CancellationToken,
    previous_response_id: Option<String>,
}

impl AgentClient {
    pub fn new(settings: StudioGptSettings) -> Result<Self> {
        Self::with_cancellation(settings, CancellationToken::new())
    }

    /// Build a client whose requests abort when `cancel` fires — typically
    /// the owning extension's token, so unloading tears down in-flight work.
    pub fn with_cancellation(
        settings: StudioGptSettings,
        cancel: CancellationToken,
    ) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(AgentError::InvalidConfig("api key is not set".into()));
        }
        let http = HttpClient::with_timeout(Duration::from_secs(settings.execution_timeout_secs))?;
        let guard = ToolLoopGuard::new(settings.max_tool_iterations);
        Ok(Self {
            http,
            settings,
            history: ConversationHistory::new(),
            guard,
            retry: RetryPolicy::default(),
            cancel,
            previous_response_id: None,
        })
    }

    /// Replace the retry policy, e.g. to disable backoff in tests.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Drop the conversation, including server-side state and the executed
    /// tool-call record.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.guard.reset();
        self.previous_response_id = None;
    }

    /// Abort the in-flight exchange, if any. Idempotent: cancelling twice,
    /// or after completion, is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Send a user message and run the tool loop to completion.
    ///
    /// Transport and configuration failures before anything happened surface
    /// as `Err`; once the exchange is underway, terminal conditions
    /// (cancellation, guardrail veto) are reported as the last event.
    pub async fn send(
        &mut self,
        commands: &CommandRegistry,
        user_message: &str,
    ) -> Result<Vec<AgentEvent>> {
        let mut events = Vec::new();
        self.history.push_user(user_message);
        self.guard.reset_turn();

        let tools: Vec<ToolSpec> = commands
            .specs()
            .into_iter()
            .map(ToolSpec::from_command)
            .collect();
        let mut input = vec![InputItem::user_text(user_message)];

        loop {
            let reply = match self.exchange(&input, &tools).await {
                Ok(reply) => reply,
                Err(AgentError::Capability(CapabilityError::Cancelled)) => {
                    events.push(AgentEvent::Cancelled);
                    return Ok(events);
                }
                Err(err) => return Err(err),
            };

            if !reply.id.is_empty() {
                self.previous_response_id = Some(reply.id.clone());
            }

            for summary in reply.reasoning_summaries() {
                events.push(AgentEvent::ReasoningSummary(summary.to_string()));
            }
            let text = reply.output_text();
            if !text.is_empty() {
                self.history.push_assistant(&text);
                events.push(AgentEvent::AssistantText(text));
            }

            let calls: Vec<FunctionCall> = reply.function_calls().into_iter().cloned().collect();
            if calls.is_empty() {
                events.push(AgentEvent::Completed {
                    response_id: self.previous_response_id.clone(),
                });
                return Ok(events);
            }

            input = Vec::new();
            for call in calls {
                let args: Value = serde_json::from_str(&call.arguments).unwrap_or(Value::Null);
                if let Err(violation) = self.guard.check(&call.name, &args) {
                    tracing::warn!(%violation, command = %call.name, "tool call vetoed");
                    events.push(AgentEvent::GuardrailStop(violation.to_string()));
                    return Ok(events);
                }

                events.push(AgentEvent::ToolCall {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                });
                let raw_result = match commands.invoke(&call.name, &args) {
                    Ok(value) => value.to_string(),
                    Err(err) => serde_json::json!({ "error": err.to_string() }).to_string(),
                };
                self.history
                    .push_tool_result(&call.call_id, &call.name, &raw_result);

                let result = truncate_tool_result(&raw_result);
                events.push(AgentEvent::ToolResult {
                    call_id: call.call_id.clone(),
                    result: result.clone(),
                });
                input.push(InputItem::FunctionCallOutput {
                    call_id: call.call_id,
                    output: result,
                });
            }
        }
    }

    async fn exchange(&self, input: &[InputItem], tools: &[ToolSpec]) -> Result<ResponsesReply> {
        let request_body = ResponsesRequest {
            model: self.settings.default_model.clone(),
            instructions: Some(default_instructions()),
            input: input.to_vec(),
            tools: tools.to_vec(),
            previous_response_id: self.previous_response_id.clone(),
            stream: false,
        };
        let body = json::serialize(&request_body)?;

        let request = HttpRequest::post(&self.settings.effective_api_url(), body)
            .with_header("Content-Type", "application/json")
            .with_header(
                "Authorization",
                &format!("Bearer {}", self.settings.api_key),
            );

        let mut attempt = 0;
        let response = loop {
            let response = self.http.issue_cancellable(&request, &self.cancel).await?;
            if response.is_success() {
                break response;
            }

            let class = RetryPolicy::classify_status(response.status, response.retry_after_secs());
            let backoff = if RetryPolicy::should_retry(&class) {
                self.retry.next_delay(attempt)
            } else {
                None
            };
            let Some(backoff) = backoff else {
                return Err(classify_agent_error(response.status, &response.body));
            };

            // Server-suggested delays win over the computed backoff.
            let delay = match class {
                ErrorClass::RateLimited {
                    retry_after: Some(d),
                }
                | ErrorClass::Retryable {
                    delay_hint: Some(d),
                } => d,
                _ => backoff,
            };
            attempt += 1;
            tracing::debug!(status = response.status, attempt, ?delay, "retrying request");
            if self
                .cancel
                .run_until_cancelled(tokio::time::sleep(delay))
                .await
                .is_none()
            {
                return Err(CapabilityError::Cancelled.into());
            }
        };

        // Some endpoints answer with an event stream even for buffered
        // requests; both shapes resolve to the same reply.
        if looks_like_stream(&response.body) {
            process_stream_body(&response.body)
        } else {
            json::deserialize(&response.body)
                .map_err(|e| AgentError::MalformedResponse(e.to_string()))
        }
    }
}

/// Standing instructions sent with every request.
fn default_instructions() -> String {
    concat!(
        "You are an assistant embedded in a 3D content-creation editor. ",
        "Use 'script_execute' to change the scene, 'scene_query' to inspect it, ",
        "and 'viewport_screenshot' to see it. After any script_execute call, ",
        "verify the result with scene_query or viewport_screenshot before ",
        "executing further scripts. When verification confirms the request is ",
        "fulfilled, reply with a brief text confirmation and stop.",
    )
    .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
