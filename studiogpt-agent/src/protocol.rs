//! Responses API translation types.
//!
//! A data-only layer: the request/response wire shapes for an
//! OpenAI-compatible Responses endpoint, plus pure helpers for stream
//! processing and error classification. No HTTP and no I/O here — the client
//! supplies the transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use studiogpt_capability::sse::parse_sse_stream;
use studiogpt_extension::commands::CommandSpec;

use crate::error::AgentError;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A Responses API request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tools: Vec<ToolSpec>,
    /// Server-side conversation state: the id of the previous response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

/// One item in the request `input` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    Message {
        role: String,
        content: Vec<ContentPart>,
    },
    /// The result of a tool call from the previous turn.
    FunctionCallOutput { call_id: String, output: String },
}

impl InputItem {
    /// A plain user text message.
    pub fn user_text(text: &str) -> Self {
        Self::Message {
            role: "user".into(),
            content: vec![ContentPart::InputText { text: text.into() }],
        }
    }

    /// A user message with attached images (base64 PNG data).
    pub fn user_with_images(text: &str, images_base64: &[String]) -> Self {
        let mut content = vec![ContentPart::InputText { text: text.into() }];
        for image in images_base64 {
            content.push(ContentPart::InputImage {
                image_url: format!("data:image/png;base64,{image}"),
            });
        }
        Self::Message {
            role: "user".into(),
            content,
        }
    }
}

/// Content parts within a message input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    InputImage { image_url: String },
}

/// A tool made available to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolSpec {
    Function {
        name: String,
        description: String,
        parameters: Value,
        strict: bool,
    },
    WebSearch,
    FileSearch { vector_store_ids: Vec<String> },
}

impl ToolSpec {
    /// Expose a bridge command to the model.
    pub fn from_command(spec: &CommandSpec) -> Self {
        Self::Function {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: serde_json::to_value(&spec.parameters).unwrap_or(Value::Null),
            strict: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A parsed (non-streaming) Responses API reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsesReply {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub usage: Option<ResponseUsage>,
}

/// Token usage reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// One item in the response `output` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        role: String,
        content: Vec<OutputContent>,
    },
    FunctionCall(FunctionCall),
    Reasoning {
        #[serde(default)]
        summary: Vec<SummaryPart>,
    },
    /// Item types this surface does not consume.
    #[serde(other)]
    Other,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub call_id: String,
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them.
    pub arguments: String,
}

/// Content parts within a message output item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContent {
    OutputText { text: String },
    #[serde(other)]
    Other,
}

/// Reasoning summary fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SummaryPart {
    SummaryText { text: String },
    #[serde(other)]
    Other,
}

impl ResponsesReply {
    /// All assistant text in this reply, concatenated.
    pub fn output_text(&self) -> String {
        let mut text = String::new();
        for item in &self.output {
            if let OutputItem::Message { content, .. } = item {
                for part in content {
                    if let OutputContent::OutputText { text: t } = part {
                        text.push_str(t);
                    }
                }
            }
        }
        text
    }

    /// Tool calls requested by this reply, in order.
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::FunctionCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    /// Reasoning summary fragments, in order.
    pub fn reasoning_summaries(&self) -> Vec<&str> {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Reasoning { summary } => Some(summary),
                _ => None,
            })
            .flatten()
            .filter_map(|part| match part {
                SummaryPart::SummaryText { text } => Some(text.as_str()),
                SummaryPart::Other => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// A classified streaming event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text.
    OutputTextDelta(String),
    /// The terminal event carrying the complete response.
    Completed(Box<ResponsesReply>),
    /// An event type this surface does not consume.
    Ignored(String),
}

/// Classify one SSE data payload into a [`StreamEvent`].
pub fn parse_stream_event(data: &str) -> Result<StreamEvent, AgentError> {
    if data.trim() == "[DONE]" {
        return Ok(StreamEvent::Ignored("done".into()));
    }
    let value: Value = serde_json::from_str(data)
        .map_err(|e| AgentError::MalformedResponse(format!("stream event: {e}")))?;
    let event_type = value["type"].as_str().unwrap_or_default().to_string();
    match event_type.as_str() {
        "response.output_text.delta" => {
            let delta = value["delta"].as_str().unwrap_or_default().to_string();
            Ok(StreamEvent::OutputTextDelta(delta))
        }
        "response.completed" => {
            let reply: ResponsesReply = serde_json::from_value(value["response"].clone())
                .map_err(|e| AgentError::MalformedResponse(format!("completed event: {e}")))?;
            Ok(StreamEvent::Completed(Box::new(reply)))
        }
        _ => Ok(StreamEvent::Ignored(event_type)),
    }
}

/// Process a fully collected SSE body into the terminal reply.
///
/// Prefers the `response.completed` payload; if the stream carried only text
/// deltas, a reply is synthesized from them. A stream with neither is
/// malformed.
pub fn process_stream_body(body: &str) -> Result<ResponsesReply, AgentError> {
    let mut deltas = String::new();
    let mut completed: Option<ResponsesReply> = None;

    for sse_event in parse_sse_stream(body) {
        match parse_stream_event(&sse_event.data)? {
            StreamEvent::OutputTextDelta(delta) => deltas.push_str(&delta),
            StreamEvent::Completed(reply) => completed = Some(*reply),
            StreamEvent::Ignored(_) => {}
        }
    }

    if let Some(reply) = completed {
        return Ok(reply);
    }
    if !deltas.is_empty() {
        return Ok(ResponsesReply {
            id: String::new(),
            status: Some("completed".into()),
            output: vec![OutputItem::Message {
                role: "assistant".into(),
                content: vec![OutputContent::OutputText { text: deltas }],
            }],
            usage: None,
        });
    }
    Err(AgentError::MalformedResponse(
        "stream ended without a terminal event".into(),
    ))
}

/// Whether a response body is an SSE stream rather than a JSON document.
pub fn looks_like_stream(body: &str) -> bool {
    let trimmed = body.trim_start();
    trimmed.starts_with("event:") || trimmed.starts_with("data:")
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Classify an HTTP error from the endpoint into an [`AgentError`].
pub fn classify_agent_error(status: u16, body: &str) -> AgentError {
    match status {
        401 | 403 => AgentError::InvalidConfig(format!("authentication failed: {body}")),
        404 => AgentError::InvalidConfig(format!("endpoint or model not found: {body}")),
        429 => AgentError::Api(format!("rate limited: {body}")),
        500..=599 => AgentError::Api(format!("server error ({status}): {body}")),
        _ => AgentError::Api(format!("HTTP {status}: {body}")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use studiogpt_extension::commands::scene_query_spec;

    // -- Request serialization -----------------------------------------------

    #[test]
    fn request_serializes_with_snake_case_tags() {
        let request = ResponsesRequest {
            model: "gpt-5.1".into(),
            instructions: Some("You assist inside a 3D editor.".into()),
            input: vec![InputItem::user_text("add a cube")],
            tools: vec![ToolSpec::WebSearch],
            previous_response_id: None,
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-5.1");
        assert_eq!(json["input"][0]["type"], "message");
        assert_eq!(json["input"][0]["content"][0]["type"], "input_text");
        assert_eq!(json["tools"][0]["type"], "web_search");
        assert!(json.get("previous_response_id").is_none());
    }

    #[test]
    fn empty_tools_are_omitted() {
        let request = ResponsesRequest {
            model: "gpt-5.1".into(),
            instructions: None,
            input: vec![],
            tools: vec![],
            previous_response_id: None,
            stream: false,
        };
        let text = serde_json::to_string(&request).unwrap();
        assert!(!text.contains("tools"));
        assert!(!text.contains("instructions"));
    }

    #[test]
    fn function_call_output_item_shape() {
        let item = InputItem::FunctionCallOutput {
            call_id: "call_1".into(),
            output: r#"{"ok":true}"#.into(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "function_call_output");
        assert_eq!(json["call_id"], "call_1");
    }

    #[test]
    fn user_with_images_builds_data_urls() {
        let item = InputItem::user_with_images("look at this", &["QUJD".into()]);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["content"][1]["type"], "input_image");
        assert_eq!(json["content"][1]["image_url"], "data:image/png;base64,QUJD");
    }

    #[test]
    fn tool_spec_from_command_keeps_schema() {
        let tool = ToolSpec::from_command(&scene_query_spec());
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["name"], "scene_query");
        assert_eq!(json["parameters"]["type"], "object");
        assert_eq!(json["strict"], false);
    }

    // -- Response parsing ----------------------------------------------------

    fn sample_reply() -> &'static str {
        r#"{
            "id": "resp_123",
            "status": "completed",
            "output": [
                {
                    "type": "reasoning",
                    "summary": [{"type": "summary_text", "text": "Plan the cube."}]
                },
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "output_text", "text": "Placing a cube."}]
                },
                {
                    "type": "function_call",
                    "call_id": "call_9",
                    "name": "script_execute",
                    "arguments": "{\"code\":\"spawn_cube()\"}"
                }
            ],
            "usage": {"input_tokens": 120, "output_tokens": 30, "total_tokens": 150}
        }"#
    }

    #[test]
    fn reply_parses_text_calls_and_reasoning() {
        let reply: ResponsesReply = serde_json::from_str(sample_reply()).unwrap();
        assert_eq!(reply.id, "resp_123");
        assert_eq!(reply.output_text(), "Placing a cube.");
        assert_eq!(reply.reasoning_summaries(), vec!["Plan the cube."]);

        let calls = reply.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "script_execute");
        assert_eq!(calls[0].call_id, "call_9");

        assert_eq!(reply.usage.unwrap().total_tokens, 150);
    }

    #[test]
    fn unknown_output_items_are_tolerated() {
        let reply: ResponsesReply = serde_json::from_str(
            r#"{"id":"r","output":[{"type":"web_search_call","status":"completed"}]}"#,
        )
        .unwrap();
        assert_eq!(reply.output, vec![OutputItem::Other]);
        assert!(reply.function_calls().is_empty());
        assert_eq!(reply.output_text(), "");
    }

    #[test]
    fn reply_roundtrip() {
        let reply: ResponsesReply = serde_json::from_str(sample_reply()).unwrap();
        let text = serde_json::to_string(&reply).unwrap();
        let back: ResponsesReply = serde_json::from_str(&text).unwrap();
        assert_eq!(back, reply);
    }

    // -- Streaming -----------------------------------------------------------

    #[test]
    fn stream_event_delta() {
        let event =
            parse_stream_event(r#"{"type":"response.output_text.delta","delta":"Hel"}"#).unwrap();
        assert_eq!(event, StreamEvent::OutputTextDelta("Hel".into()));
    }

    #[test]
    fn stream_event_completed_carries_reply() {
        let data = format!(
            r#"{{"type":"response.completed","response":{}}}"#,
            sample_reply()
        );
        match parse_stream_event(&data).unwrap() {
            StreamEvent::Completed(reply) => assert_eq!(reply.id, "resp_123"),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn stream_event_done_marker_is_ignored() {
        assert_eq!(
            parse_stream_event("[DONE]").unwrap(),
            StreamEvent::Ignored("done".into())
        );
    }

    #[test]
    fn stream_event_garbage_is_malformed() {
        assert!(matches!(
            parse_stream_event("{oops"),
            Err(AgentError::MalformedResponse(_))
        ));
    }

    #[test]
    fn stream_body_prefers_completed_response() {
        // SSE data lines are single-line, so compact the reply JSON first.
        let reply_value: Value = serde_json::from_str(sample_reply()).unwrap();
        let completed = json!({"type": "response.completed", "response": reply_value}).to_string();
        let body = format!(
            "event: response.output_text.delta\ndata: {}\n\nevent: response.completed\ndata: {}\n\n",
            r#"{"type":"response.output_text.delta","delta":"Placing"}"#, completed,
        );
        let reply = process_stream_body(&body).unwrap();
        assert_eq!(reply.id, "resp_123");
        assert_eq!(reply.output_text(), "Placing a cube.");
    }

    #[test]
    fn stream_body_with_only_deltas_synthesizes_reply() {
        let body = concat!(
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hello \"}\n\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"world\"}\n\n",
            "data: [DONE]\n\n",
        );
        let reply = process_stream_body(body).unwrap();
        assert_eq!(reply.output_text(), "Hello world");
        assert!(reply.id.is_empty());
    }

    #[test]
    fn empty_stream_is_malformed() {
        assert!(matches!(
            process_stream_body(": keep-alive\n\n"),
            Err(AgentError::MalformedResponse(_))
        ));
    }

    #[test]
    fn stream_detection() {
        assert!(looks_like_stream("event: x\ndata: {}\n\n"));
        assert!(looks_like_stream("data: {}\n\n"));
        assert!(!looks_like_stream(r#"{"id":"resp"}"#));
    }

    // -- Error classification ------------------------------------------------

    #[test]
    fn classify_auth_errors() {
        let err = classify_agent_error(401, "bad key");
        assert!(matches!(err, AgentError::InvalidConfig(_)));
        assert!(err.to_string().contains("authentication failed"));
    }

    #[test]
    fn classify_rate_limit() {
        let err = classify_agent_error(429, "slow down");
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn classify_server_errors() {
        for status in [500u16, 502, 503] {
            let err = classify_agent_error(status, "boom");
            assert!(err.to_string().contains(&format!("server error ({status})")));
        }
    }

    #[test]
    fn classify_unknown_status() {
        let err = classify_agent_error(418, "teapot");
        assert!(err.to_string().contains("HTTP 418"));
    }
}
