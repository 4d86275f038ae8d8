//! Prompt orchestration.
//!
//! `send_prompt` drives one full user turn: persist the user message, stream
//! the model's reply (text surfacing immediately, tool calls accumulating on
//! the side), run any requested observation plans through the output bridge,
//! feed results back, and loop until the model answers in plain text or a
//! safety bound trips.

use crate::api::logging::{log_request_if_enabled, log_response_meta_if_enabled};
use crate::api::request::{PromptOptions, build_request_body};
use crate::api::sink::{ResponseEvent, ResponseSink};
use crate::api::stream::{FinishReason, SseDecoder, StreamChunk, StreamDemux, Usage};
use crate::bridge::bridge;
use crate::config::ResolvedConfig;
use crate::context::{ChatMessage, Role, ToolCallRecord, prepare_context_messages};
use crate::extract::extract_request;
use crate::llm::ToolCallAccumulator;
use crate::planner::{ObservationRequest, PLAN_TOOL_NAME, Planner, ToolInvocation, tool_definitions};
use crate::state::{
    AppState, create_assistant_message_entry, create_tool_call_entry, create_tool_result_entry,
    create_user_message_entry,
};
use futures_util::StreamExt;
use serde_json::json;
use std::io::{self, ErrorKind};
use std::sync::Arc;

/// Everything one streamed response produced.
struct StreamingResponse {
    full_response: String,
    tool_calls: Vec<ToolCallAccumulator>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
}

/// Process one user prompt end to end.
pub async fn send_prompt<S: ResponseSink>(
    app: &AppState,
    session: &str,
    prompt: &str,
    planner: Arc<dyn Planner>,
    config: &ResolvedConfig,
    options: &PromptOptions<'_>,
    sink: &mut S,
) -> io::Result<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(io::Error::new(ErrorKind::InvalidInput, "empty prompt"));
    }
    app.ensure_session(session)?;

    let user_message = ChatMessage::new(Role::User, prompt);
    app.append_context_message(session, &user_message)?;
    let user_entry = create_user_message_entry(session, prompt, &config.username);
    app.append_transcript_entry(session, &user_entry)?;
    sink.handle(ResponseEvent::TranscriptEntry(user_entry))?;

    let context = app.load_context(session)?;
    let system_prompt = app.load_system_prompt(session)?;
    let keep = (config.context_keep_messages > 0).then_some(config.context_keep_messages);

    let mut messages = vec![json!({"role": "system", "content": system_prompt})];
    messages.extend(prepare_context_messages(&context.messages, keep));

    let tools_payload =
        (!config.no_tool_calls && !options.no_tools).then(tool_definitions);

    let client = reqwest::Client::new();
    let mut tool_rounds = 0usize;
    let mut empty_responses = 0usize;

    loop {
        sink.handle(ResponseEvent::StartResponse)?;
        let body = build_request_body(config, &messages, tools_payload.as_deref(), true);
        log_request_if_enabled(app, session, options.debug, &body);

        let response = collect_streaming_response(&client, config, &body, sink).await?;
        log_response_meta_if_enabled(
            app,
            session,
            options.debug,
            &json!({
                "finish_reason": response.finish_reason,
                "usage": response.usage,
                "tool_calls": response.tool_calls.len(),
            }),
        );
        sink.handle(ResponseEvent::Finished)?;

        if wants_tool_dispatch(&response) {
            tool_rounds += 1;
            if tool_rounds > config.max_tool_rounds {
                // Persist the text but drop the unanswered calls; a context
                // ending on an open tool call is rejected by the API.
                if !response.full_response.trim().is_empty() {
                    let assistant = ChatMessage::new(Role::Assistant, &response.full_response);
                    app.append_context_message(session, &assistant)?;
                }
                sink.handle(ResponseEvent::Diagnostic {
                    message: format!(
                        "[Tool round limit ({}) reached; stopping]",
                        config.max_tool_rounds
                    ),
                    verbose_only: false,
                })?;
                return Ok(());
            }

            let records = finalize_records(response.tool_calls);
            let assistant =
                ChatMessage::assistant_with_tool_calls(&response.full_response, records.clone());
            app.append_context_message(session, &assistant)?;
            messages.push(assistant.to_api_json());
            if !response.full_response.is_empty() {
                sink.handle(ResponseEvent::Newline)?;
            }

            for record in records {
                sink.handle(ResponseEvent::ToolStart {
                    name: record.name.clone(),
                })?;
                app.append_transcript_entry(
                    session,
                    &create_tool_call_entry(session, &record.name, &record.arguments, &record.id),
                )?;

                let (result, ok) = run_tool_call(
                    planner.clone(),
                    &record.name,
                    &record.arguments,
                    options.verbose,
                    sink,
                )
                .await?;

                app.append_transcript_entry(
                    session,
                    &create_tool_result_entry(session, &record.name, &result, &record.id),
                )?;
                sink.handle(ResponseEvent::ToolResult {
                    name: record.name.clone(),
                    ok,
                })?;

                let tool_message = ChatMessage::tool_result(&record.id, &result);
                app.append_context_message(session, &tool_message)?;
                messages.push(tool_message.to_api_json());
            }
            continue;
        }

        if response.full_response.trim().is_empty() {
            empty_responses += 1;
            if empty_responses >= config.max_empty_responses {
                sink.handle(ResponseEvent::Diagnostic {
                    message: format!(
                        "[Model returned {} empty responses; giving up]",
                        empty_responses
                    ),
                    verbose_only: false,
                })?;
                return Ok(());
            }
            sink.handle(ResponseEvent::Diagnostic {
                message: "[Empty response; retrying]".to_string(),
                verbose_only: true,
            })?;
            continue;
        }

        let assistant = ChatMessage::new(Role::Assistant, &response.full_response);
        app.append_context_message(session, &assistant)?;
        app.append_transcript_entry(
            session,
            &create_assistant_message_entry(session, &response.full_response),
        )?;
        sink.handle(ResponseEvent::Newline)?;

        // Some models answer with the config written out instead of calling
        // the tool; recover it and plan anyway.
        if let Some(request) = extract_request(&response.full_response) {
            plan_from_extracted(app, session, planner, request, sink).await?;
        }
        return Ok(());
    }
}

/// POST the request and demultiplex the SSE stream, forwarding text deltas
/// to the sink as they arrive.
async fn collect_streaming_response<S: ResponseSink>(
    client: &reqwest::Client,
    config: &ResolvedConfig,
    request_body: &serde_json::Value,
    sink: &mut S,
) -> io::Result<StreamingResponse> {
    let mut request = client.post(&config.base_url).json(request_body);
    if let Some(key) = &config.api_key {
        request = request.bearer_auth(key);
    }
    let response = request
        .send()
        .await
        .map_err(|e| io::Error::other(format!("request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(io::Error::other(format!("API error {}: {}", status, body)));
    }

    let mut bytes = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut demux = StreamDemux::new();
    let mut full_response = String::new();

    'stream: while let Some(chunk) = bytes.next().await {
        let chunk = chunk.map_err(|e| io::Error::other(format!("stream error: {}", e)))?;
        for payload in decoder.feed(&chunk) {
            match serde_json::from_str::<StreamChunk>(&payload) {
                Ok(parsed) => {
                    if let Some(text) = demux.absorb(parsed) {
                        // Some providers open the response with a stray
                        // newline; drop it.
                        let text = if full_response.is_empty() {
                            text.trim_start_matches('\n').to_string()
                        } else {
                            text
                        };
                        if !text.is_empty() {
                            full_response.push_str(&text);
                            sink.handle(ResponseEvent::TextChunk(&text))?;
                        }
                    }
                }
                Err(e) => eprintln!("[WARN] skipping unparseable stream chunk: {}", e),
            }
        }
        if decoder.is_done() {
            break 'stream;
        }
    }

    let finish_reason = demux.finish_reason();
    let usage = demux.usage();
    Ok(StreamingResponse {
        full_response,
        tool_calls: demux.into_tool_calls(),
        finish_reason,
        usage,
    })
}

/// The model signalled tool calls and at least one accumulator actually
/// materialized. The guard covers streams that report `tool_calls` without
/// delivering any fragments.
fn wants_tool_dispatch(response: &StreamingResponse) -> bool {
    response.finish_reason == Some(FinishReason::ToolCalls) && !response.tool_calls.is_empty()
}

/// Turn finalized accumulators into records, synthesizing ids the stream
/// never provided. An accumulator that never received a name (the stream
/// ended mid-call) cannot be dispatched and is dropped.
fn finalize_records(accumulators: Vec<ToolCallAccumulator>) -> Vec<ToolCallRecord> {
    accumulators
        .into_iter()
        .filter(|acc| acc.is_complete())
        .enumerate()
        .map(|(i, acc)| {
            let mut record = ToolCallRecord::from(acc);
            if record.id.is_empty() {
                record.id = format!("call_{}", i);
            }
            record
        })
        .collect()
}

/// Dispatch one tool call. Invalid calls become error results rather than
/// hard failures, so the model can see what went wrong.
async fn run_tool_call<S: ResponseSink>(
    planner: Arc<dyn Planner>,
    name: &str,
    arguments: &str,
    verbose: bool,
    sink: &mut S,
) -> io::Result<(String, bool)> {
    if verbose {
        sink.handle(ResponseEvent::Diagnostic {
            message: format!("[{} arguments: {}]", name, arguments),
            verbose_only: true,
        })?;
    }
    let invocation = match ToolInvocation::parse(name, arguments) {
        Ok(invocation) => invocation,
        Err(e) => return Ok((format!("Error: {}", e), false)),
    };
    let ToolInvocation::PlanObservation(request) = invocation;
    run_plan(planner, request, sink).await
}

/// Run one observation plan through the bridge, forwarding progress lines
/// and collecting them as the tool result.
async fn run_plan<S: ResponseSink>(
    planner: Arc<dyn Planner>,
    request: ObservationRequest,
    sink: &mut S,
) -> io::Result<(String, bool)> {
    let mut lines = bridge(move |mut out| planner.plan(&request, &mut out));
    let mut collected = String::new();
    let mut failure: Option<io::Error> = None;
    while let Some(item) = lines.next_line().await {
        match item {
            Ok(line) => {
                sink.handle(ResponseEvent::ToolOutputLine(&line))?;
                collected.push_str(&line);
            }
            Err(e) => failure = Some(e),
        }
    }
    Ok(match failure {
        Some(e) => {
            let message = format!("Error: {}", e);
            let result = if collected.trim().is_empty() {
                message
            } else {
                format!("{}\n{}", collected.trim_end(), message)
            };
            (result, false)
        }
        None => {
            let result = if collected.trim().is_empty() {
                "(planner produced no output)".to_string()
            } else {
                collected
            };
            (result, true)
        }
    })
}

/// Plan from a config the model wrote into its text answer.
async fn plan_from_extracted<S: ResponseSink>(
    app: &AppState,
    session: &str,
    planner: Arc<dyn Planner>,
    request: ObservationRequest,
    sink: &mut S,
) -> io::Result<()> {
    let arguments = serde_json::to_string(&request)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
    let call_id = format!("extracted_{}", uuid::Uuid::new_v4());
    sink.handle(ResponseEvent::Diagnostic {
        message: "[Observation config detected in response; running planner]".to_string(),
        verbose_only: false,
    })?;
    sink.handle(ResponseEvent::ToolStart {
        name: PLAN_TOOL_NAME.to_string(),
    })?;
    app.append_transcript_entry(
        session,
        &create_tool_call_entry(session, PLAN_TOOL_NAME, &arguments, &call_id),
    )?;

    let (result, ok) = run_plan(planner, request, sink).await?;

    app.append_transcript_entry(
        session,
        &create_tool_result_entry(session, PLAN_TOOL_NAME, &result, &call_id),
    )?;
    sink.handle(ResponseEvent::ToolResult {
        name: PLAN_TOOL_NAME.to_string(),
        ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sink::CollectingSink;
    use crate::config::Config;
    use std::io::Write;

    struct FakePlanner {
        lines: Vec<&'static str>,
        fail: bool,
    }

    impl Planner for FakePlanner {
        fn plan(&self, _request: &ObservationRequest, out: &mut dyn Write) -> io::Result<()> {
            for line in &self.lines {
                writeln!(out, "{}", line)?;
            }
            if self.fail {
                return Err(io::Error::other("pipeline crashed"));
            }
            Ok(())
        }
    }

    fn request_args() -> String {
        r#"{"targets": ["25544"], "time_start": "2026-09-01"}"#.to_string()
    }

    #[tokio::test]
    async fn test_run_tool_call_streams_and_collects() {
        let planner = Arc::new(FakePlanner {
            lines: vec!["computing passes", "3 passes found"],
            fail: false,
        });
        let mut sink = CollectingSink::new();
        let (result, ok) = run_tool_call(planner, PLAN_TOOL_NAME, &request_args(), false, &mut sink)
            .await
            .unwrap();
        assert!(ok);
        assert_eq!(result, "computing passes\n3 passes found\n");
        assert_eq!(
            sink.tool_output,
            vec!["computing passes\n", "3 passes found\n"]
        );
    }

    #[tokio::test]
    async fn test_run_tool_call_failure_keeps_partial_output() {
        let planner = Arc::new(FakePlanner {
            lines: vec!["computing passes"],
            fail: true,
        });
        let mut sink = CollectingSink::new();
        let (result, ok) = run_tool_call(planner, PLAN_TOOL_NAME, &request_args(), false, &mut sink)
            .await
            .unwrap();
        assert!(!ok);
        assert_eq!(result, "computing passes\nError: pipeline crashed");
        // Partial output was still streamed live.
        assert_eq!(sink.tool_output, vec!["computing passes\n"]);
    }

    #[tokio::test]
    async fn test_run_tool_call_unknown_tool_is_soft_error() {
        let planner = Arc::new(FakePlanner {
            lines: vec![],
            fail: false,
        });
        let mut sink = CollectingSink::new();
        let (result, ok) = run_tool_call(planner, "fire_lasers", "{}", false, &mut sink)
            .await
            .unwrap();
        assert!(!ok);
        assert!(result.starts_with("Error: unknown tool"));
        assert!(sink.tool_output.is_empty());
    }

    #[tokio::test]
    async fn test_run_tool_call_bad_arguments_is_soft_error() {
        let planner = Arc::new(FakePlanner {
            lines: vec![],
            fail: false,
        });
        let mut sink = CollectingSink::new();
        let (result, ok) = run_tool_call(planner, PLAN_TOOL_NAME, "{\"targets\": [", false, &mut sink)
            .await
            .unwrap();
        assert!(!ok);
        assert!(result.contains("invalid arguments"));
    }

    #[tokio::test]
    async fn test_run_tool_call_verbose_surfaces_arguments() {
        let planner = Arc::new(FakePlanner {
            lines: vec!["ok"],
            fail: false,
        });
        let mut sink = CollectingSink::new();
        run_tool_call(planner, PLAN_TOOL_NAME, &request_args(), true, &mut sink)
            .await
            .unwrap();
        assert!(
            sink.diagnostics
                .iter()
                .any(|d| d.contains("arguments") && d.contains("25544"))
        );
    }

    #[tokio::test]
    async fn test_plan_from_extracted_persists_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let app = AppState::from_dir(dir.path().to_path_buf(), Config::default()).unwrap();
        app.ensure_session("night1").unwrap();
        let planner = Arc::new(FakePlanner {
            lines: vec!["scheduled"],
            fail: false,
        });
        let request = ObservationRequest {
            targets: vec!["25544".to_string()],
            time_start: "2026-09-01".to_string(),
            duration_hours: 8.0,
            site: None,
            min_elevation_deg: None,
        };
        let mut sink = CollectingSink::new();
        plan_from_extracted(&app, "night1", planner, request, &mut sink)
            .await
            .unwrap();

        let transcript = app.read_transcript("night1").unwrap();
        let kinds: Vec<&str> = transcript.iter().map(|e| e.entry_type.as_str()).collect();
        assert_eq!(kinds, vec!["session_created", "tool_call", "tool_result"]);
        assert_eq!(transcript[2].content, "scheduled\n");
        assert_eq!(sink.diagnostics.len(), 1);
    }

    #[test]
    fn test_finalize_records_synthesizes_missing_ids() {
        let records = finalize_records(vec![
            ToolCallAccumulator {
                id: String::new(),
                name: "plan_observation".to_string(),
                arguments: "{}".to_string(),
            },
            ToolCallAccumulator {
                id: "call_x".to_string(),
                name: "plan_observation".to_string(),
                arguments: "{}".to_string(),
            },
        ]);
        assert_eq!(records[0].id, "call_0");
        assert_eq!(records[1].id, "call_x");
    }

    #[test]
    fn test_tool_dispatch_requires_finish_reason_and_calls() {
        let call = ToolCallAccumulator {
            id: "call_a".to_string(),
            name: "plan_observation".to_string(),
            arguments: "{}".to_string(),
        };
        let with_both = StreamingResponse {
            full_response: String::new(),
            tool_calls: vec![call.clone()],
            finish_reason: Some(FinishReason::ToolCalls),
            usage: None,
        };
        assert!(wants_tool_dispatch(&with_both));

        let wrong_reason = StreamingResponse {
            finish_reason: Some(FinishReason::Stop),
            ..with_both
        };
        assert!(!wants_tool_dispatch(&wrong_reason));

        let no_calls = StreamingResponse {
            full_response: String::new(),
            tool_calls: vec![],
            finish_reason: Some(FinishReason::ToolCalls),
            usage: None,
        };
        assert!(!wants_tool_dispatch(&no_calls));
    }

    // A call whose name never arrived cannot be dispatched; it must not
    // produce a record.
    #[test]
    fn test_finalize_records_drops_nameless_accumulators() {
        let records = finalize_records(vec![
            ToolCallAccumulator {
                id: "call_a".to_string(),
                name: String::new(),
                arguments: "{\"targ".to_string(),
            },
            ToolCallAccumulator {
                id: String::new(),
                name: "plan_observation".to_string(),
                arguments: "{}".to_string(),
            },
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "plan_observation");
        assert_eq!(records[0].id, "call_0");
    }
}
