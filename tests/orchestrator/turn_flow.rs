use crate::turn_harness::{Harness, Script, ScriptedClient, messages_with_role};
use tagwright::error::{LlmError, TagwrightError};
use tagwright::llm::{MessageRole, ProviderMessage, StopReason, StreamEvent};
use tagwright::orchestrator::{ChatEvent, TurnRequest};
use tagwright::protocol::{ChatMode, Directive};
use tagwright::store::ChatStore;
use tagwright::workflow::WorkflowStep;
use tagwright::Config;

#[tokio::test]
async fn clean_turn_returns_directives_and_persists_snapshot() {
    let client = ScriptedClient::new(vec![Script::text(&[
        "<write path=\"a.ts\" description=\"d\">",
        "const a=1;",
        "</write><delete path=\"b.ts\" />",
        "<chat-summary>Add a</chat-summary>",
    ])]);
    let mut harness = Harness::new(client, &Config::default());

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "add a constant"))
        .await
        .unwrap();

    assert!(!outcome.cancelled);
    assert_eq!(outcome.counters.corrections, 0);
    assert_eq!(outcome.model, "claude-sonnet-4-5");
    assert_eq!(
        outcome.directives,
        vec![
            Directive::Write {
                path: "a.ts".into(),
                content: "const a=1;".into(),
                description: Some("d".into()),
            },
            Directive::Delete {
                path: "b.ts".into()
            },
        ]
    );

    let snapshot = harness.store.load_snapshot("chat-1").await.unwrap();
    assert_eq!(snapshot.as_deref(), Some(outcome.response.as_str()));
    assert!(!harness.registry.is_streaming("chat-1"));
    assert!(harness.registry.partial("chat-1").is_none());

    let events = harness.drain_events();
    let chunks = events
        .iter()
        .filter(|e| matches!(e, ChatEvent::Chunk { .. }))
        .count();
    assert_eq!(chunks, 4);
    assert!(matches!(
        events.last(),
        Some(ChatEvent::End {
            updated_files: true,
            error: None,
            ..
        })
    ));
}

#[tokio::test]
async fn chunk_events_carry_a_growing_buffer() {
    let client = ScriptedClient::new(vec![Script::text(&["Hel", "lo"])]);
    let mut harness = Harness::new(client, &Config::default());
    harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "hi"))
        .await
        .unwrap();

    let texts: Vec<String> = harness
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            ChatEvent::Chunk { messages, .. } => {
                messages.last().map(ProviderMessage::text_content)
            }
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["Hel".to_string(), "Hello".to_string()]);
}

#[tokio::test]
async fn unclosed_write_is_continued_with_text_only() {
    let client = ScriptedClient::new(vec![
        Script::text(&["<write path=\"a.ts\">const a"]),
        Script::Events(vec![
            StreamEvent::reasoning("ignored while continuing"),
            StreamEvent::text(" = 1;</write>"),
            StreamEvent::finish(StopReason::EndTurn),
        ]),
    ]);
    let harness = Harness::new(client, &Config::default());

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "write a"))
        .await
        .unwrap();

    assert_eq!(outcome.counters.continuations, 1);
    assert_eq!(outcome.response, "<write path=\"a.ts\">const a = 1;</write>");
    assert!(matches!(
        &outcome.directives[..],
        [Directive::Write { content, .. }] if content == "const a = 1;"
    ));

    let requests = harness.client.requests();
    assert_eq!(requests.len(), 2);
    let continuation = &requests[1].messages;
    let last_two = &continuation[continuation.len() - 2..];
    assert_eq!(last_two[0].role, MessageRole::Assistant);
    assert_eq!(last_two[0].text_content(), "<write path=\"a.ts\">const a");
    assert_eq!(last_two[1].role, MessageRole::User);
}

#[tokio::test]
async fn continuation_budget_is_bounded() {
    let mut config = Config::default();
    config.guardrail.final_gate = false;
    let client = ScriptedClient::new(vec![
        Script::text(&["<write path=\"a.ts\">1"]),
        Script::text(&["2"]),
        Script::text(&["3"]),
        Script::text(&["</write>"]),
    ]);
    let harness = Harness::new(client, &config);

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "write a"))
        .await
        .unwrap();

    assert_eq!(outcome.counters.continuations, 2);
    assert_eq!(harness.client.requests().len(), 3);
    assert_eq!(outcome.response, "<write path=\"a.ts\">123");
    assert!(outcome.directives.is_empty());
}

#[tokio::test]
async fn reasoning_is_wrapped_and_escaped() {
    let client = ScriptedClient::new(vec![Script::Events(vec![
        StreamEvent::reasoning("I could use <wri"),
        StreamEvent::reasoning("te path=\"x.ts\"> here"),
        StreamEvent::text("<write path=\"a.ts\">ok</write>"),
        StreamEvent::finish(StopReason::EndTurn),
    ])]);
    let harness = Harness::new(client, &Config::default());

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "go"))
        .await
        .unwrap();

    assert_eq!(
        outcome.response,
        "<think>I could use &lt;write path=\"x.ts\"> here</think><write path=\"a.ts\">ok</write>"
    );
    assert_eq!(outcome.directives.len(), 1);
    assert_eq!(outcome.counters.corrections, 0);
}

#[tokio::test]
async fn provider_failure_surfaces_as_error_event() {
    let client = ScriptedClient::new(vec![Script::fail("overloaded", Some("req_42"))]);
    let mut harness = Harness::new(client, &Config::default());

    let err = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "go"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TagwrightError::Llm(LlmError::Provider { ref request_id, .. }) if request_id.as_deref() == Some("req_42")
    ));
    assert_eq!(err.to_string(), "llm: [request req_42] overloaded");

    let events = harness.drain_events();
    assert_eq!(
        events,
        vec![ChatEvent::Error {
            chat_id: "chat-1".into(),
            error: "[request req_42] overloaded".into(),
        }]
    );
    assert!(!harness.registry.is_streaming("chat-1"));
}

#[tokio::test]
async fn workflow_step_shapes_prompt_and_model() {
    let mut config = Config::default();
    config
        .routing
        .task_models
        .insert("documentation".into(), "docs-model".into());
    let client = ScriptedClient::new(vec![Script::text(&[
        "<write path=\"docs/guide.md\"># Guide</write>",
    ])]);
    let harness = Harness::new(client, &config);
    harness
        .orchestrator
        .workflow()
        .force("chat-1", WorkflowStep::Docs)
        .await
        .unwrap();

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "write the guide").with_system_prompt("base"))
        .await
        .unwrap();

    assert_eq!(outcome.model, "docs-model");
    let request = &harness.client.requests()[0];
    assert!(request.system_prompt.starts_with("base\n\n"));
    assert!(request.system_prompt.contains(WorkflowStep::Docs.prompt_fragment()));
    assert!(harness.client.completion_prompts().is_empty());
}

#[tokio::test]
async fn docs_step_rejects_source_writes() {
    let client = ScriptedClient::new(vec![
        Script::text(&["<write path=\"src/app.ts\">x</write>"]),
        Script::text(&["<write path=\"docs/app.md\">x</write>"]),
    ]);
    let harness = Harness::new(client, &Config::default());
    harness
        .orchestrator
        .workflow()
        .force("chat-1", WorkflowStep::Docs)
        .await
        .unwrap();

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "document it"))
        .await
        .unwrap();

    assert_eq!(outcome.counters.corrections, 1);
    assert_eq!(outcome.response, "<write path=\"docs/app.md\">x</write>");
}

#[tokio::test]
async fn ask_mode_reports_no_file_updates() {
    let mut config = Config::default();
    config.guardrail.max_correction_attempts = 0;
    let client = ScriptedClient::new(vec![Script::text(&["<delete path=\"a.ts\" />"])]);
    let mut harness = Harness::new(client, &config);

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "what is a.ts?").with_mode(ChatMode::Ask))
        .await
        .unwrap();

    assert_eq!(outcome.directives.len(), 1);
    assert!(matches!(
        harness.drain_events().last(),
        Some(ChatEvent::End {
            updated_files: false,
            ..
        })
    ));
}

#[tokio::test]
async fn agent_mode_forwards_tools_and_records_calls() {
    let client = ScriptedClient::new(vec![Script::Events(vec![
        StreamEvent::ToolCall {
            id: "t1".into(),
            name: "read_file".into(),
            input: serde_json::json!({"path": "a.ts"}),
        },
        StreamEvent::ToolResult {
            id: "t1".into(),
            name: "read_file".into(),
            output: "const a = 1;".into(),
        },
        StreamEvent::text("a.ts defines a constant."),
        StreamEvent::Finish {
            stop_reason: Some(StopReason::EndTurn),
            input_tokens: Some(12),
            output_tokens: Some(5),
        },
    ])]);
    let harness = Harness::new(client, &Config::default());
    let tools = vec![tagwright::llm::ToolSpec {
        name: "read_file".into(),
        description: "Read a file.".into(),
        parameters: serde_json::json!({"type": "object"}),
    }];

    let outcome = harness
        .orchestrator
        .run_turn(
            TurnRequest::new("chat-1", "what is in a.ts?")
                .with_mode(ChatMode::Agent)
                .with_tools(tools),
        )
        .await
        .unwrap();

    assert_eq!(harness.client.requests()[0].tools.len(), 1);
    assert_eq!(outcome.tool_calls.len(), 1);
    assert_eq!(outcome.tool_calls[0].output.as_deref(), Some("const a = 1;"));
    assert_eq!(outcome.input_tokens, Some(12));
    assert_eq!(outcome.output_tokens, Some(5));
    assert_eq!(outcome.response, "a.ts defines a constant.");
}

#[tokio::test]
async fn history_precedes_the_prompt() {
    let client = ScriptedClient::new(vec![Script::text(&["ok"])]);
    let harness = Harness::new(client, &Config::default());
    harness
        .orchestrator
        .run_turn(
            TurnRequest::new("chat-1", "second")
                .with_history(vec![
                    ProviderMessage::user("first"),
                    ProviderMessage::assistant("reply"),
                ]),
        )
        .await
        .unwrap();

    let messages = &harness.client.requests()[0].messages;
    assert_eq!(
        messages_with_role(messages, MessageRole::User),
        vec!["first".to_string(), "second".to_string()]
    );
}
