use crate::turn_harness::{Harness, Script, ScriptedClient, messages_with_role};
use std::sync::Arc;
use std::time::Duration;
use tagwright::Config;
use tagwright::config::MonitorKind;
use tagwright::guardrail::canned_correction;
use tagwright::llm::MessageRole;
use tagwright::orchestrator::TurnRequest;
use tagwright::protocol::ViolationKind;

const FENCED: &[&str] = &["Here is the fix:\n", "```ts\nconst x = 1;\n", "```"];

#[tokio::test]
async fn fenced_block_restarts_with_canned_correction() {
    let client = ScriptedClient::new(vec![
        Script::text(FENCED),
        Script::text(&["<write path=\"x.ts\">const x = 1;</write>"]),
    ]);
    let harness = Harness::new(client, &Config::default());

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "fix x"))
        .await
        .unwrap();

    assert_eq!(outcome.counters.corrections, 1);
    assert_eq!(outcome.response, "<write path=\"x.ts\">const x = 1;</write>");

    let requests = harness.client.requests();
    assert_eq!(requests.len(), 2);
    let retry = &requests[1].messages;
    assert_eq!(
        messages_with_role(retry, MessageRole::System),
        vec![canned_correction(ViolationKind::ProhibitedMarkupBlock).to_string()]
    );
    // The partial response up to the violation is kept as context.
    let assistant = messages_with_role(retry, MessageRole::Assistant);
    assert_eq!(assistant.len(), 1);
    assert!(assistant[0].starts_with("Here is the fix:\n```ts"));
}

#[tokio::test]
async fn user_cancel_after_correction_abort_ends_the_turn() {
    let client = ScriptedClient::new(vec![
        Script::text(FENCED),
        Script::stall(&["<write path=\"x.ts\">retry"]),
    ]);
    let harness = Harness::new(client, &Config::default());

    let orchestrator = Arc::clone(&harness.orchestrator);
    let turn = tokio::spawn(async move {
        orchestrator
            .run_turn(TurnRequest::new("chat-1", "fix x"))
            .await
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while !harness
            .registry
            .partial("chat-1")
            .is_some_and(|p| p.contains("retry"))
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert!(harness.orchestrator.cancel("chat-1"));

    let outcome = turn.await.unwrap().unwrap();
    assert!(outcome.cancelled);
    assert_eq!(outcome.counters.corrections, 1);
    assert!(outcome.response.contains("<write path=\"x.ts\">retry"));
    assert!(outcome.response.ends_with("[Response cancelled by user]"));
    assert_eq!(harness.client.requests().len(), 2);
}

#[tokio::test]
async fn correction_loop_stops_after_budget() {
    let client = ScriptedClient::new(vec![
        Script::text(FENCED),
        Script::text(FENCED),
        Script::text(FENCED),
        Script::text(FENCED),
    ]);
    let harness = Harness::new(client, &Config::default());

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "fix x"))
        .await
        .unwrap();

    assert_eq!(outcome.counters.corrections, 2);
    assert_eq!(harness.client.requests().len(), 3);
    // The last response is returned uncorrected.
    assert_eq!(outcome.response, FENCED.concat());
    assert!(harness.client.completion_prompts().is_empty());
}

#[tokio::test]
async fn corrections_accumulate_in_context() {
    let client = ScriptedClient::new(vec![
        Script::text(&["```\n"]),
        Script::text(&["apply_patch now"]),
        Script::text(&["<write path=\"a.ts\">ok</write>"]),
    ]);
    let harness = Harness::new(client, &Config::default());

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "go"))
        .await
        .unwrap();

    assert_eq!(outcome.counters.corrections, 2);
    let last = &harness.client.requests()[2].messages;
    assert_eq!(
        messages_with_role(last, MessageRole::System),
        vec![
            canned_correction(ViolationKind::ProhibitedMarkupBlock).to_string(),
            canned_correction(ViolationKind::ProhibitedToolReference).to_string(),
        ]
    );
}

#[tokio::test]
async fn streaming_monitor_uses_router_correction() {
    let mut config = Config::default();
    config.guardrail.monitor = MonitorKind::Streaming;
    let client = ScriptedClient::new(vec![
        Script::text(FENCED),
        Script::text(&["<write path=\"x.ts\">const x = 1;</write>"]),
    ])
    .with_completions(&["Put the code for x.ts inside a write tag."]);
    let harness = Harness::new(client, &config);

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "fix x"))
        .await
        .unwrap();

    assert_eq!(outcome.counters.corrections, 1);
    let retry = &harness.client.requests()[1].messages;
    assert_eq!(
        messages_with_role(retry, MessageRole::System),
        vec!["Put the code for x.ts inside a write tag.".to_string()]
    );
}

#[tokio::test]
async fn streaming_monitor_failure_never_breaks_the_stream() {
    let mut config = Config::default();
    config.guardrail.monitor = MonitorKind::Streaming;
    config.guardrail.final_gate = false;
    // No router reply scripted: every router call fails.
    let client = ScriptedClient::new(vec![Script::text(FENCED)]);
    let harness = Harness::new(client, &config);

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "fix x"))
        .await
        .unwrap();

    assert_eq!(outcome.counters.corrections, 0);
    assert_eq!(outcome.response, FENCED.concat());
    assert_eq!(harness.client.requests().len(), 1);
}
