use crate::turn_harness::{Harness, Script, ScriptedClient, messages_with_role};
use tagwright::Config;
use tagwright::llm::MessageRole;
use tagwright::orchestrator::TurnRequest;

fn no_continuation() -> Config {
    let mut config = Config::default();
    config.guardrail.max_continuation_attempts = 0;
    config
}

#[tokio::test]
async fn gate_restarts_with_corrective_instruction() {
    let client = ScriptedClient::new(vec![
        Script::text(&["<write path=\"a.ts\">const a = 1;"]),
        Script::text(&["<write path=\"a.ts\">const a = 1;</write>"]),
    ])
    .with_completions(&[
        "Sure. <correction-instruction>Close every write tag you open.</correction-instruction>",
    ]);
    let harness = Harness::new(client, &no_continuation());

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "add a"))
        .await
        .unwrap();

    assert_eq!(outcome.counters.corrections, 1);
    assert_eq!(outcome.directives.len(), 1);

    let prompts = harness.client.completion_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("malformed-tag-structure"));
    assert!(prompts[0].contains("add a"));

    let retry = &harness.client.requests()[1].messages;
    assert_eq!(
        messages_with_role(retry, MessageRole::System),
        vec!["Close every write tag you open.".to_string()]
    );
}

#[tokio::test]
async fn gate_without_instruction_returns_response() {
    let client = ScriptedClient::new(vec![Script::text(&["<write path=\"a.ts\">const a"])])
        .with_completions(&["I think the response is fine."]);
    let harness = Harness::new(client, &no_continuation());

    let outcome = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "add a"))
        .await
        .unwrap();

    assert_eq!(outcome.counters.corrections, 0);
    assert_eq!(outcome.response, "<write path=\"a.ts\">const a");
    assert_eq!(harness.client.requests().len(), 1);
}

#[tokio::test]
async fn disabled_gate_skips_router() {
    let mut config = no_continuation();
    config.guardrail.final_gate = false;
    let client = ScriptedClient::new(vec![Script::text(&["<write path=\"a.ts\">x"])]);
    let harness = Harness::new(client, &config);

    harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "add a"))
        .await
        .unwrap();

    assert!(harness.client.completion_prompts().is_empty());
}
