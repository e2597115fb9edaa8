use crate::turn_harness::{Harness, Script, ScriptedClient};
use std::sync::Arc;
use tagwright::Config;
use tagwright::error::{TagwrightError, TurnError};
use tagwright::orchestrator::{ChatEvent, TurnRequest};
use tagwright::store::ChatStore;

async fn wait_for_chunk(harness: &mut Harness) {
    loop {
        match harness.events.recv().await {
            Some(ChatEvent::Chunk { .. }) => return,
            Some(_) => {}
            None => panic!("event channel closed before a chunk arrived"),
        }
    }
}

#[tokio::test]
async fn user_cancel_keeps_partial_response() {
    let client = ScriptedClient::new(vec![Script::stall(&["<write path=\"a.ts\">partial"])]);
    let mut harness = Harness::new(client, &Config::default());

    let orchestrator = Arc::clone(&harness.orchestrator);
    let turn = tokio::spawn(async move {
        orchestrator
            .run_turn(TurnRequest::new("chat-1", "write a"))
            .await
    });

    wait_for_chunk(&mut harness).await;
    assert!(harness.registry.is_streaming("chat-1"));
    assert_eq!(
        harness.registry.partial("chat-1").as_deref(),
        Some("<write path=\"a.ts\">partial")
    );
    assert!(harness.orchestrator.cancel("chat-1"));

    let outcome = turn.await.unwrap().unwrap();
    assert!(outcome.cancelled);
    assert_eq!(
        outcome.response,
        "<write path=\"a.ts\">partial\n\n[Response cancelled by user]"
    );
    assert!(outcome.directives.is_empty());

    let snapshot = harness.store.load_snapshot("chat-1").await.unwrap();
    assert_eq!(snapshot.as_deref(), Some(outcome.response.as_str()));
    assert!(!harness.registry.is_streaming("chat-1"));
    assert_eq!(harness.client.requests().len(), 1);
}

#[tokio::test]
async fn concurrent_turn_on_same_chat_is_rejected() {
    let client = ScriptedClient::new(vec![Script::stall(&["thinking about it"])]);
    let mut harness = Harness::new(client, &Config::default());

    let orchestrator = Arc::clone(&harness.orchestrator);
    let turn = tokio::spawn(async move {
        orchestrator
            .run_turn(TurnRequest::new("chat-1", "first"))
            .await
    });
    wait_for_chunk(&mut harness).await;

    let err = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-1", "second"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TagwrightError::Turn(TurnError::AlreadyStreaming { ref chat_id }) if chat_id == "chat-1"
    ));

    harness.orchestrator.cancel("chat-1");
    assert!(turn.await.unwrap().unwrap().cancelled);
}

#[tokio::test]
async fn other_chats_stream_independently() {
    let client = ScriptedClient::new(vec![Script::stall(&["slow"]), Script::text(&["fast"])]);
    let mut harness = Harness::new(client, &Config::default());

    let orchestrator = Arc::clone(&harness.orchestrator);
    let slow = tokio::spawn(async move {
        orchestrator
            .run_turn(TurnRequest::new("chat-slow", "one"))
            .await
    });
    wait_for_chunk(&mut harness).await;

    let fast = harness
        .orchestrator
        .run_turn(TurnRequest::new("chat-fast", "two"))
        .await
        .unwrap();
    assert_eq!(fast.response, "fast");
    assert!(harness.registry.is_streaming("chat-slow"));

    harness.orchestrator.cancel("chat-slow");
    let slow = slow.await.unwrap().unwrap();
    assert!(slow.response.starts_with("slow"));
}

#[tokio::test]
async fn cancel_without_active_turn_is_a_no_op() {
    let harness = Harness::new(ScriptedClient::new(Vec::new()), &Config::default());
    assert!(!harness.orchestrator.cancel("nobody"));
}
