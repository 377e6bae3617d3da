// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-message flow over an in-memory document store.

use std::sync::Arc;

use futures::future::join_all;
use snare_agent::{MAX_MESSAGES, MAX_MESSAGES_REASON, MessageEngine, OutcomeStatus};
use snare_core::session::{MESSAGES, SESSIONS};
use snare_core::{DocumentStore, Filter, SessionDocument, SessionStatus, StructuredIntel};
use snare_storage::MemoryDocumentStore;
use snare_test_utils::{MockAgent, MockClassifier, RecordingReportSink};

struct Fixture {
    store: Arc<MemoryDocumentStore>,
    classifier: Arc<MockClassifier>,
    agent: Arc<MockAgent>,
    reporter: Arc<RecordingReportSink>,
    engine: Arc<MessageEngine>,
}

fn fixture(classifier: MockClassifier, agent: MockAgent) -> Fixture {
    let store = Arc::new(MemoryDocumentStore::new());
    let classifier = Arc::new(classifier);
    let agent = Arc::new(agent);
    let reporter = Arc::new(RecordingReportSink::new());
    let engine = MessageEngine::new(
        store.clone(),
        classifier.clone(),
        agent.clone(),
        reporter.clone(),
    )
    .with_mission_context("keep them talking");
    Fixture {
        store,
        classifier,
        agent,
        reporter,
        engine: Arc::new(engine),
    }
}

async fn session(store: &MemoryDocumentStore, id: &str) -> SessionDocument {
    let raw = store
        .find_one(SESSIONS, &Filter::session(id))
        .await
        .unwrap()
        .expect("session stored");
    serde_json::from_value(raw).unwrap()
}

#[tokio::test]
async fn benign_message_gets_no_reply() {
    let f = fixture(MockClassifier::benign(0.1), MockAgent::replying("hello?"));
    let outcome = f.engine.handle_message("s-1", "hi, how are you", None).await.unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.reply, None);
    assert_eq!(f.agent.calls(), 0);

    let doc = session(&f.store, "s-1").await;
    assert_eq!(doc.message_count, 1);
    assert!(!doc.is_confirmed_scam);
    assert_eq!(doc.scam_score, 0.1);
    assert_eq!(f.store.dump(MESSAGES).len(), 1);
}

#[tokio::test]
async fn confirmed_scam_is_engaged() {
    let f = fixture(MockClassifier::scam(0.95), MockAgent::replying("which account sir?"));
    let outcome = f
        .engine
        .handle_message(
            "s-1",
            "your account is blocked, pay now",
            Some(serde_json::json!({"channel": "sms"})),
        )
        .await
        .unwrap();

    assert_eq!(outcome.reply.as_deref(), Some("which account sir?"));
    let doc = session(&f.store, "s-1").await;
    assert!(doc.is_confirmed_scam);
    assert_eq!(doc.agent_state.turn_count, 1);
    assert_eq!(doc.agent_state.last_action, "engage");
    assert_eq!(doc.agent_state.sentiment, "neutral");

    let messages = f.store.dump(MESSAGES);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["sender"], "scammer");
    assert_eq!(messages[0]["metadata"]["channel"], "sms");
    assert_eq!(messages[1]["sender"], "agent");

    let history = f.agent.histories().await[0].clone();
    assert_eq!(history.last().unwrap().text, "your account is blocked, pay now");
}

#[tokio::test]
async fn classifier_stops_after_confirmation() {
    let f = fixture(MockClassifier::scam(0.95), MockAgent::replying("ok"));
    for text in ["first", "second", "third"] {
        f.engine.handle_message("s-1", text, None).await.unwrap();
    }
    assert_eq!(f.classifier.calls(), 1);
    assert_eq!(f.agent.calls(), 3);
    assert_eq!(session(&f.store, "s-1").await.message_count, 3);
}

#[tokio::test]
async fn classifier_failure_degrades() {
    let f = fixture(MockClassifier::unavailable(), MockAgent::replying("ok"));
    let outcome = f.engine.handle_message("s-1", "hello", None).await.unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.reply, None);
    let doc = session(&f.store, "s-1").await;
    assert_eq!(doc.message_count, 1);
    assert_eq!(doc.scam_score, 0.0);
}

#[tokio::test]
async fn agent_failure_degrades() {
    let f = fixture(MockClassifier::scam(0.95), MockAgent::failing("agent unavailable"));
    let outcome = f.engine.handle_message("s-1", "pay now", None).await.unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.reply, None);
    assert!(session(&f.store, "s-1").await.is_confirmed_scam);
    assert_eq!(f.store.dump(MESSAGES).len(), 1);
}

#[tokio::test]
async fn unreadable_session_falls_back_to_fresh_state() {
    let f = fixture(MockClassifier::benign(0.1), MockAgent::replying("ok"));
    f.store
        .insert_one(
            SESSIONS,
            serde_json::json!({ "session_id": "s-1", "status": 42 }),
        )
        .await
        .unwrap();

    let outcome = f.engine.handle_message("s-1", "hello", None).await.unwrap();
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(session(&f.store, "s-1").await.status, SessionStatus::Active);
}

#[tokio::test]
async fn corrupt_counter_is_reset_and_counting_resumes() {
    let f = fixture(MockClassifier::scam(0.95), MockAgent::replying("ok"));
    f.store
        .insert_one(
            SESSIONS,
            serde_json::json!({ "session_id": "s-9", "message_count": "seven" }),
        )
        .await
        .unwrap();

    for text in ["hello", "are you there", "pay now"] {
        let outcome = f.engine.handle_message("s-9", text, None).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.reply.as_deref(), Some("ok"));
    }
    f.engine.settle().await;

    let doc = session(&f.store, "s-9").await;
    assert_eq!(doc.message_count, 3);
    assert!(doc.is_confirmed_scam);
    assert_eq!(f.store.dump(SESSIONS).len(), 1);
}

#[tokio::test]
async fn background_extraction_records_intelligence() {
    let intel = StructuredIntel {
        names: vec!["Rahul Sharma".into()],
        ..Default::default()
    };
    let f = fixture(MockClassifier::scam(0.95), MockAgent::replying("ok").extracting(intel));
    f.engine
        .handle_message(
            "s-1",
            "send to 9876543210 or account 123456789012 via user@oksbi",
            None,
        )
        .await
        .unwrap();
    f.engine.settle().await;

    let doc = session(&f.store, "s-1").await;
    let intel = &doc.extracted_intelligence.0;
    assert!(intel["phone_numbers"].contains("9876543210"));
    assert!(intel["bank_accounts"].contains("123456789012"));
    assert!(intel["upi_ids"].contains("user@oksbi"));
    assert!(intel["names"].contains("Rahul Sharma"));
}

#[tokio::test]
async fn confirmed_session_is_reported_after_five_messages() {
    let f = fixture(MockClassifier::scam(0.95), MockAgent::replying("ok"));
    for i in 0..4 {
        f.engine.handle_message("s-1", &format!("msg {i}"), None).await.unwrap();
        f.engine.settle().await;
    }
    assert_eq!(f.reporter.count().await, 0);

    for i in 4..8 {
        f.engine.handle_message("s-1", &format!("msg {i}"), None).await.unwrap();
        f.engine.settle().await;
    }
    assert_eq!(f.reporter.count().await, 1);

    let doc = session(&f.store, "s-1").await;
    assert_eq!(doc.status, SessionStatus::Reported);
    assert!(doc.is_reported);
    let delivered = f.reporter.delivered().await[0].clone();
    assert_eq!(delivered.message_count, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_messages_do_not_lose_counts() {
    let f = fixture(MockClassifier::scam(0.95), MockAgent::replying("ok"));
    let sends = (0..12).map(|i| {
        let engine = Arc::clone(&f.engine);
        tokio::spawn(async move {
            engine
                .handle_message("s-1", &format!("msg {i}"), None)
                .await
                .unwrap()
        })
    });
    for result in join_all(sends).await {
        result.unwrap();
    }
    f.engine.settle().await;

    let doc = session(&f.store, "s-1").await;
    assert_eq!(doc.message_count, 12);
    assert_eq!(doc.agent_state.turn_count, 12);
    assert_eq!(f.classifier.calls(), 1);
    assert_eq!(f.reporter.count().await, 1);
}

#[tokio::test]
async fn session_terminates_at_message_limit() {
    let f = fixture(MockClassifier::benign(0.1), MockAgent::replying("ok"));
    for i in 0..MAX_MESSAGES - 1 {
        f.engine.handle_message("s-1", &format!("msg {i}"), None).await.unwrap();
    }
    f.engine.settle().await;
    assert_eq!(session(&f.store, "s-1").await.status, SessionStatus::Active);

    f.engine.handle_message("s-1", "the fiftieth", None).await.unwrap();
    f.engine.settle().await;
    let doc = session(&f.store, "s-1").await;
    assert_eq!(doc.status, SessionStatus::Terminated);
    assert_eq!(doc.termination_reason.as_deref(), Some(MAX_MESSAGES_REASON));

    let after = f.engine.handle_message("s-1", "still there?", None).await.unwrap();
    assert_eq!(after.status, OutcomeStatus::Terminated);
    assert_eq!(after.reply, None);
    assert_eq!(session(&f.store, "s-1").await.message_count, MAX_MESSAGES);
}
