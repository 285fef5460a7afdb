//! End-to-end tests for the chat pipeline: save directives, the three-stage
//! refinement flow, cancellation, single-flight session handling, and
//! regeneration.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use contextguard_application::{ChatUseCase, TypewriterReveal, prompts};
use contextguard_core::completion::CompletionEngine;
use contextguard_core::error::{ContextGuardError, Result};
use contextguard_core::memory::{ContextVault, InMemorySlotRepository};
use contextguard_core::session::{Sender, Stage};

/// One scripted engine behavior, consumed per completion call.
enum Step {
    /// Answer immediately.
    Reply(&'static str),
    /// Fail immediately.
    Fail(&'static str),
    /// Wait for the notify handle, then answer.
    Gated(Arc<Notify>, &'static str),
}

/// Completion engine double that replays a fixed script and records every
/// prompt it is asked to complete.
struct ScriptedEngine {
    steps: Mutex<VecDeque<Step>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    async fn calls(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl CompletionEngine for ScriptedEngine {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().await.push(prompt.to_string());
        let step = self
            .steps
            .lock()
            .await
            .pop_front()
            .expect("engine called more times than scripted");

        match step {
            Step::Reply(text) => Ok(text.to_string()),
            Step::Fail(message) => Err(ContextGuardError::completion(message)),
            Step::Gated(gate, text) => {
                gate.notified().await;
                Ok(text.to_string())
            }
        }
    }
}

fn usecase(engine: Arc<ScriptedEngine>) -> ChatUseCase {
    let vault = Arc::new(ContextVault::new(Arc::new(InMemorySlotRepository::new())));
    ChatUseCase::new(engine, vault).with_reveal(TypewriterReveal::instant())
}

async fn wait_for_stage(chat: &ChatUseCase, stage: Stage) {
    for _ in 0..1000 {
        if chat.current_stage().await == stage {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("timed out waiting for stage {stage:?}");
}

async fn wait_for_calls(engine: &ScriptedEngine, count: usize) {
    for _ in 0..1000 {
        if engine.calls().await >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("timed out waiting for {count} engine calls");
}

// ============================================================================
// Save directives
// ============================================================================

#[tokio::test]
async fn save_directive_short_circuits_with_confirmation() {
    let engine = Arc::new(ScriptedEngine::new(vec![]));
    let chat = usecase(engine.clone());

    chat.handle_user_message("save buy milk").await.unwrap();

    let transcript = chat.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].sender, Sender::User);
    assert_eq!(
        transcript[1].text,
        "✅ I've saved: \"buy milk\"\nI'll remember this for future conversations."
    );

    let memories = chat.list_memories().await;
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0].content, "buy milk");

    // No pipeline ran for the save path.
    assert_eq!(engine.calls().await, 0);
    assert_eq!(chat.current_stage().await, Stage::Idle);
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn three_stages_run_in_order_and_reveal_the_final_text() {
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::Reply("the draft"),
        Step::Reply("the verified text"),
        Step::Reply("the formatted answer"),
    ]));
    let chat = usecase(engine.clone());

    chat.handle_user_message("explain X").await.unwrap();

    let prompts_seen = engine.prompts().await;
    assert_eq!(prompts_seen[0], "explain X");
    assert_eq!(prompts_seen[1], prompts::verify_prompt("the draft"));
    assert_eq!(prompts_seen[2], prompts::format_prompt("the verified text"));

    let transcript = chat.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].text, "the formatted answer");

    assert_eq!(chat.current_stage().await, Stage::Done);
    assert!(!chat.can_stop().await);
    assert!(chat.can_regenerate().await);
}

// ============================================================================
// Memory augmentation
// ============================================================================

#[tokio::test]
async fn saved_memory_augments_the_draft_prompt_and_tags_the_reply() {
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::Reply("draft"),
        Step::Reply("verified"),
        Step::Reply("It is Friday."),
    ]));
    let chat = usecase(engine.clone());

    chat.handle_user_message("remember: project deadline is Friday")
        .await
        .unwrap();
    chat.handle_user_message("what is my deadline").await.unwrap();

    let prompts_seen = engine.prompts().await;
    assert_eq!(
        prompts_seen[0],
        "Based on this saved information: \"project deadline is Friday\"\n\n\
         Please answer this question: what is my deadline"
    );

    let transcript = chat.transcript().await;
    let reply = &transcript.last().unwrap().text;
    assert_eq!(
        reply,
        "🔍 Using: \"project deadline is Friday\"\n\nIt is Friday."
    );
}

#[tokio::test]
async fn unrelated_question_is_not_augmented() {
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::Reply("draft"),
        Step::Reply("verified"),
        Step::Reply("plain answer"),
    ]));
    let chat = usecase(engine.clone());

    chat.handle_user_message("remember: project deadline is Friday")
        .await
        .unwrap();
    chat.handle_user_message("how old is the sun").await.unwrap();

    assert_eq!(engine.prompts().await[0], "how old is the sun");
    assert_eq!(chat.transcript().await.last().unwrap().text, "plain answer");
}

// ============================================================================
// Failure path
// ============================================================================

#[tokio::test]
async fn completion_failure_writes_the_apology_and_ends_the_session() {
    let engine = Arc::new(ScriptedEngine::new(vec![Step::Fail("model unavailable")]));
    let chat = usecase(engine.clone());

    chat.handle_user_message("explain X").await.unwrap();

    let transcript = chat.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(
        transcript[1].text,
        "I'm here to help! Please try your question again."
    );
    assert_eq!(chat.current_stage().await, Stage::Errored);

    // No retry was attempted.
    assert_eq!(engine.calls().await, 1);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn stop_while_awaiting_a_stage_discards_the_late_result() {
    let gate = Arc::new(Notify::new());
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::Reply("the draft"),
        Step::Gated(gate.clone(), "the verified text"),
    ]));
    let chat = usecase(engine.clone());

    let runner = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.handle_user_message("explain X").await })
    };

    wait_for_stage(&chat, Stage::Verifying).await;
    assert!(chat.can_stop().await);
    chat.stop().await;
    gate.notify_one();
    runner.await.unwrap().unwrap();

    let transcript = chat.transcript().await;
    // user message, placeholder, stop notice
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].text, "(generation stopped)");
    assert_eq!(transcript[2].text, "(stopped by user)");
    assert_eq!(chat.current_stage().await, Stage::Cancelled);

    // The verified text that arrived after the stop never surfaced.
    assert_eq!(engine.calls().await, 2);
    assert!(chat.can_regenerate().await);
}

#[tokio::test]
async fn stop_mid_reveal_keeps_the_displayed_prefix() {
    let full = "a reasonably long final answer that takes a while to type out on screen";
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::Reply("draft"),
        Step::Reply("verified"),
        Step::Reply(full),
    ]));
    let vault = Arc::new(ContextVault::new(Arc::new(InMemorySlotRepository::new())));
    let chat = ChatUseCase::new(engine.clone(), vault)
        .with_reveal(TypewriterReveal::with_delay_range(5, 10));

    let runner = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.handle_user_message("explain X").await })
    };

    wait_for_stage(&chat, Stage::Revealing).await;

    // Let a few characters land before stopping.
    loop {
        let shown = chat.current_reveal_text().await.unwrap_or_default();
        if shown.chars().count() >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    chat.stop().await;
    runner.await.unwrap().unwrap();

    let transcript = chat.transcript().await;
    let placeholder = &transcript[1].text;
    let prefix = placeholder
        .strip_suffix(" …(stopped)")
        .expect("placeholder ends with the stopped marker");
    assert!(full.starts_with(prefix));
    assert!(!prefix.is_empty());
    assert!(prefix.len() < full.len());
    assert_eq!(chat.current_stage().await, Stage::Cancelled);
}

#[tokio::test]
async fn stop_with_no_active_session_is_a_noop() {
    let engine = Arc::new(ScriptedEngine::new(vec![]));
    let chat = usecase(engine);

    chat.stop().await;

    assert!(chat.transcript().await.is_empty());
    assert!(!chat.can_stop().await);
}

// ============================================================================
// Single flight
// ============================================================================

#[tokio::test]
async fn a_new_message_supersedes_the_active_session() {
    let gate = Arc::new(Notify::new());
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::Gated(gate.clone(), "first draft"),
        Step::Reply("second draft"),
        Step::Reply("second verified"),
        Step::Reply("second answer"),
    ]));
    let chat = usecase(engine.clone());

    let first = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.handle_user_message("first question").await })
    };
    wait_for_calls(&engine, 1).await;

    // The second message cancels the first session before its own
    // placeholder is created, then runs to completion.
    chat.handle_user_message("second question").await.unwrap();
    gate.notify_one();
    first.await.unwrap().unwrap();

    let transcript = chat.transcript().await;
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[0].text, "first question");
    assert_eq!(transcript[1].text, "(generation stopped)");
    assert_eq!(transcript[2].text, "second question");
    assert_eq!(transcript[3].text, "second answer");

    // The surviving session finished normally.
    assert_eq!(chat.current_stage().await, Stage::Done);
    assert_eq!(engine.calls().await, 4);
}

// ============================================================================
// Regenerate
// ============================================================================

#[tokio::test]
async fn regenerate_reruns_the_last_prompt_without_a_new_user_message() {
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::Reply("draft one"),
        Step::Reply("verified one"),
        Step::Reply("answer one"),
        Step::Reply("draft two"),
        Step::Reply("verified two"),
        Step::Reply("answer two"),
    ]));
    let chat = usecase(engine.clone());

    chat.handle_user_message("explain X").await.unwrap();
    chat.regenerate().await.unwrap();

    let prompts_seen = engine.prompts().await;
    // The regenerated Drafting input is identical to the original.
    assert_eq!(prompts_seen[3], prompts_seen[0]);
    assert_eq!(prompts_seen[0], "explain X");

    let transcript = chat.transcript().await;
    let user_count = transcript
        .iter()
        .filter(|m| m.sender == Sender::User)
        .count();
    assert_eq!(user_count, 1);

    assert!(transcript.iter().any(|m| m.text == "(regenerating…)"));
    assert_eq!(transcript.last().unwrap().text, "answer two");
    assert_eq!(chat.current_stage().await, Stage::Done);
}

#[tokio::test]
async fn regenerate_before_any_generation_is_a_noop() {
    let engine = Arc::new(ScriptedEngine::new(vec![]));
    let chat = usecase(engine.clone());

    assert!(!chat.can_regenerate().await);
    chat.regenerate().await.unwrap();

    assert!(chat.transcript().await.is_empty());
    assert_eq!(engine.calls().await, 0);
}

// ============================================================================
// Memory pass-throughs
// ============================================================================

#[tokio::test]
async fn delete_and_clear_surface_notices() {
    let engine = Arc::new(ScriptedEngine::new(vec![]));
    let chat = usecase(engine);

    chat.handle_user_message("save wifi password is hunter2")
        .await
        .unwrap();
    let memories = chat.list_memories().await;
    assert_eq!(memories.len(), 1);

    chat.delete_memory(&memories[0].id).await;
    assert!(chat.list_memories().await.is_empty());

    chat.handle_user_message("save another fact").await.unwrap();
    chat.clear_memories().await;
    assert!(chat.list_memories().await.is_empty());

    let texts: Vec<String> = chat
        .transcript()
        .await
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert!(texts.contains(&"Memory deleted".to_string()));
    assert!(texts.contains(&"All memories cleared".to_string()));
}

#[tokio::test]
async fn memory_snapshot_refreshes_after_a_completed_session() {
    let engine = Arc::new(ScriptedEngine::new(vec![
        Step::Reply("draft"),
        Step::Reply("verified"),
        Step::Reply("answer"),
    ]));
    let chat = usecase(engine);

    chat.handle_user_message("save the sky is blue").await.unwrap();
    chat.handle_user_message("tell me a joke").await.unwrap();

    // The cached snapshot was re-queried at session end.
    assert_eq!(chat.memories().await.len(), 1);
}
