//! End-to-end conversation tests.
//!
//! Drives `ChatAgent` through the public API with a stub LLM and a stub
//! embedder, writing the transcript to a temp file.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use folio_assist::chat::replies;
use folio_assist::chat::{ChatAgent, ChatSession, ContactRecord, ReplySource};
use folio_assist::config::AgentConfig;
use folio_assist::contact::{
    ClassificationResult, ContactInfoClassifier, KeywordCategory, KeywordTables,
};
use folio_assist::error::{KnowledgeError, LlmError};
use folio_assist::knowledge::{ChunkFile, Embedder, InMemoryKnowledgeBase, Retriever};
use folio_assist::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
};
use folio_assist::transcript::TranscriptLog;

/// Stub LLM provider (no real API calls). Remembers the prompts it was given.
struct StubLlm {
    prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }
    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.prompts
            .lock()
            .unwrap()
            .push(request.preamble().unwrap_or_default());
        Ok(CompletionResponse {
            content: "That sounds like a wonderful project!".to_string(),
            input_tokens: 120,
            output_tokens: 8,
            finish_reason: FinishReason::Stop,
            response_id: None,
        })
    }
}

/// LLM that always fails.
struct DownLlm;

#[async_trait]
impl LlmProvider for DownLlm {
    fn model_name(&self) -> &str {
        "down"
    }
    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::RequestFailed {
            provider: "down".into(),
            reason: "connection refused".into(),
        })
    }
}

/// Embeds everything mentioning "cover" onto the second axis.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        if text.to_lowercase().contains("cover") {
            Ok(vec![0.0, 1.0])
        } else {
            Ok(vec![1.0, 0.0])
        }
    }
}

struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, KnowledgeError> {
        Err(KnowledgeError::EmbeddingFailed {
            reason: "quota exceeded".into(),
        })
    }
}

fn classifier() -> Arc<ContactInfoClassifier> {
    Arc::new(ContactInfoClassifier::with_builtin_tables().unwrap())
}

fn retriever(embedder: Arc<dyn Embedder>) -> Retriever {
    let knowledge = InMemoryKnowledgeBase::from_chunk_file(ChunkFile {
        docs: vec![
            "Our editors offer developmental and line editing.".into(),
            "Cover design packages include three concepts.".into(),
        ],
        embeddings: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
    })
    .unwrap();
    Retriever::new(embedder, Arc::new(knowledge))
}

async fn say(agent: &ChatAgent, session: &mut ChatSession, text: &str) -> String {
    agent
        .handle_message(session, text)
        .await
        .unwrap()
        .unwrap()
        .content
}

#[tokio::test]
async fn classifier_scenarios_through_public_api() {
    let c = classifier();
    assert_eq!(
        c.classify("my email is jane.doe@gmail.com"),
        ClassificationResult::ValidEmail("jane.doe@gmail.com".into())
    );
    assert_eq!(c.classify("test@example.com"), ClassificationResult::InvalidEmail);
    assert_eq!(c.classify("I'm 32 years old"), ClassificationResult::Invalid);
    assert_eq!(
        c.classify("call me at 555-123-4567"),
        ClassificationResult::ValidPhone("5551234567".into())
    );
    assert!(matches!(
        c.classify("555-123-4567"),
        ClassificationResult::AmbiguousPhone(_)
    ));
    assert_eq!(c.classify("200 page horror novel"), ClassificationResult::Invalid);
}

#[tokio::test]
async fn full_conversation_captures_contact_and_logs_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_logs.jsonl");
    let llm = StubLlm::new();
    let agent = ChatAgent::new(llm.clone(), classifier(), AgentConfig::default())
        .with_retriever(retriever(Arc::new(KeywordEmbedder)))
        .with_transcript(TranscriptLog::new(&path));
    let mut session = ChatSession::new();

    let first = say(&agent, &mut session, "Hi! I need help with my book cover").await;
    assert_eq!(first, "That sounds like a wonderful project!");
    assert!(llm.last_prompt().contains("Cover design packages"));

    let second = say(&agent, &mut session, "sure, my email is jane.doe@gmail.com").await;
    assert_eq!(second, replies::EMAIL_RECEIVED);
    assert_eq!(llm.calls(), 1);

    let raw = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = raw
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);

    let last = &lines[1];
    assert_eq!(last["session_id"], session.id().to_string());
    assert_eq!(last["chat_history"].as_array().unwrap().len(), 4);
    assert_eq!(last["chat_history"][2]["role"], "user");
    assert_eq!(last["chat_history"][3]["role"], "assistant");
    assert_eq!(last["contact_info"][0]["email"], "jane.doe@gmail.com");
}

#[tokio::test]
async fn invalid_email_correction_then_give_up_then_model() {
    let llm = StubLlm::new();
    let agent = ChatAgent::new(llm.clone(), classifier(), AgentConfig::default());
    let mut session = ChatSession::new();

    assert_eq!(
        say(&agent, &mut session, "sure it's test@example.com").await,
        replies::EMAIL_CORRECTION
    );
    assert_eq!(
        say(&agent, &mut session, "ok then sample@mysite.com").await,
        replies::EMAIL_GIVE_UP
    );
    assert_eq!(llm.calls(), 0);

    let reply = agent
        .handle_message(&mut session, "fine, demo@mysite.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.source, ReplySource::Model);
    assert_eq!(llm.calls(), 1);
    assert!(session.contacts().is_empty());
}

#[tokio::test]
async fn ambiguous_email_confirmed_with_yes_is_stored() {
    let agent = ChatAgent::new(StubLlm::new(), classifier(), AgentConfig::default());
    let mut session = ChatSession::new();

    let question = say(&agent, &mut session, "Jo.Marsh@press.io").await;
    assert!(question.contains("Jo.Marsh@press.io"));
    assert!(session.contacts().is_empty());

    assert_eq!(
        say(&agent, &mut session, "Yes, that's the one").await,
        replies::EMAIL_RECEIVED
    );
    assert_eq!(
        session.contacts(),
        &[ContactRecord::Email {
            email: "Jo.Marsh@press.io".into()
        }]
    );
}

#[tokio::test]
async fn shortcut_phrases_never_reach_the_model() {
    let llm = StubLlm::new();
    let agent = ChatAgent::new(llm.clone(), classifier(), AgentConfig::default());
    let mut session = ChatSession::new();

    let real = say(&agent, &mut session, "Wait, are you a bot?").await;
    assert!(real.contains("Folio Publishers") || real.contains("Becca"));
    let samples = say(&agent, &mut session, "Can I see examples of your design?").await;
    assert!(samples.contains("email"));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn retrieval_failure_still_answers() {
    let llm = StubLlm::new();
    let agent = ChatAgent::new(llm.clone(), classifier(), AgentConfig::default())
        .with_retriever(retriever(Arc::new(BrokenEmbedder)));
    let mut session = ChatSession::new();

    let reply = say(&agent, &mut session, "what does editing cost?").await;
    assert_eq!(reply, "That sounds like a wonderful project!");
    assert!(!llm.last_prompt().contains("knowledge base"));
}

#[tokio::test]
async fn model_failure_is_an_error() {
    let agent = ChatAgent::new(Arc::new(DownLlm), classifier(), AgentConfig::default());
    let mut session = ChatSession::new();

    let err = agent
        .handle_message(&mut session, "tell me about marketing")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("connection refused"));

    // Contact capture does not need the model.
    let ok = say(&agent, &mut session, "my number is 555-123-4567").await;
    assert_eq!(ok, replies::PHONE_RECEIVED);
}

#[tokio::test]
async fn model_failure_leaves_session_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_logs.jsonl");
    let agent = ChatAgent::new(Arc::new(DownLlm), classifier(), AgentConfig::default())
        .with_transcript(TranscriptLog::new(&path));
    let mut session = ChatSession::new();

    say(&agent, &mut session, "jo@press.io").await;
    assert_eq!(session.history().len(), 2);

    agent
        .handle_message(&mut session, "tell me about seo")
        .await
        .unwrap_err();
    assert_eq!(session.history().len(), 2);
    assert_eq!(
        session.pending(),
        Some(&ContactRecord::Email {
            email: "jo@press.io".into()
        })
    );

    // The pending question can still be answered.
    assert_eq!(say(&agent, &mut session, "yes").await, replies::EMAIL_RECEIVED);
    assert_eq!(session.history().len(), 4);

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.lines().count(), 2);
}

#[tokio::test]
async fn swapped_keyword_tables_change_behavior() {
    let tables = KeywordTables::builtin().with(KeywordCategory::NonContact, ["isbn", "order"]);
    let custom = Arc::new(ContactInfoClassifier::new(tables).unwrap());
    let llm = StubLlm::new();
    let agent = ChatAgent::new(llm.clone(), custom, AgentConfig::default());
    let mut session = ChatSession::new();

    let reply = agent
        .handle_message(&mut session, "my order 5551234567")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.source, ReplySource::Model);
    assert_eq!(llm.calls(), 1);
}
