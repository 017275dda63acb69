//! Per-turn orchestration of the chat.
//!
//! Each user message goes through, in order:
//! 1. `/reset` handling
//! 2. a pending yes/no confirmation for ambiguous contact info
//! 3. shortcut phrase rules (no model call)
//! 4. the contact classifier
//! 5. retrieval + the LLM
//!
//! The first step that produces a reply ends the turn.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::prompt::system_prompt;
use super::replies::{self, Confirmation, parse_confirmation};
use super::session::{ChatSession, ContactKind, ContactRecord};
use super::shortcuts::ShortcutRules;
use crate::channels::StatusUpdate;
use crate::config::AgentConfig;
use crate::contact::{ClassificationResult, ContactInfoClassifier, normalize_phone};
use crate::error::Result;
use crate::knowledge::Retriever;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::transcript::{TranscriptEntry, TranscriptLog};

/// Command that clears the conversation.
pub const RESET_COMMAND: &str = "/reset";

/// Status text shown while the model composes a reply.
pub const THINKING_STATUS: &str = "Typing...";

/// Used when the model returns nothing printable.
const EMPTY_MODEL_REPLY: &str = "Sorry, I didn't quite catch that. Could you say it another way?";

/// Which step produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Reset,
    Confirmation,
    Shortcut,
    Contact,
    Model,
}

/// The assistant's answer to one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub content: String,
    pub source: ReplySource,
}

impl AgentReply {
    fn new(source: ReplySource, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source,
        }
    }
}

/// Chat agent: shortcuts, contact capture, and model replies.
pub struct ChatAgent {
    llm: Arc<dyn LlmProvider>,
    classifier: Arc<ContactInfoClassifier>,
    shortcuts: ShortcutRules,
    retriever: Option<Retriever>,
    transcript: Option<TranscriptLog>,
    status: Option<UnboundedSender<StatusUpdate>>,
    config: AgentConfig,
}

impl ChatAgent {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        classifier: Arc<ContactInfoClassifier>,
        config: AgentConfig,
    ) -> Self {
        let shortcuts =
            ShortcutRules::default_rules(config.persona.first_name(), &config.persona.company);
        Self {
            llm,
            classifier,
            shortcuts,
            retriever: None,
            transcript: None,
            status: None,
            config,
        }
    }

    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_transcript(mut self, transcript: TranscriptLog) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Send a `Thinking` update whenever a turn goes to the model.
    pub fn with_status_updates(mut self, status: UnboundedSender<StatusUpdate>) -> Self {
        self.status = Some(status);
        self
    }

    /// Handle one user message. Blank messages get no reply.
    ///
    /// On error the session is left as it was before the message.
    pub async fn handle_message(
        &self,
        session: &mut ChatSession,
        text: &str,
    ) -> Result<Option<AgentReply>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        if text.eq_ignore_ascii_case(RESET_COMMAND) {
            session.reset();
            info!(session = %session.id(), "Chat reset");
            return Ok(Some(AgentReply::new(ReplySource::Reset, replies::RESET_DONE)));
        }

        let before = session.clone();
        session.push_user(text);
        let reply = match self.route(session, text).await {
            Ok(reply) => reply,
            Err(e) => {
                *session = before;
                return Err(e);
            }
        };
        session.push_assistant(reply.content.clone());
        self.log_transcript(session).await;
        Ok(Some(reply))
    }

    async fn route(&self, session: &mut ChatSession, text: &str) -> Result<AgentReply> {
        if let Some(reply) = self.resolve_pending(session, text) {
            return Ok(reply);
        }

        if let Some(hit) = self.shortcuts.evaluate(text) {
            return Ok(AgentReply::new(ReplySource::Shortcut, hit.reply));
        }

        if let Some(content) = self.contact_reply(session, text) {
            return Ok(AgentReply::new(ReplySource::Contact, content));
        }

        self.model_reply(session, text).await
    }

    /// Answer a confirmation question asked on the previous turn.
    ///
    /// The pending contact is dropped whatever the answer; only "yes" stores it.
    /// A "no" that carries new contact info ("no, my email is ...") is left
    /// to the classifier.
    fn resolve_pending(&self, session: &mut ChatSession, text: &str) -> Option<AgentReply> {
        let pending = session.take_pending()?;
        match parse_confirmation(text)? {
            Confirmation::Yes => {
                let received = match &pending {
                    ContactRecord::Email { .. } => {
                        session.reset_attempts(ContactKind::Email);
                        replies::EMAIL_RECEIVED
                    }
                    ContactRecord::Phone { .. } => {
                        session.reset_attempts(ContactKind::Phone);
                        replies::PHONE_RECEIVED
                    }
                };
                info!(session = %session.id(), "Contact info confirmed");
                session.add_contact(pending);
                Some(AgentReply::new(ReplySource::Confirmation, received))
            }
            Confirmation::No if self.classifier.classify(text).is_contact() => {
                debug!(session = %session.id(), "Confirmation declined with a correction");
                None
            }
            Confirmation::No => {
                debug!(session = %session.id(), "Contact confirmation declined");
                Some(AgentReply::new(
                    ReplySource::Confirmation,
                    replies::CONFIRMATION_DECLINED,
                ))
            }
        }
    }

    /// Map the classifier's verdict to a reply, or `None` to fall through.
    fn contact_reply(&self, session: &mut ChatSession, text: &str) -> Option<String> {
        let result = self.classifier.classify(text);
        debug!(session = %session.id(), tag = result.tag(), "Contact classification");

        match result {
            ClassificationResult::ValidEmail(email) => {
                info!(session = %session.id(), "Captured email");
                session.add_contact(ContactRecord::Email { email });
                session.reset_attempts(ContactKind::Email);
                Some(replies::EMAIL_RECEIVED.to_string())
            }
            ClassificationResult::ValidPhone(phone) => {
                info!(session = %session.id(), "Captured phone number");
                session.add_contact(ContactRecord::Phone { phone });
                session.reset_attempts(ContactKind::Phone);
                Some(replies::PHONE_RECEIVED.to_string())
            }
            ClassificationResult::InvalidEmail => correction(
                session,
                ContactKind::Email,
                replies::EMAIL_CORRECTION,
                replies::EMAIL_GIVE_UP,
            ),
            ClassificationResult::InvalidPhone => correction(
                session,
                ContactKind::Phone,
                replies::PHONE_CORRECTION,
                replies::PHONE_GIVE_UP,
            ),
            ClassificationResult::AmbiguousEmail(address) => {
                let question = replies::confirm_email(&address);
                session.set_pending(ContactRecord::Email { email: address });
                Some(question)
            }
            ClassificationResult::AmbiguousPhone(raw) => {
                session.set_pending(ContactRecord::Phone {
                    phone: normalize_phone(&raw),
                });
                Some(replies::confirm_phone(&raw))
            }
            ClassificationResult::Invalid => None,
        }
    }

    async fn model_reply(&self, session: &ChatSession, text: &str) -> Result<AgentReply> {
        let context = match &self.retriever {
            Some(retriever) => match retriever.context_for(text).await {
                Ok(context) => context,
                Err(e) => {
                    warn!(error = %e, "Knowledge retrieval failed, answering without context");
                    None
                }
            },
            None => None,
        };

        let prompt = system_prompt(
            &self.config.persona,
            context.as_deref(),
            &session.transcript_text(),
        );
        let request = CompletionRequest::new(vec![
            ChatMessage::system(prompt),
            ChatMessage::user(text),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        if let Some(status) = &self.status {
            // The receiver may be gone during shutdown.
            let _ = status.send(StatusUpdate::Thinking(THINKING_STATUS.to_string()));
        }
        let response = self.llm.complete(request).await?;

        let (input_cost, output_cost) = self.llm.cost_per_token();
        let cost = input_cost * Decimal::from(response.input_tokens)
            + output_cost * Decimal::from(response.output_tokens);
        debug!(
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost_usd = %cost,
            "Model reply"
        );

        let content = response.content.trim();
        let content = if content.is_empty() {
            warn!(model = self.llm.model_name(), "Model returned an empty reply");
            EMPTY_MODEL_REPLY
        } else {
            content
        };
        Ok(AgentReply::new(ReplySource::Model, content))
    }

    async fn log_transcript(&self, session: &ChatSession) {
        let Some(transcript) = &self.transcript else {
            return;
        };
        if let Err(e) = transcript.append(&TranscriptEntry::snapshot(session)).await {
            warn!(error = %e, "Failed to write transcript");
        }
    }
}

/// First invalid attempt gets a correction, the second a graceful give-up,
/// later ones fall through to the model.
fn correction(
    session: &mut ChatSession,
    kind: ContactKind,
    first: &str,
    second: &str,
) -> Option<String> {
    match session.record_invalid_attempt(kind) {
        1 => Some(first.to_string()),
        2 => Some(second.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::{CompletionResponse, FinishReason};

    /// Records requests and answers with a fixed reply.
    struct RecordingLlm {
        reply: String,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl RecordingLlm {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        fn model_name(&self) -> &str {
            "recording"
        }
        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            Ok(CompletionResponse {
                content: self.reply.clone(),
                input_tokens: 10,
                output_tokens: 5,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    fn agent(llm: Arc<RecordingLlm>) -> ChatAgent {
        ChatAgent::new(
            llm,
            Arc::new(ContactInfoClassifier::with_builtin_tables().unwrap()),
            AgentConfig::default(),
        )
    }

    async fn say(agent: &ChatAgent, session: &mut ChatSession, text: &str) -> AgentReply {
        agent.handle_message(session, text).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn valid_email_is_captured_without_model() {
        let llm = RecordingLlm::new("unused");
        let agent = agent(llm.clone());
        let mut session = ChatSession::new();

        let reply = say(&agent, &mut session, "my email is jane.doe@gmail.com").await;
        assert_eq!(reply.source, ReplySource::Contact);
        assert_eq!(reply.content, replies::EMAIL_RECEIVED);
        assert_eq!(
            session.contacts(),
            &[ContactRecord::Email {
                email: "jane.doe@gmail.com".into()
            }]
        );
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_email_is_corrected_once_then_given_up() {
        let llm = RecordingLlm::new("Happy to help with your book!");
        let agent = agent(llm.clone());
        let mut session = ChatSession::new();

        let first = say(&agent, &mut session, "test@example.com").await;
        assert_eq!(first.content, replies::EMAIL_CORRECTION);
        let second = say(&agent, &mut session, "fake@example.com").await;
        assert_eq!(second.content, replies::EMAIL_GIVE_UP);
        let third = say(&agent, &mut session, "demo@example.com").await;
        assert_eq!(third.source, ReplySource::Model);
        assert_eq!(llm.calls(), 1);
        assert!(session.contacts().is_empty());
    }

    #[tokio::test]
    async fn valid_capture_resets_retry_counter() {
        let agent = agent(RecordingLlm::new("ok"));
        let mut session = ChatSession::new();

        say(&agent, &mut session, "call me at 555-1234").await;
        assert_eq!(session.invalid_attempts(ContactKind::Phone), 1);
        say(&agent, &mut session, "call me at 555-123-4567").await;
        assert_eq!(session.invalid_attempts(ContactKind::Phone), 0);
    }

    #[tokio::test]
    async fn ambiguous_phone_confirmed_with_yes() {
        let agent = agent(RecordingLlm::new("ok"));
        let mut session = ChatSession::new();

        let question = say(&agent, &mut session, "+1 555-123-4567").await;
        assert_eq!(question.source, ReplySource::Contact);
        assert!(question.content.contains("+1 555-123-4567"));
        assert!(session.contacts().is_empty());

        let confirmed = say(&agent, &mut session, "yes").await;
        assert_eq!(confirmed.source, ReplySource::Confirmation);
        assert_eq!(confirmed.content, replies::PHONE_RECEIVED);
        assert_eq!(
            session.contacts(),
            &[ContactRecord::Phone {
                phone: "+15551234567".into()
            }]
        );
    }

    #[tokio::test]
    async fn ambiguous_email_declined_with_no() {
        let agent = agent(RecordingLlm::new("ok"));
        let mut session = ChatSession::new();

        say(&agent, &mut session, "jo@press.io").await;
        let declined = say(&agent, &mut session, "no").await;
        assert_eq!(declined.content, replies::CONFIRMATION_DECLINED);
        assert!(session.contacts().is_empty());
        assert!(session.pending().is_none());
    }

    #[tokio::test]
    async fn decline_with_new_email_is_classified() {
        let llm = RecordingLlm::new("unused");
        let agent = agent(llm.clone());
        let mut session = ChatSession::new();

        say(&agent, &mut session, "jo@press.io").await;
        let reply = say(&agent, &mut session, "no, my email is jo.marsh@press.io").await;
        assert_eq!(reply.source, ReplySource::Contact);
        assert_eq!(reply.content, replies::EMAIL_RECEIVED);
        assert_eq!(
            session.contacts(),
            &[ContactRecord::Email {
                email: "jo.marsh@press.io".into()
            }]
        );
        assert!(session.pending().is_none());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn decline_with_new_ambiguous_number_asks_again() {
        let agent = agent(RecordingLlm::new("unused"));
        let mut session = ChatSession::new();

        say(&agent, &mut session, "555-123-4567").await;
        let reply = say(&agent, &mut session, "no, 555-987-6543").await;
        assert_eq!(reply.source, ReplySource::Contact);
        assert!(reply.content.contains("555-987-6543"));
        assert_eq!(
            session.pending(),
            Some(&ContactRecord::Phone {
                phone: "5559876543".into()
            })
        );
    }

    #[tokio::test]
    async fn thinking_status_only_for_model_turns() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let agent = agent(RecordingLlm::new("Happy to help!")).with_status_updates(tx);
        let mut session = ChatSession::new();

        say(&agent, &mut session, "my email is jane.doe@gmail.com").await;
        assert!(rx.try_recv().is_err());

        say(&agent, &mut session, "tell me about cover design").await;
        assert_eq!(
            rx.try_recv().unwrap(),
            StatusUpdate::Thinking(THINKING_STATUS.to_string())
        );
    }

    #[tokio::test]
    async fn unrelated_answer_drops_pending_and_continues() {
        let llm = RecordingLlm::new("Editing polishes your manuscript.");
        let agent = agent(llm.clone());
        let mut session = ChatSession::new();

        say(&agent, &mut session, "jo@press.io").await;
        let reply = say(&agent, &mut session, "what does editing involve?").await;
        assert_eq!(reply.source, ReplySource::Model);
        assert!(session.pending().is_none());
        assert!(session.contacts().is_empty());
    }

    #[tokio::test]
    async fn shortcut_skips_classifier_and_model() {
        let llm = RecordingLlm::new("unused");
        let agent = agent(llm.clone());
        let mut session = ChatSession::new();

        let reply = say(&agent, &mut session, "are you a real person?").await;
        assert_eq!(reply.source, ReplySource::Shortcut);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn model_prompt_carries_persona_and_history() {
        let llm = RecordingLlm::new("  Yes, we can definitely help with that.  ");
        let agent = agent(llm.clone());
        let mut session = ChatSession::new();

        let reply = say(&agent, &mut session, "I'm writing a 200 page memoir").await;
        assert_eq!(reply.source, ReplySource::Model);
        assert_eq!(reply.content, "Yes, we can definitely help with that.");

        let requests = llm.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.messages.len(), 2);
        assert!(request.messages[0].content.contains("Becca Williams"));
        assert!(request.messages[0].content.contains("I'm writing a 200 page memoir"));
        assert_eq!(request.messages[1].content, "I'm writing a 200 page memoir");
        assert_eq!(request.max_tokens, Some(300));
    }

    #[tokio::test]
    async fn empty_model_reply_gets_fallback() {
        let agent = agent(RecordingLlm::new("   "));
        let mut session = ChatSession::new();
        let reply = say(&agent, &mut session, "tell me about seo").await;
        assert_eq!(reply.content, EMPTY_MODEL_REPLY);
    }

    #[tokio::test]
    async fn blank_input_gets_no_reply() {
        let agent = agent(RecordingLlm::new("ok"));
        let mut session = ChatSession::new();
        assert!(agent.handle_message(&mut session, "   ").await.unwrap().is_none());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn reset_clears_session() {
        let agent = agent(RecordingLlm::new("ok"));
        let mut session = ChatSession::new();
        say(&agent, &mut session, "my email is jane.doe@gmail.com").await;

        let reply = say(&agent, &mut session, "/RESET").await;
        assert_eq!(reply.source, ReplySource::Reset);
        assert!(session.history().is_empty());
        assert!(session.contacts().is_empty());
    }

    #[tokio::test]
    async fn history_records_both_sides() {
        let agent = agent(RecordingLlm::new("Hi! I'm Becca. How are you?"));
        let mut session = ChatSession::new();
        say(&agent, &mut session, "hello").await;
        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].content, "Hi! I'm Becca. How are you?");
    }
}
