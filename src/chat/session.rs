//! Per-conversation state owned by the caller of the classifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::Role;

/// One message in the chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A captured piece of contact information.
///
/// Serializes as `{"email": "..."}` or `{"phone": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContactRecord {
    Email { email: String },
    Phone { phone: String },
}

impl ContactRecord {
    pub fn value(&self) -> &str {
        match self {
            Self::Email { email } => email,
            Self::Phone { phone } => phone,
        }
    }
}

/// Which kind of contact a retry counter or confirmation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Email,
    Phone,
}

/// State of one chat conversation.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    history: Vec<ChatTurn>,
    contacts: Vec<ContactRecord>,
    invalid_email_attempts: u32,
    invalid_phone_attempts: u32,
    /// Contact info awaiting a yes/no from the user.
    pending: Option<ContactRecord>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            history: Vec::new(),
            contacts: Vec::new(),
            invalid_email_attempts: 0,
            invalid_phone_attempts: 0,
            pending: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn contacts(&self) -> &[ContactRecord] {
        &self.contacts
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into());
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content.into());
    }

    fn push(&mut self, role: Role, content: String) {
        self.history.push(ChatTurn {
            role,
            content,
            timestamp: Utc::now(),
        });
    }

    /// Store a contact; duplicates are ignored.
    pub fn add_contact(&mut self, record: ContactRecord) {
        if !self.contacts.contains(&record) {
            self.contacts.push(record);
        }
    }

    /// Record one more invalid attempt and return the new count.
    pub fn record_invalid_attempt(&mut self, kind: ContactKind) -> u32 {
        let counter = match kind {
            ContactKind::Email => &mut self.invalid_email_attempts,
            ContactKind::Phone => &mut self.invalid_phone_attempts,
        };
        *counter += 1;
        *counter
    }

    pub fn invalid_attempts(&self, kind: ContactKind) -> u32 {
        match kind {
            ContactKind::Email => self.invalid_email_attempts,
            ContactKind::Phone => self.invalid_phone_attempts,
        }
    }

    pub fn reset_attempts(&mut self, kind: ContactKind) {
        match kind {
            ContactKind::Email => self.invalid_email_attempts = 0,
            ContactKind::Phone => self.invalid_phone_attempts = 0,
        }
    }

    pub fn set_pending(&mut self, record: ContactRecord) {
        self.pending = Some(record);
    }

    pub fn pending(&self) -> Option<&ContactRecord> {
        self.pending.as_ref()
    }

    pub fn take_pending(&mut self) -> Option<ContactRecord> {
        self.pending.take()
    }

    /// History rendered as plain lines for the prompt.
    pub fn transcript_text(&self) -> String {
        self.history
            .iter()
            .map(|t| t.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Forget everything except the session id.
    pub fn reset(&mut self) {
        let id = self.id;
        *self = Self::new();
        self.id = id;
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
