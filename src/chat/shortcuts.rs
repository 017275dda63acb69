//! Phrase rules answered without calling the model.
//!
//! Runs before contact classification and the LLM to short-circuit requests
//! with a fixed answer:
//! - "are you a real person?" style questions → real-person reply
//! - requests for cover/design samples → ask for an email to send them to
//!
//! Rules are checked in order; the first rule with a matching phrase wins.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

/// A phrase rule with one or more canned replies.
#[derive(Debug, Clone)]
pub struct ShortcutRule {
    /// Rule name, for logs.
    pub name: String,
    /// Lower-cased phrases; any substring hit triggers the rule.
    pub phrases: Vec<String>,
    /// Replies to choose from.
    pub replies: Vec<String>,
}

/// A triggered rule and the reply chosen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutMatch {
    pub rule: String,
    pub reply: String,
}

/// Ordered set of shortcut rules.
#[derive(Debug, Clone, Default)]
pub struct ShortcutRules {
    rules: Vec<ShortcutRule>,
}

impl ShortcutRules {
    /// The default real-person and samples rules.
    pub fn default_rules(persona: &str, company: &str) -> Self {
        let mut rules = Self::empty();
        rules.add_rule(
            "real_person",
            &[
                "real person",
                "connect me with a real person",
                "are you a real person",
                "can i speak to a human",
                "talk to someone",
                "talk to a human",
                "real human",
                "are you a bot",
                "is this a human",
            ],
            &[
                format!("You're chatting with a real person! I'm {persona} from the {company} team. How can I help you today?"),
                format!("I'm a real member of the {company} team, here to assist. What can I do for you?"),
                format!("Not a bot, just {persona}! Here to help you."),
            ],
        );
        rules.add_rule(
            "samples",
            &[
                "cover samples",
                "cover examples",
                "sample covers",
                "book cover examples",
                "show me covers",
                "can i see designs",
                "any samples",
                "can i see examples",
                "sample book design",
                "examples of your design",
            ],
            &["We'd be happy to show you! Just drop your email and we'll send over some great examples.".to_string()],
        );
        rules
    }

    /// Create an empty rule set (for testing).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule. Phrases are lower-cased; rules without replies are ignored.
    pub fn add_rule<P: AsRef<str>>(&mut self, name: &str, phrases: &[P], replies: &[String]) {
        if replies.is_empty() {
            return;
        }
        self.rules.push(ShortcutRule {
            name: name.to_string(),
            phrases: phrases
                .iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            replies: replies.to_vec(),
        });
    }

    /// Evaluate a message, picking a reply at random.
    pub fn evaluate(&self, text: &str) -> Option<ShortcutMatch> {
        self.evaluate_with_rng(text, &mut rand::thread_rng())
    }

    /// Evaluate a message with a caller-supplied RNG.
    pub fn evaluate_with_rng<R: Rng + ?Sized>(
        &self,
        text: &str,
        rng: &mut R,
    ) -> Option<ShortcutMatch> {
        let lowered = text.to_lowercase();
        let rule = self
            .rules
            .iter()
            .find(|r| r.phrases.iter().any(|p| lowered.contains(p.as_str())))?;
        let reply = rule.replies.choose(rng)?;
        debug!(rule = %rule.name, "Message matched shortcut rule");
        Some(ShortcutMatch {
            rule: rule.name.clone(),
            reply: reply.clone(),
        })
    }
}
