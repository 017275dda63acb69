//! Contact-information classifier.
//!
//! Decides whether a single chat message is an email address, a phone number,
//! something that only looks like one, or unrelated text. The checks run in a
//! fixed priority order and the first decisive check wins:
//!
//! 1. non-contact vocabulary (pages, price, age, ...) → `Invalid`
//! 2. a genre word plus any 1-4 digit number anywhere in the message
//!    ("500 page horror") → `Invalid`, even when the number is a phone group
//! 3. an email-shaped substring → `InvalidEmail` / `ValidEmail` / `AmbiguousEmail`
//! 4. the digit run of the message → phone tags, or `Invalid`
//!
//! The classifier never fails once built and holds no mutable state, so one
//! instance can be shared across threads.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::tables::{KeywordCategory, KeywordTables};
use crate::error::ClassifierError;

/// Smallest digit count that can be a phone number.
pub const PHONE_MIN_DIGITS: usize = 10;
/// Largest digit count that can be a phone number.
pub const PHONE_MAX_DIGITS: usize = 15;
/// Below this many digits a number is never treated as a phone attempt.
pub const PHONE_ATTEMPT_MIN_DIGITS: usize = 7;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}").unwrap());

static YEAR_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

static SHORT_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{1,4}\b").unwrap());

/// Outcome of classifying one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult {
    /// Email with declared intent; the address as it appeared in the input.
    ValidEmail(String),
    /// Email-shaped but malformed or a placeholder address.
    InvalidEmail,
    /// Email-shaped with no declared intent; caller should confirm.
    AmbiguousEmail(String),
    /// Phone number with declared intent; digits only, with an optional leading `+`.
    ValidPhone(String),
    /// Digits that look like an incomplete phone attempt.
    InvalidPhone,
    /// Phone-shaped with no declared intent; the trimmed input.
    AmbiguousPhone(String),
    /// Not contact information.
    Invalid,
}

impl ClassificationResult {
    /// Short machine tag, for logs only.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ValidEmail(_) => "valid_email",
            Self::InvalidEmail => "invalid_email",
            Self::AmbiguousEmail(_) => "ambiguous_email",
            Self::ValidPhone(_) => "valid_phone",
            Self::InvalidPhone => "invalid_phone",
            Self::AmbiguousPhone(_) => "ambiguous_phone",
            Self::Invalid => "invalid",
        }
    }

    /// Whether the message should be handled as contact info at all.
    pub fn is_contact(&self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// Classifies free text as contact information using injected keyword tables.
#[derive(Debug, Clone)]
pub struct ContactInfoClassifier {
    tables: KeywordTables,
    non_contact: Option<Regex>,
    genre: Option<Regex>,
}

impl ContactInfoClassifier {
    /// Build a classifier over `tables`.
    pub fn new(tables: KeywordTables) -> Result<Self, ClassifierError> {
        let non_contact = word_pattern(&tables, KeywordCategory::NonContact)?;
        let genre = word_pattern(&tables, KeywordCategory::Genre)?;
        Ok(Self {
            tables,
            non_contact,
            genre,
        })
    }

    /// Build a classifier over the built-in tables.
    pub fn with_builtin_tables() -> Result<Self, ClassifierError> {
        Self::new(KeywordTables::builtin())
    }

    pub fn tables(&self) -> &KeywordTables {
        &self.tables
    }

    /// Classify one message.
    ///
    /// Keyword checks run on the trimmed, lower-cased text. Extracted emails
    /// keep the casing of `text`.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let original = text.trim();
        let lowered = original.to_lowercase();

        let result = self.classify_inner(original, &lowered);
        debug!(
            tag = result.tag(),
            tables_version = self.tables.version(),
            "Classified message"
        );
        result
    }

    fn classify_inner(&self, original: &str, lowered: &str) -> ClassificationResult {
        if self.non_contact.as_ref().is_some_and(|re| re.is_match(lowered)) {
            return ClassificationResult::Invalid;
        }

        if self.genre.as_ref().is_some_and(|re| re.is_match(lowered))
            && SHORT_NUMBER.is_match(lowered)
        {
            return ClassificationResult::Invalid;
        }

        if let Some(found) = EMAIL.find(original) {
            return self.classify_email(original, lowered, found);
        }

        self.classify_phone(original, lowered)
    }

    fn classify_email(
        &self,
        original: &str,
        lowered: &str,
        found: regex::Match<'_>,
    ) -> ClassificationResult {
        let address = found.as_str();

        let trailing = original[found.end()..].trim();
        if trailing == "@" || trailing == "." {
            return ClassificationResult::InvalidEmail;
        }

        let local_part = address
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        let banned = self
            .tables
            .get(KeywordCategory::BannedEmailFragment)
            .iter()
            .any(|fragment| local_part.contains(fragment.as_str()));
        if banned {
            return ClassificationResult::InvalidEmail;
        }

        if self
            .tables
            .contains_phrase(KeywordCategory::EmailIntent, lowered)
        {
            ClassificationResult::ValidEmail(address.to_string())
        } else {
            ClassificationResult::AmbiguousEmail(address.to_string())
        }
    }

    fn classify_phone(&self, original: &str, lowered: &str) -> ClassificationResult {
        let digits: String = original.chars().filter(char::is_ascii_digit).collect();
        let count = digits.len();
        let has_intent = self
            .tables
            .contains_phrase(KeywordCategory::PhoneIntent, lowered);

        if (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&count) {
            if YEAR_TOKEN.is_match(lowered) && !has_intent {
                return ClassificationResult::Invalid;
            }
            if has_intent {
                return ClassificationResult::ValidPhone(normalize_phone(original));
            }
            return ClassificationResult::AmbiguousPhone(original.to_string());
        }

        if count < PHONE_ATTEMPT_MIN_DIGITS {
            return ClassificationResult::Invalid;
        }

        if self
            .tables
            .contains_phrase(KeywordCategory::NarrativeClue, lowered)
        {
            return ClassificationResult::Invalid;
        }

        ClassificationResult::InvalidPhone
    }
}

/// Reduce a phone number to its digits, keeping a `+` that leads the number.
pub fn normalize_phone(text: &str) -> String {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if has_leading_plus(text) {
        format!("+{digits}")
    } else {
        digits
    }
}

fn has_leading_plus(text: &str) -> bool {
    let Some(first_digit) = text.find(|c: char| c.is_ascii_digit()) else {
        return false;
    };
    text[..first_digit]
        .trim_end_matches(|c: char| c == '(' || c.is_whitespace())
        .ends_with('+')
}

/// Compile an alternation over one category that only matches whole words,
/// or `None` if the category is empty.
///
/// `\b` is not used because entries may start or end with non-word
/// characters ("c++", "sci-fi").
fn word_pattern(
    tables: &KeywordTables,
    category: KeywordCategory,
) -> Result<Option<Regex>, ClassifierError> {
    let words = tables.get(category);
    if words.is_empty() {
        return Ok(None);
    }
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?:^|\W)(?:{alternation})(?:\W|$)"))
        .map(Some)
        .map_err(|source| ClassifierError::Pattern {
            category: category.to_string(),
            source,
        })
}
