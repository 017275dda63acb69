//! Keyword tables that drive contact classification.
//!
//! Tables are plain data: a version number and a set of lower-cased strings
//! per [`KeywordCategory`]. The built-in set ships with the crate; deployments
//! can replace it with a JSON file of the same shape:
//!
//! ```json
//! { "version": 3, "tables": { "non_contact": ["pages", "price"], "email_intent": ["my email is"] } }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Version of the built-in tables. Bump when the default lists change.
pub const BUILTIN_VERSION: u32 = 2;

static EMPTY: BTreeSet<String> = BTreeSet::new();

/// The categories a keyword can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    /// Vocabulary that marks a number as a page count, price, date, etc.
    NonContact,
    /// Book genres; together with a short number they describe a project.
    Genre,
    /// Placeholder fragments that disqualify an email local-part.
    BannedEmailFragment,
    /// Phrases declaring that an email address follows.
    EmailIntent,
    /// Phrases declaring that a phone number follows.
    PhoneIntent,
    /// Phrases that put a number in a life-event or time context.
    NarrativeClue,
}

impl KeywordCategory {
    pub const ALL: [KeywordCategory; 6] = [
        Self::NonContact,
        Self::Genre,
        Self::BannedEmailFragment,
        Self::EmailIntent,
        Self::PhoneIntent,
        Self::NarrativeClue,
    ];
}

impl std::fmt::Display for KeywordCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NonContact => "non_contact",
            Self::Genre => "genre",
            Self::BannedEmailFragment => "banned_email_fragment",
            Self::EmailIntent => "email_intent",
            Self::PhoneIntent => "phone_intent",
            Self::NarrativeClue => "narrative_clue",
        };
        write!(f, "{s}")
    }
}

/// Versioned keyword tables, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawKeywordTables")]
pub struct KeywordTables {
    version: u32,
    tables: BTreeMap<KeywordCategory, BTreeSet<String>>,
}

/// On-disk shape before normalization.
#[derive(Deserialize)]
struct RawKeywordTables {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    tables: BTreeMap<KeywordCategory, Vec<String>>,
}

impl From<RawKeywordTables> for KeywordTables {
    fn from(raw: RawKeywordTables) -> Self {
        let mut tables = KeywordTables::empty(raw.version);
        for (category, entries) in raw.tables {
            tables = tables.with(category, entries);
        }
        tables
    }
}

impl KeywordTables {
    /// Tables with no entries in any category.
    pub fn empty(version: u32) -> Self {
        Self {
            version,
            tables: BTreeMap::new(),
        }
    }

    /// The tables shipped with the crate.
    pub fn builtin() -> Self {
        Self::empty(BUILTIN_VERSION)
            .with(
                KeywordCategory::NonContact,
                [
                    "pages",
                    "page",
                    "words",
                    "copies",
                    "price",
                    "cost",
                    "lines",
                    "chapters",
                    "years",
                    "months",
                    "age",
                    "deadline",
                    "characters",
                    "illustrations",
                    "budget",
                    "dollars",
                    "date",
                    "isbn",
                ],
            )
            .with(
                KeywordCategory::Genre,
                [
                    "horror",
                    "romance",
                    "fantasy",
                    "thriller",
                    "mystery",
                    "memoir",
                    "novel",
                    "novella",
                    "poetry",
                    "sci-fi",
                    "fiction",
                    "nonfiction",
                    "biography",
                    "cookbook",
                ],
            )
            .with(
                KeywordCategory::BannedEmailFragment,
                ["example", "test", "sample", "demo", "domain", "fake"],
            )
            .with(
                KeywordCategory::EmailIntent,
                [
                    "my email is",
                    "my email address is",
                    "email me at",
                    "reach me at",
                    "contact me at",
                    "here's my email",
                    "here is my email",
                    "email:",
                ],
            )
            .with(
                KeywordCategory::PhoneIntent,
                [
                    "my phone is",
                    "my phone number is",
                    "my number is",
                    "here's my number",
                    "here is my number",
                    "call me at",
                    "text me at",
                    "reach me on",
                    "contact number",
                    "phone:",
                ],
            )
            .with(
                KeywordCategory::NarrativeClue,
                [
                    "since",
                    "years old",
                    "at the age of",
                    "back in",
                    "when i was",
                    "born in",
                    "in the year",
                    "ago",
                ],
            )
    }

    /// Parse tables from JSON.
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read tables from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ClassifierError> {
        let json = std::fs::read_to_string(path).map_err(|source| ClassifierError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Return a copy with `entries` added to `category`.
    ///
    /// Entries are trimmed and lower-cased; blank entries are dropped.
    pub fn with<I, S>(mut self, category: KeywordCategory, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = self.tables.entry(category).or_default();
        for entry in entries {
            let entry = entry.as_ref().trim().to_lowercase();
            if !entry.is_empty() {
                set.insert(entry);
            }
        }
        self
    }

    /// Return a copy with `category` emptied.
    pub fn without(mut self, category: KeywordCategory) -> Self {
        self.tables.remove(&category);
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Entries of one category (empty if the category is absent).
    pub fn get(&self, category: KeywordCategory) -> &BTreeSet<String> {
        self.tables.get(&category).unwrap_or(&EMPTY)
    }

    /// Whether any phrase of `category` occurs as a substring of `lowered`.
    pub fn contains_phrase(&self, category: KeywordCategory, lowered: &str) -> bool {
        self.get(category)
            .iter()
            .any(|phrase| lowered.contains(phrase.as_str()))
    }
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self::builtin()
    }
}
