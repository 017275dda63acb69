//! Contact-information detection.
//!
//! `tables` holds the keyword data, `classifier` the rule engine that turns a
//! message into a [`ClassificationResult`].

pub mod classifier;
pub mod tables;

pub use classifier::{ClassificationResult, ContactInfoClassifier, normalize_phone};
pub use tables::{KeywordCategory, KeywordTables};
