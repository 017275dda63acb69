//! Folio Assist: publishing support chat with contact capture.

pub mod channels;
pub mod chat;
pub mod config;
pub mod contact;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod transcript;
