use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use folio_assist::channels::{Channel, CliChannel, OutgoingResponse};
use folio_assist::chat::{ChatAgent, ChatSession};
use folio_assist::config::AppConfig;
use folio_assist::contact::{ContactInfoClassifier, KeywordTables};
use folio_assist::knowledge::{GeminiEmbedder, InMemoryKnowledgeBase, KnowledgeBase, Retriever};
use folio_assist::llm::create_provider;
use folio_assist::transcript::TranscriptLog;

const ERROR_REPLY: &str = "Sorry, something went wrong on my side. Could you try that again?";

/// Stderr logging, plus a daily rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter).with(stderr);

    match log_dir {
        Some(dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "folio-assist.log"));
            registry
                .with(fmt::layer().with_target(false).with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    let llm = create_provider(&config.llm).context("failed to create LLM provider")?;

    let tables = match &config.agent.keywords_path {
        Some(path) => KeywordTables::from_path(path)
            .with_context(|| format!("failed to load keyword tables from {}", path.display()))?,
        None => KeywordTables::builtin(),
    };
    let tables_version = tables.version();
    let classifier = Arc::new(ContactInfoClassifier::new(tables)?);

    let knowledge = InMemoryKnowledgeBase::load_or_empty(&config.agent.knowledge_path)
        .await
        .context("failed to load knowledge base")?;

    eprintln!("📚 Folio Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Persona: {} ({})", config.agent.persona.name, config.agent.persona.company);
    eprintln!("   Model: {}", llm.model_name());
    eprintln!("   Keyword tables: v{tables_version}");
    eprintln!(
        "   Knowledge: {} chunks from {}",
        knowledge.len(),
        config.agent.knowledge_path.display()
    );
    eprintln!("   Transcript: {}", config.agent.transcript_path.display());

    let channel = Arc::new(CliChannel::new().with_typing_effect(config.agent.typing_effect));
    let (status_tx, mut status_rx) = tokio::sync::mpsc::unbounded_channel();
    {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move {
            while let Some(status) = status_rx.recv().await {
                if let Err(e) = channel.send_status(status).await {
                    tracing::warn!(error = %e, "Failed to show status");
                }
            }
        });
    }

    let mut agent = ChatAgent::new(llm, classifier, config.agent.clone())
        .with_transcript(TranscriptLog::new(&config.agent.transcript_path))
        .with_status_updates(status_tx);

    match config.embedding_api_key.clone() {
        Some(key) if !knowledge.is_empty() => {
            let embedder = Arc::new(GeminiEmbedder::new(key, &config.embedding_model));
            let retriever = Retriever::new(embedder, Arc::new(knowledge))
                .with_top_k(config.agent.retrieval_top_k);
            agent = agent.with_retriever(retriever);
            eprintln!("   Retrieval: {} (top {})", config.embedding_model, config.agent.retrieval_top_k);
        }
        _ => eprintln!("   Retrieval: disabled"),
    }
    eprintln!("   Channel: {}", channel.name());
    eprintln!("   Type a message and press Enter. /reset clears the chat, /quit exits.\n");

    let mut messages = channel.start().await?;
    let mut sessions: HashMap<String, ChatSession> = HashMap::new();

    while let Some(message) = messages.next().await {
        let session = sessions.entry(message.user_id.clone()).or_default();
        match agent.handle_message(session, &message.content).await {
            Ok(Some(reply)) => {
                channel
                    .respond(&message, OutgoingResponse::text(reply.content))
                    .await?;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    channel = %message.channel,
                    session = %session.id(),
                    "Failed to handle message"
                );
                channel
                    .respond(&message, OutgoingResponse::text(ERROR_REPLY))
                    .await?;
            }
        }
    }

    channel.shutdown().await?;
    Ok(())
}
