//! CLI channel: stdin/stdout chat loop.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
use crate::error::ChannelError;

/// Replies longer than this do not slow the typing down any further.
const TYPING_LENGTH_CAP: usize = 500;

/// Per-character delay for the typing effect: 15 ms plus 0.2 ms per character
/// of the whole reply, up to the cap.
pub fn typing_delay(reply_len: usize) -> Duration {
    let capped = reply_len.min(TYPING_LENGTH_CAP) as f64;
    Duration::from_secs_f64(0.015 + capped / 5000.0)
}

/// Reads lines from stdin and prints replies to stdout.
pub struct CliChannel {
    typing_effect: bool,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            typing_effect: false,
        }
    }

    /// Print replies one character at a time.
    pub fn with_typing_effect(mut self, enabled: bool) -> Self {
        self.typing_effect = enabled;
        self
    }

    async fn type_out(&self, text: &str) -> Result<(), ChannelError> {
        let delay = typing_delay(text.chars().count());
        let mut stdout = tokio::io::stdout();
        let mut buf = [0u8; 4];
        for c in text.chars() {
            stdout
                .write_all(c.encode_utf8(&mut buf).as_bytes())
                .await
                .map_err(send_failed)?;
            stdout.flush().await.map_err(send_failed)?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn send_failed(e: std::io::Error) -> ChannelError {
    ChannelError::SendFailed {
        name: "cli".into(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let reader = BufReader::new(tokio::io::stdin());
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        if line == "/quit" || line == "/exit" {
                            break;
                        }
                        let msg = IncomingMessage::new("cli", "local-user", line);
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Error reading stdin");
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        if self.typing_effect {
            println!();
            self.type_out(&response.content).await?;
            println!("\n");
        } else {
            println!("\n{}\n", response.content);
        }
        eprint!("> ");
        Ok(())
    }

    async fn send_status(&self, status: StatusUpdate) -> Result<(), ChannelError> {
        match status {
            StatusUpdate::Thinking(msg) => eprintln!("… {msg}"),
        }
        Ok(())
    }
}
