//! Console speech backend: stdin lines in, stdout lines out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, warn};

use crate::config::SpeechConfig;
use crate::error::SpeechError;
use crate::speech::{SpeechInput, SpeechOutput};

/// Reads "utterances" from stdin and "speaks" to stdout.
pub struct ConsoleSpeech {
    lines: Mutex<mpsc::UnboundedReceiver<String>>,
    listen_timeout: Duration,
    closed: AtomicBool,
}

impl ConsoleSpeech {
    /// Spawn the stdin reader. Must be called inside a tokio runtime.
    pub fn new(config: &SpeechConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        error!("Error reading stdin: {}", SpeechError::Io(e));
                        break;
                    }
                }
            }
        });

        Self::from_receiver(rx, config.listen_timeout)
    }

    /// Build on an existing line source instead of stdin.
    pub fn from_receiver(lines: mpsc::UnboundedReceiver<String>, listen_timeout: Duration) -> Self {
        Self {
            lines: Mutex::new(lines),
            listen_timeout,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SpeechInput for ConsoleSpeech {
    async fn listen(&self) -> Option<String> {
        let received = {
            let mut lines = self.lines.lock().await;
            tokio::time::timeout(self.listen_timeout, lines.recv()).await
        };
        match received {
            Ok(Some(text)) => {
                debug!(text = %text, "Heard");
                Some(text)
            }
            Ok(None) => {
                if !self.closed.swap(true, Ordering::SeqCst) {
                    warn!("{}", SpeechError::InputClosed);
                }
                // Pace callers that keep polling a closed input.
                tokio::time::sleep(self.listen_timeout).await;
                None
            }
            Err(_) => {
                debug!("Listen timed out");
                None
            }
        }
    }

    async fn detect_wake_word(&self, phrase: &str) -> bool {
        let phrase = phrase.to_lowercase();
        self.listen()
            .await
            .is_some_and(|text| text.to_lowercase().contains(&phrase))
    }
}

#[async_trait]
impl SpeechOutput for ConsoleSpeech {
    async fn speak(&self, text: &str) -> bool {
        println!("Assistant: {}", text);
        true
    }
}
