//! Live document channel: at most one WebSocket binding per session.
//!
//! ## Design
//! - The manager owns at most one binding, addressed to exactly one file;
//!   binding a different file closes the old channel first.
//! - Every binding carries a generation number. Inbound bodies are tagged
//!   with it and the session drops anything whose generation is no longer
//!   current, so a receive after close is a guaranteed no-op even when a
//!   frame was already queued.
//! - Outbound sends push the full document body onto an unbounded queue
//!   drained by a writer task. No diffing, no envelope, no acknowledgment.
//! - Transport errors are logged and end the binding's tasks; the channel
//!   stays closed until the next explicit bind.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use crate::api::FileId;
use crate::config::Config;

/// A full-document body received from the bound channel, tagged with the
/// generation of the binding it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUpdate {
    pub generation: u64,
    pub content: String,
}

/// Generate a random per-session display identity.
///
/// Uniqueness is cosmetic — a collision only affects how the participant is
/// listed, never message routing.
pub fn generate_identity() -> String {
    use rand::Rng;
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect();
    format!("user-{}", suffix)
}

struct Binding {
    file_id: FileId,
    generation: u64,
    outbound_tx: mpsc::UnboundedSender<String>,
    tasks: Vec<JoinHandle<()>>,
}

/// Owns the session's single live channel.
pub struct ChannelManager {
    active: Option<Binding>,
    next_generation: u64,
    inbound_tx: mpsc::UnboundedSender<RemoteUpdate>,
    identity: String,
}

impl ChannelManager {
    /// `inbound_tx` receives every remote body, tagged with its binding
    /// generation; the session decides whether the tag is still current.
    pub fn new(inbound_tx: mpsc::UnboundedSender<RemoteUpdate>) -> Self {
        ChannelManager {
            active: None,
            next_generation: 0,
            inbound_tx,
            identity: generate_identity(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_bound(&self) -> bool {
        self.active.is_some()
    }

    pub fn bound_file(&self) -> Option<FileId> {
        self.active.as_ref().map(|b| b.file_id)
    }

    pub fn current_generation(&self) -> Option<u64> {
        self.active.as_ref().map(|b| b.generation)
    }

    /// Whether updates tagged with `generation` belong to the live binding.
    pub fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == Some(generation)
    }

    fn fresh_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Bind the channel to a file over the configured WebSocket origin.
    ///
    /// A bind for the already-bound file is a no-op — no second channel is
    /// opened. Connect failures are logged and leave the channel unbound;
    /// editing continues locally and the next bind attempt starts fresh.
    pub async fn bind(&mut self, config: &Config, file_id: FileId) {
        if self.bound_file() == Some(file_id) {
            debug!(file = file_id, "bind requested for the already-bound file");
            return;
        }
        self.close();

        let url = config.channel_url(file_id, &self.identity);
        let ws = match connect_async(url.as_str()).await {
            Ok((ws, _resp)) => ws,
            Err(e) => {
                warn!(url = %url, error = %e, "channel connect failed");
                return;
            }
        };

        let generation = self.fresh_generation();
        let (mut sink, mut stream) = ws.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

        let writer = tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    warn!(error = %e, "channel send failed");
                    break;
                }
            }
        });

        let inbound_tx = self.inbound_tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        let update = RemoteUpdate { generation, content: text };
                        if inbound_tx.send(update).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {} // ignore binary / ping / pong frames
                    Err(e) => {
                        warn!(error = %e, "channel transport error");
                        break;
                    }
                }
            }
        });

        debug!(file = file_id, generation, "channel bound");
        self.active = Some(Binding {
            file_id,
            generation,
            outbound_tx,
            tasks: vec![writer, reader],
        });
    }

    /// Bind without a transport, returning the receiver end of the outbound
    /// queue. Used by the offline client mode and by in-process relays.
    /// Returns `None` when the file is already bound.
    pub fn bind_offline(&mut self, file_id: FileId) -> Option<mpsc::UnboundedReceiver<String>> {
        if self.bound_file() == Some(file_id) {
            debug!(file = file_id, "bind requested for the already-bound file");
            return None;
        }
        self.close();
        let generation = self.fresh_generation();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        debug!(file = file_id, generation, "channel bound (offline)");
        self.active = Some(Binding {
            file_id,
            generation,
            outbound_tx,
            tasks: Vec::new(),
        });
        Some(outbound_rx)
    }

    /// Close the live binding, if any. Late frames from the old channel are
    /// discarded: its tasks are aborted and its generation goes stale.
    pub fn close(&mut self) {
        if let Some(binding) = self.active.take() {
            for task in &binding.tasks {
                task.abort();
            }
            debug!(file = binding.file_id, generation = binding.generation, "channel closed");
        }
    }

    /// Transmit the full current document body over the bound channel.
    pub fn send(&self, content: &str) {
        match &self.active {
            Some(binding) => {
                let _ = binding.outbound_tx.send(content.to_string());
            }
            None => debug!("send with no bound channel, dropped"),
        }
    }
}
