//! Wire format and channel between a sandbox context and the host.
//!
//! Every message crosses the boundary as JSON text. The host only accepts
//! payloads that carry `"marker": true`; anything else on the channel is
//! dropped, so a context cannot forge messages of another shape.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vx_types::console::{ConsoleLine, LogKind};

/// One console event from the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxMessage {
    pub marker: bool,
    pub kind: LogKind,
    pub text: String,
}

/// Shape used for decoding: the marker may be absent on foreign payloads.
#[derive(Deserialize)]
struct Incoming {
    marker: Option<bool>,
    kind: LogKind,
    text: String,
}

impl SandboxMessage {
    pub fn new(kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            marker: true,
            kind,
            text: text.into(),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing a struct of plain fields cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode a payload, rejecting it unless `marker` is present and `true`.
    pub fn decode(payload: &str) -> Option<Self> {
        let incoming: Incoming = match serde_json::from_str(payload) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Dropping malformed sandbox payload: {e}");
                return None;
            },
        };
        if incoming.marker != Some(true) {
            log::debug!("Dropping sandbox payload without marker");
            return None;
        }
        Some(Self {
            marker: true,
            kind: incoming.kind,
            text: incoming.text,
        })
    }

    pub fn into_line(self) -> ConsoleLine {
        ConsoleLine {
            kind: self.kind,
            text: self.text,
        }
    }
}

/// Create the one-directional channel. The host keeps the [`Inbox`] for the
/// whole session; every context gets a clone of the [`Outbox`].
pub fn channel() -> (Outbox, Inbox) {
    let (tx, rx) = mpsc::channel();
    (Outbox { tx }, Inbox { rx })
}

/// Sending half, owned by sandbox contexts.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: Sender<String>,
}

impl Outbox {
    /// Post a console event. Returns `false` once the host is gone.
    pub fn post(&self, kind: LogKind, text: impl Into<String>) -> bool {
        self.post_raw(SandboxMessage::new(kind, text).encode())
    }

    /// Post an arbitrary payload; the inbox validates it.
    pub fn post_raw(&self, payload: String) -> bool {
        self.tx.send(payload).is_ok()
    }
}

/// Receiving half, owned by the host.
#[derive(Debug)]
pub struct Inbox {
    rx: Receiver<String>,
}

impl Inbox {
    /// Next valid message without blocking.
    pub fn try_next(&self) -> Option<SandboxMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(payload) => {
                    if let Some(msg) = SandboxMessage::decode(&payload) {
                        return Some(msg);
                    }
                },
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Every valid message currently queued, in arrival order.
    pub fn drain(&self) -> Vec<SandboxMessage> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Block up to `timeout` for the next valid message.
    pub fn next_timeout(&self, timeout: Duration) -> Option<SandboxMessage> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(payload) => {
                    if let Some(msg) = SandboxMessage::decode(&payload) {
                        return Some(msg);
                    }
                },
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape() {
        let msg = SandboxMessage::new(LogKind::Error, "boom");
        assert_eq!(
            msg.encode(),
            r#"{"marker":true,"kind":"error","text":"boom"}"#
        );
    }

    #[test]
    fn decode_requires_marker() {
        assert!(SandboxMessage::decode(r#"{"kind":"log","text":"x"}"#).is_none());
        assert!(SandboxMessage::decode(r#"{"marker":false,"kind":"log","text":"x"}"#).is_none());
        assert!(SandboxMessage::decode("not json").is_none());
        let ok = SandboxMessage::decode(r#"{"marker":true,"kind":"log","text":"x"}"#).unwrap();
        assert_eq!(ok.kind, LogKind::Log);
        assert_eq!(ok.text, "x");
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        assert!(SandboxMessage::decode(r#"{"marker":true,"kind":"warn","text":"x"}"#).is_none());
    }

    #[test]
    fn inbox_skips_invalid_payloads() {
        let (outbox, inbox) = channel();
        outbox.post_raw(r#"{"kind":"log","text":"forged"}"#.to_string());
        outbox.post(LogKind::Log, "a");
        outbox.post_raw("garbage".to_string());
        outbox.post(LogKind::Error, "b");
        let texts: Vec<_> = inbox.drain().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, ["a", "b"]);
        assert!(inbox.try_next().is_none());
    }

    #[test]
    fn next_timeout_expires() {
        let (_outbox, inbox) = channel();
        assert!(inbox.next_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn into_line_keeps_kind() {
        let line = SandboxMessage::new(LogKind::Error, "e").into_line();
        assert_eq!(line, ConsoleLine::error("e"));
    }
}
