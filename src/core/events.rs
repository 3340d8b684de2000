// ─── Events ───
// Status and log output flows through an injected sink so the engine never
// depends on a particular front-end.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

pub const STATUS_CHANNEL: &str = "update-status";
pub const LOG_CHANNEL: &str = "log-data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "channel", content = "payload")]
pub enum LauncherEvent {
    #[serde(rename = "update-status")]
    Status(String),
    #[serde(rename = "log-data")]
    Log(String),
}

impl LauncherEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            LauncherEvent::Status(_) => STATUS_CHANNEL,
            LauncherEvent::Log(_) => LOG_CHANNEL,
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            LauncherEvent::Status(s) | LauncherEvent::Log(s) => s,
        }
    }
}

/// Receiver of engine events. Emission must never block or fail the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LauncherEvent);

    fn status(&self, message: &str) {
        self.emit(LauncherEvent::Status(message.to_string()));
    }

    fn log(&self, message: &str) {
        self.emit(LauncherEvent::Log(message.to_string()));
    }
}

pub type SharedSink = Arc<dyn EventSink>;

/// Forwards events over an unbounded channel to whichever task renders them.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LauncherEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LauncherEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: LauncherEvent) {
        // Receiver gone means the front-end shut down; nothing left to notify.
        let _ = self.tx.send(event);
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: LauncherEvent) {}
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.status("Checking Java...");
        sink.log("hello");

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.channel(), STATUS_CHANNEL);
        assert_eq!(first.payload(), "Checking Java...");
        assert_eq!(second, LauncherEvent::Log("hello".into()));
    }

    #[test]
    fn closed_channel_does_not_panic() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.status("nobody listening");
    }

    #[test]
    fn events_serialize_with_channel_name() {
        let json = serde_json::to_value(LauncherEvent::Log("x".into())).unwrap();
        assert_eq!(json["channel"], "log-data");
        assert_eq!(json["payload"], "x");
    }
}
