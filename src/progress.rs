//! Progress events emitted by the marking engine
//!
//! One-way stream from the engine's worker task to whatever renders it.
//! The consumer drains the channel on its own schedule; a slow or absent
//! consumer can never abort or block the engine.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Events describing a marking run, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The run started: how many amounts are being hunted
    Started {
        total_target: usize,
        distinct_values: usize,
    },
    /// One row was accepted; `index` counts from 1
    Matched {
        index: usize,
        total: usize,
        amount: String,
    },
    /// Human-readable status (stall reached, cancellation observed, ...)
    Info { message: String },
    /// A failure the operator needs to see
    Error { message: String },
    /// Terminal summary; sums are canonical amount strings
    Finished {
        total_target: usize,
        matched_count: usize,
        missing_count: usize,
        matched_sum: String,
        missing_sum: String,
    },
}

/// Sending half of the progress stream.
///
/// Emission is synchronous and infallible from the engine's point of view:
/// if the receiver is gone the event is dropped, never an error.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressSender {
    /// Create a connected sender/receiver pair
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender that drops every event; handy for tests and headless runs
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emit one event, ignoring a disconnected consumer
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn started(&self, total_target: usize, distinct_values: usize) {
        self.emit(ProgressEvent::Started {
            total_target,
            distinct_values,
        });
    }

    pub fn matched(&self, index: usize, total: usize, amount: &str) {
        self.emit(ProgressEvent::Matched {
            index,
            total,
            amount: amount.to_string(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(ProgressEvent::Info {
            message: message.into(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(ProgressEvent::Error {
            message: message.into(),
        });
    }

    pub fn finished(
        &self,
        total_target: usize,
        matched_count: usize,
        missing_count: usize,
        matched_sum: String,
        missing_sum: String,
    ) {
        self.emit(ProgressEvent::Finished {
            total_target,
            matched_count,
            missing_count,
            matched_sum,
            missing_sum,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let (tx, mut rx) = ProgressSender::channel();
        tx.started(3, 2);
        tx.matched(1, 3, "100,00");
        tx.info("halfway");

        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::Started {
                total_target: 3,
                distinct_values: 2
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::Matched {
                index: 1,
                total: 3,
                amount: "100,00".to_string()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::Info {
                message: "halfway".to_string()
            }
        );
    }

    #[test]
    fn dropped_receiver_never_fails_the_sender() {
        let (tx, rx) = ProgressSender::channel();
        drop(rx);
        tx.error("nobody listening");
        tx.finished(0, 0, 0, "0,00".into(), "0,00".into());
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let json = serde_json::to_string(&ProgressEvent::Info {
            message: "oi".into(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"info""#));
    }
}
