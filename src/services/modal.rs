use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Message published on the modal bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModalEvent {
    #[serde(rename_all = "camelCase")]
    Open {
        modal_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Close { modal_id: String },
}

impl ModalEvent {
    pub fn modal_id(&self) -> &str {
        match self {
            ModalEvent::Open { modal_id, .. } | ModalEvent::Close { modal_id } => modal_id,
        }
    }
}

/// In-process broadcast channel for modal open/close requests.
///
/// The engine only publishes. Modal hosts call [`ModalBus::subscribe`]; a message
/// published while nobody listens is dropped.
#[derive(Debug, Clone)]
pub struct ModalBus {
    sender: broadcast::Sender<ModalEvent>,
}

impl ModalBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: ModalEvent) {
        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(target: "pageflow::modal", receivers, "Modal event published");
            }
            Err(broadcast::error::SendError(event)) => {
                trace!(
                    target: "pageflow::modal",
                    modal_id = %event.modal_id(),
                    "Modal event dropped; no subscribers"
                );
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModalEvent> {
        self.sender.subscribe()
    }
}

impl Default for ModalBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = ModalBus::default();
        let mut rx = bus.subscribe();
        bus.publish(ModalEvent::Open {
            modal_id: "confirm".into(),
            title: Some("Sure?".into()),
            content: None,
        });
        bus.publish(ModalEvent::Close {
            modal_id: "confirm".into(),
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.modal_id(), "confirm");
        assert!(matches!(first, ModalEvent::Open { .. }));
        assert!(matches!(rx.recv().await.unwrap(), ModalEvent::Close { .. }));
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = ModalBus::new(0);
        bus.publish(ModalEvent::Close {
            modal_id: "x".into(),
        });
    }
}
