//! Bridges a chat panel and the [`AiClient`].
//!
//! Every `askAI` envelope is answered on its own task, so several questions
//! can be in flight at once and their answers are posted in completion
//! order, not submission order. The `id` a panel attaches to a question is
//! echoed on the answer for correlation.

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ai::{AiClient, NOT_LOADED};
use crate::protocol::{InboundMessage, OutboundMessage};

/// The host side of a chat panel: where the relay posts its envelopes.
pub trait Panel: Send + Sync {
    fn post_message(&self, message: Value) -> Result<()>;
}

impl Panel for mpsc::UnboundedSender<Value> {
    fn post_message(&self, message: Value) -> Result<()> {
        self.send(message).map_err(|_| anyhow!("chat panel is closed"))
    }
}

pub struct Relay {
    client: Option<AiClient>,
    panel: Arc<dyn Panel>,
    session: CancellationToken,
}

impl Relay {
    pub fn new(client: AiClient, panel: Arc<dyn Panel>) -> Self {
        Self {
            client: Some(client),
            panel,
            session: CancellationToken::new(),
        }
    }

    /// A relay with no usable client. Every question gets [`NOT_LOADED`]
    /// and nothing is sent over the network.
    pub fn unavailable(panel: Arc<dyn Panel>, reason: &str) -> Self {
        warn!("Chat relay started without an AI client: {}", reason);
        Self {
            client: None,
            panel,
            session: CancellationToken::new(),
        }
    }

    /// Token that ends this panel session.
    pub fn session(&self) -> CancellationToken {
        self.session.clone()
    }

    /// Cancel every in-flight request. Cancelled requests post nothing.
    pub fn shutdown(&self) {
        if !self.session.is_cancelled() {
            info!("Chat session closed");
            self.session.cancel();
        }
    }

    /// Dispatch one envelope from the panel.
    ///
    /// Returns the handle of the spawned request, or `None` when the
    /// envelope was ignored.
    pub fn handle_inbound(&self, message: Value) -> Option<JoinHandle<()>> {
        if self.session.is_cancelled() {
            debug!("Ignoring message for a closed chat session");
            return None;
        }

        let OutboundMessage::AskAi { text, id } = OutboundMessage::from_value(&message)?;
        if text.trim().is_empty() {
            debug!("Ignoring blank question");
            return None;
        }

        let client = self.client.clone();
        let panel = Arc::clone(&self.panel);
        let session = self.session.clone();

        Some(tokio::spawn(async move {
            let answer = match client {
                Some(client) => match client.ask_cancellable(&text, &session).await {
                    Some(answer) => answer,
                    None => return,
                },
                None => NOT_LOADED.to_string(),
            };

            let reply = InboundMessage::response(answer, id);
            if let Err(e) = panel.post_message(reply.to_value()) {
                warn!("Dropping response {:?}: {}", id, e);
            }
        }))
    }

    /// Consume panel messages until the panel goes away or the session is
    /// shut down. Pending requests are cancelled on the way out.
    pub async fn run(self, mut inbound: mpsc::UnboundedReceiver<Value>) {
        loop {
            tokio::select! {
                _ = self.session.cancelled() => break,
                message = inbound.recv() => match message {
                    Some(message) => {
                        self.handle_inbound(message);
                    }
                    None => break,
                },
            }
        }
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::tests::FakeBackend;
    use crate::error::AiError;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn relay_with<F>(backend: Arc<FakeBackend<F>>) -> (Relay, mpsc::UnboundedReceiver<Value>)
    where
        F: Fn(&str) -> Result<String, AiError> + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = AiClient::new(backend, Duration::from_secs(5));
        (Relay::new(client, Arc::new(tx)), rx)
    }

    fn echo() -> Arc<FakeBackend<impl Fn(&str) -> Result<String, AiError> + Send + Sync>> {
        Arc::new(FakeBackend::new(|p: &str| Ok(format!("answer to {}", p))))
    }

    #[tokio::test]
    async fn test_single_question_yields_single_response() {
        let (relay, mut rx) = relay_with(echo());

        relay
            .handle_inbound(json!({"command": "askAI", "text": "hello"}))
            .unwrap()
            .await
            .unwrap();

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply, json!({"command": "aiResponse", "text": "answer to hello"}));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_two_questions_each_get_their_own_answer() {
        let (relay, mut rx) = relay_with(echo());

        let a = relay.handle_inbound(json!({"command": "askAI", "text": "a", "id": 1})).unwrap();
        let b = relay.handle_inbound(json!({"command": "askAI", "text": "b", "id": 2})).unwrap();
        a.await.unwrap();
        b.await.unwrap();

        let mut replies = vec![
            InboundMessage::from_value(&rx.recv().await.unwrap()).unwrap(),
            InboundMessage::from_value(&rx.recv().await.unwrap()).unwrap(),
        ];
        replies.sort_by_key(|r| r.id());

        assert_eq!(replies[0], InboundMessage::response("answer to a", Some(1)));
        assert_eq!(replies[1], InboundMessage::response("answer to b", Some(2)));
    }

    #[tokio::test]
    async fn test_answers_arrive_in_completion_order() {
        let backend = Arc::new(FakeBackend::new(|p: &str| Ok(p.to_string())));
        let slow = Arc::new(
            FakeBackend::new(|p: &str| Ok(p.to_string())).with_delay(Duration::from_millis(200)),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let panel: Arc<dyn Panel> = Arc::new(tx);
        let slow_relay = Relay::new(AiClient::new(slow, Duration::from_secs(5)), Arc::clone(&panel));
        let fast_relay = Relay::new(AiClient::new(backend, Duration::from_secs(5)), panel);

        let first = slow_relay.handle_inbound(json!({"command": "askAI", "text": "first"})).unwrap();
        let second = fast_relay.handle_inbound(json!({"command": "askAI", "text": "second"})).unwrap();
        first.await.unwrap();
        second.await.unwrap();

        let texts: Vec<String> = [rx.recv().await.unwrap(), rx.recv().await.unwrap()]
            .iter()
            .map(|v| InboundMessage::from_value(v).unwrap().text().to_string())
            .collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_unrecognized_envelopes_are_ignored() {
        let backend = echo();
        let (relay, mut rx) = relay_with(Arc::clone(&backend));

        assert!(relay.handle_inbound(json!({"command": "hello", "text": "x"})).is_none());
        assert!(relay.handle_inbound(json!("askAI")).is_none());
        assert!(relay.handle_inbound(json!({"command": "askAI", "text": "   "})).is_none());

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unavailable_relay_answers_not_loaded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let relay = Relay::unavailable(Arc::new(tx), "no API key configured");

        relay
            .handle_inbound(json!({"command": "askAI", "text": "hello", "id": 4}))
            .unwrap()
            .await
            .unwrap();

        let reply = InboundMessage::from_value(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(reply, InboundMessage::response(NOT_LOADED, Some(4)));
    }

    #[tokio::test]
    async fn test_shutdown_suppresses_pending_answers() {
        let slow = Arc::new(
            FakeBackend::new(|p: &str| Ok(p.to_string())).with_delay(Duration::from_secs(10)),
        );
        let (relay, mut rx) = relay_with(slow);

        let pending = relay.handle_inbound(json!({"command": "askAI", "text": "hello"})).unwrap();
        relay.shutdown();
        pending.await.unwrap();

        assert!(rx.try_recv().is_err());
        assert!(relay.handle_inbound(json!({"command": "askAI", "text": "again"})).is_none());
    }

    #[tokio::test]
    async fn test_closed_panel_does_not_panic() {
        let (relay, rx) = relay_with(echo());
        drop(rx);

        relay
            .handle_inbound(json!({"command": "askAI", "text": "hello"}))
            .unwrap()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_when_panel_closes() {
        let (relay, mut replies) = relay_with(echo());
        let session = relay.session();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(json!({"command": "askAI", "text": "hello"})).unwrap();
        let runner = tokio::spawn(relay.run(rx));

        let reply = replies.recv().await.unwrap();
        assert_eq!(InboundMessage::from_value(&reply).unwrap().text(), "answer to hello");

        drop(tx);
        runner.await.unwrap();
        assert!(session.is_cancelled());
    }
}
