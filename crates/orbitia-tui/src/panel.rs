use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};
use orbitia_core::{
    AiClient, ChatMessage, InboundMessage, OutboundMessage, PanelState, Relay, Settings,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const PANEL_TITLE: &str = "OrbitIA Chatbot";

/// The chat panel: transcript, input line and both ends of the relay link.
pub struct ChatPanel {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub cursor: usize, // char index into input
    pub state: PanelState,
    pub scroll: u16,
    pub height: u16,
    pub width: u16,
    /// Set when the relay has no client; shown above the transcript.
    pub notice: Option<String>,
    /// Backend and deadline, shown in the transcript title.
    pub backend: Option<String>,

    pending: HashSet<u64>,
    next_id: u64,
    to_relay: mpsc::UnboundedSender<Value>,
    from_relay: mpsc::UnboundedReceiver<Value>,
    session: CancellationToken,
}

impl ChatPanel {
    /// Create the panel and start its relay. Must run inside a tokio runtime.
    pub fn open(settings: Result<&Settings, &str>) -> Self {
        let (to_relay, relay_inbox) = mpsc::unbounded_channel();
        let (relay_outbox, from_relay) = mpsc::unbounded_channel::<Value>();
        let panel_sink = Arc::new(relay_outbox);

        let mut backend = None;
        let (relay, notice) = match settings.map(|s| (s.provider, AiClient::from_settings(s))) {
            Ok((provider, Ok(client))) => {
                debug!("Chat panel using {} backend", client.backend_name());
                backend = Some(format!(
                    "{}, {}s timeout",
                    provider.display_name(),
                    client.timeout().as_secs()
                ));
                (Relay::new(client, panel_sink), None)
            }
            Ok((_, Err(e))) => (Relay::unavailable(panel_sink, &e.to_string()), Some(e.to_string())),
            Err(reason) => (Relay::unavailable(panel_sink, reason), Some(reason.to_string())),
        };

        let session = relay.session();
        tokio::spawn(relay.run(relay_inbox));

        Self {
            messages: Vec::new(),
            input: String::new(),
            cursor: 0,
            state: PanelState::Idle,
            scroll: 0,
            height: 0,
            width: 0,
            notice,
            backend,
            pending: HashSet::new(),
            next_id: 1,
            to_relay,
            from_relay,
            session,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.state == PanelState::AwaitingResponse
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Send the input line as a question. Blank input is kept and nothing
    /// is sent.
    pub fn submit(&mut self) -> bool {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return false;
        }

        let id = self.next_id;
        self.next_id += 1;

        self.messages.push(ChatMessage::user(text.clone()));
        self.input.clear();
        self.cursor = 0;

        if self.to_relay.send(OutboundMessage::ask(text, Some(id)).to_value()).is_err() {
            warn!("Chat relay is gone, question {} was not sent", id);
            self.messages
                .push(ChatMessage::assistant("Error: the chat session has ended."));
            return false;
        }

        self.pending.insert(id);
        self.state = PanelState::AwaitingResponse;
        self.scroll_to_bottom();
        true
    }

    /// Apply one envelope from the relay. Unknown envelopes are ignored.
    pub fn receive(&mut self, envelope: &Value) {
        let Some(message) = InboundMessage::from_value(envelope) else {
            debug!("Panel ignoring envelope: {}", envelope);
            return;
        };

        if let Some(id) = message.id() {
            self.pending.remove(&id);
        }
        if self.pending.is_empty() {
            self.state = PanelState::Idle;
        }
        self.messages.push(ChatMessage::assistant(message.text()));
        self.scroll_to_bottom();
    }

    /// Drain everything the relay has posted so far.
    pub fn poll(&mut self) {
        while let Ok(envelope) = self.from_relay.try_recv() {
            self.receive(&envelope);
        }
    }

    /// Wait for the next envelope from the relay.
    #[cfg(test)]
    pub async fn next_response(&mut self) -> Option<Value> {
        self.from_relay.recv().await
    }

    /// Dispose the panel: in-flight questions are cancelled.
    pub fn close(&self) {
        self.session.cancel();
    }

    pub fn scroll_to_bottom(&mut self) {
        let wrap_width = if self.width > 0 { self.width as usize } else { 50 };

        let mut total_lines: usize = 0;
        for msg in &self.messages {
            total_lines = total_lines.saturating_add(2); // role line + blank line
            for line in msg.content.lines() {
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
            }
        }
        if self.is_awaiting() {
            total_lines = total_lines.saturating_add(2);
        }

        let visible_height = if self.height > 0 { self.height as usize } else { 20 };
        self.scroll = u16::try_from(total_lines.saturating_sub(visible_height)).unwrap_or(u16::MAX);
    }
}

impl Drop for ChatPanel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitia_core::ai::NOT_LOADED;
    use orbitia_core::ChatRole;
    use serde_json::json;

    fn unavailable() -> ChatPanel {
        ChatPanel::open(Err("no API key configured"))
    }

    #[tokio::test]
    async fn test_submit_moves_to_awaiting() {
        let mut panel = unavailable();
        panel.input = "  hello  ".to_string();
        panel.cursor = 9;

        assert!(panel.submit());
        assert_eq!(panel.state, PanelState::AwaitingResponse);
        assert_eq!(panel.messages, vec![ChatMessage::user("hello")]);
        assert!(panel.input.is_empty());
        assert_eq!(panel.cursor, 0);
        assert_eq!(panel.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_input_is_not_sent() {
        let mut panel = unavailable();
        panel.input = "   ".to_string();

        assert!(!panel.submit());
        assert_eq!(panel.state, PanelState::Idle);
        assert!(panel.messages.is_empty());
    }

    #[tokio::test]
    async fn test_response_returns_to_idle() {
        let mut panel = unavailable();
        panel.input = "hello".to_string();
        panel.submit();

        let reply = panel.next_response().await.unwrap();
        panel.receive(&reply);

        assert_eq!(panel.state, PanelState::Idle);
        assert_eq!(panel.messages.len(), 2);
        assert_eq!(panel.messages[1].role, ChatRole::Assistant);
        assert_eq!(panel.messages[1].content, NOT_LOADED);
        assert!(panel.notice.is_some());
    }

    #[tokio::test]
    async fn test_stays_awaiting_until_all_answers_arrive() {
        let mut panel = unavailable();
        panel.input = "a".to_string();
        panel.submit();
        panel.input = "b".to_string();
        panel.submit();
        assert_eq!(panel.pending_count(), 2);

        panel.receive(&json!({"command": "aiResponse", "text": "for b", "id": 2}));
        assert!(panel.is_awaiting());

        panel.receive(&json!({"command": "aiResponse", "text": "for a", "id": 1}));
        assert_eq!(panel.state, PanelState::Idle);
    }

    #[tokio::test]
    async fn test_long_transcript_scroll_is_clamped() {
        let mut panel = unavailable();
        panel.receive(&json!({"command": "aiResponse", "text": "x\n".repeat(70_000)}));
        assert_eq!(panel.scroll, u16::MAX);

        panel.width = 10;
        panel.height = 5;
        panel.messages = vec![ChatMessage::assistant("a".repeat(25))];
        panel.scroll_to_bottom();
        // role line + 3 wrapped lines + blank line, minus the visible 5
        assert_eq!(panel.scroll, 0);
        panel.messages.push(ChatMessage::user("b"));
        panel.scroll_to_bottom();
        assert_eq!(panel.scroll, 3);
    }

    #[tokio::test]
    async fn test_configured_panel_shows_backend() {
        let settings = orbitia_core::Config::new()
            .validate_with(Some("test-key".to_string()))
            .unwrap();
        let panel = ChatPanel::open(Ok(&settings));
        assert_eq!(panel.backend.as_deref(), Some("Gemini, 60s timeout"));
        assert!(panel.notice.is_none());
        assert!(unavailable().backend.is_none());
    }

    #[tokio::test]
    async fn test_unknown_envelope_is_ignored() {
        let mut panel = unavailable();
        panel.receive(&json!({"command": "askAI", "text": "echo"}));
        assert!(panel.messages.is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_reports_error() {
        let mut panel = unavailable();
        panel.close();
        // Let the relay task observe the cancellation and drop its inbox.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        panel.input = "hello".to_string();
        assert!(!panel.submit());
        assert_eq!(panel.state, PanelState::Idle);
        assert_eq!(panel.messages.len(), 2);
    }
}
