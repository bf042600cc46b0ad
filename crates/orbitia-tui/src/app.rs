use log::info;
use orbitia_core::{ConfigError, Settings};
use ratatui::widgets::ListState;

use crate::commands::{HostCommand, GREETING};
use crate::panel::ChatPanel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Commands,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Command palette
    pub commands: Vec<HostCommand>,
    pub command_state: ListState,
    pub status: Option<String>,

    // Chat panel, created by "Open Chat" and kept until closed
    pub chat: Option<ChatPanel>,

    pub animation_frame: u8, // 0-2 for ellipsis animation

    settings: Result<Settings, String>,
}

impl App {
    pub fn new(settings: Result<Settings, ConfigError>) -> Self {
        let settings = settings.map_err(|e| e.to_string());
        let status = settings.as_ref().err().map(|e| format!("Configuration: {}", e));

        let mut command_state = ListState::default();
        command_state.select(Some(0));

        info!("OrbitIA is active");

        Self {
            should_quit: false,
            screen: Screen::Commands,
            input_mode: InputMode::Normal,
            commands: HostCommand::all(),
            command_state,
            status,
            chat: None,
            animation_frame: 0,
            settings,
        }
    }

    pub fn selected_command(&self) -> Option<HostCommand> {
        self.command_state
            .selected()
            .and_then(|i| self.commands.get(i).copied())
    }

    pub fn command_down(&mut self) {
        let len = self.commands.len();
        if len > 0 {
            let i = self.command_state.selected().unwrap_or(0);
            self.command_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn command_up(&mut self) {
        let i = self.command_state.selected().unwrap_or(0);
        self.command_state.select(Some(i.saturating_sub(1)));
    }

    pub fn execute(&mut self, command: HostCommand) {
        info!("Executing command {}", command.id());
        match command {
            HostCommand::HelloWorld => {
                self.status = Some(GREETING.to_string());
            }
            HostCommand::OpenChat => self.open_chat(),
        }
    }

    /// Show the chat panel, creating it on first use.
    pub fn open_chat(&mut self) {
        if self.chat.is_none() {
            let settings = self.settings.as_ref().map_err(String::as_str);
            self.chat = Some(ChatPanel::open(settings));
        }
        self.screen = Screen::Chat;
        self.input_mode = InputMode::Editing;
    }

    /// Dispose the chat panel and go back to the command list.
    pub fn close_chat(&mut self) {
        if let Some(chat) = self.chat.take() {
            chat.close();
        }
        self.screen = Screen::Commands;
        self.input_mode = InputMode::Normal;
    }

    /// Pull any relay responses into the transcript.
    pub fn poll_chat(&mut self) {
        if let Some(chat) = self.chat.as_mut() {
            chat.poll();
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.chat.as_ref().is_some_and(ChatPanel::is_awaiting)
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitia_core::Config;

    fn configured() -> App {
        let settings = Config::new().validate_with(Some("test-key".to_string()));
        App::new(settings)
    }

    #[test]
    fn test_missing_credential_is_reported() {
        let app = App::new(Config::new().validate_with(None));
        assert!(app.status.as_deref().unwrap().starts_with("Configuration: no API key"));
    }

    #[test]
    fn test_hello_world_only_sets_status() {
        let mut app = configured();
        app.execute(HostCommand::HelloWorld);

        assert_eq!(app.status.as_deref(), Some(GREETING));
        assert_eq!(app.screen, Screen::Commands);
        assert!(app.chat.is_none());
    }

    #[test]
    fn test_command_navigation_is_clamped() {
        let mut app = configured();
        app.command_up();
        assert_eq!(app.selected_command(), Some(HostCommand::HelloWorld));
        app.command_down();
        app.command_down();
        assert_eq!(app.selected_command(), Some(HostCommand::OpenChat));
    }

    #[tokio::test]
    async fn test_open_chat_reuses_panel() {
        let mut app = configured();
        app.execute(HostCommand::OpenChat);
        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.input_mode, InputMode::Editing);

        app.chat.as_mut().unwrap().input = "draft".to_string();
        app.screen = Screen::Commands;
        app.execute(HostCommand::OpenChat);
        assert_eq!(app.chat.as_ref().unwrap().input, "draft");
    }

    #[tokio::test]
    async fn test_close_chat_disposes_panel() {
        let mut app = configured();
        app.open_chat();
        app.close_chat();

        assert!(app.chat.is_none());
        assert_eq!(app.screen, Screen::Commands);
        assert!(!app.is_awaiting());
    }
}
