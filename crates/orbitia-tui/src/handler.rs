use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode, Screen};
use crate::commands::HostCommand;
use crate::panel::ChatPanel;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_chat();
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match (app.screen, app.input_mode) {
        (Screen::Commands, _) => handle_commands(app, key),
        (Screen::Chat, InputMode::Normal) => handle_chat_normal(app, key),
        (Screen::Chat, InputMode::Editing) => {
            if let Some(chat) = app.chat.as_mut() {
                if handle_chat_editing(chat, key) {
                    app.input_mode = InputMode::Normal;
                }
            }
        }
    }
}

fn handle_commands(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.command_down(),
        KeyCode::Char('k') | KeyCode::Up => app.command_up(),
        KeyCode::Enter => {
            if let Some(command) = app.selected_command() {
                app.execute(command);
            }
        }
        KeyCode::Char('h') => app.execute(HostCommand::HelloWorld),
        KeyCode::Char('c') => app.execute(HostCommand::OpenChat),
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => app.close_chat(),
        KeyCode::Tab => app.screen = Screen::Commands,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(chat) = app.chat.as_mut() {
                chat.scroll = chat.scroll.saturating_add(1);
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(chat) = app.chat.as_mut() {
                chat.scroll = chat.scroll.saturating_sub(1);
            }
        }
        KeyCode::Char('G') => {
            if let Some(chat) = app.chat.as_mut() {
                chat.scroll_to_bottom();
            }
        }
        _ => {}
    }
}

/// Returns true when editing should end.
fn handle_chat_editing(chat: &mut ChatPanel, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Enter => {
            chat.submit();
        }
        KeyCode::Backspace => {
            if chat.cursor > 0 {
                chat.cursor -= 1;
                let byte_pos = char_to_byte_index(&chat.input, chat.cursor);
                chat.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if chat.cursor < chat.input.chars().count() {
                let byte_pos = char_to_byte_index(&chat.input, chat.cursor);
                chat.input.remove(byte_pos);
            }
        }
        KeyCode::Left => chat.cursor = chat.cursor.saturating_sub(1),
        KeyCode::Right => chat.cursor = (chat.cursor + 1).min(chat.input.chars().count()),
        KeyCode::Home => chat.cursor = 0,
        KeyCode::End => chat.cursor = chat.input.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&chat.input, chat.cursor);
            chat.input.insert(byte_pos, c);
            chat.cursor += 1;
        }
        _ => {}
    }
    false
}
