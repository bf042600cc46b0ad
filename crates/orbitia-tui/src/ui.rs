use orbitia_core::ChatRole;
use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode, Screen};
use crate::panel::{ChatPanel, PANEL_TITLE};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        match after.find("**") {
            Some(end) if end > 0 => {
                if start > 0 {
                    spans.push(Span::raw(rest[..start].to_string()));
                }
                spans.push(Span::styled(
                    after[..end].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                rest = &after[end + 2..];
            }
            // No closing **, treat as literal
            _ => break,
        }
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Commands => render_commands(app, frame, body_area),
        Screen::Chat => {
            let editing = app.input_mode == InputMode::Editing;
            let frame_no = app.animation_frame;
            if let Some(chat) = app.chat.as_mut() {
                render_chat(chat, editing, frame_no, frame, body_area);
            }
        }
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" OrbitIA ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if app.chat.is_some() && app.screen == Screen::Commands {
        spans.push(Span::styled("  [chat open]", Style::default().fg(Color::DarkGray)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_commands(app: &mut App, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = app
        .commands
        .iter()
        .map(|command| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<12}", command.title()), Style::default().bold()),
                Span::styled(
                    format!("{}  ", command.description()),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(command.id(), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Commands "),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.command_state);
}

fn render_chat(chat: &mut ChatPanel, editing: bool, animation_frame: u8, frame: &mut Frame, area: Rect) {
    let notice_height = if chat.notice.is_some() { 3 } else { 0 };
    let [notice_area, chat_area, input_area] = Layout::vertical([
        Constraint::Length(notice_height),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    if let Some(notice) = &chat.notice {
        let warning = Paragraph::new(notice.as_str())
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title(" AI client not loaded "))
            .wrap(Wrap { trim: true });
        frame.render_widget(warning, notice_area);
    }

    // Inner size, for scroll calculations
    chat.height = chat_area.height.saturating_sub(2);
    chat.width = chat_area.width.saturating_sub(2);

    let chat_text = if chat.messages.is_empty() && !chat.is_awaiting() {
        Text::from(Span::styled(
            "Ask OrbitIA anything...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &chat.messages {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(msg.content.clone()));
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(msg.content.lines().map(parse_markdown_line));
                }
            }
            lines.push(Line::default());
        }

        if chat.is_awaiting() {
            let dots = ".".repeat(animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{} ({} pending)", dots, chat.pending_count()),
                Style::default().fg(Color::Blue).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let transcript = Paragraph::new(chat_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if editing { Color::DarkGray } else { Color::Cyan }))
                .title(match &chat.backend {
                    Some(backend) => format!(" {} ({}) ", PANEL_TITLE, backend),
                    None => format!(" {} ", PANEL_TITLE),
                }),
        )
        .wrap(Wrap { trim: true })
        .scroll((chat.scroll, 0));
    frame.render_widget(transcript, chat_area);

    let input_style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input_text = if chat.input.is_empty() && !editing {
        Span::styled("Type your question...", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(chat.input.as_str())
    };
    let input = Paragraph::new(Line::from(input_text)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(input_style)
            .title(" Message "),
    );
    frame.render_widget(input, input_area);

    if editing {
        let cursor_x = input_area.x + 1 + chat.cursor as u16;
        frame.set_cursor_position(Position::new(
            cursor_x.min(input_area.right().saturating_sub(2)),
            input_area.y + 1,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = match (app.screen, app.input_mode) {
        (Screen::Commands, _) => "j/k select  Enter run  h hello  c chat  q quit",
        (Screen::Chat, InputMode::Editing) => "Enter send  Esc stop editing",
        (Screen::Chat, InputMode::Normal) => "i edit  j/k scroll  Tab commands  Esc close chat  q quit",
    };

    let mut spans = vec![Span::styled(hints, Style::default().fg(Color::DarkGray))];
    if let Some(status) = &app.status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.as_str(), Style::default().fg(Color::Green)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
