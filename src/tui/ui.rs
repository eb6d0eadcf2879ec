use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use crate::chat::{ChatMessage, Conversation, MessageRole, PROMPT_SUGGESTIONS};
use crate::markdown::{render_markdown, Block as MdBlock, Inline};
use crate::tui::app::{Focus, InputMode, WorkloadApp};

const SIDEBAR_WIDTH: u16 = 30;
const MAX_INPUT_LINES: u16 = 6;
const TYPING_FRAMES: [&str; 3] = ["●∙∙", "∙●∙", "∙∙●"];

/// Render the main UI
pub fn render_ui(f: &mut Frame, app: &WorkloadApp) {
    if let Some(message) = app.fault() {
        render_fault(f, message);
        return;
    }

    let columns = if app.sidebar_visible() {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
            .split(f.size())
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(0), Constraint::Min(20)])
            .split(f.size())
    };

    if app.sidebar_visible() {
        render_sidebar(f, app, columns[0]);
    }

    let input_height = input_line_count(app.input()).min(MAX_INPUT_LINES) + 2;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Header
            Constraint::Min(5),               // Messages
            Constraint::Length(input_height), // Input box
        ])
        .split(columns[1]);

    render_header(f, app, rows[0]);
    if app.shows_empty_state() {
        render_empty_state(f, rows[1]);
    } else {
        render_messages(f, app, rows[1]);
    }
    render_input_box(f, app, rows[2]);
}

fn render_sidebar(f: &mut Frame, app: &WorkloadApp, area: Rect) {
    let focused = app.focus() == Focus::Sidebar;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title("WorkLoad Manager");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // New conversation hint
            Constraint::Min(3),    // Conversation list
            Constraint::Length(1), // Sample data toggle
            Constraint::Length(2), // Agent status
        ])
        .split(inner);

    let new_hint = Paragraph::new(Line::from(vec![
        Span::styled("+ ", Style::default().fg(Color::Green)),
        Span::raw("New conversation "),
        Span::styled("^N", Style::default().fg(Color::DarkGray)),
    ]));
    f.render_widget(new_hint, chunks[0]);

    render_conversation_list(f, app, chunks[1]);

    let samples = if app.session().shows_samples() { "on" } else { "off" };
    let sample_line = Paragraph::new(Line::from(vec![
        Span::styled("Sample data: ", Style::default().fg(Color::DarkGray)),
        Span::raw(samples),
        Span::styled(" ^S", Style::default().fg(Color::DarkGray)),
    ]));
    f.render_widget(sample_line, chunks[2]);

    render_agent_status(f, app, chunks[3]);
}

fn render_conversation_list(f: &mut Frame, app: &WorkloadApp, area: Rect) {
    let conversations = app.session().displayed();
    if conversations.is_empty() {
        let empty = Paragraph::new("No conversations yet")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(empty, area);
        return;
    }

    let active = app.session().active_id();
    let items: Vec<ListItem> = conversations
        .iter()
        .map(|c| conversation_item(c, Some(c.id.as_str()) == active))
        .collect();

    let mut state = ListState::default();
    if app.focus() == Focus::Sidebar {
        state.select(Some(app.sidebar_selected()));
    }

    let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray));
    f.render_stateful_widget(list, area, &mut state);
}

fn conversation_item(conversation: &Conversation, is_active: bool) -> ListItem<'static> {
    let title_style = if is_active {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    ListItem::new(Text::from(vec![
        Line::from(Span::styled(conversation.title().to_string(), title_style)),
        Line::from(Span::styled(
            conversation.created_at.format("%-d %b").to_string(),
            Style::default().fg(Color::DarkGray),
        )),
    ]))
}

fn render_agent_status(f: &mut Frame, app: &WorkloadApp, area: Rect) {
    let dot = if app.session().is_busy() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let status = Paragraph::new(Text::from(vec![
        Line::from(vec![
            Span::styled("● ", dot),
            Span::styled(app.agent_name().to_string(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(Span::styled("  Task Manager", Style::default().fg(Color::DarkGray))),
    ]));
    f.render_widget(status, area);
}

fn render_header(f: &mut Frame, app: &WorkloadApp, area: Rect) {
    let title = app
        .session()
        .active()
        .map_or(crate::chat::UNTITLED, |c| c.title());

    let mut spans = vec![Span::styled(
        title.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if app.session().is_busy() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            " processing... ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_empty_state(f: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "WorkLoad Manager",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Type your task list and I'll help you manage it.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
    ];

    for (i, suggestion) in PROMPT_SUGGESTIONS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("[{}] ", i + 1), Style::default().fg(Color::Cyan)),
            Span::raw(*suggestion),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Esc then 1-3 to use a suggestion · Enter to send · Tab for conversations",
        Style::default().fg(Color::DarkGray),
    )));

    let empty = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Conversation"));
    f.render_widget(empty, area);
}

fn render_messages(f: &mut Frame, app: &WorkloadApp, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    if let Some(conversation) = app.session().active() {
        for message in &conversation.messages {
            lines.extend(message_lines(message, app.agent_name()));
            lines.push(Line::from(""));
        }
    }

    if app.session().is_busy() {
        let frame = TYPING_FRAMES[(app.tick() / 3) % TYPING_FRAMES.len()];
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} ", app.agent_name()),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::styled(frame, Style::default().fg(Color::Gray)),
        ]));
    }

    render_thread(f, &lines, app.scroll(), area);
}

/// Draw the thread pinned to its newest row, `scroll` rows back from the bottom.
fn render_thread(f: &mut Frame, lines: &[Line], scroll: u16, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Conversation");
    let inner = block.inner(area);

    let rows: Vec<Line> = lines
        .iter()
        .flat_map(|line| wrap_line(line, inner.width as usize))
        .collect();
    let total = rows.len().min(u16::MAX as usize) as u16;
    let max_offset = total.saturating_sub(inner.height);
    let offset = max_offset.saturating_sub(scroll.min(max_offset));

    let messages = Paragraph::new(Text::from(rows))
        .block(block)
        .scroll((offset, 0));
    f.render_widget(messages, area);
}

fn message_lines<'a>(message: &'a ChatMessage, agent_name: &str) -> Vec<Line<'a>> {
    let time = message.timestamp.format("%H:%M").to_string();
    let mut lines = Vec::new();

    match message.role {
        MessageRole::User => {
            lines.push(
                Line::from(vec![
                    Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                    Span::styled(format!(" · {}", time), Style::default().fg(Color::DarkGray)),
                ])
                .alignment(Alignment::Right),
            );
            for line in message.content.split('\n') {
                lines.push(Line::from(line).alignment(Alignment::Right));
            }
        }
        MessageRole::Agent => {
            let mut header = vec![
                Span::styled(
                    agent_name.to_string(),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" · {}", time), Style::default().fg(Color::DarkGray)),
            ];
            if message.copied() {
                header.push(Span::styled("  ✓ copied", Style::default().fg(Color::Green)));
            }
            lines.push(Line::from(header));
            lines.extend(markdown_lines(&message.content));
        }
        MessageRole::Error => {
            let red = Style::default().fg(Color::Red);
            lines.push(Line::from(vec![
                Span::styled("Error", red.add_modifier(Modifier::BOLD)),
                Span::styled(format!(" · {}", time), Style::default().fg(Color::DarkGray)),
            ]));
            lines.push(Line::from(Span::styled(message.content.as_str(), red)));
            lines.push(Line::from(Span::styled(
                "[Ctrl+R] retry",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
    }

    lines
}

/// Turn an agent reply into styled terminal lines.
pub fn markdown_lines(content: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut number = 0;

    for block in render_markdown(content) {
        let line = match block {
            MdBlock::Heading { level, inlines } => {
                number = 0;
                let mut style = Style::default().add_modifier(Modifier::BOLD);
                if level == 1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                Line::from(inline_spans(inlines, style))
            }
            MdBlock::Bullet(inlines) => {
                let mut spans = vec![Span::raw("  • ")];
                spans.extend(inline_spans(inlines, Style::default()));
                Line::from(spans)
            }
            MdBlock::Numbered(inlines) => {
                number += 1;
                let mut spans = vec![Span::raw(format!("  {}. ", number))];
                spans.extend(inline_spans(inlines, Style::default()));
                Line::from(spans)
            }
            MdBlock::Paragraph(inlines) => Line::from(inline_spans(inlines, Style::default())),
            MdBlock::Spacer => Line::from(""),
        };
        lines.push(line);
    }

    lines
}

fn inline_spans(inlines: Vec<Inline>, base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => spans.push(Span::styled(text, base)),
            Inline::Bold(text) => spans.push(Span::styled(text, base.add_modifier(Modifier::BOLD))),
            Inline::Code(text) => spans.push(Span::styled(
                text,
                base.fg(Color::Yellow).bg(Color::DarkGray),
            )),
            Inline::Link { label, href } => {
                spans.push(Span::styled(label, base.add_modifier(Modifier::UNDERLINED)));
                spans.push(Span::styled(
                    format!(" ({})", href),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
    }
    spans
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Break a styled line into rows of at most `width` columns.
///
/// Rows break at whitespace where possible. Words wider than a row are split
/// by column. Whitespace that overflows a row is dropped.
fn wrap_line(line: &Line, width: usize) -> Vec<Line<'static>> {
    let cells: Vec<(char, Style)> = line
        .spans
        .iter()
        .flat_map(|span| span.content.chars().map(move |c| (c, span.style)))
        .collect();

    let mut rows: Vec<Vec<(char, Style)>> = Vec::new();
    let mut row: Vec<(char, Style)> = Vec::new();
    let mut row_width = 0;
    let mut start = 0;

    while width > 0 && start < cells.len() {
        let is_space = cells[start].0.is_whitespace();
        let end = cells[start..]
            .iter()
            .position(|(c, _)| c.is_whitespace() != is_space)
            .map_or(cells.len(), |p| start + p);
        let token = &cells[start..end];
        start = end;

        let token_width: usize = token.iter().map(|(c, _)| char_width(*c)).sum();
        if row_width + token_width <= width {
            row.extend_from_slice(token);
            row_width += token_width;
        } else if is_space {
            if !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
        } else if !row.is_empty() && token_width <= width {
            rows.push(std::mem::take(&mut row));
            row.extend_from_slice(token);
            row_width = token_width;
        } else {
            for &(c, style) in token {
                let w = char_width(c);
                if row_width + w > width && !row.is_empty() {
                    rows.push(std::mem::take(&mut row));
                    row_width = 0;
                }
                row.push((c, style));
                row_width += w;
            }
        }
    }

    if width == 0 {
        row = cells;
    }
    if !row.is_empty() || rows.is_empty() {
        rows.push(row);
    }

    rows.into_iter()
        .map(|cells| {
            let mut wrapped = Line::from(group_spans(cells));
            wrapped.alignment = line.alignment;
            wrapped
        })
        .collect()
}

/// Merge runs of equally styled characters back into spans
fn group_spans(cells: Vec<(char, Style)>) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut text = String::new();
    let mut current: Option<Style> = None;

    for (c, style) in cells {
        if current.is_some_and(|s| s != style) {
            if let Some(prev) = current {
                spans.push(Span::styled(std::mem::take(&mut text), prev));
            }
        }
        current = Some(style);
        text.push(c);
    }
    if let Some(style) = current {
        spans.push(Span::styled(text, style));
    }
    spans
}

fn input_line_count(input: &str) -> u16 {
    let count = input.split('\n').count();
    count.min(u16::MAX as usize) as u16
}

/// Render the input box
fn render_input_box(f: &mut Frame, app: &WorkloadApp, area: Rect) {
    let busy = app.session().is_busy();
    let title = match (busy, app.input_mode()) {
        (true, _) => "Message (waiting for agent)",
        (false, InputMode::Normal) => "Message (Esc: normal, e: edit, q: quit)",
        (false, InputMode::Editing) => "Message (Enter: send, Alt+Enter: newline)",
    };

    // Keep the tail of long drafts in view.
    let visible = (area.height.saturating_sub(2)) as usize;
    let all: Vec<&str> = app.input().split('\n').collect();
    let skip = all.len().saturating_sub(visible.max(1));
    let shown: Vec<Line> = all[skip..].iter().map(|l| Line::from(*l)).collect();

    let last = all.last().copied().unwrap_or("");
    let (offset, column) = input_cursor(Span::raw(last).width(), area.width.saturating_sub(2));

    let input = Paragraph::new(Text::from(shown))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(Style::default().fg(if busy { Color::DarkGray } else { Color::White })),
        )
        .scroll((0, offset));
    f.render_widget(input, area);

    if !busy && app.focus() == Focus::Input && app.input_mode() == InputMode::Editing {
        let row = (all.len() - skip).saturating_sub(1) as u16;
        f.set_cursor(area.x + 1 + column, area.y + 1 + row);
    }
}

/// Horizontal scroll and cursor column that keep the end of the line in a
/// box `inner_width` columns wide.
fn input_cursor(line_width: usize, inner_width: u16) -> (u16, u16) {
    let line_width = line_width.min(u16::MAX as usize) as u16;
    let last_column = inner_width.saturating_sub(1);
    let offset = line_width.saturating_sub(last_column);
    (offset, line_width - offset)
}

fn render_fault(f: &mut Frame, message: &str) {
    let area = centered(f.size(), 60, 9);
    let text = Text::from(vec![
        Line::from(Span::styled(
            "Something went wrong",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            "press r to try again, q to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let fallback = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(Clear, area);
    f.render_widget(fallback, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
