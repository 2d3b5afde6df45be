use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};

use crate::app::{App, FocusPane, InputMode, StatusKind};
use crate::bible::Translation;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, search bar, body, chat input, footer
    let [header_area, search_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_search_bar(app, frame, search_area);

    let [passage_area, chat_area] =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
            .areas(body_area);
    render_passage(app, frame, passage_area);
    render_chat(app, frame, chat_area);

    render_chat_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    // Popups (one at a time)
    if app.show_translation_picker {
        render_translation_picker(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Verse Study ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", app.translation.code()),
            Style::default().fg(Color::Blue),
        ),
        Span::raw(" "),
        Span::styled(
            format!("[{}]", app.selected_model),
            Style::default().fg(Color::Magenta),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// Renders an input's text with a reversed-video cursor while editing.
fn input_line(text: &str, cursor: usize, editing: bool) -> Line<'static> {
    if !editing {
        return Line::raw(text.to_string());
    }

    let byte_pos = text
        .char_indices()
        .nth(cursor)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let before = text[..byte_pos].to_string();
    let mut rest = text[byte_pos..].chars();
    let under_cursor = rest.next().map(String::from).unwrap_or_else(|| " ".to_string());
    let after: String = rest.collect();

    Line::from(vec![
        Span::raw(before),
        Span::styled(under_cursor, Style::default().add_modifier(Modifier::REVERSED)),
        Span::raw(after),
    ])
}

fn render_search_bar(app: &App, frame: &mut Frame, area: Rect) {
    let [translation_area, book_area, reference_area] = Layout::horizontal([
        Constraint::Length(30),
        Constraint::Percentage(40),
        Constraint::Min(16),
    ])
    .areas(area);

    let translation = Paragraph::new(app.translation.display_name()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Translation (t) ")
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(translation, translation_area);

    let book_editing = app.focus == FocusPane::Book && app.input_mode == InputMode::Editing;
    let book = Paragraph::new(input_line(&app.book_input, app.book_cursor, book_editing)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Book ")
            .border_style(border_style(app.focus == FocusPane::Book)),
    );
    frame.render_widget(book, book_area);

    let reference_editing =
        app.focus == FocusPane::Reference && app.input_mode == InputMode::Editing;
    let reference = Paragraph::new(input_line(
        &app.reference_input,
        app.reference_cursor,
        reference_editing,
    ))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Chapter:Verse ")
            .border_style(border_style(app.focus == FocusPane::Reference)),
    );
    frame.render_widget(reference, reference_area);
}

fn render_passage(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = match (&app.session.verse, app.searching) {
        (_, true) => format!(
            " Searching{} ",
            ".".repeat(app.animation_frame as usize + 1)
        ),
        (Some(verse), false) => format!(" {} ", verse.reference),
        (None, false) => " Passage ".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style(app.focus == FocusPane::Passage));
    let inner = block.inner(area);

    let lines: Vec<Line> = match &app.session.verse {
        Some(verse) => {
            let mut lines = Vec::new();
            for v in &verse.verses {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{} ", v.verse),
                        Style::default().fg(Color::Yellow).bold(),
                    ),
                    Span::raw(v.text.trim().to_string()),
                ]));
                lines.push(Line::default());
            }
            lines
        }
        None => vec![
            Line::default(),
            Line::styled("Look up a chapter or verse:", Style::default().bold()),
            Line::default(),
            Line::raw("  an entire chapter     Philippians 4"),
            Line::raw("  a single verse        Jeremiah 29:11"),
            Line::raw("  a range of verses     Matthew 6:25-34"),
            Line::raw("  multiple chapters     John 3:16-4:10"),
        ],
    };

    // Track pane metrics for scroll clamping
    app.passage_height = inner.height;
    app.total_passage_lines = wrapped_line_count(&lines, inner.width);
    let max_scroll = app
        .total_passage_lines
        .saturating_sub(app.passage_height);
    app.passage_scroll = app.passage_scroll.min(max_scroll);

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.passage_scroll, 0))
        .block(block);
    frame.render_widget(paragraph, area);

    if app.total_passage_lines > app.passage_height {
        let mut scrollbar_state = ScrollbarState::new(max_scroll as usize)
            .position(app.passage_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut scrollbar_state,
        );
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Study Chat ")
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);

    app.chat_height = inner.height;
    app.chat_width = inner.width;

    let mut lines: Vec<Line> = Vec::new();

    // The leading system turn is never rendered
    for msg in app.session.messages.iter().skip(1) {
        let label = match msg.role {
            crate::session::ChatRole::User => {
                Line::styled("You:", Style::default().fg(Color::Cyan).bold())
            }
            _ => Line::styled("AI:", Style::default().fg(Color::Magenta).bold()),
        };
        lines.push(label);
        for line in msg.content.lines() {
            lines.push(Line::raw(line.to_string()));
        }
        lines.push(Line::default());
    }

    if app.awaiting_reply {
        lines.push(Line::styled(
            "AI:",
            Style::default().fg(Color::Magenta).bold(),
        ));
        if app.pending_reply.is_empty() {
            lines.push(Line::styled(
                format!("Thinking{}", ".".repeat(app.animation_frame as usize + 1)),
                Style::default().fg(Color::DarkGray),
            ));
        } else {
            for line in app.pending_reply.lines() {
                lines.push(Line::raw(line.to_string()));
            }
        }
    } else if lines.is_empty() {
        lines.push(Line::default());
        lines.push(Line::styled(
            "need context or clarification?",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0))
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_chat_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.focus == FocusPane::ChatInput && app.input_mode == InputMode::Editing;
    let content = if app.chat_input.is_empty() && !editing {
        Line::styled(
            "need context or clarification?",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        input_line(&app.chat_input, app.chat_cursor, editing)
    };

    let input = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Ask about this passage ")
            .border_style(border_style(app.focus == FocusPane::ChatInput)),
    );
    frame.render_widget(input, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    if let Some(status) = &app.status {
        let style = match status.kind {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Warning => Style::default().fg(Color::Yellow),
            StatusKind::Error => Style::default().fg(Color::Red),
        };
        frame.render_widget(
            Paragraph::new(Line::styled(format!(" {}", status.message), style)),
            area,
        );
        return;
    }

    let hints = match (app.input_mode, app.focus) {
        (InputMode::Editing, FocusPane::Book | FocusPane::Reference) => {
            " Enter search · Tab next field · Esc done"
        }
        (InputMode::Editing, FocusPane::ChatInput) => " Enter send · Tab next field · Esc done",
        _ => " Tab switch · / search · a ask · j/k scroll · t translation · M model · q quit",
    };
    frame.render_widget(
        Paragraph::new(Line::styled(hints, Style::default().fg(Color::DarkGray))),
        area,
    );
}

fn render_translation_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup = centered_rect(44, 8, area);
    frame.render_widget(Clear, popup);

    let items: Vec<ListItem> = Translation::all()
        .iter()
        .map(|t| ListItem::new(format!("{:<28} {}", t.display_name(), t.code())))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Select Translation ")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, popup, &mut app.translation_state);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let height = (app.available_models.len() as u16 + 2).min(12);
    let popup = centered_rect(40, height, area);
    frame.render_widget(Clear, popup);

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|m| ListItem::new(m.clone()))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Select Model ")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, popup, &mut app.model_picker_state);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn wrapped_line_count(lines: &[Line], width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let width = width as usize;
    let mut total: u16 = 0;
    for line in lines {
        let char_count: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
        if char_count == 0 {
            total += 1;
        } else {
            total += ((char_count.saturating_sub(1)) / width + 1) as u16;
        }
    }
    total
}
