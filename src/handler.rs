use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::app::{App, FocusPane, InputMode, StatusKind};
use crate::bible::VerseQuery;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(
    app: &mut App,
    event: AppEvent,
    tx: &mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Verse(result) => app.on_verse_result(result),
        AppEvent::Chat(chat_event) => app.on_chat_event(chat_event),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &mpsc::UnboundedSender<AppEvent>) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Popups swallow input while open
    if app.show_translation_picker {
        handle_translation_picker(app, key);
        return;
    }
    if app.show_model_picker {
        handle_model_picker(app, key);
        return;
    }

    // Tab cycles focus in either mode
    if key.code == KeyCode::Tab {
        cycle_focus(app);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key, tx),
    }
}

fn cycle_focus(app: &mut App) {
    app.focus = match app.focus {
        FocusPane::Book => FocusPane::Reference,
        FocusPane::Reference => FocusPane::Passage,
        FocusPane::Passage => FocusPane::ChatInput,
        FocusPane::ChatInput => FocusPane::Book,
    };

    // Input panes auto-enter editing with the cursor at the end
    match app.focus {
        FocusPane::Book => {
            app.input_mode = InputMode::Editing;
            app.book_cursor = app.book_input.chars().count();
        }
        FocusPane::Reference => {
            app.input_mode = InputMode::Editing;
            app.reference_cursor = app.reference_input.chars().count();
        }
        FocusPane::ChatInput => {
            app.input_mode = InputMode::Editing;
            app.chat_cursor = app.chat_input.chars().count();
        }
        FocusPane::Passage => {
            app.input_mode = InputMode::Normal;
        }
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Passage scrolling
        KeyCode::Char('j') | KeyCode::Down => app.passage_scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.passage_scroll_up(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.passage_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.passage_half_page_up();
        }
        KeyCode::Char('g') => app.passage_scroll = 0,
        KeyCode::Char('G') => {
            app.passage_scroll = app
                .total_passage_lines
                .saturating_sub(app.passage_height);
        }

        // Chat log scrolling
        KeyCode::PageDown => app.chat_scroll_down(),
        KeyCode::PageUp => app.chat_scroll_up(),

        // Jump straight to a field
        KeyCode::Char('/') => {
            app.focus = FocusPane::Book;
            app.input_mode = InputMode::Editing;
            app.book_cursor = app.book_input.chars().count();
        }
        KeyCode::Char('a') | KeyCode::Char('i') => {
            app.focus = FocusPane::ChatInput;
            app.input_mode = InputMode::Editing;
            app.chat_cursor = app.chat_input.chars().count();
        }

        // Pickers
        KeyCode::Char('t') => app.open_translation_picker(),
        KeyCode::Char('M') => app.open_model_picker(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent, tx: &mpsc::UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => match app.focus {
            FocusPane::Book | FocusPane::Reference => submit_search(app, tx),
            FocusPane::ChatInput => submit_chat(app, tx),
            FocusPane::Passage => {}
        },
        KeyCode::Backspace => {
            if let Some((input, cursor)) = focused_field(app) {
                if *cursor > 0 {
                    *cursor -= 1;
                    let byte_pos = char_to_byte_index(input, *cursor);
                    input.remove(byte_pos);
                }
            }
        }
        KeyCode::Delete => {
            if let Some((input, cursor)) = focused_field(app) {
                if *cursor < input.chars().count() {
                    let byte_pos = char_to_byte_index(input, *cursor);
                    input.remove(byte_pos);
                }
            }
        }
        KeyCode::Left => {
            if let Some((_, cursor)) = focused_field(app) {
                *cursor = cursor.saturating_sub(1);
            }
        }
        KeyCode::Right => {
            if let Some((input, cursor)) = focused_field(app) {
                *cursor = (*cursor + 1).min(input.chars().count());
            }
        }
        KeyCode::Home => {
            if let Some((_, cursor)) = focused_field(app) {
                *cursor = 0;
            }
        }
        KeyCode::End => {
            if let Some((input, cursor)) = focused_field(app) {
                *cursor = input.chars().count();
            }
        }
        KeyCode::Char(c) => {
            if let Some((input, cursor)) = focused_field(app) {
                let byte_pos = char_to_byte_index(input, *cursor);
                input.insert(byte_pos, c);
                *cursor += 1;
            }
        }
        _ => {}
    }
}

fn focused_field(app: &mut App) -> Option<(&mut String, &mut usize)> {
    match app.focus {
        FocusPane::Book => Some((&mut app.book_input, &mut app.book_cursor)),
        FocusPane::Reference => Some((&mut app.reference_input, &mut app.reference_cursor)),
        FocusPane::ChatInput => Some((&mut app.chat_input, &mut app.chat_cursor)),
        FocusPane::Passage => None,
    }
}

/// Validates the search fields and spawns the lookup. No request leaves
/// the machine unless both fields are filled in; the two missing-field
/// cases get distinct messages.
fn submit_search(app: &mut App, tx: &mpsc::UnboundedSender<AppEvent>) {
    if app.busy() {
        return;
    }

    let book = app.book_input.trim().to_string();
    let reference = app.reference_input.trim().to_string();

    if book.is_empty() {
        app.set_status(StatusKind::Warning, "Please enter both a book name and verse.");
        return;
    }
    if reference.is_empty() {
        app.set_status(StatusKind::Warning, "Please enter a chapter and verse.");
        return;
    }

    app.clear_status();
    app.searching = true;

    let query = VerseQuery {
        book,
        reference,
        translation: app.translation,
    };
    let bible = app.bible.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = bible.fetch_verse(&query).await;
        let _ = tx.send(AppEvent::Verse(result));
    });
}

/// Appends the user turn, builds the outbound list (injecting the stored
/// passage, if any) and spawns the streaming completion. Fragments come
/// back through the event channel.
fn submit_chat(app: &mut App, tx: &mpsc::UnboundedSender<AppEvent>) {
    if app.busy() {
        return;
    }

    let content = app.chat_input.trim().to_string();
    if content.is_empty() {
        // Empty submissions never reach the session
        return;
    }

    let Some(client) = app.openai.clone() else {
        app.set_status(
            StatusKind::Error,
            "OpenAI API key not configured. Set OPENAI_API_KEY or add it to config.json.",
        );
        return;
    };

    app.chat_input.clear();
    app.chat_cursor = 0;
    app.clear_status();

    app.session.push_user(content);
    let outbound = app.session.outbound_messages();

    app.awaiting_reply = true;
    app.pending_reply.clear();
    app.scroll_chat_to_bottom();

    let model = app.selected_model.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let (chat_tx, mut chat_rx) = mpsc::unbounded_channel();
        let request = tokio::spawn(async move {
            let _ = client.stream_chat(&model, &outbound, chat_tx).await;
        });
        while let Some(event) = chat_rx.recv().await {
            if tx.send(AppEvent::Chat(event)).is_err() {
                break;
            }
        }
        let _ = request.await;
    });
}

fn handle_translation_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_translation_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.translation_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.translation_picker_nav_up(),
        KeyCode::Enter => app.select_translation(),
        _ => {}
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_model_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_app() -> App {
        App::new(&Config::new())
    }

    fn channel() -> (
        mpsc::UnboundedSender<AppEvent>,
        mpsc::UnboundedReceiver<AppEvent>,
    ) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn char_to_byte_index_handles_multibyte() {
        let s = "Crúzate";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 3), 4); // past the two-byte ú
        assert_eq!(char_to_byte_index(s, 99), s.len());
    }

    #[test]
    fn empty_book_issues_no_request_and_warns() {
        let mut app = test_app();
        let (tx, mut rx) = channel();
        app.reference_input = "1:1".to_string();

        submit_search(&mut app, &tx);

        assert!(!app.searching);
        assert!(rx.try_recv().is_err());
        let status = app.status.as_ref().unwrap();
        assert_eq!(status.kind, StatusKind::Warning);
        assert_eq!(status.message, "Please enter both a book name and verse.");
    }

    #[test]
    fn empty_reference_gets_its_own_message() {
        let mut app = test_app();
        let (tx, mut rx) = channel();
        app.book_input = "Genesis".to_string();

        submit_search(&mut app, &tx);

        assert!(!app.searching);
        assert!(rx.try_recv().is_err());
        assert_eq!(
            app.status.as_ref().unwrap().message,
            "Please enter a chapter and verse."
        );
    }

    #[test]
    fn empty_chat_submission_is_filtered() {
        let mut app = test_app();
        let (tx, _rx) = channel();
        app.focus = FocusPane::ChatInput;
        app.chat_input = "   ".to_string();

        submit_chat(&mut app, &tx);

        assert!(!app.awaiting_reply);
        assert_eq!(app.session.messages.len(), 1);
    }

    #[test]
    fn chat_without_api_key_surfaces_error() {
        let mut app = test_app();
        app.openai = None;
        let (tx, _rx) = channel();
        app.chat_input = "what does this mean".to_string();

        submit_chat(&mut app, &tx);

        assert!(!app.awaiting_reply);
        // the unsent message stays in the input box
        assert_eq!(app.chat_input, "what does this mean");
        assert_eq!(app.session.messages.len(), 1);
        assert_eq!(app.status.as_ref().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn tab_cycles_through_all_panes() {
        let mut app = test_app();
        assert_eq!(app.focus, FocusPane::Book);
        cycle_focus(&mut app);
        assert_eq!(app.focus, FocusPane::Reference);
        assert_eq!(app.input_mode, InputMode::Editing);
        cycle_focus(&mut app);
        assert_eq!(app.focus, FocusPane::Passage);
        assert_eq!(app.input_mode, InputMode::Normal);
        cycle_focus(&mut app);
        assert_eq!(app.focus, FocusPane::ChatInput);
        cycle_focus(&mut app);
        assert_eq!(app.focus, FocusPane::Book);
    }
}
