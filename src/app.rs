use ratatui::widgets::ListState;

use crate::bible::{BibleClient, Translation, VerseError, VerseResult, BIBLE_API_URL};
use crate::config::Config;
use crate::openai::{ChatError, ChatEvent, OpenAIClient};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Book,
    Reference,
    Passage,
    ChatInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub message: String,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Search fields
    pub book_input: String,
    pub book_cursor: usize,
    pub reference_input: String,
    pub reference_cursor: usize,
    pub translation: Translation,

    // Chat input
    pub chat_input: String,
    pub chat_cursor: usize,

    // Session state shared by both flows
    pub session: Session,

    // In-flight operations (one at a time)
    pub searching: bool,
    pub awaiting_reply: bool,
    pub pending_reply: String,

    // Status line
    pub status: Option<StatusLine>,

    // Passage scrolling
    pub passage_scroll: u16,
    pub passage_height: u16,
    pub total_passage_lines: u16,

    // Chat scrolling
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Translation picker state
    pub show_translation_picker: bool,
    pub translation_state: ListState,

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // Clients
    pub bible: BibleClient,
    pub openai: Option<OpenAIClient>,
    pub selected_model: String,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let translation = config
            .default_translation
            .as_deref()
            .and_then(Translation::from_code)
            .unwrap_or_default();

        let bible = BibleClient::new(config.bible_api_url.as_deref().unwrap_or(BIBLE_API_URL));

        // API key: env var first, then config
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .or_else(|| config.openai_api_key.clone());
        let openai = api_key.map(|key| match config.openai_api_url.as_deref() {
            Some(url) => OpenAIClient::with_base_url(&key, url),
            None => OpenAIClient::new(&key),
        });

        let selected_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| "gpt-3.5-turbo".to_string());

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Book,

            book_input: String::new(),
            book_cursor: 0,
            reference_input: String::new(),
            reference_cursor: 0,
            translation,

            chat_input: String::new(),
            chat_cursor: 0,

            session: Session::new(),

            searching: false,
            awaiting_reply: false,
            pending_reply: String::new(),

            status: None,

            passage_scroll: 0,
            passage_height: 0,
            total_passage_lines: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            show_translation_picker: false,
            translation_state: ListState::default(),

            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),

            bible,
            openai,
            selected_model,
        }
    }

    pub fn set_status(&mut self, kind: StatusKind, message: impl Into<String>) {
        self.status = Some(StatusLine {
            kind,
            message: message.into(),
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// A lookup or a streamed reply is running; further submissions are
    /// ignored until it settles.
    pub fn busy(&self) -> bool {
        self.searching || self.awaiting_reply
    }

    /// Outcome of the spawned lookup. Only success touches the stored
    /// passage; every error leaves the previous result visible.
    pub fn on_verse_result(&mut self, result: Result<VerseResult, VerseError>) {
        self.searching = false;
        match result {
            Ok(verse) => {
                self.set_status(StatusKind::Info, format!("Showing {}", verse.reference));
                self.session.store_verse(verse);
                self.passage_scroll = 0;
            }
            Err(VerseError::NotFound) => {
                self.set_status(
                    StatusKind::Error,
                    "Error! Please enter a valid book and verse.",
                );
            }
            Err(VerseError::Unexpected(code)) => {
                self.set_status(
                    StatusKind::Warning,
                    format!("Unexpected error. (Status code: {code})"),
                );
            }
            Err(err @ (VerseError::Transport(_) | VerseError::Malformed)) => {
                self.set_status(StatusKind::Error, format!("An error occurred: {err}"));
            }
        }
    }

    /// One piece of the streamed reply. Fragments grow the pending text
    /// shown in the chat log; `Done` commits the concatenation as a
    /// single assistant turn; an error discards whatever was rendered.
    pub fn on_chat_event(&mut self, event: ChatEvent) {
        if !self.awaiting_reply {
            return;
        }
        match event {
            ChatEvent::Fragment(text) => {
                self.pending_reply.push_str(&text);
                self.scroll_chat_to_bottom();
            }
            ChatEvent::Done => {
                let reply = std::mem::take(&mut self.pending_reply);
                self.session.push_assistant(reply);
                self.awaiting_reply = false;
                self.scroll_chat_to_bottom();
            }
            ChatEvent::Error(err) => {
                self.pending_reply.clear();
                self.awaiting_reply = false;
                let message = match err {
                    ChatError::Api { status, .. } => {
                        format!("Chat request failed. (Status code: {status})")
                    }
                    ChatError::Transport(msg) => format!("An error occurred: {msg}"),
                };
                self.set_status(StatusKind::Error, message);
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Passage scrolling
    pub fn passage_scroll_down(&mut self) {
        let max = self.total_passage_lines.saturating_sub(self.passage_height);
        if self.passage_scroll < max {
            self.passage_scroll += 1;
        }
    }

    pub fn passage_scroll_up(&mut self) {
        self.passage_scroll = self.passage_scroll.saturating_sub(1);
    }

    pub fn passage_half_page_down(&mut self) {
        let half_page = self.passage_height / 2;
        let max = self.total_passage_lines.saturating_sub(self.passage_height);
        self.passage_scroll = (self.passage_scroll + half_page).min(max);
    }

    pub fn passage_half_page_up(&mut self) {
        let half_page = self.passage_height / 2;
        self.passage_scroll = self.passage_scroll.saturating_sub(half_page);
    }

    // Chat scrolling
    pub fn chat_scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn chat_scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Keep the newest chat content (or the thinking indicator) visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.session.messages.iter().skip(1) {
            total_lines += 1; // Role line ("You:" or "AI:")
            for line in msg.content.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.awaiting_reply {
            total_lines += 1; // "AI:" label
            if self.pending_reply.is_empty() {
                total_lines += 1; // "Thinking..." line
            } else {
                for line in self.pending_reply.lines() {
                    let char_count = line.chars().count();
                    total_lines += ((char_count / wrap_width) + 1).max(1) as u16;
                }
            }
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    // Translation picker
    pub fn open_translation_picker(&mut self) {
        let current_idx = Translation::all()
            .iter()
            .position(|t| *t == self.translation)
            .unwrap_or(0);
        self.translation_state.select(Some(current_idx));
        self.show_translation_picker = true;
    }

    pub fn translation_picker_nav_down(&mut self) {
        let len = Translation::all().len();
        let i = self.translation_state.selected().unwrap_or(0);
        self.translation_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn translation_picker_nav_up(&mut self) {
        let i = self.translation_state.selected().unwrap_or(0);
        self.translation_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_translation(&mut self) {
        if let Some(i) = self.translation_state.selected() {
            if let Some(&translation) = Translation::all().get(i) {
                self.translation = translation;
                self.show_translation_picker = false;
                // Save to config
                let _ = Config::save_default_translation(translation.code());
            }
        }
    }

    // Model picker
    pub fn open_model_picker(&mut self) {
        self.available_models = OpenAIClient::list_models();
        let current_idx = self
            .available_models
            .iter()
            .position(|m| m == &self.selected_model)
            .unwrap_or(0);
        self.model_picker_state.select(Some(current_idx));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = self.available_models.get(i) {
                self.selected_model = model.clone();
                self.show_model_picker = false;
                // Save to config
                let _ = Config::save_default_model(&self.selected_model);
            }
        }
    }
}
