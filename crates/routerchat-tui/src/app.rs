use std::sync::Arc;

use ratatui::layout::Rect;
use ratatui::widgets::Paragraph;
use routerchat_core::{ChatSession, Completer, Completion};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in chars, not bytes

    // Conversation
    pub session: ChatSession,
    pub completer: Arc<dyn Completer>,
    pub model: String,
    pub pending: Option<JoinHandle<Completion>>,

    // Transcript viewport
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(completer: Arc<dyn Completer>, model: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            input: String::new(),
            cursor: 0,
            session: ChatSession::new(),
            completer,
            model: model.into(),
            pending: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            animation_frame: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_awaiting()
    }

    /// Start a turn with the current input and send it in the background.
    ///
    /// Returns `false` when nothing was dispatched (blank input, or a reply
    /// is still pending).
    pub fn submit_input(&mut self) -> bool {
        let Some(history) = self.session.begin_turn(&self.input) else {
            return false;
        };

        self.input.clear();
        self.cursor = 0;
        self.animation_frame = 0;

        let completer = Arc::clone(&self.completer);
        self.pending = Some(tokio::spawn(async move { completer.complete(&history).await }));

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_to_bottom();
        true
    }

    /// Record the reply once the background request has finished.
    pub async fn poll_pending(&mut self) {
        let finished = self.pending.as_ref().is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.pending.take() {
            let completion = match task.await {
                Ok(completion) => completion,
                Err(e) => {
                    warn!(error = %e, "completion task did not finish");
                    Completion::Failed(e.to_string())
                }
            };
            self.session.finish_turn(completion);
            self.scroll_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Number of rendered lines the transcript takes at the current width,
    /// wrapped exactly as the chat widget wraps it.
    pub fn transcript_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };

        let rows = Paragraph::new(ui::transcript_text(self))
            .wrap(ui::TRANSCRIPT_WRAP)
            .line_count(wrap_width);
        u16::try_from(rows).unwrap_or(u16::MAX)
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.transcript_lines().saturating_sub(visible_height)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }
}
