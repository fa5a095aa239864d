//! Application state management

use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::answer::Question;
use crate::config::Config;
use crate::llm::Panel;
use crate::report::Report;

/// Focus areas in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Answers,
    Merged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Working,
    Complete,
    Rejected,
}

/// Application state
pub struct App {
    /// Configuration
    pub config: Config,

    /// Current question input
    pub input: String,

    /// Cursor position in input, in chars
    pub cursor: usize,

    /// Result of the last completed question
    pub report: Option<Report>,

    /// Scroll position of the three answer panes
    pub answer_scroll: u16,

    /// Scroll position of the merged answer pane
    pub merged_scroll: u16,

    /// Current focus
    pub focus: Focus,

    /// Providers asked for every question
    pub panel: Panel,

    /// Current status
    pub status: Status,
}

impl App {
    pub fn new(config: Config, initial_question: Option<String>) -> Self {
        let panel = Panel::new(&config);
        Self::with_panel(config, panel, initial_question)
    }

    pub fn with_panel(config: Config, panel: Panel, initial_question: Option<String>) -> Self {
        let input = initial_question.unwrap_or_default();
        let cursor = input.chars().count();

        Self {
            config,
            input,
            cursor,
            report: None,
            answer_scroll: 0,
            merged_scroll: 0,
            focus: Focus::Input,
            panel,
            status: Status::Idle,
        }
    }

    /// Validate the input and mark the app busy.
    ///
    /// Returns `None` when a question is already running or the input is
    /// blank; a blank input sets [`Status::Rejected`] and asks nothing.
    pub fn begin_submit(&mut self) -> Option<Question> {
        if self.status == Status::Working {
            return None;
        }

        match Question::new(&self.input) {
            Ok(question) => {
                self.status = Status::Working;
                Some(question)
            }
            Err(_) => {
                self.status = Status::Rejected;
                None
            }
        }
    }

    /// Run the panel for a question accepted by [`App::begin_submit`].
    pub async fn finish_submit(&mut self, question: Question) {
        info!(question = question.as_str(), "Comparing answers");

        let report = self.panel.run(&question).await;
        self.report = Some(report);
        self.answer_scroll = 0;
        self.merged_scroll = 0;
        self.status = Status::Complete;
    }

    /// Navigate to next focus area
    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::Answers,
            Focus::Answers => Focus::Merged,
            Focus::Merged => Focus::Input,
        };
    }

    /// Navigate to previous focus area
    pub fn prev_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::Merged,
            Focus::Answers => Focus::Input,
            Focus::Merged => Focus::Answers,
        };
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    /// Input character at cursor
    pub fn input_char(&mut self, c: char) {
        if self.focus == Focus::Input {
            let offset = self.byte_offset(self.cursor);
            self.input.insert(offset, c);
            self.cursor += 1;
        }
    }

    /// Delete character before cursor
    pub fn delete_char(&mut self) {
        if self.focus == Focus::Input && self.cursor > 0 {
            self.cursor -= 1;
            let offset = self.byte_offset(self.cursor);
            self.input.remove(offset);
        }
    }

    /// Move cursor left
    pub fn move_cursor_left(&mut self) {
        if self.focus == Focus::Input && self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// Move cursor right
    pub fn move_cursor_right(&mut self) {
        if self.focus == Focus::Input && self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    /// Terminal column of the cursor inside the input box
    pub fn cursor_column(&self) -> u16 {
        let prefix = &self.input[..self.byte_offset(self.cursor)];
        prefix.width() as u16
    }

    /// Scroll the focused pane up
    pub fn scroll_up(&mut self) {
        match self.focus {
            Focus::Answers => self.answer_scroll = self.answer_scroll.saturating_sub(1),
            Focus::Merged => self.merged_scroll = self.merged_scroll.saturating_sub(1),
            Focus::Input => {}
        }
    }

    /// Scroll the focused pane down
    pub fn scroll_down(&mut self) {
        match self.focus {
            Focus::Answers => self.answer_scroll = self.answer_scroll.saturating_add(1),
            Focus::Merged => self.merged_scroll = self.merged_scroll.saturating_add(1),
            Focus::Input => {}
        }
    }
}
