//! TUI application state management.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::execution::{ExecutionResult, Language, RenderDirective};
use crate::theme::{self, Theme};

use super::editor::EditorBuffer;

const NOTIFICATION_TTL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub shown_at: Instant,
}

/// What the output pane currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputPane {
    Empty,
    Loading(String),
    Finished { language: Language, result: ExecutionResult },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewState {
    pub directive: RenderDirective,
    pub path: Option<PathBuf>,
}

/// Popup display state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupState {
    None,
    ConfirmNewFile,
}

/// Application state for the TUI
#[derive(Debug)]
pub struct App {
    pub editor: EditorBuffer,
    pub language: Language,
    pub theme: &'static Theme,
    /// Name of the file opened from the command line, if any.
    pub file_name: Option<String>,
    pub output: OutputPane,
    pub preview: Option<PreviewState>,
    /// A run is in flight; further run requests are ignored.
    pub running: bool,
    pub show_help: bool,
    pub popup_state: PopupState,
    pub notifications: VecDeque<Notification>,
    /// Editor rows visible in the last frame, used for paging.
    pub editor_height: usize,
    /// Timestamp of last Ctrl+C press for double Ctrl+C detection
    pub last_ctrl_c_time: Option<Instant>,
}

impl App {
    pub fn new(editor: EditorBuffer, language: Language, theme: &'static Theme) -> Self {
        Self {
            editor,
            language,
            theme,
            file_name: None,
            output: OutputPane::Empty,
            preview: None,
            running: false,
            show_help: false,
            popup_state: PopupState::None,
            notifications: VecDeque::new(),
            editor_height: 20,
            last_ctrl_c_time: None,
        }
    }

    pub fn run_label(&self) -> &'static str {
        self.language.run_label()
    }

    /// Switches language; leaving HTML closes any open preview.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
        if language != Language::Html {
            self.preview = None;
        }
    }

    pub fn next_language(&mut self) -> Language {
        let next = self.language.next();
        self.set_language(next);
        next
    }

    pub fn next_theme(&mut self) -> &'static Theme {
        self.theme = theme::next(self.theme);
        self.theme
    }

    /// Marks a run as started; returns false when one is already in flight.
    pub fn begin_run(&mut self, loading_message: &str) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        if self.language != Language::Html {
            self.preview = None;
            self.output = OutputPane::Loading(loading_message.to_string());
        }
        self.show_help = false;
        true
    }

    pub fn finish_run(&mut self, language: Language, result: ExecutionResult) {
        self.running = false;
        self.output = OutputPane::Finished { language, result };
    }

    pub fn show_preview(&mut self, directive: RenderDirective, path: Option<PathBuf>) {
        self.running = false;
        self.preview = Some(PreviewState { directive, path });
    }

    pub fn close_preview(&mut self) {
        self.preview = None;
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: NotificationKind) {
        self.notifications.push_back(Notification {
            message: message.into(),
            kind,
            shown_at: Instant::now(),
        });
    }

    /// Drops notifications older than their display time.
    pub fn expire_notifications(&mut self, now: Instant) {
        while let Some(front) = self.notifications.front() {
            if now.duration_since(front.shown_at) >= NOTIFICATION_TTL {
                self.notifications.pop_front();
            } else {
                break;
            }
        }
    }

    /// Clears the buffer, asking first when it holds anything.
    /// Returns true when the buffer was cleared right away.
    pub fn request_new_file(&mut self) -> bool {
        if self.editor.is_blank() {
            self.editor.set_text("");
            true
        } else {
            self.popup_state = PopupState::ConfirmNewFile;
            false
        }
    }

    pub fn confirm_new_file(&mut self) {
        self.popup_state = PopupState::None;
        self.editor.set_text("");
        self.file_name = None;
        self.notify("New file created", NotificationKind::Success);
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn hide_popup(&mut self) {
        self.popup_state = PopupState::None;
    }

    pub fn is_popup_shown(&self) -> bool {
        self.popup_state != PopupState::None
    }

    /// Handle Ctrl+C press and detect double press for quit
    /// Returns true if should quit (double Ctrl+C), false otherwise
    pub fn handle_ctrl_c(&mut self) -> bool {
        const DOUBLE_CTRL_C_TIMEOUT: Duration = Duration::from_millis(500);

        let now = Instant::now();
        if let Some(last_time) = self.last_ctrl_c_time {
            if now.duration_since(last_time) <= DOUBLE_CTRL_C_TIMEOUT {
                self.last_ctrl_c_time = None;
                return true;
            }
        }
        self.last_ctrl_c_time = Some(now);
        self.notify("Press Ctrl+C again to quit", NotificationKind::Success);
        false
    }

    pub fn status_message(&self) -> String {
        let state = if self.running { "running" } else { "ready" };
        format!(
            "{} | {} | {} | F1 help | Ctrl+Enter/F5 {}",
            self.language,
            self.theme.name,
            state,
            self.run_label()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(EditorBuffer::new(4), Language::JavaScript, theme::resolve(None))
    }

    fn result() -> ExecutionResult {
        ExecutionResult {
            succeeded: true,
            output: String::new(),
            error: None,
            error_kind: None,
            elapsed_ms: 0.5,
            included_bootstrap: false,
        }
    }

    #[test]
    fn leaving_html_closes_the_preview() {
        let mut app = app();
        app.set_language(Language::Html);
        assert_eq!(app.run_label(), "Preview");
        app.show_preview(RenderDirective::new("<p></p>"), None);
        app.set_language(Language::Python);
        assert!(app.preview.is_none());
        assert_eq!(app.run_label(), "Run");
    }

    #[test]
    fn second_run_is_refused_while_running() {
        let mut app = app();
        assert!(app.begin_run("Running..."));
        assert!(!app.begin_run("Running..."));
        app.finish_run(Language::JavaScript, result());
        assert!(app.begin_run("Running..."));
    }

    #[test]
    fn new_file_asks_only_when_buffer_has_content() {
        let mut app = app();
        assert!(app.request_new_file());
        app.editor.insert_str("let x = 1");
        assert!(!app.request_new_file());
        assert!(app.is_popup_shown());
        app.confirm_new_file();
        assert!(app.editor.is_blank());
        assert!(!app.is_popup_shown());
    }

    #[test]
    fn notifications_expire() {
        let mut app = app();
        app.notify("File saved!", NotificationKind::Success);
        app.expire_notifications(Instant::now());
        assert_eq!(app.notifications.len(), 1);
        app.expire_notifications(Instant::now() + NOTIFICATION_TTL);
        assert!(app.notifications.is_empty());
    }

    #[test]
    fn double_ctrl_c_quits() {
        let mut app = app();
        assert!(!app.handle_ctrl_c());
        assert!(app.handle_ctrl_c());
    }
}
