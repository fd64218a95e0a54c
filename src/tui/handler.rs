//! Async event loop for the playground TUI.

use std::io;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use is_terminal::IsTerminal;
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, Interval};
use tracing::{debug, warn};

use crate::{
    config::Config,
    execution::{Dispatcher, ExecutionRequest, Language, Outcome},
    state::StateStore,
    theme,
    utils,
};
use super::{
    app::{App, NotificationKind},
    editor::EditorBuffer,
    events::TuiEvent,
    ui::render_ui,
};

/// Everything the key handlers act on besides the view state.
struct Services {
    dispatcher: Arc<Dispatcher>,
    store: StateStore,
    event_tx: mpsc::UnboundedSender<TuiEvent>,
    save_dir: PathBuf,
    preview_path: PathBuf,
}

/// Run the playground editor
pub async fn run_tui(cfg: &Config, file: Option<&str>, theme_override: Option<&str>) -> Result<()> {
    // Check if we're in a proper terminal environment
    if !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!("TUI mode requires a proper terminal environment"));
    }

    let store = StateStore::from_config(cfg);
    let mut app = build_app(cfg, &store, file, theme_override)?;
    let (event_tx, event_rx) = mpsc::unbounded_channel::<TuiEvent>();
    let mut services = Services {
        dispatcher: Arc::new(Dispatcher::from_config(cfg)),
        store,
        event_tx,
        save_dir: cfg.save_dir(),
        preview_path: cfg.preview_path(),
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &mut services, event_rx, cfg.autosave_interval()).await;

    // Restore terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(DisableBracketedPaste)?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = services.store.save_code(&app.editor.text()) {
        warn!(error = %e, "failed to save code on exit");
    }
    result
}

/// Restores the saved state, then applies the command-line file and theme.
fn build_app(
    cfg: &Config,
    store: &StateStore,
    file: Option<&str>,
    theme_override: Option<&str>,
) -> Result<App> {
    let saved = store.load();
    let mut editor = EditorBuffer::new(cfg.tab_size());
    if let Some(code) = saved.restorable_code() {
        editor.set_text(code);
    }

    let mut language = saved
        .language()
        .or_else(|| cfg.get("DEFAULT_LANGUAGE").and_then(|l| l.parse().ok()))
        .unwrap_or(Language::JavaScript);
    let theme = theme::resolve(
        theme_override
            .or(saved.theme.as_deref())
            .or(cfg.get("DEFAULT_THEME").as_deref()),
    );

    let mut file_name = None;
    if let Some(path) = file {
        editor.set_text(&utils::read_source(path)?);
        if let Some(detected) = utils::language_for_path(path) {
            language = detected;
        }
        file_name = Some(path.to_string());
    }

    let mut app = App::new(editor, language, theme);
    app.file_name = file_name;
    Ok(app)
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    services: &mut Services,
    mut event_rx: mpsc::UnboundedReceiver<TuiEvent>,
    autosave_every: Option<Duration>,
) -> Result<()> {
    // Spawn input handler
    let stop = Arc::new(AtomicBool::new(false));
    let input_stop = stop.clone();
    let input_tx = services.event_tx.clone();
    tokio::task::spawn_blocking(move || {
        while !input_stop.load(Ordering::SeqCst) {
            if !event::poll(Duration::from_millis(100)).unwrap_or(false) {
                continue;
            }
            let forwarded = match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => input_tx.send(TuiEvent::Key(key)),
                Ok(Event::Paste(text)) => input_tx.send(TuiEvent::Paste(text)),
                Ok(Event::Resize(_, _)) => input_tx.send(TuiEvent::Resize),
                _ => Ok(()),
            };
            if forwarded.is_err() {
                break; // Channel closed
            }
        }
    });

    let mut autosave = autosave_every.map(|every| interval_at(tokio::time::Instant::now() + every, every));
    let mut redraw = interval(Duration::from_millis(250));

    let result = loop {
        app.expire_notifications(Instant::now());
        if let Err(e) = terminal.draw(|frame| render_ui(frame, app)) {
            break Err(e.into());
        }

        tokio::select! {
            Some(tui_event) = event_rx.recv() => {
                match tui_event {
                    TuiEvent::Key(key) => {
                        if handle_key_event(app, key, services) {
                            break Ok(());
                        }
                    }
                    TuiEvent::Paste(text) => app.editor.insert_str(&text),
                    TuiEvent::Resize => {}
                    TuiEvent::ExecutionFinished { language, outcome } => {
                        handle_outcome(app, services, language, outcome);
                    }
                    TuiEvent::Quit => break Ok(()),
                }
            }
            _ = next_tick(&mut autosave) => {
                match services.store.autosave(&app.editor.text()) {
                    Ok(true) => debug!("autosaved code"),
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "autosave failed"),
                }
            }
            _ = redraw.tick() => {}
        }
    };

    stop.store(true, Ordering::SeqCst);
    result
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Handle keyboard events. Returns true when the app should quit.
fn handle_key_event(app: &mut App, key: KeyEvent, services: &mut Services) -> bool {
    if app.is_popup_shown() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_new_file(),
            _ => app.hide_popup(),
        }
        return false;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => return app.handle_ctrl_c(),
        KeyCode::Char('q') if ctrl => return true,
        KeyCode::Enter | KeyCode::Char('j') | KeyCode::Char('r') if ctrl => start_run(app, services),
        KeyCode::F(5) => start_run(app, services),
        KeyCode::Char('s') if ctrl => save_file(app, services),
        KeyCode::Char('n') if ctrl => {
            app.request_new_file();
        }
        KeyCode::Char('d') if ctrl => copy_code(app),
        KeyCode::Char('l') if ctrl => switch_language(app, services),
        KeyCode::F(2) => switch_language(app, services),
        KeyCode::Char('t') if ctrl => switch_theme(app, services),
        KeyCode::F(3) => switch_theme(app, services),
        KeyCode::Char('/') | KeyCode::Char('7') if ctrl => {
            if let Some(prefix) = app.language.line_comment() {
                app.editor.toggle_comment(prefix);
            }
        }
        KeyCode::F(1) => app.toggle_help(),
        KeyCode::Esc => {
            if app.show_help {
                app.show_help = false;
            } else {
                app.close_preview();
            }
        }
        KeyCode::Enter => app.editor.insert_newline(),
        KeyCode::Tab => app.editor.insert_tab(),
        KeyCode::Backspace => app.editor.backspace(),
        KeyCode::Delete => app.editor.delete(),
        KeyCode::Left => app.editor.move_left(),
        KeyCode::Right => app.editor.move_right(),
        KeyCode::Up => app.editor.move_up(),
        KeyCode::Down => app.editor.move_down(),
        KeyCode::Home => app.editor.move_home(),
        KeyCode::End => app.editor.move_end(),
        KeyCode::PageUp => app.editor.page_up(app.editor_height),
        KeyCode::PageDown => app.editor.page_down(app.editor_height),
        KeyCode::Char(c) if !ctrl => app.editor.insert_char(c),
        _ => {}
    }
    false
}

fn start_run(app: &mut App, services: &Services) {
    let language = app.language;
    let loading = if language == Language::Python && !services.dispatcher.session().is_live() {
        "Loading Python interpreter..."
    } else {
        "Running..."
    };
    if !app.begin_run(loading) {
        debug!("run already in flight");
        return;
    }

    let request = ExecutionRequest::new(app.editor.text(), language);
    let dispatcher = services.dispatcher.clone();
    let tx = services.event_tx.clone();
    tokio::spawn(async move {
        let outcome = dispatcher.execute(&request).await;
        let _ = tx.send(TuiEvent::ExecutionFinished { language, outcome });
    });
}

fn handle_outcome(app: &mut App, services: &Services, language: Language, outcome: Outcome) {
    match outcome {
        Outcome::Completed(result) => app.finish_run(language, result),
        Outcome::Render(directive) => {
            let path = match directive.write_preview(&services.preview_path) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "failed to write preview page");
                    app.notify("Failed to write preview", NotificationKind::Error);
                    None
                }
            };
            app.show_preview(directive, path);
        }
    }
}

fn save_file(app: &mut App, services: &Services) {
    match utils::save_code(&services.save_dir, app.language, &app.editor.text()) {
        Ok(path) => {
            debug!(path = %path.display(), "saved code");
            app.notify("File saved!", NotificationKind::Success);
        }
        Err(e) => {
            warn!(error = %e, "save failed");
            app.notify("Failed to save file", NotificationKind::Error);
        }
    }
}

fn copy_code(app: &mut App) {
    match utils::copy_to_clipboard(&mut io::stdout(), &app.editor.text()) {
        Ok(()) => app.notify("Code copied to clipboard", NotificationKind::Success),
        Err(e) => {
            warn!(error = %e, "clipboard write failed");
            app.notify("Failed to copy code", NotificationKind::Error);
        }
    }
}

fn switch_language(app: &mut App, services: &Services) {
    let language = app.next_language();
    if let Err(e) = services.store.save_language(language) {
        warn!(error = %e, "failed to save language");
    }
}

fn switch_theme(app: &mut App, services: &Services) {
    let theme = app.next_theme();
    if let Err(e) = services.store.save_theme(theme.id) {
        warn!(error = %e, "failed to save theme");
    }
}
