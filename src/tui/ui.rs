//! UI layout and rendering logic for the TUI.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::app::{App, NotificationKind, OutputPane, PopupState, PreviewState};
use crate::printer;
use crate::utils::unicode::display_width_to;

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &mut App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(3),    // Editor and output
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_layout[1]);

    render_header(frame, app, main_layout[0]);
    render_editor(frame, app, panes[0]);
    match &app.preview {
        Some(preview) => render_preview(frame, app, preview, panes[1]),
        None => render_output(frame, app, panes[1]),
    }
    render_status_bar(frame, app, main_layout[2]);
    render_notifications(frame, app);

    // Render help overlay if requested
    if app.show_help {
        render_help_overlay(frame, app);
    }

    if app.popup_state == PopupState::ConfirmNewFile {
        render_confirm_popup(frame, app);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let palette = app.theme.palette;
    let mut spans = vec![
        Span::styled(
            format!(" {} ", app.language),
            Style::default().fg(palette.background).bg(palette.accent).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(app.theme.name, Style::default().fg(palette.foreground)),
    ];
    if let Some(name) = &app.file_name {
        spans.push(Span::styled(format!("  {name}"), Style::default().fg(palette.gutter)));
    }
    let run = if app.running { "running..." } else { app.run_label() };
    spans.push(Span::styled(format!("  [{run}]"), Style::default().fg(palette.success)));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.background));
    frame.render_widget(header, area);
}

/// Render the editor with line numbers and the active line highlighted
fn render_editor(frame: &mut Frame, app: &mut App, area: Rect) {
    let palette = app.theme.palette;
    let height = area.height.saturating_sub(2) as usize; // Account for borders
    app.editor_height = height.max(1);
    app.editor.scroll_into_view(height);

    let lines = app.editor.lines();
    let gutter_width = lines.len().to_string().len().max(3);
    let visible: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(app.editor.scroll)
        .take(height)
        .map(|(i, text)| {
            let active = i == app.editor.row;
            let mut style = Style::default().fg(palette.foreground);
            if active {
                style = style.bg(palette.active_line);
            }
            Line::from(vec![
                Span::styled(
                    format!("{:>width$} ", i + 1, width = gutter_width),
                    Style::default().fg(if active { palette.accent } else { palette.gutter }),
                ),
                Span::styled(text.clone(), style),
            ])
            .style(style)
        })
        .collect();

    let title = match &app.file_name {
        Some(name) => format!("Editor - {name}"),
        None => "Editor".to_string(),
    };
    let editor = Paragraph::new(Text::from(visible)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(palette.gutter))
            .style(Style::default().bg(palette.background)),
    );
    frame.render_widget(editor, area);

    if app.popup_state == PopupState::None && !app.show_help {
        let line = &lines[app.editor.row];
        let x = area.x + 1 + gutter_width as u16 + 1 + display_width_to(line, app.editor.col) as u16;
        let y = area.y + 1 + app.editor.row.saturating_sub(app.editor.scroll) as u16;
        if x < area.right().saturating_sub(1) && y < area.bottom().saturating_sub(1) {
            frame.set_cursor_position((x, y));
        }
    }
}

fn render_output(frame: &mut Frame, app: &App, area: Rect) {
    let palette = app.theme.palette;
    let text = match &app.output {
        OutputPane::Empty => Text::from(Line::styled(
            format!("Press Ctrl+Enter or F5 to {}", app.run_label().to_lowercase()),
            Style::default().fg(palette.gutter),
        )),
        OutputPane::Loading(message) => {
            Text::from(Line::styled(message.clone(), Style::default().fg(palette.accent)))
        }
        OutputPane::Finished { language, result } => {
            let mut lines: Vec<Line> = printer::result_lines(*language, result)
                .into_iter()
                .map(|l| Line::styled(l, Style::default().fg(palette.foreground)))
                .collect();
            let head = if result.succeeded { palette.success } else { palette.error };
            if let Some(first) = lines.first_mut() {
                *first = first.clone().style(Style::default().fg(head).add_modifier(Modifier::BOLD));
            }
            if let Some(last) = lines.last_mut() {
                *last = last.clone().style(Style::default().fg(palette.gutter));
            }
            Text::from(lines)
        }
    };

    let output = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Output")
                .border_style(Style::default().fg(palette.gutter))
                .style(Style::default().bg(palette.background)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(output, area);
}

fn render_preview(frame: &mut Frame, app: &App, preview: &PreviewState, area: Rect) {
    let palette = app.theme.palette;
    let mut lines = vec![Line::styled(
        match &preview.path {
            Some(path) => format!("Preview written to {}", path.display()),
            None => "Preview could not be written".to_string(),
        },
        Style::default().fg(palette.success).add_modifier(Modifier::BOLD),
    )];
    lines.push(Line::from(""));
    lines.push(Line::styled(
        preview.directive.iframe_markup(),
        Style::default().fg(palette.foreground),
    ));

    let pane = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Preview (Esc to close)")
                .border_style(Style::default().fg(palette.accent))
                .style(Style::default().bg(palette.background)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(pane, area);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_paragraph = Paragraph::new(app.status_message())
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(status_paragraph, area);
}

/// Stack notifications in the top-right corner
fn render_notifications(frame: &mut Frame, app: &App) {
    let area = frame.area();
    for (i, notification) in app.notifications.iter().enumerate() {
        let width = (notification.message.chars().count() as u16 + 4).min(area.width);
        let y = area.y + 1 + (i as u16) * 3;
        if y + 3 > area.bottom() {
            break;
        }
        let rect = Rect::new(area.right().saturating_sub(width), y, width, 3);
        let color = match notification.kind {
            NotificationKind::Success => app.theme.palette.success,
            NotificationKind::Error => app.theme.palette.error,
        };
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(notification.message.as_str())
                .style(Style::default().fg(color))
                .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color))),
            rect,
        );
    }
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Create centered popup area
    let popup_area = centered_rect(70, 70, area);

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let help_lines = vec![
        Line::from("Playground Help"),
        Line::from(""),
        Line::from("Run:"),
        Line::from(format!("  Ctrl+Enter / F5 / Ctrl+R - {}", app.run_label())),
        Line::from("  Esc                     - Close preview or help"),
        Line::from(""),
        Line::from("File:"),
        Line::from("  Ctrl+S     - Save code to a file"),
        Line::from("  Ctrl+N     - New file"),
        Line::from("  Ctrl+D     - Copy code to clipboard"),
        Line::from(""),
        Line::from("Editor:"),
        Line::from("  F2 / Ctrl+L - Switch language"),
        Line::from("  F3 / Ctrl+T - Switch theme"),
        Line::from("  Ctrl+/     - Toggle line comment"),
        Line::from("  Tab        - Indent"),
        Line::from(""),
        Line::from("  F1         - Toggle this help"),
        Line::from("  Ctrl+C x2 / Ctrl+Q - Quit"),
    ];

    let help_paragraph = Paragraph::new(Text::from(help_lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .title_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(help_paragraph, popup_area);
}

fn render_confirm_popup(frame: &mut Frame, app: &App) {
    let popup_area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, popup_area);

    let popup = Paragraph::new(vec![
        Line::from("Create new file?"),
        Line::from("Unsaved changes will be lost. (y/n)"),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("New File")
            .title_style(Style::default().fg(app.theme.palette.accent).add_modifier(Modifier::BOLD)),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
