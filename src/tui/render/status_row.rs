use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::{App, Mode};

const NAVIGATE_HINTS: &str = "j/k move  d dismiss  D clear  / search  f filter  q quit";

/// Pad between `spans` and a right-aligned dim hint, if both fit
fn push_right_hint(spans: &mut Vec<Span<'static>>, hint: &'static str, app: &App, width: usize) {
    let bg = app.theme.background;
    let content_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let hint_width = hint.chars().count();
    if content_width + hint_width < width {
        let padding = width - content_width - hint_width;
        spans.push(Span::styled(" ".repeat(padding), Style::default().bg(bg)));
        spans.push(Span::styled(hint, Style::default().fg(app.theme.dim).bg(bg)));
    }
}

/// Render the status row (bottom of screen)
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;

    let line = match app.mode {
        Mode::Navigate => {
            let mut spans = Vec::new();
            if let Some(ref status) = app.status {
                spans.push(Span::styled(
                    status.clone(),
                    Style::default().fg(app.theme.text_bright).bg(bg),
                ));
            } else if let Some(ref pattern) = app.last_search {
                // Active search shown dimmed
                spans.push(Span::styled(
                    format!("/{}", pattern),
                    Style::default().fg(app.theme.dim).bg(bg),
                ));
            }
            let hint = if app.newest_pending().is_some() {
                "y accept  n reject"
            } else if app.last_search.is_some() {
                "Esc clear search"
            } else {
                NAVIGATE_HINTS
            };
            push_right_hint(&mut spans, hint, app, width);
            Line::from(spans)
        }
        Mode::Search => {
            // Search prompt: /pattern▌
            let mut spans = vec![
                Span::styled(
                    format!("/{}", app.search_input),
                    Style::default().fg(app.theme.text_bright).bg(bg),
                ),
                Span::styled("\u{258C}", Style::default().fg(app.theme.highlight).bg(bg)), // ▌ cursor
            ];
            push_right_hint(&mut spans, "Enter search  Esc cancel", app, width);
            Line::from(spans)
        }
    };

    let paragraph = Paragraph::new(line).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}
