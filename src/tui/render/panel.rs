use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::Message;
use crate::tui::app::App;
use crate::util::unicode::{display_width, first_line, truncate_to_width};

use super::push_highlighted_spans;

/// Action hint shown at the right edge of a row. Dismissed rows get none.
fn row_hint(message: &Message) -> Option<&'static str> {
    if !message.shows_actions() {
        None
    } else if message.is_pending_confirmation() {
        Some("y/n")
    } else {
        Some("d")
    }
}

/// Render the side panel listing messages under the current filter
pub fn render_panel(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;
    let messages = app.visible_messages();
    let search_re = app.active_search_re();

    let header_style = Style::default()
        .fg(app.theme.highlight)
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let dim_style = Style::default().fg(app.theme.dim).bg(bg);

    let mut lines: Vec<Line> = vec![Line::from(vec![
        Span::styled(" Messages", header_style),
        Span::styled(
            format!(" {} ({})", app.filter.label(), messages.len()),
            dim_style,
        ),
    ])];

    if messages.is_empty() {
        lines.push(Line::from(Span::styled(" Nothing here", dim_style)));
    }

    // Keep the cursor row on screen
    let rows = (area.height as usize).saturating_sub(1);
    let offset = (app.cursor + 1).saturating_sub(rows);

    for (i, message) in messages.iter().enumerate().skip(offset).take(rows) {
        let selected = i == app.cursor;
        let row_bg = if selected { app.theme.selection_bg } else { bg };
        let fg = if message.dismissed {
            app.theme.dim
        } else {
            app.theme.text
        };
        let icon_fg = if message.dismissed {
            app.theme.dim
        } else {
            app.theme.message_color(&message.color)
        };
        let base = Style::default().fg(fg).bg(row_bg);
        let match_style = Style::default()
            .fg(app.theme.search_match_fg)
            .bg(app.theme.search_match_bg);

        let hint = row_hint(message);
        let hint_w = hint.map_or(0, |h| display_width(h) + 2);
        let marker = if selected { "\u{258E}" } else { " " };

        let mut spans = vec![
            Span::styled(
                marker,
                Style::default().fg(app.theme.selection_border).bg(row_bg),
            ),
            Span::styled(format!("{} ", message.icon), Style::default().fg(icon_fg).bg(row_bg)),
        ];
        let lead_w = 1 + display_width(&message.icon) + 1;

        let body = match &message.title {
            Some(title) => format!("{}: {}", title, first_line(&message.text)),
            None => first_line(&message.text).to_string(),
        };
        let body = truncate_to_width(&body, width.saturating_sub(lead_w + hint_w));
        let body_w = display_width(&body);
        push_highlighted_spans(&mut spans, &body, base, match_style, search_re.as_ref());

        let fill = width.saturating_sub(lead_w + body_w + hint_w);
        spans.push(Span::styled(" ".repeat(fill), Style::default().bg(row_bg)));
        if let Some(hint) = hint {
            spans.push(Span::styled(
                format!(" {hint} "),
                Style::default().fg(app.theme.dim).bg(row_bg),
            ));
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(bg)), area);
}
