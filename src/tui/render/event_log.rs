use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::app::App;
use crate::util::unicode::truncate_to_width;

/// Render bus traffic, newest at the bottom
pub fn render_event_log(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(Style::default().fg(app.theme.dim).bg(bg))
        .style(Style::default().bg(bg));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width as usize;
    let rows = inner.height as usize;
    let text_style = Style::default().fg(app.theme.text).bg(bg);
    let dim_style = Style::default().fg(app.theme.dim).bg(bg);

    let lines: Vec<Line> = if app.event_log.is_empty() {
        vec![
            Line::from(Span::styled(" No events yet", dim_style)),
            Line::from(Span::styled(
                " 1-4 post  x confirm  a api error",
                dim_style,
            )),
        ]
    } else {
        let skip = app.event_log.len().saturating_sub(rows);
        app.event_log
            .iter()
            .skip(skip)
            .map(|entry| {
                Line::from(Span::styled(
                    truncate_to_width(&format!(" {entry}"), width),
                    text_style,
                ))
            })
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(bg)), inner);
}
