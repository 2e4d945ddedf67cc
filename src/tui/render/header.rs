use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::MessageKind;
use crate::tui::app::App;
use crate::util::unicode::display_width;

/// Render the header: active count per kind, panel filter on the right
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;
    let counts = app.service.active_counts();
    let policies = app.service.policies();

    let mut spans = vec![Span::styled(
        " notices ",
        Style::default()
            .fg(app.theme.highlight)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )];
    for kind in MessageKind::ALL {
        let policy = policies.get(kind);
        let count = counts.of(kind);
        let fg = if count == 0 {
            app.theme.dim
        } else {
            app.theme.message_color(&policy.color)
        };
        spans.push(Span::styled(
            format!(" {} {}", policy.icon, count),
            Style::default().fg(fg).bg(bg),
        ));
    }

    let right = if app.panel_open {
        format!("[{}] ", app.filter.label())
    } else {
        "m panel ".to_string()
    };
    let used: usize = spans.iter().map(|s| display_width(&s.content)).sum();
    let right_w = display_width(&right);
    if used + right_w < width {
        spans.push(Span::styled(
            " ".repeat(width - used - right_w),
            Style::default().bg(bg),
        ));
        spans.push(Span::styled(right, Style::default().fg(app.theme.dim).bg(bg)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
