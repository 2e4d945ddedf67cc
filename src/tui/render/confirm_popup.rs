use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::model::{Emphasis, Message};
use crate::tui::app::App;

/// Render the prompt for a confirmation still waiting on the user
pub fn render_confirm_popup(frame: &mut Frame, app: &App, message: &Message, area: Rect) {
    let Some(prompt) = &message.confirm else {
        return;
    };

    let bg = app.theme.background;
    let highlight = app.theme.highlight;
    let danger = prompt.emphasis == Emphasis::Danger;

    let header_style = Style::default()
        .fg(if danger { app.theme.red } else { highlight })
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let text_style = Style::default().fg(app.theme.text).bg(bg);
    let dim_style = Style::default().fg(app.theme.dim).bg(bg);
    let accept_style = if danger {
        Style::default()
            .fg(app.theme.text_bright)
            .bg(app.theme.red)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(app.theme.text_bright)
            .bg(bg)
            .add_modifier(Modifier::BOLD)
    };

    let popup_w: u16 = 50.min(area.width.saturating_sub(2));

    let mut lines: Vec<Line> = Vec::new();

    let title = message.title.as_deref().unwrap_or("Confirm");
    lines.push(Line::from(Span::styled(format!(" {title}"), header_style)));
    lines.push(Line::from(Span::styled("", text_style)));
    for text_line in message.text.lines() {
        lines.push(Line::from(Span::styled(format!("  {text_line}"), text_style)));
    }
    lines.push(Line::from(Span::styled("", text_style)));

    // Key hints
    lines.push(Line::from(vec![
        Span::styled("  ", text_style),
        Span::styled(format!(" {} ", prompt.confirm_label), accept_style),
        Span::styled(" y/Enter   ", dim_style),
        Span::styled(format!("{} ", prompt.cancel_label), text_style),
        Span::styled("n/Esc", dim_style),
    ]));

    let popup_h = ((lines.len() as u16) + 2).min(area.height.saturating_sub(2));

    let overlay_area = centered_rect_fixed(popup_w, popup_h, area);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if danger { app.theme.red } else { highlight }).bg(bg))
        .style(Style::default().bg(bg));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(bg));

    frame.render_widget(paragraph, overlay_area);
}

fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}
