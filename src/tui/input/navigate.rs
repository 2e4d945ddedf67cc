use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::app::{App, Mode};

pub(super) fn handle_navigate(app: &mut App, key: KeyEvent) {
    // A visible confirmation prompt takes Enter and Esc
    let prompt_open = app.newest_pending().is_some();

    match (key.modifiers, key.code) {
        (_, KeyCode::Char('q')) => app.should_quit = true,
        (m, KeyCode::Char('c')) if m.contains(KeyModifiers::CONTROL) => app.should_quit = true,

        (_, KeyCode::Char('j') | KeyCode::Down) => app.move_cursor(1),
        (_, KeyCode::Char('k') | KeyCode::Up) => app.move_cursor(-1),
        (_, KeyCode::Char('g') | KeyCode::Home) => app.cursor = 0,
        (_, KeyCode::Char('G') | KeyCode::End) => app.move_cursor(isize::MAX / 2),

        (_, KeyCode::Char('d')) => app.dismiss_selected(),
        (_, KeyCode::Char('D')) => app.clear_all(),
        (_, KeyCode::Char('y')) => app.answer(true),
        (_, KeyCode::Char('n')) => app.answer(false),
        (_, KeyCode::Enter) if prompt_open => app.answer(true),
        (_, KeyCode::Esc) if prompt_open => app.answer(false),

        (_, KeyCode::Char(c @ '1'..='4')) => app.post_sample(c as u8 - b'0'),
        (_, KeyCode::Char('x')) => app.ask_delete_issue(),
        (_, KeyCode::Char('a')) => app.publish_api_error(),

        (_, KeyCode::Char('m')) => app.toggle_panel(),
        (_, KeyCode::Char('f') | KeyCode::Tab) => app.cycle_filter(),

        (_, KeyCode::Char('/')) => {
            app.mode = Mode::Search;
            app.search_input.clear();
        }
        (_, KeyCode::Esc) => {
            app.last_search = None;
            app.cursor = 0;
        }
        _ => {}
    }
}
