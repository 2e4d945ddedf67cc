use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::app::{App, Mode};

pub(super) fn handle_search(app: &mut App, key: KeyEvent) {
    match (key.modifiers, key.code) {
        // Cancel search
        (_, KeyCode::Esc) => {
            app.mode = Mode::Navigate;
            app.search_input.clear();
        }

        // Execute search
        (_, KeyCode::Enter) => {
            if !app.search_input.is_empty() {
                app.last_search = Some(app.search_input.clone());
            }
            app.mode = Mode::Navigate;
            app.search_input.clear();
            app.cursor = 0;
        }

        (_, KeyCode::Backspace) => {
            if app.search_input.pop().is_none() {
                app.mode = Mode::Navigate;
            }
            app.cursor = 0;
        }

        (m, KeyCode::Char('u')) if m.contains(KeyModifiers::CONTROL) => {
            app.search_input.clear();
        }

        (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => {
            app.search_input.push(c);
            app.cursor = 0;
        }
        _ => {}
    }
}
