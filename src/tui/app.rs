use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use regex::Regex;
use tracing::{info, warn};

use crate::cli::output::{format_duration, format_event};
use crate::io::config_io::{self, ConfigLocation};
use crate::io::state::{PanelFilter, PanelState, read_panel_state, write_panel_state};
use crate::io::watcher::ConfigWatcher;
use crate::io::STATE_DIR;
use crate::model::{Emphasis, Message, MessageKind, NoticeEvent, NoticesConfig, PolicyTable};
use crate::ops::{ConfirmOptions, Confirmation, MessageFilter, MessageService, Subscription};

use super::input;
use super::render;
use super::theme::Theme;

/// Lines kept in the event log
const EVENT_LOG_LIMIT: usize = 200;

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    Search,
}

/// A confirmation this screen asked and is waiting on
pub struct PendingAsk {
    pub subject: String,
    pub confirmation: Confirmation,
}

/// Main application state
pub struct App {
    pub service: MessageService,
    events: Subscription,
    pub mode: Mode,
    pub should_quit: bool,
    pub theme: Theme,
    pub panel_open: bool,
    pub filter: PanelFilter,
    /// Cursor into the visible panel rows
    pub cursor: usize,
    /// Bus traffic, oldest first
    pub event_log: VecDeque<String>,
    /// Search mode: current query being typed
    pub search_input: String,
    /// Last executed search pattern
    pub last_search: Option<String>,
    /// One-shot message for the status row
    pub status: Option<String>,
    pub asks: Vec<PendingAsk>,
    next_issue: u32,
}

impl App {
    pub fn new(service: MessageService, theme: Theme) -> Self {
        let events = service.bus().subscribe();
        App {
            service,
            events,
            mode: Mode::Navigate,
            should_quit: false,
            theme,
            panel_open: false,
            filter: PanelFilter::Active,
            cursor: 0,
            event_log: VecDeque::new(),
            search_input: String::new(),
            last_search: None,
            status: None,
            asks: Vec::new(),
            next_issue: 12,
        }
    }

    /// Get the active search regex for highlighting and filtering.
    /// In Search mode: compiles from current input. In Navigate: compiles from last_search.
    pub fn active_search_re(&self) -> Option<Regex> {
        let pattern = match self.mode {
            Mode::Search if !self.search_input.is_empty() => &self.search_input,
            Mode::Navigate => self.last_search.as_deref()?,
            _ => return None,
        };
        Regex::new(&format!("(?i){}", pattern))
            .or_else(|_| Regex::new(&format!("(?i){}", regex::escape(pattern))))
            .ok()
    }

    /// Messages the panel lists, most recent first
    pub fn visible_messages(&self) -> Vec<Message> {
        let filter = match self.filter {
            PanelFilter::Active => MessageFilter::active(),
            PanelFilter::All => MessageFilter::all(),
            PanelFilter::Dismissed => MessageFilter {
                dismissed: Some(true),
                ..Default::default()
            },
        };
        let mut messages = self.service.list(&filter);
        if let Some(re) = self.active_search_re() {
            messages.retain(|m| {
                re.is_match(&m.text) || m.title.as_deref().is_some_and(|t| re.is_match(t))
            });
        }
        messages
    }

    pub fn selected(&self) -> Option<Message> {
        self.visible_messages().into_iter().nth(self.cursor)
    }

    /// Newest confirmation still waiting on the user
    pub fn newest_pending(&self) -> Option<Message> {
        self.service
            .list(&MessageFilter::active())
            .into_iter()
            .find(Message::is_pending_confirmation)
    }

    pub fn clamp_cursor(&mut self) {
        let count = self.visible_messages().len();
        self.cursor = if count == 0 {
            0
        } else {
            self.cursor.min(count - 1)
        };
    }

    /// Drain bus traffic and settled confirmations. Called every tick.
    pub fn pump(&mut self) {
        for event in self.events.poll() {
            if let NoticeEvent::MessageAdded {
                auto_open: true, ..
            } = &event
            {
                self.panel_open = true;
            }
            self.log(format_event(&event));
        }
        self.collect_answers();
        self.clamp_cursor();
    }

    fn log(&mut self, line: String) {
        self.event_log.push_back(line);
        while self.event_log.len() > EVENT_LOG_LIMIT {
            self.event_log.pop_front();
        }
    }

    fn collect_answers(&mut self) {
        let mut settled = Vec::new();
        self.asks.retain_mut(|ask| match ask.confirmation.try_outcome() {
            Some(accepted) => {
                settled.push((ask.subject.clone(), accepted));
                false
            }
            None => true,
        });
        for (subject, accepted) in settled {
            if accepted {
                self.service.success(format!("{subject} deleted"));
                self.status = Some(format!("Deleted {subject}"));
            } else {
                self.service.info(format!("Kept {subject}"));
                self.status = Some(format!("Kept {subject}"));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    pub fn move_cursor(&mut self, delta: isize) {
        let count = self.visible_messages().len();
        if count == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, count as isize - 1) as usize;
    }

    pub fn dismiss_selected(&mut self) {
        if let Some(message) = self.selected()
            && message.shows_actions()
        {
            self.service.dismiss(message.id);
        }
    }

    pub fn clear_all(&mut self) {
        self.service.clear();
        self.cursor = 0;
        self.status = Some("Cleared all messages".into());
    }

    /// Accept or reject the selected confirmation, or the newest pending one
    pub fn answer(&mut self, accept: bool) {
        let target = self
            .selected()
            .filter(Message::is_pending_confirmation)
            .or_else(|| self.newest_pending());
        let Some(message) = target else {
            self.status = Some("No confirmation waiting".into());
            return;
        };
        if let Some(handle) = message.continuation() {
            if accept {
                handle.accept();
            } else {
                handle.reject();
            }
        }
    }

    pub fn post_sample(&mut self, n: u8) {
        match n {
            1 => self.service.error("Save failed: network timeout"),
            2 => self.service.warning("Disk almost full"),
            3 => self.service.success("Issue saved"),
            _ => self.service.info("3 new comments on ISS-7"),
        };
    }

    /// Ask the user before deleting a (pretend) issue
    pub fn ask_delete_issue(&mut self) {
        let subject = format!("ISS-{}", self.next_issue);
        self.next_issue += 1;
        let confirmation = self.service.confirm(
            format!("Delete issue {subject}? This cannot be undone."),
            ConfirmOptions {
                title: Some("Delete issue".into()),
                confirm_label: "Delete".into(),
                emphasis: Emphasis::Danger,
                ..Default::default()
            },
        );
        self.asks.push(PendingAsk {
            subject,
            confirmation,
        });
    }

    pub fn publish_api_error(&mut self) {
        self.service.bus().publish(NoticeEvent::ApiError {
            operation: "Load issues".into(),
            error: "503 Service Unavailable".into(),
        });
    }

    pub fn toggle_panel(&mut self) {
        self.panel_open = !self.panel_open;
    }

    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
        self.cursor = 0;
    }

    /// Re-read the config after it changed on disk
    pub fn reload_config(&mut self, location: &ConfigLocation) {
        match config_io::load_config(location) {
            Ok(config) => {
                self.apply_config(&config);
                let summary = reload_summary(&config);
                self.service.info(format!("Configuration reloaded ({summary})"));
                info!(path = %location.path.display(), "Configuration reloaded");
            }
            Err(e) => {
                warn!(error = %e, "Configuration reload failed");
                self.service.error(format!("Configuration reload failed: {e}"));
            }
        }
    }

    pub fn apply_config(&mut self, config: &NoticesConfig) {
        self.service.apply_config(config);
        self.theme = Theme::from_config(&config.ui);
    }
}

fn reload_summary(config: &NoticesConfig) -> String {
    let policies = PolicyTable::from_config(&config.kinds);
    let warning = policies.get(MessageKind::Warning);
    format!(
        "capacity {}, warnings dismiss after {}",
        config.store.capacity,
        format_duration(warning.dismiss_delay)
    )
}

/// Restore panel state from .notices/state.json
pub fn restore_panel_state(app: &mut App, root: &Path, config: &NoticesConfig) {
    match read_panel_state(root) {
        Some(state) => {
            app.panel_open = state.panel_open;
            app.filter = state.filter;
            app.last_search = state.last_search;
        }
        None => app.panel_open = config.ui.panel_open,
    }
}

/// Save panel state to .notices/state.json
pub fn save_panel_state(app: &App, root: &Path) {
    let state = PanelState {
        panel_open: app.panel_open,
        filter: app.filter,
        last_search: app.last_search.clone(),
    };
    if let Err(e) = write_panel_state(root, &state) {
        warn!(error = %e, "Could not save panel state");
    }
}

/// Run the TUI application
pub fn run(dir: Option<&str>, config_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let start = match dir {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };
    let explicit = config_path.map(|p| start.join(p));
    let location = config_io::locate_config(&start, explicit.as_deref());
    let config = config_io::load_config(&location)?;
    let root: PathBuf = location.root.clone();

    if let Err(e) = crate::logging::init_file(&root.join(STATE_DIR)) {
        eprintln!("warning: logging disabled: {}", e);
    }

    // Timers and the api-error bridge run here; the UI loop stays synchronous
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()?;
    let _guard = runtime.enter();

    let service = MessageService::new(&config);
    let _bridge = service.attach_api_errors();
    let mut app = App::new(service, Theme::from_config(&config.ui));
    restore_panel_state(&mut app, &root, &config);

    let watcher = match ConfigWatcher::start(&location.path) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "Config watcher unavailable, hot reload disabled");
            None
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app, watcher.as_ref(), &location);

    save_panel_state(&app, &root);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    watcher: Option<&ConfigWatcher>,
    location: &ConfigLocation,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut save_counter = 0u32;
    loop {
        app.pump();
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(Duration::from_millis(250))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            input::handle_key(app, key);
            // Debounced state save: every ~5 key presses
            save_counter += 1;
            if save_counter >= 5 {
                save_panel_state(app, &location.root);
                save_counter = 0;
            }
        }

        if watcher.and_then(ConfigWatcher::poll).is_some() {
            app.reload_config(location);
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
