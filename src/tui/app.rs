use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    any::Any,
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::error;

use crate::agent::{AgentClient, AgentError, AgentResponse};
use crate::chat::{ChatSession, PendingSend, PROMPT_SUGGESTIONS};
use crate::clipboard::{Clipboard, SystemClipboard};
use crate::config::AppConfig;
use crate::tui::ui::render_ui;

/// Lines moved per PageUp/PageDown
const SCROLL_STEP: u16 = 5;

type Reply = (PendingSend, Result<AgentResponse, AgentError>);

/// Input mode for the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Which pane receives key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Sidebar,
}

/// TUI Application state
pub struct WorkloadApp {
    config: AppConfig,
    session: ChatSession,
    client: Arc<dyn AgentClient>,
    clipboard: Box<dyn Clipboard>,

    // Agent replies come back from spawned tasks through here
    replies_tx: UnboundedSender<Reply>,
    replies_rx: UnboundedReceiver<Reply>,

    // Input state
    input: String,
    input_history: Vec<String>,
    input_history_index: usize,
    input_mode: InputMode,

    // Layout state
    focus: Focus,
    sidebar_visible: bool,
    sidebar_selected: usize,
    scroll: u16,
    tick: usize,

    fault: Option<String>,
    should_quit: bool,
}

impl WorkloadApp {
    pub fn new(config: AppConfig, client: Arc<dyn AgentClient>, clipboard: Box<dyn Clipboard>) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        let session = ChatSession::new(config.agent_id.clone());

        Self {
            config,
            session,
            client,
            clipboard,
            replies_tx,
            replies_rx,
            input: String::new(),
            input_history: Vec::new(),
            input_history_index: 0,
            input_mode: InputMode::Editing,
            focus: Focus::Input,
            sidebar_visible: true,
            sidebar_selected: 0,
            scroll: 0,
            tick: 0,
            fault: None,
            should_quit: false,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn agent_name(&self) -> &str {
        &self.config.agent_name
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    pub fn sidebar_selected(&self) -> usize {
        self.sidebar_selected
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Whether the empty state with suggestions is on screen
    pub fn shows_empty_state(&self) -> bool {
        let empty = self
            .session
            .active()
            .map_or(true, |c| c.messages.is_empty());
        empty && !self.session.is_busy()
    }

    /// Record a caught failure; the fallback screen replaces the UI until reset.
    pub fn set_fault(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(%message, "ui fault");
        self.fault = Some(message);
    }

    fn reset_fault(&mut self) {
        self.fault = None;
        self.input_mode = InputMode::Editing;
        self.focus = Focus::Input;
    }

    /// Dispatch a key press. Errors end up on the fault screen.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        if self.fault.is_some() {
            match key.code {
                KeyCode::Char('r') => self.reset_fault(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return Ok(());
        }

        if ctrl {
            match key.code {
                KeyCode::Char('n') => self.new_conversation(),
                KeyCode::Char('b') => self.toggle_sidebar(),
                KeyCode::Char('s') => self.toggle_samples(),
                KeyCode::Char('y') => self.copy_last_reply(Instant::now()),
                KeyCode::Char('r') => self.retry_last_error()?,
                _ => {}
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Tab => {
                self.toggle_focus();
                return Ok(());
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_add(SCROLL_STEP);
                return Ok(());
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_sub(SCROLL_STEP);
                return Ok(());
            }
            _ => {}
        }

        match self.focus {
            Focus::Sidebar => self.handle_sidebar_key(key),
            Focus::Input => match self.input_mode {
                InputMode::Normal => self.handle_normal_key(key),
                InputMode::Editing => self.handle_editing_key(key),
            },
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) -> Result<()> {
        let count = self.session.displayed().len();
        match key.code {
            KeyCode::Up => {
                self.sidebar_selected = self.sidebar_selected.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.sidebar_selected + 1 < count {
                    self.sidebar_selected += 1;
                }
            }
            KeyCode::Enter => {
                let id = self
                    .session
                    .displayed()
                    .get(self.sidebar_selected)
                    .map(|c| c.id.clone());
                if let Some(id) = id {
                    self.session.select(&id);
                    self.scroll = 0;
                }
                self.focus = Focus::Input;
            }
            KeyCode::Esc => self.focus = Focus::Input,
            _ => {}
        }
        Ok(())
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('e') | KeyCode::Char('i') => self.input_mode = InputMode::Editing,
            KeyCode::Char(c @ '1'..='3') if self.shows_empty_state() => {
                let index = c as usize - '1' as usize;
                if let Some(suggestion) = PROMPT_SUGGESTIONS.get(index) {
                    self.send_text(suggestion)?;
                    self.input_mode = InputMode::Editing;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_editing_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => self.input.push('\n'),
            KeyCode::Enter => self.submit_message()?,
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Up => self.previous_input(),
            KeyCode::Down => self.next_input(),
            _ => {}
        }
        Ok(())
    }

    /// Go to the previous input in history
    fn previous_input(&mut self) {
        if self.input_history.is_empty() {
            return;
        }

        if self.input_history_index > 0 {
            self.input_history_index -= 1;
            self.input = self.input_history[self.input_history_index].clone();
        }
    }

    /// Go to the next input in history
    fn next_input(&mut self) {
        if self.input_history.is_empty() {
            return;
        }

        if self.input_history_index + 1 < self.input_history.len() {
            self.input_history_index += 1;
            self.input = self.input_history[self.input_history_index].clone();
        } else {
            self.input_history_index = self.input_history.len();
            self.input.clear();
        }
    }

    /// Submit the current input as a message
    fn submit_message(&mut self) -> Result<()> {
        if self.input.trim().is_empty() || self.session.is_busy() {
            return Ok(());
        }

        let text = std::mem::take(&mut self.input);
        if self.send_text(&text)? {
            self.input_history.push(text);
            self.input_history_index = self.input_history.len();
        } else {
            self.input = text;
        }
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> Result<bool> {
        match self.session.begin_send(text) {
            Some(pending) => {
                self.scroll = 0;
                self.dispatch(pending)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run the agent call on its own task; the reply arrives on the next tick.
    fn dispatch(&self, pending: PendingSend) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()?;
        let client = Arc::clone(&self.client);
        let replies = self.replies_tx.clone();

        runtime.spawn(async move {
            let outcome = client.call(&pending.request).await;
            // The receiver only goes away when the app is shutting down.
            let _ = replies.send((pending, outcome));
        });
        Ok(())
    }

    fn new_conversation(&mut self) {
        self.session.new_conversation();
        self.input.clear();
        self.input_mode = InputMode::Editing;
        self.focus = Focus::Input;
        self.sidebar_selected = 0;
        self.scroll = 0;
    }

    fn toggle_sidebar(&mut self) {
        self.sidebar_visible = !self.sidebar_visible;
        if !self.sidebar_visible {
            self.focus = Focus::Input;
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => {
                self.sidebar_visible = true;
                self.sidebar_selected = self.active_index();
                Focus::Sidebar
            }
            Focus::Sidebar => Focus::Input,
        };
    }

    fn active_index(&self) -> usize {
        let active = self.session.active_id();
        self.session
            .displayed()
            .iter()
            .position(|c| Some(c.id.as_str()) == active)
            .unwrap_or(0)
    }

    fn toggle_samples(&mut self) {
        let show = !self.session.shows_samples();
        self.session.set_show_samples(show);
        self.sidebar_selected = self.active_index();
        self.scroll = 0;
    }

    fn copy_last_reply(&mut self, now: Instant) {
        let Some((id, content)) = self
            .session
            .last_reply()
            .map(|m| (m.id.clone(), m.content.clone()))
        else {
            return;
        };

        if self.clipboard.copy(&content) {
            self.session.mark_copied(&id, now);
        }
    }

    fn retry_last_error(&mut self) -> Result<()> {
        let Some(error_id) = self.session.last_error_id() else {
            return Ok(());
        };
        if let Some(pending) = self.session.retry(&error_id) {
            self.scroll = 0;
            self.dispatch(pending)?;
        }
        Ok(())
    }

    fn apply_reply(&mut self, pending: PendingSend, outcome: Result<AgentResponse, AgentError>) {
        if self.session.active_id() == Some(pending.conversation_id.as_str()) {
            self.scroll = 0;
        }
        self.session.complete(&pending, outcome);
    }

    /// Periodic housekeeping: collect replies, expire copy feedback, animate.
    pub fn on_tick(&mut self, now: Instant) {
        while let Ok((pending, outcome)) = self.replies_rx.try_recv() {
            self.apply_reply(pending, outcome);
        }

        self.session.expire_copied(now);

        if self.session.is_busy() {
            self.tick = self.tick.wrapping_add(1);
        }
    }
}

/// Puts the terminal back however the loop exits, unwinding included.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run the TUI application
pub async fn run(config: AppConfig, client: Arc<dyn AgentClient>) -> Result<()> {
    // Panics go to the log file; stderr would scribble over the alternate screen.
    panic::set_hook(Box::new(|info| {
        error!(panic = %info, "panic");
    }));

    let guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut app = WorkloadApp::new(config, client, Box::new(SystemClipboard::new()));

    let tick_rate = Duration::from_millis(100);
    let result = run_app(&mut terminal, &mut app, tick_rate).await;

    drop(guard);
    terminal.show_cursor()?;
    let _ = panic::take_hook();

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut WorkloadApp,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        let mut render_fault = None;
        terminal.draw(|f| {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| render_ui(f, app))) {
                render_fault = Some(panic_message(&*payload));
            }
        })?;
        if let Some(message) = render_fault {
            app.set_fault(message);
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Err(err) = app.handle_key(key) {
                        app.set_fault(format!("{:#}", err));
                    }
                }
            }
        }

        if app.should_quit() {
            return Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick(Instant::now());
            last_tick = Instant::now();
        }

        // Let spawned agent calls make progress between frames.
        tokio::task::yield_now().await;
    }
}
