//! App — terminal event loop for the countdown page.
//!
//! Architecture:
//! - `App` owns the four page components and `AppState` (read-only data for them).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks:
//!   terminal input and the PlayerCore broadcast.
//! - The event loop draws a frame when something changed, then awaits the next
//!   message or timer tick.
//! - Components return `Vec<Action>`; App dispatches each Action. A restart goes
//!   out to the PlayerCore through `cmd_tx`; the App never toggles a region on
//!   its own.

use std::io;
use std::time::Duration;

use countdown_proto::config::Config;
use countdown_proto::presentation::{PresentationEvent, Region};
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::Block,
    Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::{
    action::Action,
    app_state::{AppState, Timeline},
    component::Component,
    components::{
        countdown_panel::CountdownPanel, loading_screen::LoadingScreen,
        reload_button::ReloadButton, title_footer::TitleFooter,
    },
    core::CoreEvent,
    theme::C_BG,
    widgets::{progress_bar, status_bar},
    CoreBroadcast,
};

enum AppMessage {
    Event(Event),
    Core(CoreBroadcast),
}

/// Last-drawn rects used for mouse hit-testing.
#[derive(Default, Clone, Copy)]
struct PageAreas {
    countdown: Rect,
    reload: Rect,
    title: Rect,
    progress: Rect,
    status: Rect,
}

impl PageAreas {
    fn split(area: Rect) -> Self {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Fill(1),
                Constraint::Length(4),
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Fill(1),
                Constraint::Length(2),
                Constraint::Length(1),
            ])
            .split(outer[0]);

        Self {
            countdown: body[1],
            reload: body[3],
            title: body[5],
            progress: outer[1],
            status: outer[2],
        }
    }
}

pub struct App {
    pub state: AppState,

    loading_screen: LoadingScreen,
    title_footer: TitleFooter,
    countdown_panel: CountdownPanel,
    reload_button: ReloadButton,

    cmd_tx: mpsc::Sender<CoreEvent>,
    tick_interval: Duration,
    should_quit: bool,
    areas: PageAreas,
}

impl App {
    pub fn new(config: &Config, cmd_tx: mpsc::Sender<CoreEvent>) -> Self {
        Self {
            state: AppState::new(config),
            loading_screen: LoadingScreen::new(),
            title_footer: TitleFooter::new(),
            countdown_panel: CountdownPanel::new(),
            reload_button: ReloadButton::new(),
            cmd_tx,
            tick_interval: config.timing.tick_interval(),
            should_quit: false,
            areas: PageAreas::default(),
        }
    }

    pub async fn run(mut self, broadcast_rx: broadcast::Receiver<CoreBroadcast>) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let result = self.event_loop(&mut terminal, broadcast_rx).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        let _ = self.cmd_tx.send(CoreEvent::Shutdown).await;
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        mut broadcast_rx: broadcast::Receiver<CoreBroadcast>,
    ) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (PlayerCore → AppMessage) ──────
        let bc_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(msg) => {
                        if bc_tx.send(AppMessage::Core(msg)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // ── Periodic timers ───────────────────────────────────────────────────
        let mut countdown_tick = tokio::time::interval(self.tick_interval);
        countdown_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // spinner animation
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!("countdown page running");

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg).await;
                    while let Ok(next) = rx.try_recv() {
                        needs_redraw |= self.handle_message(next).await;
                    }
                }

                _ = countdown_tick.tick() => {
                    self.state.refresh_countdown(chrono::Utc::now());
                    needs_redraw = true;
                }

                _ = ui_tick.tick() => {
                    if self.state.is_visible(Region::Loading) {
                        self.loading_screen.tick(&self.state);
                        needs_redraw = true;
                    }
                }
            }
        }

        Ok(())
    }

    /// Returns `true` when the screen needs a redraw.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return false;
                }
                for action in self.handle_key(key) {
                    self.dispatch(action).await;
                }
                true
            }
            AppMessage::Event(Event::Mouse(mouse)) => {
                let actions = self.handle_mouse(mouse);
                let redraw = !actions.is_empty();
                for action in actions {
                    self.dispatch(action).await;
                }
                redraw
            }
            AppMessage::Event(Event::Resize(..)) => true,
            AppMessage::Event(_) => false,
            AppMessage::Core(CoreBroadcast::Surface { change, visibility }) => {
                debug!("surface: {:?}", change);
                self.state.sync_visibility(visibility);
                true
            }
            AppMessage::Core(CoreBroadcast::Timeline { time_pos, duration }) => {
                self.state.timeline = Timeline { time_pos, duration };
                true
            }
            AppMessage::Core(CoreBroadcast::Health(health)) => {
                self.state.health = health;
                true
            }
            AppMessage::Core(CoreBroadcast::Log(line)) => {
                self.state.last_warning = Some(line);
                true
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return vec![Action::Quit],
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return vec![Action::Quit];
            }
            _ => {}
        }

        if self.state.is_visible(Region::Reload) {
            return self.reload_button.handle_key(key, &self.state);
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        if !self.state.is_visible(Region::Reload) || self.state.is_visible(Region::Loading) {
            return vec![];
        }
        self.reload_button
            .handle_mouse(event, self.areas.reload, &self.state)
    }

    async fn dispatch(&mut self, action: Action) {
        debug!("dispatch {:?}", action);
        match action {
            Action::Quit => self.should_quit = true,
            Action::Restart => {
                let event = CoreEvent::Presentation(PresentationEvent::RestartRequested);
                if self.cmd_tx.send(event).await.is_err() {
                    warn!("restart dropped: player core is gone");
                }
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        self.areas = PageAreas::split(area);
        let areas = self.areas;
        let s = &self.state;

        if s.is_visible(Region::Countdown) {
            self.countdown_panel.draw(frame, areas.countdown, s);
        }
        if s.is_visible(Region::Reload) {
            self.reload_button.draw(frame, areas.reload, s);
        }
        if s.is_visible(Region::Title) {
            self.title_footer.draw(frame, areas.title, s);
        }

        progress_bar::draw_progress(frame, areas.progress, &s.timeline);
        status_bar::draw_status_bar(
            frame,
            areas.status,
            &s.health,
            s.last_warning.as_deref(),
            s.is_visible(Region::Reload),
        );

        // the loading screen sits on top until the core hides it
        if s.is_visible(Region::Loading) {
            self.loading_screen.draw(frame, area, s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use countdown_proto::presentation::{SurfaceChange, Visibility};
    use ratatui::backend::TestBackend;
    use ratatui::crossterm::event::{MouseButton, MouseEventKind};

    fn new_app() -> (App, mpsc::Receiver<CoreEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        (App::new(&Config::default(), cmd_tx), cmd_rx)
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    /// Replay changes the way the core broadcasts them: each one carries the
    /// visibility after it.
    async fn send_changes(app: &mut App, changes: &[SurfaceChange]) {
        let mut visibility = Visibility::default();
        for &change in changes {
            visibility.apply(change);
            app.handle_message(AppMessage::Core(CoreBroadcast::Surface { change, visibility }))
                .await;
        }
    }

    async fn reveal_all(app: &mut App) {
        send_changes(
            app,
            &[
                SurfaceChange::hide(Region::Loading),
                SurfaceChange::show(Region::Title),
                SurfaceChange::show(Region::Countdown),
                SurfaceChange::show(Region::Reload),
            ],
        )
        .await;
    }

    fn key(code: KeyCode) -> AppMessage {
        AppMessage::Event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    #[tokio::test]
    async fn test_loading_screen_hides_content() {
        let (mut app, _cmd_rx) = new_app();
        let text = screen(&mut app);
        assert!(text.contains("geladen"));
        assert!(!text.contains("Tage"));

        reveal_all(&mut app).await;
        let text = screen(&mut app);
        assert!(!text.contains("geladen"));
        assert!(text.contains("Tage"));
        assert!(text.contains("Fischerstiching 2029"));
        assert!(text.contains("Nochmal"));
    }

    #[tokio::test]
    async fn test_title_only_before_countdown() {
        let (mut app, _cmd_rx) = new_app();
        send_changes(
            &mut app,
            &[
                SurfaceChange::hide(Region::Loading),
                SurfaceChange::show(Region::Title),
            ],
        )
        .await;
        let text = screen(&mut app);
        assert!(text.contains("Fischerstiching 2029"));
        assert!(!text.contains("Tage"));
        assert!(!text.contains("Nochmal"));
    }

    #[tokio::test]
    async fn test_missed_changes_resync_from_next_message() {
        let (mut app, _cmd_rx) = new_app();
        // earlier changes lost to a lagged receiver; only the last arrives
        let visibility = Visibility {
            loading_hidden: true,
            title_shown: true,
            countdown_shown: true,
            reload_shown: true,
        };
        app.handle_message(AppMessage::Core(CoreBroadcast::Surface {
            change: SurfaceChange::show(Region::Reload),
            visibility,
        }))
        .await;

        let text = screen(&mut app);
        assert!(!text.contains("geladen"));
        assert!(text.contains("Fischerstiching 2029"));
        assert!(text.contains("Tage"));
        assert!(text.contains("Nochmal"));
    }

    #[tokio::test]
    async fn test_restart_key_only_when_reload_visible() {
        let (mut app, mut cmd_rx) = new_app();
        app.handle_message(key(KeyCode::Char('r'))).await;
        assert!(cmd_rx.try_recv().is_err());

        reveal_all(&mut app).await;
        app.handle_message(key(KeyCode::Enter)).await;
        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(CoreEvent::Presentation(PresentationEvent::RestartRequested))
        ));
    }

    #[tokio::test]
    async fn test_click_on_reload_button() {
        let (mut app, mut cmd_rx) = new_app();
        reveal_all(&mut app).await;
        let _ = screen(&mut app);

        let button = ReloadButton::button_area(app.areas.reload);
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: button.x + 2,
            row: button.y + 1,
            modifiers: KeyModifiers::NONE,
        };
        app.handle_message(AppMessage::Event(Event::Mouse(click))).await;
        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(CoreEvent::Presentation(PresentationEvent::RestartRequested))
        ));
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (mut app, _cmd_rx) = new_app();
        app.handle_message(key(KeyCode::Esc)).await;
        assert!(app.should_quit);

        let (mut app, _cmd_rx) = new_app();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        app.handle_message(AppMessage::Event(Event::Key(ctrl_c))).await;
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_warning_reaches_status_line() {
        let (mut app, _cmd_rx) = new_app();
        reveal_all(&mut app).await;
        app.handle_message(AppMessage::Core(CoreBroadcast::Log(
            "12:00:00 [WARN] video stalled".to_string(),
        )))
        .await;
        assert!(screen(&mut app).contains("video stalled"));
    }
}
