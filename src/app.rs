/// Main TUI application

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::listing::{filter_and_sort, instances, ContainerFilter, SortField, SortSpec};
use crate::core::poller;
use crate::core::series::{hosts, HostFilter};
use crate::core::topology::Topology;
use crate::core::{ContainerRecord, PollerControl, Settings, Snapshot, SnapshotStore};
use crate::screens::Dashboard;

// How long the event loop waits for a key before checking for new snapshots
const INPUT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Overview,
    Containers,
    Graph,
}

impl Screen {
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Overview => "Overview",
            Screen::Containers => "Containers",
            Screen::Graph => "Graph",
        }
    }

    pub fn all() -> &'static [Screen] {
        &[Screen::Overview, Screen::Containers, Screen::Graph]
    }
}

/// Everything the screens need besides the snapshot itself
#[derive(Debug, Clone)]
pub struct ViewState {
    pub screen: Screen,
    pub filter: ContainerFilter,
    pub sort: SortSpec,
    pub host_filter: HostFilter,
    pub selected_index: usize,
    pub show_help: bool,
    pub status_message: Option<String>,
    pub api_base_url: String,
    pub poll_interval: Duration,
}

impl ViewState {
    pub fn new(api_base_url: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            screen: Screen::default(),
            filter: ContainerFilter::default(),
            sort: SortSpec::default(),
            host_filter: HostFilter::default(),
            selected_index: 0,
            show_help: false,
            status_message: None,
            api_base_url: api_base_url.into(),
            poll_interval,
        }
    }
}

pub struct App {
    dashboard: Dashboard,
    snapshots: watch::Receiver<Arc<Snapshot>>,
    snapshot: Arc<Snapshot>,
    control: PollerControl,
    view: ViewState,
    should_quit: bool,
}

impl App {
    pub fn new(store: &SnapshotStore, control: PollerControl, view: ViewState) -> Self {
        let mut snapshots = store.subscribe();
        let snapshot = snapshots.borrow_and_update().clone();

        Self {
            dashboard: Dashboard::new(),
            snapshots,
            snapshot,
            control,
            view,
            should_quit: false,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Containers on the Containers screen, in display order
    pub fn visible_containers(&self) -> Vec<ContainerRecord> {
        filter_and_sort(&self.snapshot.containers, &self.view.filter, &self.view.sort)
    }

    /// Pick up a newly published snapshot, if any
    pub fn sync_snapshot(&mut self) -> bool {
        match self.snapshots.has_changed() {
            Ok(true) => {
                self.snapshot = self.snapshots.borrow_and_update().clone();
                self.on_snapshot_changed();
                true
            }
            _ => false,
        }
    }

    fn on_snapshot_changed(&mut self) {
        // Filters pointing at hosts that disappeared fall back to all
        if let Some(instance) = &self.view.filter.instance {
            if !self.snapshot.containers.iter().any(|c| &c.instance == instance) {
                self.view.filter.instance = None;
            }
        }
        if let HostFilter::Host(host) = &self.view.host_filter {
            if !hosts(&self.snapshot.memory, &self.snapshot.cpu).contains(host) {
                self.view.host_filter = HostFilter::All;
            }
        }

        self.clamp_selection();
        self.view.status_message = None;
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        enter_alternate_screen(&mut stdout, disable_raw_mode)?;
        let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                let _ = disable_raw_mode();
                return Err(e.into());
            }
        };

        let result = self.run_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn run_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            if self.sync_snapshot() {
                debug!(tick = self.snapshot.tick, "snapshot received");
            }

            terminal.draw(|f| self.render(f))?;

            if event::poll(INPUT_POLL)? {
                if let Event::Key(key_event) = event::read()? {
                    if key_event.kind == KeyEventKind::Press {
                        self.handle_key(key_event);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    pub fn handle_key(&mut self, key_event: KeyEvent) {
        let key = key_event.code;

        if key_event.modifiers.contains(KeyModifiers::CONTROL) && key == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        // Help overlay swallows everything but its own toggles
        if self.view.show_help {
            match key {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('?') | KeyCode::Esc | KeyCode::F(1) => self.view.show_help = false,
                _ => {}
            }
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('?') | KeyCode::F(1) => self.view.show_help = true,
            KeyCode::Char('1') => self.switch_screen(Screen::Overview),
            KeyCode::Char('2') => self.switch_screen(Screen::Containers),
            KeyCode::Char('3') => self.switch_screen(Screen::Graph),
            KeyCode::Tab | KeyCode::Right => self.next_screen(),
            KeyCode::BackTab | KeyCode::Left => self.prev_screen(),
            KeyCode::Up => {
                self.view.selected_index = self.view.selected_index.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.view.selected_index + 1 < self.max_selection() {
                    self.view.selected_index += 1;
                }
            }
            KeyCode::Char('r') => {
                self.control.request_refresh();
                self.view.status_message = Some("Refresh requested...".to_string());
            }
            KeyCode::Char('s') => {
                self.view.filter.status = self.view.filter.status.next();
                self.view.selected_index = 0;
            }
            KeyCode::Char('i') => {
                let hosts = instances(&self.snapshot.containers);
                self.view.filter.cycle_instance(&hosts);
                self.view.selected_index = 0;
            }
            KeyCode::Char('h') => {
                let hosts = hosts(&self.snapshot.memory, &self.snapshot.cpu);
                self.view.host_filter = self.view.host_filter.next(&hosts);
            }
            KeyCode::Char('n') => self.toggle_sort(SortField::Name),
            KeyCode::Char('m') => self.toggle_sort(SortField::Image),
            KeyCode::Char('t') => self.toggle_sort(SortField::Status),
            KeyCode::Char('o') => self.toggle_sort(SortField::Instance),
            KeyCode::Char('u') => self.toggle_sort(SortField::Uptime),
            _ => {}
        }
    }

    fn toggle_sort(&mut self, field: SortField) {
        self.view.sort.toggle(field);
        self.view.selected_index = 0;
    }

    fn switch_screen(&mut self, screen: Screen) {
        if self.view.screen != screen {
            self.view.screen = screen;
            self.view.selected_index = 0;
        }
    }

    fn next_screen(&mut self) {
        let screens = Screen::all();
        let current_idx = screens.iter().position(|s| *s == self.view.screen).unwrap_or(0);
        let next_idx = (current_idx + 1) % screens.len();
        self.switch_screen(screens[next_idx]);
    }

    fn prev_screen(&mut self) {
        let screens = Screen::all();
        let current_idx = screens.iter().position(|s| *s == self.view.screen).unwrap_or(0);
        let prev_idx = if current_idx == 0 {
            screens.len() - 1
        } else {
            current_idx - 1
        };
        self.switch_screen(screens[prev_idx]);
    }

    fn max_selection(&self) -> usize {
        match self.view.screen {
            Screen::Overview => 0,
            Screen::Containers => self.visible_containers().len(),
            Screen::Graph => Topology::build(&self.snapshot.containers).hosts.len(),
        }
    }

    fn clamp_selection(&mut self) {
        let max = self.max_selection();
        if self.view.selected_index >= max {
            self.view.selected_index = max.saturating_sub(1);
        }
    }

    fn render(&self, frame: &mut ratatui::Frame) {
        self.dashboard.render(frame, &self.snapshot, &self.view);
    }
}

/// Switch `out` to the alternate screen, running `restore` if that fails
fn enter_alternate_screen<W, F>(out: &mut W, restore: F) -> Result<()>
where
    W: io::Write,
    F: FnOnce() -> io::Result<()>,
{
    if let Err(e) = execute!(out, EnterAlternateScreen) {
        if let Err(restore_err) = restore() {
            warn!(error = %restore_err, "failed to leave raw mode");
        }
        return Err(e.into());
    }
    Ok(())
}

/// Start polling and run the dashboard until the user quits
pub async fn run(settings: Settings) -> Result<()> {
    let (store, handle) = poller::start(&settings)?;
    info!(api_base_url = %settings.api_base_url, "starting dashboard");

    let view = ViewState::new(settings.api_base_url.clone(), settings.poll_interval);
    let mut app = App::new(&store, handle.control(), view);
    let result = app.run().await;

    handle.stop().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::listing::{SortDirection, StatusFilter};
    use crate::core::window::RollingWindow;
    use crate::core::{ContainerStatus, Sample};

    fn container(name: &str, status: ContainerStatus, instance: &str) -> ContainerRecord {
        ContainerRecord {
            id: format!("id-{}", name),
            name: name.to_string(),
            image: "img".to_string(),
            status,
            uptime: 10.0,
            instance: instance.to_string(),
        }
    }

    fn snapshot() -> Snapshot {
        let mut memory = RollingWindow::new();
        memory.extend_bounded(
            vec![
                Sample { timestamp: 1, instance: "h1".to_string(), value: 100.0 },
                Sample { timestamp: 1, instance: "h2".to_string(), value: 200.0 },
            ],
            40,
        );
        Snapshot {
            containers: vec![
                container("web", ContainerStatus::Running, "h1"),
                container("db", ContainerStatus::Stopped, "h2"),
                container("api", ContainerStatus::Running, "h2"),
            ],
            memory,
            cpu: RollingWindow::new(),
            updated_at: None,
            tick: 1,
        }
    }

    fn app_with(store: &SnapshotStore) -> App {
        App::new(
            store,
            PollerControl::default(),
            ViewState::new("http://prom:9090", Duration::from_secs(5)),
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_screen_navigation() {
        let store = SnapshotStore::with_snapshot(snapshot());
        let mut app = app_with(&store);
        assert_eq!(app.view().screen, Screen::Overview);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.view().screen, Screen::Containers);
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.view().screen, Screen::Graph);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.view().screen, Screen::Overview);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.view().screen, Screen::Graph);
    }

    #[test]
    fn test_filters_and_sort_keys() {
        let store = SnapshotStore::with_snapshot(snapshot());
        let mut app = app_with(&store);

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.view().filter.status, StatusFilter::Running);
        assert_eq!(app.visible_containers().len(), 2);

        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.view().filter.instance.as_deref(), Some("h1"));
        assert_eq!(app.visible_containers().len(), 1);

        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.view().sort, SortSpec::by(SortField::Name, SortDirection::Desc));

        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.view().host_filter, HostFilter::Host("h1".to_string()));
    }

    #[test]
    fn test_selection_is_bounded() {
        let store = SnapshotStore::with_snapshot(snapshot());
        let mut app = app_with(&store);
        press(&mut app, KeyCode::Char('2'));

        for _ in 0..10 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.view().selected_index, 2);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.view().selected_index, 1);
    }

    #[test]
    fn test_new_snapshot_resets_stale_filters() {
        let store = SnapshotStore::with_snapshot(snapshot());
        let mut app = app_with(&store);
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('i'));
        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.view().filter.instance.as_deref(), Some("h2"));
        press(&mut app, KeyCode::Down);

        store.publish(Snapshot {
            containers: vec![container("web", ContainerStatus::Running, "h1")],
            tick: 2,
            ..Snapshot::default()
        });

        assert!(app.sync_snapshot());
        assert_eq!(app.snapshot().tick, 2);
        assert_eq!(app.view().filter.instance, None);
        assert_eq!(app.view().selected_index, 0);
        assert!(!app.sync_snapshot());
    }

    struct BrokenTerminal;

    impl io::Write for BrokenTerminal {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal gone"))
        }
    }

    #[test]
    fn test_failed_screen_switch_restores_raw_mode() {
        let mut restored = false;
        let result = enter_alternate_screen(&mut BrokenTerminal, || {
            restored = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(restored);

        let mut untouched = false;
        enter_alternate_screen(&mut Vec::new(), || {
            untouched = true;
            Ok(())
        })
        .unwrap();
        assert!(!untouched);
    }

    #[test]
    fn test_help_and_quit() {
        let store = SnapshotStore::new();
        let mut app = app_with(&store);

        press(&mut app, KeyCode::Char('?'));
        assert!(app.view().show_help);
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.view().filter.status, StatusFilter::All);
        press(&mut app, KeyCode::Esc);
        assert!(!app.view().show_help);
        assert!(!app.should_quit());

        press(&mut app, KeyCode::Char('r'));
        assert!(app.view().status_message.is_some());

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }
}
