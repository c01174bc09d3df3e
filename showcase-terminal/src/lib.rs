/// Terminal kiosk host: screen navigation and STL viewing in a character grid
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyboardEnhancementFlags, MouseButton, MouseEvent, MouseEventKind,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use showcase_core::{
    load_mesh, DirectoryAssets, DirectorySource, DrawSurface, FragmentSource, LoadError, Mesh,
    NavigationError, PendingLoad, ScreenChanged, ScreenNavigator, Shade, ShowcaseConfig,
    StaticSource, StepControl, StlScreen, Timers,
};
use std::cell::RefCell;
use std::fs::OpenOptions;
use std::io::{self, stdout, Write};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

pub mod renderer;

pub use renderer::{AsciiRenderer, CELL_ASPECT};

/// Screen whose init hook drives the mesh viewer
pub const STL_SCREEN: &str = "stl";

/// Approximate pixel width of one terminal cell, for drag sensitivity
const CELL_PIXELS: f32 = 8.0;

const FRAME_TIME: Duration = Duration::from_millis(1000 / 30);

type LoadResult = (PendingLoad, Result<Mesh, LoadError>);

/// Markup compiled into the binary, used when no screens directory is set
pub fn bundled_screens() -> StaticSource {
    StaticSource::new()
        .with("home", include_str!("../screens/home.html"))
        .with("stl", include_str!("../screens/stl.html"))
        .with("settings", include_str!("../screens/settings.html"))
        .with("about", include_str!("../screens/about.html"))
}

fn fragment_source(config: &ShowcaseConfig) -> Box<dyn FragmentSource> {
    match &config.screens_dir {
        Some(dir) => Box::new(DirectorySource::new(dir)),
        None => Box::new(bundled_screens()),
    }
}

/// Install the global subscriber. The terminal is in the alternate screen,
/// so events go to the configured log file or nowhere.
pub fn init_logging(config: &ShowcaseConfig) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false);
    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::sink).init(),
    }
    Ok(())
}

/// Greedy word wrap
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Main application struct for the terminal kiosk
pub struct TerminalApp {
    navigator: ScreenNavigator<Box<dyn FragmentSource>>,
    stl: Rc<RefCell<StlScreen>>,
    assets: DirectoryAssets,
    timers: Timers<StepControl>,
    renderer: AsciiRenderer,
    title: Rc<RefCell<String>>,
    load_tx: Sender<LoadResult>,
    load_rx: Receiver<LoadResult>,
    key_release: bool,
    drag_from: Option<(u16, u16)>,
    running: bool,
}

impl TerminalApp {
    pub fn new(config: ShowcaseConfig) -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        Ok(Self::with_size(config, cols as usize, rows as usize))
    }

    pub fn with_size(config: ShowcaseConfig, cols: usize, rows: usize) -> Self {
        let renderer = AsciiRenderer::new(cols, rows);
        let stl = Rc::new(RefCell::new(StlScreen::new(
            config.viewer.clone(),
            config.model_asset.clone(),
            renderer.width(),
            renderer.height(),
        )));

        let mut navigator = ScreenNavigator::new(
            fragment_source(&config),
            config.home_screen.clone(),
            config.app_title.clone(),
        );
        navigator.register_hook(STL_SCREEN, Box::new(Rc::clone(&stl)));

        let title = Rc::new(RefCell::new(config.app_title.clone()));
        let sink = Rc::clone(&title);
        navigator.subscribe(move |change: &ScreenChanged| {
            *sink.borrow_mut() = change.title.clone();
        });

        let (load_tx, load_rx) = mpsc::channel();
        Self {
            navigator,
            stl,
            assets: DirectoryAssets::new(config.assets_dir),
            timers: Timers::new(),
            renderer,
            title,
            load_tx,
            load_rx,
            key_release: false,
            drag_from: None,
            running: true,
        }
    }

    pub fn current_screen(&self) -> Option<&str> {
        self.navigator.current_screen()
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide, EnableMouseCapture)?;
        self.key_release = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.key_release {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        let result = self.start().and_then(|()| self.main_loop());

        // Cleanup
        if self.key_release {
            execute!(stdout(), PopKeyboardEnhancementFlags)?;
        }
        terminal::disable_raw_mode()?;
        execute!(stdout(), DisableMouseCapture, terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    /// Show the home screen. Without it there is nothing to navigate from.
    fn start(&mut self) -> io::Result<()> {
        self.navigator.go_home().map_err(|err| {
            error!(error = %err, "home screen unavailable");
            io::Error::new(io::ErrorKind::NotFound, err)
        })
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let mut out = stdout();
        while self.running {
            let frame_start = Instant::now();

            // Handle input until the frame budget is spent
            while let Some(timeout) = FRAME_TIME.checked_sub(frame_start.elapsed()) {
                if !event::poll(timeout)? {
                    break;
                }
                let event = event::read()?;
                self.handle_event(event, Instant::now());
            }

            self.tick(Instant::now());
            self.compose();
            self.render(&mut out)?;
        }
        Ok(())
    }

    fn navigate(
        &mut self,
        action: impl FnOnce(&mut ScreenNavigator<Box<dyn FragmentSource>>) -> Result<(), NavigationError>,
    ) {
        if let Err(err) = action(&mut self.navigator) {
            warn!(error = %err, "navigation failed");
        }
    }

    fn on_stl_screen(&self) -> bool {
        self.navigator.current_screen() == Some(STL_SCREEN)
    }

    pub fn handle_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Key(key) => self.handle_key(key, now),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(cols, rows) => {
                self.renderer.resize(cols as usize, rows as usize);
                self.stl
                    .borrow_mut()
                    .resize(self.renderer.width(), self.renderer.height());
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.kind == KeyEventKind::Release {
            if let Some(viewer) = self.stl.borrow_mut().viewer_mut() {
                viewer.release();
            }
            return;
        }
        if key.kind == KeyEventKind::Repeat && self.key_release {
            // The hold timer already repeats
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('h') | KeyCode::Home => self.navigate(|nav| nav.go_home()),
            KeyCode::Char('b') | KeyCode::Backspace => self.navigate(|nav| nav.go_back()),
            KeyCode::Char(digit @ '1'..='9') => {
                let index = digit as usize - '1' as usize;
                let target = self
                    .navigator
                    .current_fragment()
                    .and_then(|fragment| fragment.targets().get(index))
                    .cloned();
                if let Some(target) = target {
                    self.navigate(|nav| nav.show(&target, true));
                }
            }
            code if self.on_stl_screen() => self.handle_viewer_key(code, now),
            _ => {}
        }
    }

    fn handle_viewer_key(&mut self, code: KeyCode, now: Instant) {
        let (width, height) = (self.renderer.width(), self.renderer.height());
        let mut stl = self.stl.borrow_mut();
        let Some(viewer) = stl.viewer_mut() else {
            return;
        };

        let control = match code {
            KeyCode::Left => Some(StepControl::RotateLeft),
            KeyCode::Right => Some(StepControl::RotateRight),
            KeyCode::Up => Some(StepControl::RotateUp),
            KeyCode::Down => Some(StepControl::RotateDown),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(StepControl::ZoomIn),
            KeyCode::Char('-') => Some(StepControl::ZoomOut),
            KeyCode::Char('r') => {
                viewer.reset(width, height);
                None
            }
            KeyCode::Char('a') => {
                let enabled = viewer.toggle_auto_rotate();
                debug!(enabled, "auto-rotate toggled");
                None
            }
            _ => None,
        };

        if let Some(control) = control {
            if self.key_release {
                viewer.press(control, &self.timers, now);
            } else {
                viewer.step(control);
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.drag_from = Some((mouse.column, mouse.row));
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let Some((col, row)) = self.drag_from.replace((mouse.column, mouse.row)) else {
                    return;
                };
                let dx = (mouse.column as f32 - col as f32) * CELL_PIXELS;
                let dy = (mouse.row as f32 - row as f32) * CELL_PIXELS * CELL_ASPECT as f32;
                if let Some(viewer) = self.stl.borrow_mut().viewer_mut() {
                    viewer.drag(dx, dy);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.drag_from = None;
            }
            _ => {}
        }
    }

    /// Run loads, apply finished ones and dispatch hold repeats
    pub fn tick(&mut self, now: Instant) {
        self.dispatch_pending_load();
        while let Ok((load, result)) = self.load_rx.try_recv() {
            self.stl.borrow_mut().complete_load(load, result);
        }

        let repeats = self.timers.poll(now);
        if let Some(viewer) = self.stl.borrow_mut().viewer_mut() {
            for control in repeats {
                viewer.step(control);
            }
        }
    }

    fn dispatch_pending_load(&mut self) {
        let Some(load) = self.stl.borrow_mut().take_pending_load() else {
            return;
        };
        info!(asset = load.asset_name(), "fetching model");
        let assets = self.assets.clone();
        let tx = self.load_tx.clone();
        thread::spawn(move || {
            let result = load_mesh(&assets, load.asset_name());
            // The receiver is gone once the app has quit
            let _ = tx.send((load, result));
        });
    }

    /// Fill the character buffer for the current screen
    pub fn compose(&mut self) {
        if self.on_stl_screen() {
            let mut stl = self.stl.borrow_mut();
            match stl.viewer_mut() {
                Some(viewer) => viewer.frame(&mut self.renderer),
                None => self.renderer.clear(),
            }
            let rows = self.renderer.rows();
            self.renderer.put_text(
                "Arrows=Rotate +/-=Zoom R=Reset A=Auto Drag=Rotate",
                0,
                rows.saturating_sub(1),
                Shade::Grey { lightness: 60.0 },
            );
            return;
        }

        self.renderer.clear();
        let Some(fragment) = self.navigator.current_fragment() else {
            return;
        };
        let width = self.renderer.cols().saturating_sub(4).max(1);
        let mut row = 2;
        for line in wrap(fragment.text(), width) {
            self.renderer.put_text(&line, 2, row, Shade::White);
            row += 1;
        }
        row += 1;
        for (i, target) in fragment.targets().iter().enumerate().take(9) {
            let entry = format!("[{}] {}", i + 1, target);
            self.renderer.put_text(&entry, 2, row, Shade::Grey { lightness: 75.0 });
            row += 1;
        }
    }

    fn render<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.renderer.draw(out)?;

        // Draw UI overlay
        let back = if self.navigator.can_go_back() { " B=Back" } else { "" };
        queue!(
            out,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!("{} |{} H=Home Q=Quit", self.title.borrow(), back)),
            ResetColor
        )?;

        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app(dir: &tempfile::TempDir) -> TerminalApp {
        let config = ShowcaseConfig {
            assets_dir: dir.path().to_path_buf(),
            ..ShowcaseConfig::default()
        };
        let mut app = TerminalApp::with_size(config, 60, 20);
        app.start().unwrap();
        app
    }

    fn wait_for_model(app: &mut TerminalApp) {
        app.tick(Instant::now());
        let (load, result) = app.load_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        app.stl.borrow_mut().complete_load(load, result);
    }

    fn screen_text(app: &TerminalApp) -> String {
        let renderer = &app.renderer;
        (0..renderer.rows())
            .map(|row| {
                (0..renderer.cols())
                    .filter_map(|col| renderer.char_at(col, row))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three four", 9), vec!["one two", "three", "four"]);
        assert!(wrap("   ", 5).is_empty());
        assert_eq!(wrap("unbreakableword", 4), vec!["unbreakableword"]);
    }

    #[test]
    fn test_home_lists_targets() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        assert_eq!(app.current_screen(), Some("home"));
        assert_eq!(*app.title.borrow(), "Showcase - Home");

        app.compose();
        let text = screen_text(&app);
        assert!(text.contains("Touch a card to explore."));
        assert!(text.contains("[1] stl"));
        assert!(text.contains("[3] about"));
    }

    #[test]
    fn test_number_keys_navigate_and_back_returns() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let now = Instant::now();
        app.handle_event(key(KeyCode::Char('2')), now);
        assert_eq!(app.current_screen(), Some("settings"));
        app.handle_event(key(KeyCode::Char('1')), now);
        assert_eq!(app.current_screen(), Some("about"));
        assert!(app.navigator.can_go_back());

        app.handle_event(key(KeyCode::Char('b')), now);
        assert_eq!(app.current_screen(), Some("settings"));
        app.handle_event(key(KeyCode::Backspace), now);
        assert_eq!(app.current_screen(), Some("home"));

        app.handle_event(key(KeyCode::Char('7')), now);
        assert_eq!(app.current_screen(), Some("home"));
        app.handle_event(key(KeyCode::Char('q')), now);
        assert!(!app.running);
    }

    #[test]
    fn test_stl_screen_loads_and_draws_model() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("model.stl"),
            "solid t\nvertex 0 0 0\nvertex 10 0 0\nvertex 0 10 0\nendsolid t\n",
        )
        .unwrap();
        let mut app = app(&dir);
        app.handle_event(key(KeyCode::Char('1')), Instant::now());
        assert_eq!(app.current_screen(), Some(STL_SCREEN));

        wait_for_model(&mut app);
        app.compose();
        let text = screen_text(&app);
        let (model, hint) = text.rsplit_once('\n').unwrap();
        assert!(model.chars().any(|c| "@%#*+=-:.".contains(c)), "{text}");
        assert!(hint.starts_with("Arrows=Rotate"));
    }

    #[test]
    fn test_missing_model_shows_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        app.handle_event(key(KeyCode::Char('1')), Instant::now());
        wait_for_model(&mut app);
        app.compose();
        assert!(screen_text(&app).contains("Failed to load STL: model.stl"));
    }

    #[test]
    fn test_viewer_keys_and_home() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let now = Instant::now();
        app.handle_event(key(KeyCode::Char('1')), now);

        app.handle_event(key(KeyCode::Right), now);
        app.handle_event(key(KeyCode::Char('a')), now);
        {
            let stl = app.stl.borrow();
            let view = stl.viewer().unwrap().view();
            assert!((view.angle_y - 0.7).abs() < 1e-6);
            assert!(view.auto_rotate);
        }

        app.handle_event(key(KeyCode::Char('h')), now);
        assert_eq!(app.current_screen(), Some("home"));
        assert!(app.stl.borrow().viewer().is_none());
    }

    #[test]
    fn test_mouse_drag_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        app.handle_event(key(KeyCode::Char('1')), Instant::now());
        let mouse = |kind: MouseEventKind, column: u16| {
            Event::Mouse(MouseEvent {
                kind,
                column,
                row: 5,
                modifiers: KeyModifiers::NONE,
            })
        };
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 10), Instant::now());
        app.handle_event(mouse(MouseEventKind::Drag(MouseButton::Left), 15), Instant::now());
        app.handle_event(mouse(MouseEventKind::Up(MouseButton::Left), 15), Instant::now());

        let stl = app.stl.borrow();
        // 5 cells * 8 px * 0.01
        assert!((stl.viewer().unwrap().view().angle_y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_held_key_repeats_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        app.key_release = true;
        let start = Instant::now();
        app.handle_event(key(KeyCode::Char('1')), start);
        app.handle_event(key(KeyCode::Left), start);
        app.tick(start + Duration::from_millis(100));
        app.handle_event(
            Event::Key(KeyEvent::new_with_kind(
                KeyCode::Left,
                KeyModifiers::NONE,
                KeyEventKind::Release,
            )),
            start,
        );
        app.tick(start + Duration::from_millis(200));

        let stl = app.stl.borrow();
        assert!((stl.viewer().unwrap().view().angle_y - 0.4).abs() < 1e-5);
        assert_eq!(app.timers.pending(), 0);
    }
}
