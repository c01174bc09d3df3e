/// Interactive STL viewer: mesh, view state, input handling and loading.
///
/// Loading is split in two so hosts can fetch off the event loop:
/// `begin_load` hands out a ticket, `finish_load` applies the result only if
/// that ticket is still the newest and the viewer is still alive.
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::assets::{decode_base64, AssetProvider};
use crate::config::ViewerConfig;
use crate::error::{LoadError, ParseError};
use crate::geometry::Mesh;
use crate::render::{render, DrawSurface, Shade};
use crate::stl::{parse_ascii, parse_binary, StlFormat};
use crate::timers::{Disposable, TimerHandle, Timers};
use crate::transform::{fit_to_view, ViewState};

/// Step buttons; each supports press-and-hold repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
    RotateLeft,
    RotateRight,
    RotateUp,
    RotateDown,
    ZoomIn,
    ZoomOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    /// Rebuild a ticket handed across a host boundary as a plain number
    pub fn from_generation(generation: u64) -> Self {
        Self { generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { triangles: usize },
    Failed,
    /// Stale ticket or torn-down viewer
    Discarded,
}

/// Fetch an STL asset, ASCII first, falling back to the binary form.
///
/// Text that contains `solid` is parsed as ASCII. If that is unavailable or
/// yields nothing, the base64 byte form is decoded and parsed as binary.
pub fn load_mesh<P: AssetProvider + ?Sized>(provider: &P, name: &str) -> Result<Mesh, LoadError> {
    if let Ok(text) = provider.read_asset_text(name) {
        if text.contains("solid") {
            let mesh = parse_ascii(&text);
            if !mesh.is_empty() {
                return Ok(mesh);
            }
            warn!(asset = name, "ASCII parse yielded no triangles; trying binary");
        }
    }

    let bytes = decode_base64(&provider.read_asset_bytes(name)?)?;
    let mesh = parse_binary(&bytes);
    if mesh.is_empty() {
        return Err(ParseError::Empty { format: StlFormat::Binary }.into());
    }
    Ok(mesh)
}

pub struct MeshViewer {
    config: ViewerConfig,
    asset_name: String,
    mesh: Option<Mesh>,
    view: ViewState,
    generation: u64,
    torn_down: bool,
    hold: Option<TimerHandle<StepControl>>,
    error: Option<String>,
}

impl MeshViewer {
    pub fn new(config: ViewerConfig, asset_name: impl Into<String>) -> Self {
        Self {
            view: ViewState::new(&config),
            config,
            asset_name: asset_name.into(),
            mesh: None,
            generation: 0,
            torn_down: false,
            hold: None,
            error: None,
        }
    }

    /// A viewer that starts with a mesh already in place
    pub fn with_mesh(config: ViewerConfig, mesh: Mesh, width: u32, height: u32) -> Self {
        let mut viewer = Self::new(config, "");
        viewer.set_mesh(mesh, width, height);
        viewer
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn asset_name(&self) -> &str {
        &self.asset_name
    }

    /// Message shown in the surface after a failed load
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn is_holding(&self) -> bool {
        self.hold.as_ref().is_some_and(TimerHandle::is_active)
    }

    fn set_mesh(&mut self, mesh: Mesh, width: u32, height: u32) {
        self.mesh = Some(mesh);
        self.error = None;
        self.fit(width, height);
    }

    fn fit(&mut self, width: u32, height: u32) {
        if let Some(fit) = self
            .mesh
            .as_ref()
            .and_then(|mesh| fit_to_view(mesh, width, height, &self.config))
        {
            self.view.apply_fit(fit);
        }
    }

    /// Drag rotates: horizontal motion about Y, vertical about X
    pub fn drag(&mut self, dx: f32, dy: f32) {
        let k = self.config.drag_sensitivity;
        self.view.rotate(dy * k, dx * k);
    }

    pub fn step(&mut self, control: StepControl) {
        let angle = self.config.rotate_step;
        match control {
            StepControl::RotateLeft => self.view.rotate(0.0, -angle),
            StepControl::RotateRight => self.view.rotate(0.0, angle),
            StepControl::RotateUp => self.view.rotate(-angle, 0.0),
            StepControl::RotateDown => self.view.rotate(angle, 0.0),
            StepControl::ZoomIn => self.view.zoom_by(self.config.zoom_step),
            StepControl::ZoomOut => self.view.zoom_by(1.0 / self.config.zoom_step),
        }
    }

    /// Step once now, then repeat every `hold_repeat_ms` until `release`.
    ///
    /// The repeat arrives as `control` from `timers.poll`; the host feeds it
    /// back through `step`.
    pub fn press(&mut self, control: StepControl, timers: &Timers<StepControl>, now: Instant) {
        self.release();
        self.step(control);
        let period = Duration::from_millis(self.config.hold_repeat_ms);
        self.hold = Some(timers.set_interval(period, now, control));
    }

    pub fn release(&mut self) {
        if let Some(mut hold) = self.hold.take() {
            hold.dispose();
        }
    }

    /// Default angles, fresh fit, auto-rotate off
    pub fn reset(&mut self, width: u32, height: u32) {
        self.view.reset_angles(&self.config);
        self.fit(width, height);
    }

    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.view.auto_rotate = enabled;
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.view.auto_rotate = !self.view.auto_rotate;
        self.view.auto_rotate
    }

    /// Advance auto-rotation by one frame and draw
    pub fn frame<S: DrawSurface + ?Sized>(&mut self, surface: &mut S) {
        if self.view.auto_rotate {
            self.view.angle_y += self.config.auto_rotate_speed;
        }
        self.draw(surface);
    }

    /// Draw without advancing any animation
    pub fn draw<S: DrawSurface + ?Sized>(&self, surface: &mut S) {
        match &self.mesh {
            Some(mesh) => render(mesh, &self.view, surface),
            None => surface.clear(),
        }
        if let Some(message) = &self.error {
            surface.fill_text(message, 20.0, 30.0, Shade::White);
        }
    }

    /// Start a load; any earlier ticket becomes stale
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
        }
    }

    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Mesh, LoadError>,
        width: u32,
        height: u32,
    ) -> LoadOutcome {
        if self.torn_down || ticket.generation != self.generation {
            warn!(
                asset = %self.asset_name,
                ticket = ticket.generation,
                current = self.generation,
                torn_down = self.torn_down,
                "discarding stale model load"
            );
            return LoadOutcome::Discarded;
        }

        match result {
            Ok(mesh) if !mesh.is_empty() => {
                let triangles = mesh.len();
                info!(asset = %self.asset_name, triangles, "model loaded");
                self.set_mesh(mesh, width, height);
                LoadOutcome::Applied { triangles }
            }
            Ok(_) => self.fail(ParseError::Empty { format: StlFormat::Binary }.into()),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: LoadError) -> LoadOutcome {
        warn!(asset = %self.asset_name, error = %error, "model load failed");
        self.error = Some(format!("Failed to load STL: {}", self.asset_name));
        LoadOutcome::Failed
    }

    /// Synchronous load from a provider
    pub fn load_from<P: AssetProvider + ?Sized>(&mut self, provider: &P, width: u32, height: u32) -> LoadOutcome {
        let ticket = self.begin_load();
        let result = load_mesh(provider, &self.asset_name);
        self.finish_load(ticket, result, width, height)
    }

    /// Stop timers and ignore every load still in flight
    pub fn teardown(&mut self) {
        self.release();
        self.torn_down = true;
    }
}
