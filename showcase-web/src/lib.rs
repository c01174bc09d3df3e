/// Showcase Web - WASM host for the kiosk viewer and navigator
///
/// Wraps a 2D canvas context as a draw surface and exposes the mesh viewer
/// and screen navigator to JavaScript. JS does all fetching and hands the
/// results in.

use nalgebra::Point2;
use showcase_core::{
    load_mesh, AssetProvider, ConfigError, DrawSurface, LoadError, LoadOutcome, LoadTicket,
    MeshViewer, ScreenNavigator, Shade, ShowcaseConfig, StaticSource, StepControl, ViewerConfig,
    Viewport,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

/// Font used for overlay messages
const OVERLAY_FONT: &str = "16px sans-serif";

/// A canvas 2D context as a draw surface
pub struct CanvasSurface {
    context: CanvasRenderingContext2d,
    width: u32,
    height: u32,
}

impl CanvasSurface {
    pub fn from_canvas(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            context,
            width: canvas.width(),
            height: canvas.height(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

impl DrawSurface for CanvasSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self) {
        self.context
            .clear_rect(0.0, 0.0, self.width as f64, self.height as f64);
    }

    fn fill_triangle(&mut self, points: [Point2<f32>; 3], shade: Shade) {
        let [a, b, c] = points;
        self.context.set_fill_style(&JsValue::from_str(&shade.to_css()));
        self.context.begin_path();
        self.context.move_to(a.x as f64, a.y as f64);
        self.context.line_to(b.x as f64, b.y as f64);
        self.context.line_to(c.x as f64, c.y as f64);
        self.context.close_path();
        self.context.fill();
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, shade: Shade) {
        self.context.set_fill_style(&JsValue::from_str(&shade.to_css()));
        self.context.set_font(OVERLAY_FONT);
        // Text is an overlay; a failed draw leaves the frame as it is
        let _ = self.context.fill_text(text, x as f64, y as f64);
    }
}

/// Asset content already fetched by JS
struct FetchedAsset {
    text: Option<String>,
    base64: Option<String>,
}

impl AssetProvider for FetchedAsset {
    fn read_asset_text(&self, name: &str) -> Result<String, LoadError> {
        self.text.clone().ok_or_else(|| LoadError::AssetUnavailable {
            name: name.to_string(),
            reason: "no text form supplied".to_string(),
        })
    }

    fn read_asset_bytes(&self, name: &str) -> Result<String, LoadError> {
        self.base64.clone().ok_or_else(|| LoadError::AssetUnavailable {
            name: name.to_string(),
            reason: "no binary form supplied".to_string(),
        })
    }
}

/// Button names used by the page markup
fn parse_control(name: &str) -> Option<StepControl> {
    match name {
        "rotate-left" => Some(StepControl::RotateLeft),
        "rotate-right" => Some(StepControl::RotateRight),
        "rotate-up" => Some(StepControl::RotateUp),
        "rotate-down" => Some(StepControl::RotateDown),
        "zoom-in" => Some(StepControl::ZoomIn),
        "zoom-out" => Some(StepControl::ZoomOut),
        _ => None,
    }
}

/// Apply a fetch that was started under `ticket`. Returns false when the
/// load failed or a newer one was requested since.
fn apply_fetched(
    viewer: &mut MeshViewer,
    ticket: u64,
    asset: FetchedAsset,
    width: u32,
    height: u32,
) -> bool {
    let result = load_mesh(&asset, viewer.asset_name());
    let outcome = viewer.finish_load(LoadTicket::from_generation(ticket), result, width, height);
    matches!(outcome, LoadOutcome::Applied { .. })
}

/// Viewer and panel size described by a JSON config
fn viewer_from_config(config_json: &str) -> Result<(MeshViewer, Viewport), ConfigError> {
    let config = ShowcaseConfig::from_json(config_json)?;
    let viewer = MeshViewer::new(config.viewer, config.model_asset);
    Ok((viewer, config.viewport))
}

fn canvas_by_id(canvas_id: &str) -> Result<HtmlCanvasElement, JsValue> {
    web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id(canvas_id))
        .ok_or_else(|| JsValue::from_str(&format!("no element #{canvas_id}")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str(&format!("#{canvas_id} is not a canvas")))
}

#[wasm_bindgen]
pub struct WebViewer {
    viewer: MeshViewer,
    surface: CanvasSurface,
}

#[wasm_bindgen]
impl WebViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, asset_name: &str) -> Result<WebViewer, JsValue> {
        let surface = CanvasSurface::from_canvas(&canvas_by_id(canvas_id)?)?;
        Ok(WebViewer {
            viewer: MeshViewer::new(ViewerConfig::default(), asset_name),
            surface,
        })
    }

    /// Build from a JSON config. The canvas is sized to the configured
    /// viewport.
    pub fn from_config(canvas_id: &str, config_json: &str) -> Result<WebViewer, JsValue> {
        let (viewer, viewport) =
            viewer_from_config(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let canvas = canvas_by_id(canvas_id)?;
        canvas.set_width(viewport.width);
        canvas.set_height(viewport.height);
        let surface = CanvasSurface::from_canvas(&canvas)?;
        Ok(WebViewer { viewer, surface })
    }

    /// Call before starting a fetch. Pass the ticket back to `load`; only
    /// the newest ticket's result is applied.
    pub fn begin_load(&mut self) -> u64 {
        self.viewer.begin_load().generation()
    }

    /// Apply a fetched asset. Either form may be missing; ASCII is tried
    /// first. Returns false when the load failed or was discarded.
    pub fn load(&mut self, ticket: u64, text: Option<String>, base64: Option<String>) -> bool {
        let asset = FetchedAsset { text, base64 };
        apply_fetched(&mut self.viewer, ticket, asset, self.surface.width, self.surface.height)
    }

    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.viewer.drag(dx, dy);
    }

    /// One step of a control button. Hold repeat is driven from JS.
    pub fn step(&mut self, control: &str) -> bool {
        match parse_control(control) {
            Some(control) => {
                self.viewer.step(control);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.viewer.reset(self.surface.width, self.surface.height);
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.viewer.toggle_auto_rotate()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
    }

    /// Advance one animation frame and redraw
    pub fn frame(&mut self) {
        self.viewer.frame(&mut self.surface);
    }

    pub fn error(&self) -> Option<String> {
        self.viewer.error().map(str::to_string)
    }

    pub fn teardown(&mut self) {
        self.viewer.teardown();
    }
}

/// Navigator over screens JS registers with `add_screen`
#[wasm_bindgen]
pub struct WebNavigator {
    navigator: ScreenNavigator<StaticSource>,
}

#[wasm_bindgen]
impl WebNavigator {
    #[wasm_bindgen(constructor)]
    pub fn new(home: &str, app_title: &str) -> WebNavigator {
        WebNavigator {
            navigator: ScreenNavigator::new(StaticSource::new(), home, app_title),
        }
    }

    /// Register or replace a screen's markup. A cached copy is dropped unless
    /// the screen is home or on display.
    pub fn add_screen(&mut self, name: &str, markup: &str) {
        self.navigator.source_mut().insert(name, markup);
        self.navigator.unload_screen(name);
    }

    pub fn show(&mut self, name: &str, push: bool) -> Result<(), JsValue> {
        self.navigator
            .show(name, push)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn back(&mut self) -> Result<(), JsValue> {
        self.navigator
            .go_back()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn home(&mut self) -> Result<(), JsValue> {
        self.navigator
            .go_home()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn current(&self) -> Option<String> {
        self.navigator.current_screen().map(str::to_string)
    }

    pub fn title(&self) -> Option<String> {
        self.navigator.current_fragment().map(|f| f.title().to_string())
    }

    pub fn can_go_back(&self) -> bool {
        self.navigator.can_go_back()
    }
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control() {
        assert_eq!(parse_control("zoom-in"), Some(StepControl::ZoomIn));
        assert_eq!(parse_control("rotate-down"), Some(StepControl::RotateDown));
        assert_eq!(parse_control("spin"), None);
    }

    #[test]
    fn test_fetched_asset_prefers_text() {
        let asset = FetchedAsset {
            text: Some("solid t\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendsolid\n".into()),
            base64: None,
        };
        assert_eq!(load_mesh(&asset, "m.stl").unwrap().len(), 1);

        let missing = FetchedAsset { text: None, base64: None };
        assert!(matches!(
            load_mesh(&missing, "m.stl"),
            Err(LoadError::AssetUnavailable { .. })
        ));
    }

    #[test]
    fn test_out_of_order_fetches_keep_newest() {
        let mut viewer = MeshViewer::new(ViewerConfig::default(), "model.stl");
        let older = viewer.begin_load().generation();
        let newer = viewer.begin_load().generation();

        let one = "solid t\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendsolid\n";
        let two = "solid t\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\n\
                   vertex 0 0 1\nvertex 1 0 1\nvertex 0 1 1\nendsolid\n";
        let fetched = |text: &str| FetchedAsset {
            text: Some(text.to_string()),
            base64: None,
        };

        assert!(apply_fetched(&mut viewer, newer, fetched(two), 200, 100));
        assert!(!apply_fetched(&mut viewer, older, fetched(one), 200, 100));
        assert_eq!(viewer.mesh().map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_viewer_from_config() {
        let (viewer, viewport) =
            viewer_from_config(r#"{"model_asset": "part.stl", "viewport": {"width": 800}}"#).unwrap();
        assert_eq!(viewer.asset_name(), "part.stl");
        assert_eq!(viewport, Viewport { width: 800, height: 600 });

        let (_, viewport) = viewer_from_config("{}").unwrap();
        assert_eq!(viewport, Viewport::default());
        assert!(viewer_from_config("not json").is_err());
    }

    #[test]
    fn test_navigator_uses_registered_screens() {
        let mut nav = WebNavigator::new("home", "Kiosk");
        nav.add_screen("home", "<div class=\"screen\">Home</div>");
        nav.add_screen("stl", "<div class=\"screen\"><canvas></canvas></div>");
        assert!(nav.navigator.show("home", false).is_ok());
        assert!(nav.navigator.show("stl", true).is_ok());
        assert_eq!(nav.current().as_deref(), Some("stl"));
        assert_eq!(nav.title().as_deref(), Some("Kiosk - Stl"));
        assert!(nav.navigator.go_back().is_ok());
        assert_eq!(nav.current().as_deref(), Some("home"));
    }
}
