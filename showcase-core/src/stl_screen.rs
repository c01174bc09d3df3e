/// Init hook for the `stl` screen: owns the MeshViewer while the screen is up.
///
/// The hook never touches the provider itself. It publishes a `PendingLoad`
/// that the host fetches however it likes (inline or on a worker thread) and
/// hands back through `complete_load`.
use tracing::{debug, warn};

use crate::assets::AssetProvider;
use crate::config::ViewerConfig;
use crate::error::{HookError, LoadError};
use crate::geometry::Mesh;
use crate::navigator::{ScreenContext, ScreenHook};
use crate::viewer::{load_mesh, LoadOutcome, LoadTicket, MeshViewer};

/// A fetch the host still owes the screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    session: u64,
    ticket: LoadTicket,
    asset_name: String,
}

impl PendingLoad {
    pub fn asset_name(&self) -> &str {
        &self.asset_name
    }
}

pub struct StlScreen {
    config: ViewerConfig,
    asset_name: String,
    width: u32,
    height: u32,
    viewer: Option<MeshViewer>,
    // Each init starts a new session so loads from an earlier visit never
    // land in a fresh viewer.
    session: u64,
    pending: Option<PendingLoad>,
}

impl StlScreen {
    pub fn new(config: ViewerConfig, asset_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            config,
            asset_name: asset_name.into(),
            width,
            height,
            viewer: None,
            session: 0,
            pending: None,
        }
    }

    pub fn viewer(&self) -> Option<&MeshViewer> {
        self.viewer.as_ref().filter(|v| !v.is_torn_down())
    }

    pub fn viewer_mut(&mut self) -> Option<&mut MeshViewer> {
        self.viewer.as_mut().filter(|v| !v.is_torn_down())
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn take_pending_load(&mut self) -> Option<PendingLoad> {
        self.pending.take()
    }

    pub fn complete_load(&mut self, load: PendingLoad, result: Result<Mesh, LoadError>) -> LoadOutcome {
        let Some(viewer) = self.viewer.as_mut().filter(|_| load.session == self.session) else {
            debug!(asset = %load.asset_name, "load finished for a closed viewer");
            return LoadOutcome::Discarded;
        };
        viewer.finish_load(load.ticket, result, self.width, self.height)
    }

    /// Fetch the pending load on the calling thread
    pub fn load_now<P: AssetProvider + ?Sized>(&mut self, provider: &P) -> Option<LoadOutcome> {
        let load = self.take_pending_load()?;
        let result = load_mesh(provider, load.asset_name());
        Some(self.complete_load(load, result))
    }
}

impl ScreenHook for StlScreen {
    fn init(&mut self, _ctx: &mut ScreenContext<'_>) -> Result<(), HookError> {
        if self.asset_name.is_empty() {
            return Err(HookError::Failed("no model asset configured".to_string()));
        }
        self.session += 1;
        let mut viewer = MeshViewer::new(self.config.clone(), self.asset_name.clone());
        let ticket = viewer.begin_load();
        self.pending = Some(PendingLoad {
            session: self.session,
            ticket,
            asset_name: self.asset_name.clone(),
        });
        self.viewer = Some(viewer);
        Ok(())
    }

    fn deactivate(&mut self) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.teardown();
        }
        if self.pending.take().is_some() {
            warn!(asset = %self.asset_name, "screen left before its model was fetched");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::encode_base64;
    use crate::fragment::StaticSource;
    use crate::navigator::ScreenNavigator;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct CubeAssets;

    impl AssetProvider for CubeAssets {
        fn read_asset_text(&self, _name: &str) -> Result<String, LoadError> {
            Ok("solid c\nvertex 0 0 0\nvertex 4 0 0\nvertex 0 4 0\nendsolid c\n".to_string())
        }
        fn read_asset_bytes(&self, _name: &str) -> Result<String, LoadError> {
            Ok(encode_base64(&[]))
        }
    }

    fn navigator(screen: &Rc<RefCell<StlScreen>>) -> ScreenNavigator<StaticSource> {
        let source = StaticSource::new()
            .with("home", "<main class=\"screen\"><a data-target=\"stl\">3D</a></main>")
            .with("stl", "<main class=\"screen\"><canvas></canvas></main>");
        let mut nav = ScreenNavigator::new(source, "home", "Showcase");
        nav.register_hook("stl", Box::new(Rc::clone(screen)));
        nav.show("home", false).unwrap();
        nav
    }

    #[test]
    fn test_showing_screen_requests_model() {
        let screen = Rc::new(RefCell::new(StlScreen::new(ViewerConfig::default(), "m.stl", 400, 400)));
        let mut nav = navigator(&screen);
        assert!(screen.borrow().viewer().is_none());

        nav.show("stl", true).unwrap();
        let outcome = screen.borrow_mut().load_now(&CubeAssets);
        assert_eq!(outcome, Some(LoadOutcome::Applied { triangles: 1 }));
        assert_eq!(screen.borrow().viewer().and_then(MeshViewer::mesh).map(Mesh::len), Some(1));
        assert!(screen.borrow_mut().take_pending_load().is_none());
    }

    #[test]
    fn test_leaving_discards_in_flight_load() {
        let screen = Rc::new(RefCell::new(StlScreen::new(ViewerConfig::default(), "m.stl", 400, 400)));
        let mut nav = navigator(&screen);
        nav.show("stl", true).unwrap();
        let load = screen.borrow_mut().take_pending_load().unwrap();
        assert_eq!(load.asset_name(), "m.stl");

        nav.go_home().unwrap();
        assert!(screen.borrow().viewer().is_none());
        let outcome = screen.borrow_mut().complete_load(load.clone(), Ok(Mesh::cube(1.0)));
        assert_eq!(outcome, LoadOutcome::Discarded);

        // A stale load from the first visit must not land in the second viewer
        nav.show("stl", true).unwrap();
        let outcome = screen.borrow_mut().complete_load(load, Ok(Mesh::cube(1.0)));
        assert_eq!(outcome, LoadOutcome::Discarded);
        assert!(screen.borrow().viewer().unwrap().mesh().is_none());
    }

    #[test]
    fn test_missing_asset_name_fails_init_but_screen_shows() {
        let screen = Rc::new(RefCell::new(StlScreen::new(ViewerConfig::default(), "", 400, 400)));
        let mut nav = navigator(&screen);
        nav.show("stl", true).unwrap();
        assert_eq!(nav.current_screen(), Some("stl"));
        assert!(screen.borrow().viewer().is_none());
    }
}
