/// Showcase Core Library - Kiosk screen navigation and STL model viewing
///
/// This library provides the host-independent core of the showcase kiosk:
/// STL parsing, view transforms, orthographic projection, painter's-algorithm
/// rendering onto an abstract surface, and the screen navigator.

pub mod assets;
pub mod config;
pub mod error;
pub mod fragment;
pub mod geometry;
pub mod navigator;
pub mod projection;
pub mod render;
pub mod stl;
pub mod stl_screen;
pub mod timers;
pub mod transform;
pub mod viewer;

// Re-export commonly used types
pub use assets::{AssetProvider, DirectoryAssets};
pub use config::{ShowcaseConfig, ViewerConfig, Viewport};
pub use error::{ConfigError, HookError, LoadError, NavigationError, ParseError};
pub use fragment::{DirectorySource, Fragment, FragmentSource, StaticSource};
pub use geometry::{Bounds, Mesh, Triangle, Vertex};
pub use navigator::{FnHook, NavRequest, ScreenChanged, ScreenContext, ScreenHook, ScreenNavigator};
pub use render::{DrawSurface, Shade};
pub use stl_screen::{PendingLoad, StlScreen};
pub use timers::{Disposable, Teardown, TimerHandle, Timers};
pub use transform::{Transform, ViewState};
pub use viewer::{load_mesh, LoadOutcome, LoadTicket, MeshViewer, StepControl};
