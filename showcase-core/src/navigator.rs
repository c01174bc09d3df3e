/// Screen navigator: lazy screen registry, single active screen, back-stack.
///
/// DESIGN
/// ======
/// Fragments are fetched on first use and cached. Exactly one fragment is
/// active once anything has been shown. The home screen never enters the
/// back-stack and `go_home` always empties it.
///
/// ERROR HANDLING
/// ==============
/// Invalid names are rejected before any state changes. A screen that fails
/// to load sends the user home, with an empty back-stack, instead of leaving
/// nothing on screen. Init hook failures are logged and the screen stays up
/// in a degraded state.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{error, info, warn};

use crate::error::{HookError, LoadError, NavigationError};
use crate::fragment::{Fragment, FragmentSource};
use crate::timers::Teardown;

// =============================================================================
// TYPES
// =============================================================================

/// Broadcast after every completed screen switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenChanged {
    pub name: String,
    pub previous: Option<String>,
    pub title: String,
}

/// Navigation a hook asked for while a transition was running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavRequest {
    Show { name: String, push: bool },
    Back,
    Home,
}

/// What an init hook gets to work with
pub struct ScreenContext<'a> {
    fragment: &'a Fragment,
    teardown: &'a mut Teardown,
    requests: &'a mut Vec<NavRequest>,
}

impl<'a> ScreenContext<'a> {
    pub fn fragment(&self) -> &Fragment {
        self.fragment
    }

    /// Resources registered here are disposed when the screen is left
    pub fn teardown(&mut self) -> &mut Teardown {
        &mut *self.teardown
    }

    /// Hooks run inside a transition, so requests made here are dropped
    pub fn navigate(&mut self, request: NavRequest) {
        self.requests.push(request);
    }
}

/// Per-screen behaviour, resolved by screen name
pub trait ScreenHook {
    fn init(&mut self, ctx: &mut ScreenContext<'_>) -> Result<(), HookError>;

    /// Called when the screen stops being the active one
    fn deactivate(&mut self) {}
}

impl<H: ScreenHook + ?Sized> ScreenHook for Rc<RefCell<H>> {
    fn init(&mut self, ctx: &mut ScreenContext<'_>) -> Result<(), HookError> {
        self.borrow_mut().init(ctx)
    }

    fn deactivate(&mut self) {
        self.borrow_mut().deactivate();
    }
}

/// Adapts a closure into an init-only hook
pub struct FnHook<F>(pub F);

impl<F> ScreenHook for FnHook<F>
where
    F: FnMut(&mut ScreenContext<'_>) -> Result<(), HookError>,
{
    fn init(&mut self, ctx: &mut ScreenContext<'_>) -> Result<(), HookError> {
        (self.0)(ctx)
    }
}

pub type Listener = Box<dyn FnMut(&ScreenChanged)>;

/// Screen names are lowercase ASCII words: `[a-z0-9_-]+`
pub fn is_valid_screen_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

// =============================================================================
// NAVIGATOR
// =============================================================================

pub struct ScreenNavigator<S> {
    source: S,
    app_title: String,
    home: String,
    screens: HashMap<String, Fragment>,
    hooks: HashMap<String, Box<dyn ScreenHook>>,
    current: Option<String>,
    stack: Vec<String>,
    in_transition: bool,
    teardown: Teardown,
    listeners: Vec<Listener>,
}

impl<S: FragmentSource> ScreenNavigator<S> {
    pub fn new(source: S, home: impl Into<String>, app_title: impl Into<String>) -> Self {
        Self {
            source,
            app_title: app_title.into(),
            home: home.into(),
            screens: HashMap::new(),
            hooks: HashMap::new(),
            current: None,
            stack: Vec::new(),
            in_transition: false,
            teardown: Teardown::new(),
            listeners: Vec::new(),
        }
    }

    /// Register the init hook for `name`, replacing any earlier one
    pub fn register_hook(&mut self, name: impl Into<String>, hook: Box<dyn ScreenHook>) {
        self.hooks.insert(name.into(), hook);
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ScreenChanged) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn current_screen(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_fragment(&self) -> Option<&Fragment> {
        self.current.as_ref().and_then(|name| self.screens.get(name))
    }

    /// Back-stack, most recent last
    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    pub fn can_go_back(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.screens.contains_key(name)
    }

    pub fn loaded_screens(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.screens.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn active_count(&self) -> usize {
        self.screens.values().filter(|f| f.is_active()).count()
    }

    fn is_home(&self, name: &str) -> bool {
        name == self.home
    }

    /// Return the cached fragment, fetching and registering it on first use
    pub fn load_screen(&mut self, name: &str) -> Result<&Fragment, LoadError> {
        if !self.screens.contains_key(name) {
            if !is_valid_screen_name(name) {
                return Err(LoadError::FragmentUnavailable {
                    name: name.to_string(),
                    reason: "invalid screen name".to_string(),
                });
            }
            let markup = self.source.fetch_screen_fragment(name)?;
            let fragment = Fragment::parse(name, &markup, &self.app_title)?;
            info!(screen = name, targets = fragment.targets().len(), "screen loaded");
            self.screens.insert(name.to_string(), fragment);
        }
        Ok(&self.screens[name])
    }

    /// Load without showing
    pub fn preload_screen(&mut self, name: &str) -> Result<(), LoadError> {
        self.load_screen(name).map(|_| ())
    }

    /// Drop a cached fragment. Home and the active screen stay loaded.
    pub fn unload_screen(&mut self, name: &str) -> bool {
        if self.is_home(name) || self.current.as_deref() == Some(name) {
            return false;
        }
        self.screens.remove(name).is_some()
    }

    /// Switch to `name`, optionally remembering the current screen for Back
    pub fn show(&mut self, name: &str, push_current: bool) -> Result<(), NavigationError> {
        if !is_valid_screen_name(name) {
            warn!(screen = name, "rejecting invalid screen name");
            return Err(NavigationError::InvalidName(name.to_string()));
        }
        self.guard(name)?;
        if self.current.as_deref() == Some(name) {
            return Ok(());
        }

        self.in_transition = true;
        let result = self.transition(name, push_current);
        self.in_transition = false;

        match result {
            Err(err) if !self.is_home(name) => {
                warn!(screen = name, error = %err, "screen failed to load; falling back to home");
                self.fall_back_home();
                Err(err.into())
            }
            other => other.map_err(NavigationError::from),
        }
    }

    /// Empty the back-stack and show home
    pub fn go_home(&mut self) -> Result<(), NavigationError> {
        let home = self.home.clone();
        self.guard(&home)?;
        self.stack.clear();
        self.show(&home, false)
    }

    /// Pop one screen. With an empty stack this only acts off the home
    /// screen, where it recovers by going home.
    pub fn go_back(&mut self) -> Result<(), NavigationError> {
        self.guard("back")?;
        match self.stack.pop() {
            Some(previous) => self.show(&previous, false),
            None if self.current.as_deref() != Some(self.home.as_str()) => self.go_home(),
            None => Ok(()),
        }
    }

    fn guard(&self, requested: &str) -> Result<(), NavigationError> {
        if self.in_transition {
            warn!(screen = requested, "navigation dropped during transition");
            return Err(NavigationError::Reentrant {
                requested: requested.to_string(),
            });
        }
        Ok(())
    }

    fn fall_back_home(&mut self) {
        let home = self.home.clone();
        if self.current.as_deref() == Some(home.as_str()) {
            return;
        }
        self.in_transition = true;
        match self.transition(&home, false) {
            Ok(()) => self.stack.clear(),
            Err(err) => error!(error = %err, "home screen failed to load"),
        }
        self.in_transition = false;
    }

    fn transition(&mut self, name: &str, push_current: bool) -> Result<(), LoadError> {
        self.load_screen(name)?;

        if push_current {
            if let Some(current) = &self.current {
                if !self.is_home(current) && self.stack.last() != Some(current) {
                    self.stack.push(current.clone());
                }
            }
        }

        self.deactivate_current();

        for fragment in self.screens.values_mut() {
            fragment.set_active(false);
        }
        let Some(fragment) = self.screens.get_mut(name) else {
            return Err(LoadError::FragmentUnavailable {
                name: name.to_string(),
                reason: "unloaded during transition".to_string(),
            });
        };
        fragment.set_active(true);
        let title = fragment.title().to_string();
        let previous = self.current.replace(name.to_string());

        self.run_init_hook(name);

        info!(screen = name, previous = previous.as_deref().unwrap_or("-"), "screen changed");
        let event = ScreenChanged {
            name: name.to_string(),
            previous,
            title,
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
        Ok(())
    }

    fn deactivate_current(&mut self) {
        let Some(current) = self.current.as_deref() else {
            return;
        };
        self.teardown.dispose_all();
        if let Some(fragment) = self.screens.get_mut(current) {
            fragment.set_active(false);
        }
        if let Some(hook) = self.hooks.get_mut(current) {
            hook.deactivate();
        }
    }

    fn run_init_hook(&mut self, name: &str) {
        let Some(hook) = self.hooks.get_mut(name) else {
            return;
        };
        let Some(fragment) = self.screens.get(name) else {
            return;
        };

        let mut requests = Vec::new();
        let mut ctx = ScreenContext {
            fragment,
            teardown: &mut self.teardown,
            requests: &mut requests,
        };
        if let Err(err) = hook.init(&mut ctx) {
            error!(screen = name, error = %err, "screen init failed; screen stays visible");
        }

        for request in requests {
            let err = NavigationError::Reentrant {
                requested: format!("{request:?}"),
            };
            warn!(screen = name, error = %err, "dropping navigation requested during init");
        }
    }
}
