/// Showcase Terminal Kiosk
///
/// Runs the kiosk screens in the terminal, with the STL viewer on the
/// `stl` screen.
/// Controls:
///   - 1-9: Open the numbered screen
///   - B/Backspace: Back, H/Home: Home
///   - Arrows, +/-, R, A, mouse drag: Viewer controls
///   - Q/ESC: Quit
///
/// Set SHOWCASE_CONFIG to a JSON config file to override defaults.

use std::io;
use showcase_core::ShowcaseConfig;
use showcase_terminal::{init_logging, TerminalApp};

fn main() -> io::Result<()> {
    let config = ShowcaseConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    init_logging(&config)?;

    let title = config.app_title.clone();
    println!("{title} - Loading...");

    let mut app = TerminalApp::new(config)?;
    app.run()?;

    println!("Thank you for using {title}!");
    Ok(())
}
