/// Example: Render an STL file once into the terminal
///
/// Usage: cargo run --example view_stl -- path/to/file.stl

use crossterm::{execute, terminal};
use showcase_core::{stl, DrawSurface, Mesh, MeshViewer, ViewerConfig};
use showcase_terminal::AsciiRenderer;
use std::env;
use std::fs;
use std::io::{self, stdout, Write};

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mesh = if args.len() < 2 {
        eprintln!("Usage: {} <stl-file>", args[0]);
        eprintln!("\nNo STL file provided, using default cube...");
        Mesh::cube(2.0)
    } else {
        let data = fs::read(&args[1]).map_err(|e| {
            io::Error::new(io::ErrorKind::NotFound, format!("Failed to read STL file: {}", e))
        })?;
        stl::parse_stl(&data).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Failed to parse STL: {}", e))
        })?
    };
    println!("Loaded {} triangles", mesh.len());

    let (cols, rows) = terminal::size().unwrap_or((80, 24));
    let mut renderer = AsciiRenderer::new(cols as usize, rows.saturating_sub(2) as usize);
    let viewer = MeshViewer::with_mesh(ViewerConfig::default(), mesh, renderer.width(), renderer.height());
    viewer.draw(&mut renderer);

    let mut out = stdout();
    execute!(out, terminal::Clear(terminal::ClearType::All))?;
    renderer.draw(&mut out)?;
    writeln!(out)?;
    out.flush()
}
