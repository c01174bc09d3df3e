/// ASCII draw surface for terminal rendering
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::Point2;
use showcase_core::{DrawSurface, Shade};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are roughly twice as tall as they are wide
pub const CELL_ASPECT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    rgb: (u8, u8, u8),
}

const BLANK: Cell = Cell {
    ch: ' ',
    rgb: (0, 0, 0),
};

/// Character-cell surface. Logical coordinates are one unit per column and
/// `CELL_ASPECT` units per row, so meshes keep their proportions.
///
/// There is no depth buffer: later fills overwrite earlier ones, which is
/// what the painter's algorithm expects.
pub struct AsciiRenderer {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl AsciiRenderer {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![BLANK; cols * rows],
        }
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![BLANK; cols * rows];
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn char_at(&self, col: usize, row: usize) -> Option<char> {
        (col < self.cols && row < self.rows).then(|| self.cells[row * self.cols + col].ch)
    }

    /// Write text at a cell position, clipped to the row
    pub fn put_text(&mut self, text: &str, col: usize, row: usize, shade: Shade) {
        if row >= self.rows {
            return;
        }
        let rgb = shade.to_rgb();
        for (i, ch) in text.chars().enumerate() {
            let x = col + i;
            if x >= self.cols {
                break;
            }
            self.cells[row * self.cols + x] = Cell { ch, rgb };
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for row in 0..self.rows {
            writer.queue(cursor::MoveTo(0, row as u16))?;
            let mut current = None;
            for cell in &self.cells[row * self.cols..(row + 1) * self.cols] {
                if current != Some(cell.rgb) {
                    let (r, g, b) = cell.rgb;
                    writer.queue(SetForegroundColor(Color::Rgb { r, g, b }))?;
                    current = Some(cell.rgb);
                }
                writer.queue(Print(cell.ch))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

fn ramp_char(shade: Shade) -> char {
    let index = (shade.lightness() / 100.0 * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
    // The darkest lit face still has to show up against the background
    LUMINOSITY_RAMP[index.clamp(1, LUMINOSITY_RAMP.len() - 1)]
}

impl DrawSurface for AsciiRenderer {
    fn width(&self) -> u32 {
        self.cols as u32
    }

    fn height(&self) -> u32 {
        self.rows as u32 * CELL_ASPECT
    }

    fn clear(&mut self) {
        self.cells.fill(BLANK);
    }

    fn fill_triangle(&mut self, points: [Point2<f32>; 3], shade: Shade) {
        let cell = Cell {
            ch: ramp_char(shade),
            rgb: shade.to_rgb(),
        };
        let aspect = CELL_ASPECT as f32;
        let [v0, v1, v2] = points;

        // Bounding box in cells
        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as usize;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil().min(self.cols as f32 - 1.0);
        let min_y = (v0.y.min(v1.y).min(v2.y) / aspect).floor().max(0.0) as usize;
        let max_y = (v0.y.max(v1.y).max(v2.y) / aspect).ceil().min(self.rows as f32 - 1.0);
        // NaN vertices or a triangle entirely off-surface
        if !(max_x >= 0.0 && max_y >= 0.0) {
            return;
        }

        for row in min_y..=max_y as usize {
            for col in min_x..=max_x as usize {
                let p = Point2::new(col as f32 + 0.5, (row as f32 + 0.5) * aspect);
                if let Some((w0, w1, w2)) = barycentric(v0, v1, v2, p) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        self.cells[row * self.cols + col] = cell;
                    }
                }
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, shade: Shade) {
        let col = x.max(0.0) as usize;
        let row = (y.max(0.0) / CELL_ASPECT as f32) as usize;
        self.put_text(text, col, row, shade);
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: Point2<f32>,
    v1: Point2<f32>,
    v2: Point2<f32>,
    p: Point2<f32>,
) -> Option<(f32, f32, f32)> {
    let denom = (v1.y - v2.y) * (v0.x - v2.x) + (v2.x - v1.x) * (v0.y - v2.y);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.y - v2.y) * (p.x - v2.x) + (v2.x - v1.x) * (p.y - v2.y)) / denom;
    let w1 = ((v2.y - v0.y) * (p.x - v2.x) + (v0.x - v2.x) * (p.y - v2.y)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> [Point2<f32>; 3] {
        [Point2::new(a.0, a.1), Point2::new(b.0, b.1), Point2::new(c.0, c.1)]
    }

    #[test]
    fn test_surface_size_accounts_for_cell_aspect() {
        let surface = AsciiRenderer::new(80, 24);
        assert_eq!(surface.width(), 80);
        assert_eq!(surface.height(), 48);
    }

    #[test]
    fn test_fill_covers_interior() {
        let mut surface = AsciiRenderer::new(20, 10);
        surface.fill_triangle(tri((0.0, 0.0), (20.0, 0.0), (0.0, 20.0)), Shade::White);
        assert_eq!(surface.char_at(1, 1), Some('@'));
        assert_eq!(surface.char_at(19, 9), Some(' '));
    }

    #[test]
    fn test_later_fill_wins() {
        let mut surface = AsciiRenderer::new(10, 5);
        let whole = tri((-1.0, -1.0), (30.0, -1.0), (-1.0, 30.0));
        surface.fill_triangle(whole, Shade::White);
        surface.fill_triangle(whole, Shade::Grey { lightness: 30.0 });
        assert_eq!(surface.char_at(0, 0), Some('-'));
    }

    #[test]
    fn test_dark_faces_stay_visible() {
        assert_eq!(ramp_char(Shade::Grey { lightness: 0.0 }), '.');
        assert_eq!(ramp_char(Shade::Grey { lightness: 150.0 }), '@');
    }

    #[test]
    fn test_degenerate_and_nan_triangles_draw_nothing() {
        let mut surface = AsciiRenderer::new(10, 5);
        surface.fill_triangle(tri((0.0, 0.0), (5.0, 5.0), (9.0, 9.0)), Shade::White);
        surface.fill_triangle(tri((f32::NAN, 0.0), (5.0, 5.0), (0.0, 9.0)), Shade::White);
        surface.fill_triangle(tri((-50.0, -50.0), (-40.0, -50.0), (-50.0, -40.0)), Shade::White);
        assert!((0..5).all(|row| (0..10).all(|col| surface.char_at(col, row) == Some(' '))));
    }

    #[test]
    fn test_text_and_clear() {
        let mut surface = AsciiRenderer::new(12, 4);
        surface.fill_text("Failed", 2.0, 4.0, Shade::White);
        assert_eq!(surface.char_at(2, 2), Some('F'));
        surface.put_text("overflowing text", 8, 0, Shade::White);
        assert_eq!(surface.char_at(11, 0), Some('r'));

        surface.clear();
        assert_eq!(surface.char_at(2, 2), Some(' '));
    }

    #[test]
    fn test_draw_emits_every_cell() {
        let mut surface = AsciiRenderer::new(3, 2);
        surface.put_text("abc", 0, 1, Shade::White);
        let mut out = Vec::new();
        surface.draw(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("abc"));
    }
}
