/// ASCII rasterizer for widened line meshes
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use screenline_core::camera::project_point;
use screenline_core::{LineMesh, Mat4, Pt3};
use std::io::Write;

/// Glyph ramp from far to near
const DEPTH_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Fills line quads into a character grid with a depth test.
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f64>,
    char_buffer: Vec<char>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f64::INFINITY; size],
            char_buffer: vec![' '; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f64::INFINITY);
        self.char_buffer.fill(' ');
    }

    /// Rasterize `mesh`, whose positions are in the space `to_pixels` maps
    /// from (the line node's local space).
    pub fn render_line(&mut self, mesh: &LineMesh, to_pixels: &Mat4) {
        for i in 0..mesh.triangle_count() {
            if let Some(triangle) = mesh.triangle(i) {
                self.render_triangle(&triangle, to_pixels);
            }
        }
    }

    fn render_triangle(&mut self, triangle: &[Pt3; 3], to_pixels: &Mat4) {
        let mut screen = [(0.0, 0.0, 0.0); 3];
        for (slot, corner) in screen.iter_mut().zip(triangle) {
            match project_point(to_pixels, corner) {
                // depth outside [0, 1] is clipped by the near or far plane
                Some(p) if (0.0..=1.0).contains(&p.z) => *slot = (p.x, p.y, p.z),
                _ => return,
            }
        }
        self.rasterize_triangle(&screen);
    }

    fn rasterize_triangle(&mut self, coords: &[(f64, f64, f64); 3]) {
        let [v0, v1, v2] = *coords;

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i64;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i64;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i64;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i64;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i64 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i64 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f64 + 0.5;
                let py = y as f64 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = depth_glyph(depth);
                }
            }
        }
    }

    /// Number of cells covered by at least one quad.
    pub fn filled_cells(&self) -> usize {
        self.char_buffer.iter().filter(|&&c| c != ' ').count()
    }

    pub fn draw<W: Write>(&self, writer: &mut W, tint: Color) -> std::io::Result<()> {
        writer.queue(SetForegroundColor(tint))?;
        for row in self.char_buffer.chunks(self.width.max(1)) {
            let line: String = row.iter().collect();
            writer.queue(Print(line))?;
            writer.queue(Print('\n'))?;
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Perspective depth crowds toward 1, so spread it before picking a glyph.
fn depth_glyph(depth: f64) -> char {
    let nearness = (1.0 - depth).clamp(0.0, 1.0).sqrt();
    let index = (nearness * (DEPTH_RAMP.len() - 1) as f64).round() as usize;
    DEPTH_RAMP[index.min(DEPTH_RAMP.len() - 1)]
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f64, f64),
    v1: (f64, f64),
    v2: (f64, f64),
    p: (f64, f64),
) -> Option<(f64, f64, f64)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-9 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barycentric_inside_and_degenerate() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!(w0 > 0.0 && w1 > 0.0 && w2 > 0.0);
        assert!((w0 + w1 + w2 - 1.0).abs() < 1e-12);
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 1.0)).is_none());
    }

    #[test]
    fn test_quad_fills_cells() {
        let mut renderer = AsciiRenderer::new(10, 10);
        let mesh = LineMesh {
            positions: vec![
                Pt3::new(1.0, 4.0, 0.5),
                Pt3::new(1.0, 6.0, 0.5),
                Pt3::new(9.0, 4.0, 0.5),
                Pt3::new(9.0, 6.0, 0.5),
            ],
            indices: vec![0, 1, 3, 0, 3, 2],
        };
        renderer.render_line(&mesh, &Mat4::identity());
        assert_eq!(renderer.filled_cells(), 16);

        renderer.clear();
        assert_eq!(renderer.filled_cells(), 0);
    }

    #[test]
    fn test_depth_glyph_ramp() {
        assert_eq!(depth_glyph(1.0), '.');
        assert_eq!(depth_glyph(0.0), '@');
    }
}
