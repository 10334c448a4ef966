/// Screenline Web - WASM bindings for the thick-line overlay
///
/// Wraps a single-viewport scene with one line overlay. JavaScript calls
/// `render` once per animation frame and draws the pixel-space triangles
/// returned by `screen_triangles`.
use screenline_core::camera::project_point;
use screenline_core::transform::rotation;
use screenline_core::{
    Color, Eye, FrameOutcome, MeshGeometry, Model, NodeId, NodeKind, PerspectiveCamera, Pt2, Pt3,
    Rect, Real, SceneGraph, ThickLine, Viewport,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WebRenderer {
    graph: SceneGraph,
    viewport: NodeId,
    model: NodeId,
    line: ThickLine,
    angles: [Real; 3],
    last_outcome: Option<FrameOutcome>,
}

#[wasm_bindgen]
impl WebRenderer {
    /// `field_of_view` is horizontal, in degrees.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, field_of_view: f64) -> Result<WebRenderer, JsValue> {
        let eye = Eye::looking_at(Pt3::new(0.0, 0.0, 5.0), Pt3::origin());
        let camera = PerspectiveCamera::new(eye, field_of_view, 0.1, 1000.0);
        screenline_core::Camera::from(camera)
            .validate()
            .map_err(|err| JsValue::from_str(&err.to_string()))?;

        let mut graph = SceneGraph::new();
        let viewport = graph.add_viewport(Viewport::new(camera, Rect::from_size(width, height)));
        let model = graph
            .add_child(viewport, NodeKind::Group, None)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;

        let mut line = ThickLine::new().with_thickness(2.0);
        line.attach(model);

        Ok(WebRenderer {
            graph,
            viewport,
            model,
            line,
            angles: [0.0; 3],
            last_outcome: None,
        })
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if let Ok(Some(viewport)) = self.graph.viewport_mut(self.viewport) {
            viewport.rect = Rect::from_size(width, height);
        }
    }

    pub fn add_segment(&mut self, x0: f64, y0: f64, z0: f64, x1: f64, y1: f64, z1: f64) {
        self.line
            .add_segment(Pt3::new(x0, y0, z0), Pt3::new(x1, y1, z1));
    }

    pub fn clear(&mut self) {
        self.line.clear();
    }

    /// Replace the lines with the edges of an indexed mesh given as flat
    /// `xyz` positions. An empty index list reads positions as triangles.
    pub fn load_wireframe(&mut self, positions: Vec<f64>, indices: Vec<u32>) {
        let positions = positions
            .chunks_exact(3)
            .map(|p| Pt3::new(p[0], p[1], p[2]))
            .collect();
        self.line
            .set_wireframe(&Model::mesh(MeshGeometry::new(positions, indices)));
    }

    pub fn set_thickness(&mut self, thickness: f64) {
        self.line.set_thickness(thickness);
    }

    pub fn set_color(&mut self, r: f32, g: f32, b: f32) {
        self.line.set_color(Color::rgb(r, g, b));
    }

    /// CSS color string for the current line color.
    pub fn css_color(&self) -> String {
        let c = self.line.color();
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("rgb({}, {}, {})", channel(c.r), channel(c.g), channel(c.b))
    }

    /// Update rotation state
    pub fn rotate(&mut self, dx: f64, dy: f64, dz: f64) {
        self.angles[0] += dx;
        self.angles[1] += dy;
        self.angles[2] += dz;
        let [x, y, z] = self.angles;
        if let Err(err) = self.graph.set_transform(self.model, Some(rotation(x, y, z))) {
            console_warn(&format!("screenline: model node vanished: {err}"));
        }
    }

    /// Per-frame tick. Returns true when the triangles changed.
    ///
    /// A degenerate camera empties the mesh once; repeated degenerate frames
    /// report no change and stay quiet.
    pub fn render(&mut self) -> Result<bool, JsValue> {
        let outcome = self
            .line
            .tick(&self.graph)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        let previous = self.last_outcome.replace(outcome);
        match outcome {
            FrameOutcome::Rebuilt => Ok(true),
            FrameOutcome::Invalid if previous != Some(FrameOutcome::Invalid) => {
                console_warn("screenline: camera is degenerate, skipping frames");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Triangle corners in pixels as flat `x, y, depth` triples, three
    /// corners per triangle.
    pub fn screen_triangles(&self) -> Vec<f32> {
        let Some(to_pixels) = self.line.viewport_transform() else {
            return Vec::new();
        };
        let mesh = self.line.mesh();
        let mut out = Vec::with_capacity(mesh.indices.len() * 3);
        for i in 0..mesh.triangle_count() {
            let Some(corners) = mesh.triangle(i) else {
                continue;
            };
            let projected: Option<Vec<Pt3>> = corners
                .iter()
                .map(|corner| project_point(to_pixels, corner))
                .collect();
            if let Some(projected) = projected {
                for p in projected {
                    out.extend([p.x as f32, p.y as f32, p.z as f32]);
                }
            }
        }
        out
    }

    pub fn triangle_count(&self) -> usize {
        self.line.mesh().triangle_count()
    }

    /// Index of the line point nearest to the pixel `(x, y)`, or -1.
    pub fn pick(&self, x: f64, y: f64) -> i32 {
        self.line
            .nearest_point(Pt2::new(x, y))
            .map_or(-1, |hit| hit.index as i32)
    }
}

fn console_warn(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}
