/// Screen-space thick lines.
///
/// A [`ThickLine`] keeps a list of 3D segment endpoints and turns them into a
/// quad per segment whose width is constant in *pixels*, however far the
/// segment is from the camera. The widening happens after projection: each
/// endpoint is taken to homogeneous viewport space, pushed sideways along
/// the on-screen perpendicular (scaled by its `w` so the push survives the
/// perspective divide), and carried back through the inverse matrix into
/// the node's local space.
///
/// The host drives the line by calling [`ThickLine::tick`] once per frame.
use tracing::debug;

use crate::error::SceneError;
use crate::geometry::{Color, Model};
use crate::math::{dehomogenize, homogeneous, Mat4, Pt2, Pt3, Real, Vec2, Vec4, W_EPSILON};
use crate::scene::{NodeId, SceneGraph};
use crate::wireframe::build_wireframe;

/// Triangulated output: 4 positions and 6 indices per segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineMesh {
    pub positions: Vec<Pt3>,
    pub indices: Vec<u32>,
}

impl LineMesh {
    fn with_segments(segments: usize) -> Self {
        Self {
            positions: Vec::with_capacity(segments * 4),
            indices: Vec::with_capacity(segments * 6),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Corner positions of triangle `i`.
    pub fn triangle(&self, i: usize) -> Option<[Pt3; 3]> {
        let idx = self.indices.get(i * 3..i * 3 + 3)?;
        Some([
            *self.positions.get(idx[0] as usize)?,
            *self.positions.get(idx[1] as usize)?,
            *self.positions.get(idx[2] as usize)?,
        ])
    }
}

/// A derived value remembered together with the matrix it was computed for.
#[derive(Debug, Clone, Default)]
struct Cached<T> {
    value: T,
    valid_for: Option<Mat4>,
}

impl<T: Default> Cached<T> {
    fn is_valid_for(&self, matrix: &Mat4) -> bool {
        self.valid_for.as_ref() == Some(matrix)
    }

    fn store(&mut self, value: T, matrix: Mat4) {
        self.value = value;
        self.valid_for = Some(matrix);
    }

    fn invalidate(&mut self) {
        self.valid_for = None;
    }

    fn clear(&mut self) {
        self.value = T::default();
        self.valid_for = None;
    }
}

/// What a call to [`ThickLine::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not attached to a node; nothing to do.
    Detached,
    /// Matrix and inputs unchanged since the last build.
    Unchanged,
    /// The mesh was recomputed.
    Rebuilt,
    /// The camera is degenerate this frame; the mesh is now empty.
    Invalid,
}

/// Result of a screen-space nearest point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    /// Index into [`ThickLine::points`].
    pub index: usize,
    pub point: Pt3,
    /// Projected pixel position.
    pub screen: Pt2,
    /// Pixel distance from the query position.
    pub distance: Real,
}

#[derive(Debug, Clone)]
pub struct ThickLine {
    node: Option<NodeId>,
    points: Vec<Pt3>,
    color: Color,
    thickness: Real,
    mesh: Cached<LineMesh>,
    // last invertible viewport matrix, used for picking
    projection: Option<Mat4>,
}

impl ThickLine {
    pub fn new() -> Self {
        Self {
            node: None,
            points: Vec::new(),
            color: Color::default(),
            thickness: 1.0,
            mesh: Cached::default(),
            projection: None,
        }
    }

    pub fn with_thickness(mut self, thickness: Real) -> Self {
        self.set_thickness(thickness);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Start following `node`; the next tick rebuilds.
    pub fn attach(&mut self, node: NodeId) {
        self.node = Some(node);
        self.mesh.invalidate();
    }

    /// Stop following the scene. Drops the mesh; further ticks do nothing.
    pub fn detach(&mut self) {
        self.node = None;
        self.mesh.clear();
        self.projection = None;
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn points(&self) -> &[Pt3] {
        &self.points
    }

    pub fn segment_count(&self) -> usize {
        self.points.len() / 2
    }

    /// Append one endpoint. Points pair up in order; an unpaired trailing
    /// point is ignored when widening.
    pub fn add_point(&mut self, point: Pt3) {
        self.points.push(point);
        self.mesh.invalidate();
    }

    pub fn add_segment(&mut self, start: Pt3, end: Pt3) {
        self.points.extend([start, end]);
        self.mesh.invalidate();
    }

    pub fn extend_points(&mut self, points: impl IntoIterator<Item = Pt3>) {
        self.points.extend(points);
        self.mesh.invalidate();
    }

    pub fn set_points(&mut self, points: Vec<Pt3>) {
        self.points = points;
        self.mesh.invalidate();
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.mesh.invalidate();
    }

    /// Replace the points with the triangle edges of `model`.
    pub fn set_wireframe(&mut self, model: &Model) {
        self.set_points(build_wireframe(model));
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Full on-screen width in pixels.
    pub fn thickness(&self) -> Real {
        self.thickness
    }

    pub fn set_thickness(&mut self, thickness: Real) {
        let thickness = thickness.max(0.0);
        if thickness != self.thickness {
            self.thickness = thickness;
            self.mesh.invalidate();
        }
    }

    /// The widened mesh as of the last tick, in the attached node's space.
    pub fn mesh(&self) -> &LineMesh {
        &self.mesh.value
    }

    /// Node-local to pixel matrix the current mesh was built with.
    pub fn viewport_transform(&self) -> Option<&Mat4> {
        self.projection.as_ref()
    }

    /// Per-frame update. Rebuilds the mesh when the node's viewport matrix
    /// or the line's inputs changed since the last build.
    ///
    /// A singular viewport matrix leaves an empty mesh that is kept until the
    /// matrix or the inputs change, rather than being retried every frame.
    pub fn tick(&mut self, graph: &SceneGraph) -> Result<FrameOutcome, SceneError> {
        let Some(node) = self.node else {
            return Ok(FrameOutcome::Detached);
        };

        let Some(matrix) = graph.to_viewport_transform(node)? else {
            if self.mesh.valid_for.is_some() {
                debug!(node = node.index(), "viewport unavailable, dropping line mesh");
            }
            self.mesh.clear();
            self.projection = None;
            return Ok(FrameOutcome::Invalid);
        };

        if self.mesh.is_valid_for(&matrix) {
            return Ok(FrameOutcome::Unchanged);
        }

        let Some(inverse) = matrix.try_inverse() else {
            debug!(node = node.index(), "viewport matrix is singular, dropping line mesh");
            self.mesh.store(LineMesh::default(), matrix);
            self.projection = None;
            return Ok(FrameOutcome::Invalid);
        };

        let mesh = widen_segments(&self.points, self.thickness / 2.0, &matrix, &inverse);
        debug!(
            node = node.index(),
            segments = self.segment_count(),
            "rebuilt line mesh"
        );
        self.mesh.store(mesh, matrix);
        self.projection = Some(matrix);
        Ok(FrameOutcome::Rebuilt)
    }

    /// The source point whose projection lies nearest to `screen` (pixels).
    ///
    /// `None` when there is no valid projection yet or no point lies in
    /// front of the camera.
    pub fn nearest_point(&self, screen: Pt2) -> Option<NearestPoint> {
        let matrix = self.projection.as_ref()?;
        self.points
            .iter()
            .enumerate()
            .filter_map(|(index, point)| {
                let projected = screen_position(&(matrix * homogeneous(point)))?;
                Some(NearestPoint {
                    index,
                    point: *point,
                    screen: projected,
                    distance: (projected - screen).norm(),
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

impl Default for ThickLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Pixel position of a homogeneous viewport-space point in front of the camera.
fn screen_position(v: &Vec4) -> Option<Pt2> {
    if v.w <= W_EPSILON {
        return None;
    }
    Some(Pt2::new(v.x / v.w, v.y / v.w))
}

/// Unit on-screen perpendicular to the segment `a -> b`, zero when the
/// segment has no on-screen extent.
fn screen_normal(a: &Vec4, b: &Vec4) -> Vec2 {
    if a.w.abs() < W_EPSILON || b.w.abs() < W_EPSILON {
        return Vec2::zeros();
    }
    let d = Vec2::new(b.x / b.w - a.x / a.w, b.y / b.w - a.y / a.w);
    let len = d.norm();
    if len < W_EPSILON {
        return Vec2::zeros();
    }
    Vec2::new(-d.y, d.x) / len
}

/// Build one quad per endpoint pair. Vertex order per segment is
/// `A+, A-, B+, B-`; segments never share vertices.
fn widen_segments(points: &[Pt3], half_thickness: Real, matrix: &Mat4, inverse: &Mat4) -> LineMesh {
    let mut mesh = LineMesh::with_segments(points.len() / 2);

    for (segment, pair) in points.chunks_exact(2).enumerate() {
        let a = matrix * homogeneous(&pair[0]);
        let b = matrix * homogeneous(&pair[1]);
        let offset = screen_normal(&a, &b) * half_thickness;

        for (source, p) in [(&pair[0], a), (&pair[1], b)] {
            let shift = Vec4::new(offset.x * p.w, offset.y * p.w, 0.0, 0.0);
            for side in [p + shift, p - shift] {
                let local = dehomogenize(&(inverse * side)).unwrap_or(*source);
                mesh.positions.push(local);
            }
        }

        let base = (segment * 4) as u32;
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 3, base, base + 3, base + 2]);
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{project_point, Eye, PerspectiveCamera, Rect, Viewport};
    use crate::geometry::MeshGeometry;
    use crate::math::Vec3;
    use crate::scene::NodeKind;

    fn scene() -> (SceneGraph, NodeId, NodeId) {
        let eye = Eye::new(Pt3::origin(), -Vec3::z(), Vec3::y());
        let mut graph = SceneGraph::new();
        let root = graph.add_viewport(Viewport::new(
            PerspectiveCamera::new(eye, 90.0, 1.0, 1000.0),
            Rect::from_size(800.0, 600.0),
        ));
        let node = graph.add_child(root, NodeKind::Group, None).unwrap();
        (graph, root, node)
    }

    #[test]
    fn test_empty_line_has_empty_mesh() {
        let (graph, _, node) = scene();
        let mut line = ThickLine::new();
        line.attach(node);
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Rebuilt);
        assert!(line.mesh().positions.is_empty());
        assert!(line.mesh().indices.is_empty());
    }

    #[test]
    fn test_one_segment_makes_one_quad() {
        let (graph, _, node) = scene();
        let mut line = ThickLine::new().with_thickness(2.0);
        line.attach(node);
        line.add_segment(Pt3::new(-1.0, 0.0, -5.0), Pt3::new(1.0, 0.0, -5.0));
        line.tick(&graph).unwrap();

        let mesh = line.mesh();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 3, 0, 3, 2]);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_trailing_point_is_ignored() {
        let (graph, _, node) = scene();
        let mut line = ThickLine::new();
        line.attach(node);
        line.extend_points([
            Pt3::new(0.0, 0.0, -5.0),
            Pt3::new(1.0, 0.0, -5.0),
            Pt3::new(2.0, 0.0, -5.0),
        ]);
        line.tick(&graph).unwrap();
        assert_eq!(line.mesh().positions.len(), 4);
        assert_eq!(line.segment_count(), 1);
    }

    #[test]
    fn test_segments_do_not_share_vertices() {
        let (graph, _, node) = scene();
        let mut line = ThickLine::new();
        line.attach(node);
        let shared = Pt3::new(0.0, 0.0, -5.0);
        line.add_segment(Pt3::new(-1.0, 0.0, -5.0), shared);
        line.add_segment(shared, Pt3::new(0.0, 1.0, -5.0));
        line.tick(&graph).unwrap();

        let mesh = line.mesh();
        assert_eq!(mesh.positions.len(), 8);
        assert_eq!(&mesh.indices[6..], &[4, 5, 7, 4, 7, 6]);
    }

    #[test]
    fn test_pixel_width_is_independent_of_depth() {
        let (graph, _, node) = scene();
        let mut line = ThickLine::new().with_thickness(6.0);
        line.attach(node);
        line.add_segment(Pt3::new(-1.0, 0.5, -5.0), Pt3::new(1.0, 0.2, -5.0));
        line.add_segment(Pt3::new(-1.0, 0.5, -40.0), Pt3::new(1.0, 0.2, -40.0));
        line.tick(&graph).unwrap();

        let matrix = *line.viewport_transform().unwrap();
        let pixel = |p: &Pt3| project_point(&matrix, p).unwrap();
        let mesh = line.mesh();
        for segment in 0..2 {
            let quad = &mesh.positions[segment * 4..segment * 4 + 4];
            let (a_plus, a_minus) = (pixel(&quad[0]), pixel(&quad[1]));
            let (b_plus, b_minus) = (pixel(&quad[2]), pixel(&quad[3]));
            let width_a = (a_plus.xy() - a_minus.xy()).norm();
            let width_b = (b_plus.xy() - b_minus.xy()).norm();
            assert!((width_a - 6.0).abs() < 1e-6, "segment {segment}: {width_a}");
            assert!((width_b - 6.0).abs() < 1e-6, "segment {segment}: {width_b}");

            // the offset is perpendicular to the on-screen segment
            let along = pixel(&line.points()[segment * 2 + 1]).xy()
                - pixel(&line.points()[segment * 2]).xy();
            let across = a_plus.xy() - a_minus.xy();
            assert!(along.dot(&across).abs() < 1e-6);
        }
    }

    #[test]
    fn test_unchanged_matrix_skips_rebuild() {
        let (mut graph, _, node) = scene();
        let mut line = ThickLine::new();
        line.attach(node);
        line.add_segment(Pt3::new(0.0, 0.0, -5.0), Pt3::new(1.0, 0.0, -5.0));

        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Rebuilt);
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Unchanged);

        line.set_thickness(3.0);
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Rebuilt);
        line.set_thickness(3.0);
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Unchanged);

        line.set_color(Color::WHITE);
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Unchanged);

        graph
            .set_transform(node, Some(Mat4::new_translation(&Vec3::new(0.0, 0.0, -1.0))))
            .unwrap();
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Rebuilt);
    }

    #[test]
    fn test_degenerate_camera_clears_and_recovers() {
        let (mut graph, root, node) = scene();
        let mut line = ThickLine::new();
        line.attach(node);
        line.add_segment(Pt3::new(0.0, 0.0, -5.0), Pt3::new(1.0, 0.0, -5.0));
        line.tick(&graph).unwrap();
        assert!(!line.mesh().is_empty());

        graph.viewport_mut(root).unwrap().unwrap().rect.width = 0.0;
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Invalid);
        assert!(line.mesh().is_empty());
        assert!(line.viewport_transform().is_none());
        assert!(line.nearest_point(Pt2::new(400.0, 300.0)).is_none());

        graph.viewport_mut(root).unwrap().unwrap().rect.width = 800.0;
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Rebuilt);
        assert_eq!(line.mesh().positions.len(), 4);
    }

    #[test]
    fn test_singular_node_transform_backs_off() {
        let (mut graph, _, node) = scene();
        graph.set_transform(node, Some(Mat4::zeros())).unwrap();
        let mut line = ThickLine::new();
        line.attach(node);
        line.add_segment(Pt3::new(0.0, 0.0, -5.0), Pt3::new(1.0, 0.0, -5.0));

        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Invalid);
        assert!(line.mesh().is_empty());
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Unchanged);

        graph.set_transform(node, None).unwrap();
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Rebuilt);
    }

    #[test]
    fn test_detached_line_ignores_ticks() {
        let (graph, _, node) = scene();
        let mut line = ThickLine::new();
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Detached);

        line.attach(node);
        line.add_segment(Pt3::new(0.0, 0.0, -5.0), Pt3::new(1.0, 0.0, -5.0));
        line.tick(&graph).unwrap();
        line.detach();
        assert!(line.mesh().is_empty());
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Detached);
    }

    #[test]
    fn test_broken_linkage_is_an_error() {
        let mut graph = SceneGraph::new();
        let orphan = graph.add_root(NodeKind::Group, None);
        let mut line = ThickLine::new();
        line.attach(orphan);
        assert!(matches!(
            line.tick(&graph),
            Err(SceneError::NotAViewportRoot(..))
        ));
    }

    #[test]
    fn test_nearest_point() {
        let (graph, _, node) = scene();
        let mut line = ThickLine::new();
        line.attach(node);
        assert!(line.nearest_point(Pt2::new(0.0, 0.0)).is_none());

        line.add_segment(Pt3::new(0.0, 0.0, -10.0), Pt3::new(10.0, 0.0, -10.0));
        // behind the camera, never reported
        line.add_point(Pt3::new(0.0, 0.0, 10.0));
        line.tick(&graph).unwrap();

        let hit = line.nearest_point(Pt2::new(790.0, 310.0)).unwrap();
        assert_eq!(hit.index, 1);
        assert!((hit.screen.x - 800.0).abs() < 1e-9);
        assert!((hit.distance - 200.0_f64.sqrt()).abs() < 1e-9);

        let hit = line.nearest_point(Pt2::new(390.0, 300.0)).unwrap();
        assert_eq!(hit.index, 0);
    }

    #[test]
    fn test_wireframe_replaces_points() {
        let (graph, _, node) = scene();
        let mut line = ThickLine::new();
        line.attach(node);
        line.add_segment(Pt3::origin(), Pt3::new(1.0, 1.0, 1.0));
        let model = Model::mesh(MeshGeometry::new(
            vec![
                Pt3::new(0.0, 0.0, -5.0),
                Pt3::new(1.0, 0.0, -5.0),
                Pt3::new(0.0, 1.0, -5.0),
            ],
            vec![0, 1, 2],
        ));
        line.set_wireframe(&model);
        assert_eq!(line.points().len(), 6);
        assert_eq!(line.tick(&graph).unwrap(), FrameOutcome::Rebuilt);
        assert_eq!(line.mesh().positions.len(), 12);
    }
}
