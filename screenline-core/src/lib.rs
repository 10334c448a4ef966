/// Screenline Core - Perspective-correct thick lines for 3D scene graphs
///
/// This library provides the camera and projection pipeline, scene-graph
/// transform resolution, screen-space line widening and wireframe
/// extraction. It owns no window, clock or GPU: the host calls
/// [`ThickLine::tick`] once per frame and draws the resulting mesh.

pub mod camera;
pub mod error;
pub mod geometry;
pub mod line;
pub mod math;
pub mod scene;
pub mod transform;
pub mod wireframe;

// Re-export commonly used types
pub use camera::{
    Camera, Eye, MatrixCamera, OrthographicCamera, PerspectiveCamera, Rect, Viewport,
};
pub use error::{CameraError, SceneError};
pub use geometry::{Aabb, Color, MeshGeometry, Model};
pub use line::{FrameOutcome, LineMesh, NearestPoint, ThickLine};
pub use math::{Mat4, Pt2, Pt3, Real, Vec3};
pub use scene::{NodeId, NodeKind, SceneGraph};
pub use transform::TransformStack;
pub use wireframe::build_wireframe;
