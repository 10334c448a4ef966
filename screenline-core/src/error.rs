use thiserror::Error;

use crate::math::Real;
use crate::scene::NodeId;

/// Broken scene-graph linkage. These are caller bugs and are not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("node {0:?} is not part of this scene graph")]
    NotASceneNode(NodeId),
    #[error("node {0:?} is not rooted at a viewport (walk ended at {1:?})")]
    NotAViewportRoot(NodeId, NodeId),
}

/// Camera parameters that violate the camera invariants.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CameraError {
    #[error("near plane {near} must be in front of far plane {far}")]
    InvalidClipPlanes { near: Real, far: Real },
    #[error("only perspective cameras may use an infinite far plane")]
    InfiniteFarPlane,
    #[error("look and up directions are parallel or zero")]
    ParallelUpDirection,
    #[error("orthographic width must be positive, got {0}")]
    NonPositiveWidth(Real),
    #[error("field of view must be in (0, 180) degrees, got {0}")]
    InvalidFieldOfView(Real),
}
