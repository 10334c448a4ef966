/// Scene graph storage and world-transform resolution.
///
/// Nodes live in an arena owned by [`SceneGraph`]. Each node owns its list of
/// child ids and keeps a plain, non-owning id for its parent, so walking up
/// to the root never creates an ownership cycle. Every tree hangs off a
/// viewport root, which supplies the camera and pixel rectangle for the
/// matrices produced here.
use tracing::trace;

use crate::camera::{world_to_camera, world_to_viewport, Viewport};
use crate::error::SceneError;
use crate::geometry::{Aabb, MeshGeometry};
use crate::math::Mat4;

/// Handle to a node in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain transform node.
    Group,
    /// Tree root carrying a camera and a pixel rectangle.
    Viewport(Viewport),
    /// Leaf geometry.
    Mesh(MeshGeometry),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub transform: Option<Mat4>,
    pub kind: NodeKind,
}

impl SceneNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena of scene nodes.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Add a new root carrying `viewport`.
    pub fn add_viewport(&mut self, viewport: Viewport) -> NodeId {
        self.insert(None, None, NodeKind::Viewport(viewport))
    }

    /// Add a parentless node. It stays unrenderable until attached under a
    /// viewport root.
    pub fn add_root(&mut self, kind: NodeKind, transform: Option<Mat4>) -> NodeId {
        self.insert(None, transform, kind)
    }

    /// Add `kind` as the last child of `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        transform: Option<Mat4>,
    ) -> Result<NodeId, SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::NotASceneNode(parent));
        }
        let id = self.insert(Some(parent), transform, kind);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    fn insert(&mut self, parent: Option<NodeId>, transform: Option<Mat4>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            parent,
            children: Vec::new(),
            transform,
            kind,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(id.0).ok_or(SceneError::NotASceneNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(id.0).ok_or(SceneError::NotASceneNode(id))
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Option<Mat4>) -> Result<(), SceneError> {
        self.node_mut(id)?.transform = transform;
        Ok(())
    }

    /// Mutable access to the viewport carried by `id`, if it is a viewport root.
    pub fn viewport_mut(&mut self, id: NodeId) -> Result<Option<&mut Viewport>, SceneError> {
        Ok(match &mut self.node_mut(id)?.kind {
            NodeKind::Viewport(viewport) => Some(viewport),
            _ => None,
        })
    }

    /// Accumulate the transforms from `id` up to its root and return them
    /// together with the root's viewport.
    ///
    /// Each ancestor's transform is applied after its child's, so the result
    /// maps `id`'s local space into world space.
    pub fn resolve_world_transform(&self, id: NodeId) -> Result<(Mat4, &Viewport), SceneError> {
        let mut current = self.node(id)?;
        let mut current_id = id;
        let mut world = Mat4::identity();

        loop {
            if let Some(local) = &current.transform {
                world = local * world;
            }
            match current.parent {
                Some(parent) => {
                    current_id = parent;
                    current = self.node(parent)?;
                }
                None => break,
            }
        }

        match &current.kind {
            NodeKind::Viewport(viewport) => {
                trace!(node = id.0, root = current_id.0, "resolved world transform");
                Ok((world, viewport))
            }
            _ => Err(SceneError::NotAViewportRoot(id, current_id)),
        }
    }

    /// Local space of `id` to viewport pixels.
    ///
    /// `Ok(None)` means the camera is currently degenerate; broken linkage is
    /// an error.
    pub fn to_viewport_transform(&self, id: NodeId) -> Result<Option<Mat4>, SceneError> {
        let (world, viewport) = self.resolve_world_transform(id)?;
        Ok(world_to_viewport(viewport).map(|m| m * world))
    }

    /// Local space of `id` to camera space, for depth and distance queries.
    pub fn to_camera_space_transform(&self, id: NodeId) -> Result<Option<Mat4>, SceneError> {
        let (world, viewport) = self.resolve_world_transform(id)?;
        Ok(world_to_camera(viewport).map(|m| m * world))
    }

    /// World-space bounds of a mesh node; `None` for other kinds or empty meshes.
    pub fn world_bounds(&self, id: NodeId) -> Result<Option<Aabb>, SceneError> {
        let NodeKind::Mesh(geometry) = &self.node(id)?.kind else {
            return Ok(None);
        };
        let (world, _) = self.resolve_world_transform(id)?;
        Ok(geometry.bounds().map(|b| b.transform(&world)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Eye, PerspectiveCamera, Rect};
    use crate::math::{approx_eq, Pt3, Vec3};
    use crate::transform::{scaling, translation};

    fn viewport() -> Viewport {
        let eye = Eye::new(Pt3::origin(), -Vec3::z(), Vec3::y());
        Viewport::new(
            PerspectiveCamera::new(eye, 90.0, 1.0, 1000.0),
            Rect::from_size(800.0, 600.0),
        )
    }

    #[test]
    fn test_child_transform_nests_inside_parent() {
        let mut graph = SceneGraph::new();
        let root = graph.add_viewport(viewport());
        let parent = graph
            .add_child(root, NodeKind::Group, Some(translation(10.0, 0.0, 0.0)))
            .unwrap();
        let child = graph
            .add_child(parent, NodeKind::Group, Some(scaling(2.0, 2.0, 2.0)))
            .unwrap();

        let (world, _) = graph.resolve_world_transform(child).unwrap();
        let p = world.transform_point(&Pt3::new(1.0, 0.0, 0.0));
        // scaled in the child's space first, then moved by the parent
        assert!((p.x - 12.0).abs() < 1e-12);
        assert_eq!(graph.node(child).unwrap().parent(), Some(parent));
        assert_eq!(graph.node(parent).unwrap().children(), &[child]);
    }

    #[test]
    fn test_viewport_root_resolves_to_identity() {
        let mut graph = SceneGraph::new();
        let root = graph.add_viewport(viewport());
        let (world, vp) = graph.resolve_world_transform(root).unwrap();
        assert_eq!(world, Mat4::identity());
        assert_eq!(vp.rect.width, 800.0);
    }

    #[test]
    fn test_unknown_node_is_not_a_scene_node() {
        let graph = SceneGraph::new();
        let stray = NodeId(3);
        assert_eq!(
            graph.resolve_world_transform(stray).unwrap_err(),
            SceneError::NotASceneNode(stray)
        );
        let mut graph = SceneGraph::new();
        assert_eq!(
            graph.add_child(stray, NodeKind::Group, None).unwrap_err(),
            SceneError::NotASceneNode(stray)
        );
    }

    #[test]
    fn test_orphan_tree_is_not_viewport_rooted() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root(NodeKind::Group, None);
        let leaf = graph.add_child(root, NodeKind::Group, None).unwrap();
        assert_eq!(
            graph.to_viewport_transform(leaf).unwrap_err(),
            SceneError::NotAViewportRoot(leaf, root)
        );
    }

    #[test]
    fn test_viewport_transform_includes_node_transform() {
        let mut graph = SceneGraph::new();
        let root = graph.add_viewport(viewport());
        let node = graph
            .add_child(root, NodeKind::Group, Some(translation(0.0, 0.0, -10.0)))
            .unwrap();

        let m = graph.to_viewport_transform(node).unwrap().unwrap();
        let p = crate::camera::project_point(&m, &Pt3::origin()).unwrap();
        assert!((p.x - 400.0).abs() < 1e-9);
        assert!((p.y - 300.0).abs() < 1e-9);

        let camera = graph.to_camera_space_transform(node).unwrap().unwrap();
        assert!(approx_eq(&camera, &translation(0.0, 0.0, -10.0), 1e-12));
    }

    #[test]
    fn test_degenerate_camera_is_not_an_error() {
        let mut graph = SceneGraph::new();
        let root = graph.add_viewport(viewport());
        let node = graph.add_child(root, NodeKind::Group, None).unwrap();
        graph.viewport_mut(root).unwrap().unwrap().rect.height = 0.0;

        assert_eq!(graph.to_viewport_transform(node), Ok(None));
        assert_eq!(graph.to_camera_space_transform(node), Ok(None));
    }

    #[test]
    fn test_world_bounds() {
        let mut graph = SceneGraph::new();
        let root = graph.add_viewport(viewport());
        let group = graph
            .add_child(root, NodeKind::Group, Some(translation(5.0, 0.0, 0.0)))
            .unwrap();
        let mesh = graph
            .add_child(group, NodeKind::Mesh(MeshGeometry::cube(2.0)), None)
            .unwrap();

        let b = graph.world_bounds(mesh).unwrap().unwrap();
        assert!((b.min.x - 4.0).abs() < 1e-12);
        assert!((b.max.x - 6.0).abs() < 1e-12);
        assert_eq!(graph.world_bounds(group).unwrap(), None);
    }
}
