/// Geometry primitives: indexed meshes, model hierarchies, bounding boxes
use crate::math::{Mat4, Pt3, Real, Vec3};

/// An indexed triangle mesh.
///
/// `indices` holds triangles with stride 3. When it is empty the positions
/// themselves are read as consecutive triangles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    pub positions: Vec<Pt3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    pub fn new(positions: Vec<Pt3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals: Vec::new(),
            indices,
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    pub fn triangle_count(&self) -> usize {
        if self.indices.is_empty() {
            self.positions.len() / 3
        } else {
            self.indices.len() / 3
        }
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }

    /// Axis-aligned cube centred on the origin, 8 shared corners, 12 triangles.
    pub fn cube(size: Real) -> Self {
        let h = size / 2.0;
        let positions = vec![
            Pt3::new(-h, -h, -h),
            Pt3::new(h, -h, -h),
            Pt3::new(h, h, -h),
            Pt3::new(-h, h, -h),
            Pt3::new(-h, -h, h),
            Pt3::new(h, -h, h),
            Pt3::new(h, h, h),
            Pt3::new(-h, h, h),
        ];
        let normals = positions.iter().map(|p| p.coords.normalize()).collect();
        #[rustfmt::skip]
        let indices = vec![
            4, 5, 6, 4, 6, 7, // front
            1, 0, 3, 1, 3, 2, // back
            3, 7, 6, 3, 6, 2, // top
            0, 1, 5, 0, 5, 4, // bottom
            1, 2, 6, 1, 6, 5, // right
            0, 4, 7, 0, 7, 3, // left
        ];
        Self::new(positions, indices).with_normals(normals)
    }
}

/// A hierarchy of meshes, each level optionally carrying a local transform.
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Group {
        transform: Option<Mat4>,
        children: Vec<Model>,
    },
    Mesh {
        transform: Option<Mat4>,
        geometry: MeshGeometry,
    },
}

impl Model {
    pub fn group(children: Vec<Model>) -> Self {
        Model::Group {
            transform: None,
            children,
        }
    }

    pub fn mesh(geometry: MeshGeometry) -> Self {
        Model::Mesh {
            transform: None,
            geometry,
        }
    }

    pub fn with_transform(mut self, matrix: Mat4) -> Self {
        match &mut self {
            Model::Group { transform, .. } | Model::Mesh { transform, .. } => {
                *transform = Some(matrix)
            }
        }
        self
    }

    pub fn transform(&self) -> Option<&Mat4> {
        match self {
            Model::Group { transform, .. } | Model::Mesh { transform, .. } => transform.as_ref(),
        }
    }

    /// Bounds of every mesh in the hierarchy, in the root's space.
    pub fn bounds(&self) -> Option<Aabb> {
        let local = match self {
            Model::Mesh { geometry, .. } => geometry.bounds(),
            Model::Group { children, .. } => children
                .iter()
                .filter_map(Model::bounds)
                .reduce(|a, b| a.union(&b)),
        };
        match (local, self.transform()) {
            (Some(b), Some(m)) => Some(b.transform(m)),
            (b, _) => b,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Pt3,
    pub max: Pt3,
}

impl Aabb {
    pub fn new(min: Pt3, max: Pt3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Pt3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut min = *first;
        let mut max = *first;
        for p in rest {
            min = min.inf(p);
            max = max.sup(p);
        }
        Some(Self { min, max })
    }

    pub fn center(&self) -> Pt3 {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn corners(&self) -> [Pt3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Pt3::new(a.x, a.y, a.z),
            Pt3::new(b.x, a.y, a.z),
            Pt3::new(a.x, b.y, a.z),
            Pt3::new(b.x, b.y, a.z),
            Pt3::new(a.x, a.y, b.z),
            Pt3::new(b.x, a.y, b.z),
            Pt3::new(a.x, b.y, b.z),
            Pt3::new(b.x, b.y, b.z),
        ]
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// True when `other` lies inside `self`, allowing `eps` of slack.
    pub fn contains(&self, other: &Aabb, eps: Real) -> bool {
        (0..3).all(|i| self.min[i] - eps <= other.min[i] && other.max[i] <= self.max[i] + eps)
    }

    /// See [`crate::camera::transform_aabb`].
    pub fn transform(&self, matrix: &Mat4) -> Aabb {
        crate::camera::transform_aabb(self, matrix)
    }
}

/// Straight RGBA color, each channel in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::translation;

    #[test]
    fn test_cube_counts() {
        let cube = MeshGeometry::cube(2.0);
        assert_eq!(cube.positions.len(), 8);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.positions.len()));
    }

    #[test]
    fn test_sequential_triangle_count() {
        let mesh = MeshGeometry::new(vec![Pt3::origin(); 7], Vec::new());
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_aabb_from_points() {
        assert!(Aabb::from_points(&[]).is_none());
        let b = Aabb::from_points(&[Pt3::new(1.0, -2.0, 3.0), Pt3::new(-1.0, 4.0, 0.0)]).unwrap();
        assert_eq!(b.min, Pt3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Pt3::new(1.0, 4.0, 3.0));
        assert_eq!(b.center(), Pt3::new(0.0, 1.0, 1.5));
    }

    #[test]
    fn test_model_bounds_follow_transforms() {
        let model = Model::group(vec![
            Model::mesh(MeshGeometry::cube(2.0)),
            Model::mesh(MeshGeometry::cube(2.0)).with_transform(translation(10.0, 0.0, 0.0)),
        ])
        .with_transform(translation(0.0, 1.0, 0.0));

        let b = model.bounds().unwrap();
        assert!((b.min.x + 1.0).abs() < 1e-12);
        assert!((b.max.x - 11.0).abs() < 1e-12);
        assert!((b.min.y - 0.0).abs() < 1e-12);
        assert!((b.max.y - 2.0).abs() < 1e-12);
    }
}
