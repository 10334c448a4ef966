/// Scalar and linear-algebra aliases shared by every module.
use nalgebra::{Matrix4, Point2, Point3, Vector2, Vector3, Vector4};

pub type Real = f64;

pub type Vec2 = Vector2<Real>;
pub type Vec3 = Vector3<Real>;
pub type Vec4 = Vector4<Real>;
pub type Pt2 = Point2<Real>;
pub type Pt3 = Point3<Real>;
pub type Mat4 = Matrix4<Real>;

/// Below this magnitude a homogeneous `w` is treated as zero.
pub const W_EPSILON: Real = 1e-12;

/// Lift a point to homogeneous coordinates with `w = 1`.
#[inline]
pub fn homogeneous(p: &Pt3) -> Vec4 {
    Vec4::new(p.x, p.y, p.z, 1.0)
}

/// Perspective divide. Returns `None` when `w` is (close to) zero.
#[inline]
pub fn dehomogenize(v: &Vec4) -> Option<Pt3> {
    if v.w.abs() < W_EPSILON {
        return None;
    }
    Some(Pt3::new(v.x / v.w, v.y / v.w, v.z / v.w))
}

/// Componentwise comparison within `eps`.
pub fn approx_eq(a: &Mat4, b: &Mat4, eps: Real) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= eps)
}
