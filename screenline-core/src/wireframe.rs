/// Wireframe extraction from triangulated model hierarchies
use tracing::trace;

use crate::geometry::{MeshGeometry, Model};
use crate::math::{Mat4, Pt3};
use crate::transform::TransformStack;

/// Flatten `model` into triangle edges, returned as consecutive point pairs
/// in the root's coordinate space.
///
/// Each triangle `(i0, i1, i2)` yields the edges `i0-i1`, `i1-i2`, `i2-i0`.
/// A mesh without indices is read as consecutive position triples. The first
/// triangle that references a missing position ends that mesh: nothing from
/// it or any later triangle of the same mesh is emitted, matching how a
/// renderer stops at the first malformed primitive.
pub fn build_wireframe(model: &Model) -> Vec<Pt3> {
    let mut stack = TransformStack::new();
    let mut points = Vec::new();
    visit(model, &mut stack, &mut points);
    points
}

fn visit(model: &Model, stack: &mut TransformStack, out: &mut Vec<Pt3>) {
    let mut scope = stack.scoped(model.transform());
    match model {
        Model::Group { children, .. } => {
            for child in children {
                visit(child, &mut scope, out);
            }
        }
        Model::Mesh { geometry, .. } => {
            let top = scope.top();
            mesh_edges(geometry, &top, out);
        }
    }
}

fn mesh_edges(geometry: &MeshGeometry, matrix: &Mat4, out: &mut Vec<Pt3>) {
    let positions: Vec<Pt3> = geometry
        .positions
        .iter()
        .map(|p| matrix.transform_point(p))
        .collect();

    let triangles: Vec<[usize; 3]> = if geometry.indices.is_empty() {
        (0..positions.len() / 3)
            .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
            .collect()
    } else {
        geometry
            .indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
            .collect()
    };

    for (n, [i0, i1, i2]) in triangles.into_iter().enumerate() {
        let (Some(&p0), Some(&p1), Some(&p2)) =
            (positions.get(i0), positions.get(i1), positions.get(i2))
        else {
            trace!(triangle = n, "index out of range, truncating mesh wireframe");
            return;
        };
        out.extend_from_slice(&[p0, p1, p1, p2, p2, p0]);
    }
}
