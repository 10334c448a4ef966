/// Transform accumulation for hierarchy traversal
use std::ops::{Deref, DerefMut};

use nalgebra::Vector3;

use crate::math::{Mat4, Real};

/// Stack of 4x4 transforms used while walking a model or scene hierarchy.
///
/// Matrices use the column-vector convention. *Appending* `m` to the top
/// applies `m` after the current top (`m * top`); *prepending* applies it
/// before (`top * m`). An empty stack reads as the identity.
#[derive(Debug, Clone, Default)]
pub struct TransformStack {
    stack: Vec<Mat4>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Current top of the stack, identity when empty.
    pub fn top(&self) -> Mat4 {
        self.stack.last().copied().unwrap_or_else(Mat4::identity)
    }

    pub fn push(&mut self, matrix: Mat4) {
        self.stack.push(matrix);
    }

    pub fn pop(&mut self) -> Option<Mat4> {
        self.stack.pop()
    }

    /// Apply `matrix` after the current top.
    pub fn append(&mut self, matrix: &Mat4) {
        match self.stack.last_mut() {
            Some(top) => *top = matrix * *top,
            None => self.stack.push(*matrix),
        }
    }

    /// Apply `matrix` before the current top.
    pub fn prepend(&mut self, matrix: &Mat4) {
        match self.stack.last_mut() {
            Some(top) => *top = *top * matrix,
            None => self.stack.push(*matrix),
        }
    }

    /// Duplicate the top, prepend `local` to the copy, and hand back a guard
    /// that pops it again when dropped.
    pub fn scoped(&mut self, local: Option<&Mat4>) -> StackScope<'_> {
        let top = self.top();
        self.stack.push(top);
        if let Some(local) = local {
            self.prepend(local);
        }
        StackScope { stack: self }
    }
}

/// Pops the entry pushed by [`TransformStack::scoped`] on every exit path.
pub struct StackScope<'a> {
    stack: &'a mut TransformStack,
}

impl Deref for StackScope<'_> {
    type Target = TransformStack;

    fn deref(&self) -> &Self::Target {
        self.stack
    }
}

impl DerefMut for StackScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.stack
    }
}

impl Drop for StackScope<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

/// Rotation about X, then Y, then Z (radians).
pub fn rotation(x: Real, y: Real, z: Real) -> Mat4 {
    let rx = Mat4::new_rotation(Vector3::new(x, 0.0, 0.0));
    let ry = Mat4::new_rotation(Vector3::new(0.0, y, 0.0));
    let rz = Mat4::new_rotation(Vector3::new(0.0, 0.0, z));
    rz * ry * rx
}

pub fn translation(x: Real, y: Real, z: Real) -> Mat4 {
    Mat4::new_translation(&Vector3::new(x, y, z))
}

pub fn scaling(sx: Real, sy: Real, sz: Real) -> Mat4 {
    Mat4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
}
