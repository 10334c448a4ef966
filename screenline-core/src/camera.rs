/// Camera and projection math
///
/// Builds view, projection and viewport matrices for the supported camera
/// kinds and composes them into the world-to-pixel pipeline. All matrices use
/// the column-vector convention, right-handed, with clip-space depth in
/// `[0, 1]`.
use tracing::debug;

use crate::error::CameraError;
use crate::geometry::Aabb;
use crate::math::{dehomogenize, homogeneous, Mat4, Pt3, Real, Vec3};

/// Position and orientation shared by the projection-style cameras.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eye {
    pub position: Pt3,
    pub look_direction: Vec3,
    pub up_direction: Vec3,
}

impl Eye {
    pub fn new(position: Pt3, look_direction: Vec3, up_direction: Vec3) -> Self {
        Self {
            position,
            look_direction,
            up_direction,
        }
    }

    /// Eye at `position` looking at `target`, +Y up.
    pub fn looking_at(position: Pt3, target: Pt3) -> Self {
        Self::new(position, target - position, Vec3::y())
    }

    /// Right-handed look-at basis with the eye translated to the origin.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            &self.position,
            &(self.position + self.look_direction),
            &self.up_direction,
        )
    }

    fn validate(&self) -> Result<(), CameraError> {
        let cross = self.up_direction.cross(&self.look_direction);
        if cross.norm_squared() <= Real::EPSILON * self.look_direction.norm_squared() {
            return Err(CameraError::ParallelUpDirection);
        }
        Ok(())
    }
}

impl Default for Eye {
    fn default() -> Self {
        Self::new(Pt3::new(0.0, 0.0, 5.0), -Vec3::z(), Vec3::y())
    }
}

/// Perspective camera with a *horizontal* field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub eye: Eye,
    /// Horizontal field of view in degrees.
    pub field_of_view: Real,
    pub near_plane: Real,
    /// May be `Real::INFINITY`.
    pub far_plane: Real,
    pub transform: Option<Mat4>,
}

impl PerspectiveCamera {
    pub fn new(eye: Eye, field_of_view: Real, near_plane: Real, far_plane: Real) -> Self {
        Self {
            eye,
            field_of_view,
            near_plane,
            far_plane,
            transform: None,
        }
    }

    pub fn projection_matrix(&self, aspect_ratio: Real) -> Mat4 {
        let half_fov = self.field_of_view.to_radians() / 2.0;
        let x_scale = 1.0 / half_fov.tan();
        let y_scale = aspect_ratio * x_scale;
        let z_scale = if self.far_plane.is_infinite() {
            -1.0
        } else {
            self.far_plane / (self.near_plane - self.far_plane)
        };
        let z_offset = self.near_plane * z_scale;

        #[rustfmt::skip]
        let projection = Mat4::new(
            x_scale, 0.0, 0.0, 0.0,
            0.0, y_scale, 0.0, 0.0,
            0.0, 0.0, z_scale, z_offset,
            0.0, 0.0, -1.0, 0.0,
        );
        projection
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(Eye::default(), 45.0, 0.1, 100.0)
    }
}

/// Orthographic camera; `width` is the visible extent along camera X.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicCamera {
    pub eye: Eye,
    pub width: Real,
    pub near_plane: Real,
    pub far_plane: Real,
    pub transform: Option<Mat4>,
}

impl OrthographicCamera {
    pub fn new(eye: Eye, width: Real, near_plane: Real, far_plane: Real) -> Self {
        Self {
            eye,
            width,
            near_plane,
            far_plane,
            transform: None,
        }
    }

    pub fn projection_matrix(&self, aspect_ratio: Real) -> Mat4 {
        let w = self.width;
        let h = w / aspect_ratio;
        let z_scale = 1.0 / (self.near_plane - self.far_plane);
        let z_offset = self.near_plane * z_scale;

        #[rustfmt::skip]
        let projection = Mat4::new(
            2.0 / w, 0.0, 0.0, 0.0,
            0.0, 2.0 / h, 0.0, 0.0,
            0.0, 0.0, z_scale, z_offset,
            0.0, 0.0, 0.0, 1.0,
        );
        projection
    }
}

/// Camera whose view and projection are supplied directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixCamera {
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub transform: Option<Mat4>,
}

impl MatrixCamera {
    pub fn new(view_matrix: Mat4, projection_matrix: Mat4) -> Self {
        Self {
            view_matrix,
            projection_matrix,
            transform: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Camera {
    Perspective(PerspectiveCamera),
    Orthographic(OrthographicCamera),
    Matrix(MatrixCamera),
}

impl Camera {
    /// The camera's own placement transform, if any.
    pub fn transform(&self) -> Option<&Mat4> {
        match self {
            Camera::Perspective(c) => c.transform.as_ref(),
            Camera::Orthographic(c) => c.transform.as_ref(),
            Camera::Matrix(c) => c.transform.as_ref(),
        }
    }

    pub fn set_transform(&mut self, transform: Option<Mat4>) {
        match self {
            Camera::Perspective(c) => c.transform = transform,
            Camera::Orthographic(c) => c.transform = transform,
            Camera::Matrix(c) => c.transform = transform,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        match self {
            Camera::Perspective(c) => c.eye.view_matrix(),
            Camera::Orthographic(c) => c.eye.view_matrix(),
            Camera::Matrix(c) => c.view_matrix,
        }
    }

    pub fn projection_matrix(&self, aspect_ratio: Real) -> Mat4 {
        match self {
            Camera::Perspective(c) => c.projection_matrix(aspect_ratio),
            Camera::Orthographic(c) => c.projection_matrix(aspect_ratio),
            Camera::Matrix(c) => c.projection_matrix,
        }
    }

    /// Check the clip-plane and orientation invariants.
    pub fn validate(&self) -> Result<(), CameraError> {
        match self {
            Camera::Perspective(c) => {
                if !(c.field_of_view > 0.0 && c.field_of_view < 180.0) {
                    return Err(CameraError::InvalidFieldOfView(c.field_of_view));
                }
                check_planes(c.near_plane, c.far_plane)?;
                c.eye.validate()
            }
            Camera::Orthographic(c) => {
                if c.far_plane.is_infinite() {
                    return Err(CameraError::InfiniteFarPlane);
                }
                if c.width <= 0.0 {
                    return Err(CameraError::NonPositiveWidth(c.width));
                }
                check_planes(c.near_plane, c.far_plane)?;
                c.eye.validate()
            }
            Camera::Matrix(_) => Ok(()),
        }
    }
}

impl From<PerspectiveCamera> for Camera {
    fn from(camera: PerspectiveCamera) -> Self {
        Camera::Perspective(camera)
    }
}

impl From<OrthographicCamera> for Camera {
    fn from(camera: OrthographicCamera) -> Self {
        Camera::Orthographic(camera)
    }
}

impl From<MatrixCamera> for Camera {
    fn from(camera: MatrixCamera) -> Self {
        Camera::Matrix(camera)
    }
}

fn check_planes(near: Real, far: Real) -> Result<(), CameraError> {
    if near.is_nan() || far.is_nan() || near >= far {
        return Err(CameraError::InvalidClipPlanes { near, far });
    }
    Ok(())
}

/// Pixel rectangle of a viewport; Y grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Real,
    pub y: Real,
    pub width: Real,
    pub height: Real,
}

impl Rect {
    pub fn new(x: Real, y: Real, width: Real, height: Real) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(width: Real, height: Real) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn aspect_ratio(&self) -> Real {
        self.width / self.height
    }
}

/// A camera paired with the pixel rectangle it renders into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub camera: Option<Camera>,
    pub rect: Rect,
}

impl Viewport {
    pub fn new(camera: impl Into<Camera>, rect: Rect) -> Self {
        Self {
            camera: Some(camera.into()),
            rect,
        }
    }
}

/// Homogeneous clip space to pixel space for `rect`.
pub fn clip_to_viewport(rect: &Rect) -> Mat4 {
    let sx = rect.width / 2.0;
    let sy = rect.height / 2.0;

    #[rustfmt::skip]
    let m = Mat4::new(
        sx, 0.0, 0.0, rect.x + sx,
        0.0, -sy, 0.0, rect.y + sy,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    );
    m
}

/// World space to camera space for `viewport`.
///
/// `None` when there is no camera, the rectangle is empty, or the camera's
/// own transform cannot be inverted. All three leave the scene unrenderable
/// until something changes, so callers should skip the frame.
pub fn world_to_camera(viewport: &Viewport) -> Option<Mat4> {
    let Some(camera) = viewport.camera.as_ref() else {
        debug!("viewport has no camera");
        return None;
    };
    if viewport.rect.is_empty() {
        debug!(rect = ?viewport.rect, "viewport rectangle is empty");
        return None;
    }

    let start = match camera.transform() {
        Some(transform) => match transform.try_inverse() {
            Some(inverse) => inverse,
            None => {
                debug!("camera transform is singular");
                return None;
            }
        },
        None => Mat4::identity(),
    };

    Some(camera.view_matrix() * start)
}

/// World space to pixel space for `viewport`: camera, projection, then
/// clip-to-pixel. Fails under the same conditions as [`world_to_camera`].
pub fn world_to_viewport(viewport: &Viewport) -> Option<Mat4> {
    let world_to_camera = world_to_camera(viewport)?;
    let camera = viewport.camera.as_ref()?;
    let projection = camera.projection_matrix(viewport.rect.aspect_ratio());

    Some(clip_to_viewport(&viewport.rect) * projection * world_to_camera)
}

/// Transform `point` by `matrix` including the homogeneous divide.
pub fn project_point(matrix: &Mat4, point: &Pt3) -> Option<Pt3> {
    dehomogenize(&(matrix * homogeneous(point)))
}

/// Transform a box by transforming its eight corners and re-fitting an
/// axis-aligned box around them. Corners that land on `w = 0` are skipped.
pub fn transform_aabb(aabb: &Aabb, matrix: &Mat4) -> Aabb {
    let corners: Vec<Pt3> = aabb
        .corners()
        .iter()
        .filter_map(|corner| project_point(matrix, corner))
        .collect();

    Aabb::from_points(&corners).unwrap_or(*aabb)
}
