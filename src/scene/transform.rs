use std::fmt;
use std::sync::Arc;

use glam::{DMat4, DQuat, DVec3, Mat4};
use parking_lot::Mutex;

use super::affine::{AffineTransform, EPSILON, TransformOrder};

/// Anything that contributes a matrix to the accumulated world transform.
pub trait Transformable {
    /// Forward matrix (value copy).
    fn matrix(&self) -> DMat4;

    fn inverse_matrix(&self) -> DMat4;

    /// Forward matrix in single precision.
    fn matrixf(&self) -> Mat4 {
        self.matrix().as_mat4()
    }
}

/// Arbitrary 4x4 matrix with a precomputed inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomTransform {
    m: DMat4,
    mi: DMat4,
}

impl CustomTransform {
    #[must_use]
    pub fn new(matrix: DMat4) -> Self {
        let mut transform = Self {
            m: DMat4::IDENTITY,
            mi: DMat4::IDENTITY,
        };
        transform.set_matrix(matrix);
        transform
    }

    /// Replaces the matrix. A singular matrix gets an all-zero inverse.
    pub fn set_matrix(&mut self, matrix: DMat4) {
        self.m = matrix;
        self.mi = if matrix.determinant().abs() <= EPSILON {
            log::warn!("CustomTransform matrix is singular, inverse set to zero");
            DMat4::ZERO
        } else {
            matrix.inverse()
        };
    }
}

impl Default for CustomTransform {
    fn default() -> Self {
        Self::new(DMat4::IDENTITY)
    }
}

impl Transformable for CustomTransform {
    fn matrix(&self) -> DMat4 {
        self.m
    }

    fn inverse_matrix(&self) -> DMat4 {
        self.mi
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformKind {
    Affine(AffineTransform),
    Custom(CustomTransform),
}

/// Per-tick animation hook: receives the transform and the elapsed seconds.
///
/// Shared so that cloned transforms keep driving the same animation state.
/// The hook is not re-entrant: an `animate` call made while the same hook
/// is already running (on this transform or a clone) is skipped.
pub type Animator = Arc<Mutex<dyn FnMut(&mut Transform, f64) + Send>>;

/// Wraps a closure as an [`Animator`].
pub fn animator<F>(f: F) -> Animator
where
    F: FnMut(&mut Transform, f64) + Send + 'static,
{
    Arc::new(Mutex::new(f))
}

/// Transform node payload: the matrix source plus an optional animation hook.
#[derive(Clone)]
pub struct Transform {
    kind: TransformKind,
    animator: Option<Animator>,
}

impl Transform {
    #[must_use]
    pub fn affine(order: TransformOrder) -> Self {
        Self::from_kind(TransformKind::Affine(AffineTransform::new(order)))
    }

    /// TRS transform from its three components.
    #[must_use]
    pub fn from_trs(rotation: DQuat, translation: DVec3, scale: DVec3) -> Self {
        Self::from_kind(TransformKind::Affine(AffineTransform::from_parts(
            TransformOrder::Trs,
            rotation,
            translation,
            scale,
        )))
    }

    #[must_use]
    pub fn custom(matrix: DMat4) -> Self {
        Self::from_kind(TransformKind::Custom(CustomTransform::new(matrix)))
    }

    #[must_use]
    pub fn from_kind(kind: TransformKind) -> Self {
        Self { kind, animator: None }
    }

    #[must_use]
    pub fn with_animator(mut self, animator: Animator) -> Self {
        self.animator = Some(animator);
        self
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &TransformKind {
        &self.kind
    }

    #[must_use]
    pub fn as_affine(&self) -> Option<&AffineTransform> {
        match &self.kind {
            TransformKind::Affine(a) => Some(a),
            TransformKind::Custom(_) => None,
        }
    }

    #[must_use]
    pub fn as_affine_mut(&mut self) -> Option<&mut AffineTransform> {
        match &mut self.kind {
            TransformKind::Affine(a) => Some(a),
            TransformKind::Custom(_) => None,
        }
    }

    #[must_use]
    pub fn as_custom_mut(&mut self) -> Option<&mut CustomTransform> {
        match &mut self.kind {
            TransformKind::Custom(c) => Some(c),
            TransformKind::Affine(_) => None,
        }
    }

    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.animator.is_some()
    }

    pub fn set_animator(&mut self, animator: Option<Animator>) {
        self.animator = animator;
    }

    /// Runs the animation hook once. Returns `false` if there is none, or
    /// if the hook is already running further up the stack.
    pub fn animate(&mut self, dt: f64) -> bool {
        let Some(animator) = self.animator.clone() else {
            return false;
        };
        let Some(mut hook) = animator.try_lock() else {
            log::debug!("Animation hook already running, skipping nested call");
            return false;
        };
        (&mut *hook)(self, dt);
        true
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::affine(TransformOrder::default())
    }
}

impl Transformable for Transform {
    fn matrix(&self) -> DMat4 {
        match &self.kind {
            TransformKind::Affine(a) => a.matrix(),
            TransformKind::Custom(c) => c.matrix(),
        }
    }

    fn inverse_matrix(&self) -> DMat4 {
        match &self.kind {
            TransformKind::Affine(a) => a.inverse_matrix(),
            TransformKind::Custom(c) => c.inverse_matrix(),
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("kind", &self.kind)
            .field("animated", &self.animator.is_some())
            .finish()
    }
}
