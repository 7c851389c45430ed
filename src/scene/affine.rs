use glam::{DMat3, DMat4, DQuat, DVec3, EulerRot};

use super::transform::Transformable;

/// Scale components at or below this magnitude invert to 0.
pub const EPSILON: f64 = 1e-8;

/// Order in which rotation, scale and translation are multiplied.
///
/// `Trs` means `M = T · R · S`: scale first, then rotate, then translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransformOrder {
    #[default]
    Trs,
    Rts,
    Rst,
    Srt,
    Str,
    Tsr,
}

impl TransformOrder {
    /// Arranges `(r, s, t)` as the left-to-right factors `(x, y, z)` of this order.
    fn arrange<T>(self, r: T, s: T, t: T) -> (T, T, T) {
        match self {
            TransformOrder::Trs => (t, r, s),
            TransformOrder::Rts => (r, t, s),
            TransformOrder::Rst => (r, s, t),
            TransformOrder::Srt => (s, r, t),
            TransformOrder::Str => (s, t, r),
            TransformOrder::Tsr => (t, s, r),
        }
    }
}

/// Rotation, scale and translation kept separately alongside their
/// inverses, with the forward and inverse products recomputed on every set.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform {
    order: TransformOrder,

    rotation: DQuat,
    scale: DVec3,
    translation: DVec3,

    r: DMat4,
    s: DMat4,
    t: DMat4,
    ri: DMat4,
    si: DMat4,
    ti: DMat4,

    m: DMat4,
    mi: DMat4,
}

fn guarded_recip(v: f64) -> f64 {
    if v.abs() <= EPSILON { 0.0 } else { 1.0 / v }
}

impl AffineTransform {
    #[must_use]
    pub fn new(order: TransformOrder) -> Self {
        Self {
            order,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
            translation: DVec3::ZERO,
            r: DMat4::IDENTITY,
            s: DMat4::IDENTITY,
            t: DMat4::IDENTITY,
            ri: DMat4::IDENTITY,
            si: DMat4::IDENTITY,
            ti: DMat4::IDENTITY,
            m: DMat4::IDENTITY,
            mi: DMat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn from_parts(
        order: TransformOrder,
        rotation: DQuat,
        translation: DVec3,
        scale: DVec3,
    ) -> Self {
        let mut transform = Self::new(order);
        transform.rotation = rotation;
        transform.r = DMat4::from_quat(rotation);
        transform.ri = transform.r.transpose();
        transform.translation = translation;
        transform.t = DMat4::from_translation(translation);
        transform.ti = DMat4::from_translation(-translation);
        transform.scale = scale;
        transform.s = DMat4::from_scale(scale);
        transform.si = Self::inverse_scale(scale);
        transform.recompute();
        transform
    }

    // ========================================================================
    // Setters
    // ========================================================================

    pub fn set_rotation(&mut self, rotation: DQuat) {
        self.rotation = rotation;
        self.r = DMat4::from_quat(rotation);
        self.ri = self.r.transpose();
        self.recompute();
    }

    /// Sets the rotation from a 3x3 matrix, assumed orthonormal.
    pub fn set_rotation_matrix(&mut self, rotation: DMat3) {
        self.rotation = DQuat::from_mat3(&rotation);
        self.r = DMat4::from_mat3(rotation);
        self.ri = self.r.transpose();
        self.recompute();
    }

    /// Euler angles in radians, applied in XYZ order.
    pub fn set_rotation_euler(&mut self, x: f64, y: f64, z: f64) {
        self.set_rotation(DQuat::from_euler(EulerRot::XYZ, x, y, z));
    }

    pub fn set_translation(&mut self, translation: DVec3) {
        self.translation = translation;
        self.t = DMat4::from_translation(translation);
        self.ti = DMat4::from_translation(-translation);
        self.recompute();
    }

    pub fn set_scale(&mut self, scale: DVec3) {
        self.scale = scale;
        self.s = DMat4::from_scale(scale);
        self.si = Self::inverse_scale(scale);
        self.recompute();
    }

    pub fn set_uniform_scale(&mut self, scale: f64) {
        self.set_scale(DVec3::splat(scale));
    }

    // ========================================================================
    // Getters
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn order(&self) -> TransformOrder {
        self.order
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> DQuat {
        self.rotation
    }

    #[inline]
    #[must_use]
    pub fn translation(&self) -> DVec3 {
        self.translation
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> DVec3 {
        self.scale
    }

    fn inverse_scale(scale: DVec3) -> DMat4 {
        DMat4::from_scale(DVec3::new(
            guarded_recip(scale.x),
            guarded_recip(scale.y),
            guarded_recip(scale.z),
        ))
    }

    fn recompute(&mut self) {
        let (x, y, z) = self.order.arrange(self.r, self.s, self.t);
        self.m = x * y * z;
        let (xi, yi, zi) = self.order.arrange(self.ri, self.si, self.ti);
        self.mi = zi * yi * xi;
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::new(TransformOrder::default())
    }
}

impl Transformable for AffineTransform {
    fn matrix(&self) -> DMat4 {
        self.m
    }

    fn inverse_matrix(&self) -> DMat4 {
        self.mi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_order_inverts() {
        let orders = [
            TransformOrder::Trs,
            TransformOrder::Rts,
            TransformOrder::Rst,
            TransformOrder::Srt,
            TransformOrder::Str,
            TransformOrder::Tsr,
        ];
        for order in orders {
            let t = AffineTransform::from_parts(
                order,
                DQuat::from_axis_angle(DVec3::new(1.0, 2.0, 3.0).normalize(), 0.7),
                DVec3::new(4.0, -5.0, 6.0),
                DVec3::new(2.0, 0.5, 3.0),
            );
            assert!(
                (t.matrix() * t.inverse_matrix()).abs_diff_eq(DMat4::IDENTITY, 1e-9),
                "{order:?} does not invert"
            );
        }
    }

    #[test]
    fn zero_scale_inverts_to_zero() {
        let mut t = AffineTransform::default();
        t.set_scale(DVec3::new(0.0, 1.0, 1e-9));
        let mi = t.inverse_matrix();
        assert_eq!(mi.x_axis.x, 0.0);
        assert_eq!(mi.y_axis.y, 1.0);
        assert_eq!(mi.z_axis.z, 0.0);
        assert!(mi.is_finite());
    }
}
