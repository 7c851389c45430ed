use glam::{BVec3, Mat4, Vec3};

/// Axis-aligned bounding box in local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    /// Unit box centered at the origin.
    fn default() -> Self {
        Self {
            min: Vec3::splat(-0.5),
            max: Vec3::splat(0.5),
        }
    }
}

impl BoundingBox {
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        self.min.midpoint(self.max)
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Corner `i` takes `max` on every axis whose bit is set in `i`.
    fn corners(&self) -> impl Iterator<Item = Vec3> + '_ {
        (0u8..8).map(move |i| {
            let use_max = BVec3::new(i & 1 != 0, i & 2 != 0, i & 4 != 0);
            Vec3::select(use_max, self.max, self.min)
        })
    }

    /// Axis-aligned box enclosing this one after `matrix` is applied.
    #[must_use]
    pub fn transform(&self, matrix: &Mat4) -> Self {
        let empty = Self::new(Vec3::INFINITY, Vec3::NEG_INFINITY);
        self.corners()
            .map(|corner| matrix.transform_point3(corner))
            .fold(empty, |acc, p| Self::new(acc.min.min(p), acc.max.max(p)))
    }

    /// Matrix that recenters the box on the origin and scales its largest
    /// extent to 2, i.e. fits it in the `[-1, 1]` cube.
    ///
    /// A degenerate (zero-extent) box only gets recentered.
    #[must_use]
    pub fn scale_to_unit_cube(&self) -> Mat4 {
        let extent = self.size().max_element();
        let scale = if extent > f32::EPSILON { 2.0 / extent } else { 1.0 };
        Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_translation(-self.center())
    }
}
