use glam::Mat4;

use super::bounds::BoundingBox;
use super::transform::Transform;
use crate::engine::{Entity, MaterialHandle, RenderEngine};

/// State shared by every drawable node.
#[derive(Debug, Clone)]
pub struct DrawableCore {
    entity: Entity,
    bounds: BoundingBox,
    /// World matrix written by the render traversal only.
    final_matrix: Mat4,
    internal: Option<Box<Transform>>,
    released: bool,
}

impl DrawableCore {
    #[must_use]
    pub fn new(entity: Entity, bounds: BoundingBox) -> Self {
        Self {
            entity,
            bounds,
            final_matrix: Mat4::IDENTITY,
            internal: None,
            released: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn set_bounds(&mut self, bounds: BoundingBox) {
        self.bounds = bounds;
    }

    #[inline]
    #[must_use]
    pub fn final_matrix(&self) -> Mat4 {
        self.final_matrix
    }

    pub(crate) fn set_final_matrix(&mut self, matrix: Mat4) {
        self.final_matrix = matrix;
    }

    /// Transform applied after every inherited ancestor transform.
    #[must_use]
    pub fn internal_transform(&self) -> Option<&Transform> {
        self.internal.as_deref()
    }

    pub fn internal_transform_mut(&mut self) -> Option<&mut Transform> {
        self.internal.as_deref_mut()
    }

    /// Replaces the owned internal transform, returning the previous one.
    pub fn set_internal_transform(&mut self, transform: Option<Transform>) -> Option<Transform> {
        std::mem::replace(&mut self.internal, transform.map(Box::new)).map(|t| *t)
    }

    #[inline]
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Marks the core released. Returns `false` if it already was.
    pub(crate) fn mark_released(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.internal = None;
        true
    }
}

/// A node that contributes engine entities to the render list.
pub trait Drawable {
    fn core(&self) -> &DrawableCore;

    fn core_mut(&mut self) -> &mut DrawableCore;

    fn entity(&self) -> Entity {
        self.core().entity()
    }

    fn final_matrix(&self) -> Mat4 {
        self.core().final_matrix()
    }

    /// Pushes the final matrix (and material) into the engine and appends
    /// the entities to draw.
    fn pre_render(&mut self, engine: &mut dyn RenderEngine, renderables: &mut Vec<Entity>);

    /// Releases engine-side resources. Calling it again does nothing.
    fn release(&mut self, engine: &mut dyn RenderEngine);

    fn as_materializable(&self) -> Option<&dyn Materializable> {
        None
    }

    fn as_materializable_mut(&mut self) -> Option<&mut dyn Materializable> {
        None
    }
}

/// A drawable whose material can be set, and overridden by a material
/// ancestor during traversal.
pub trait Materializable {
    /// The drawable's own material.
    fn material(&self) -> Option<MaterialHandle>;

    fn set_material(&mut self, material: Option<MaterialHandle>);

    /// Material of the part at `index`, for multi-part drawables.
    fn material_at(&self, index: usize) -> Option<MaterialHandle> {
        if index == 0 { self.material() } else { None }
    }

    fn set_material_at(&mut self, index: usize, material: Option<MaterialHandle>) {
        if index == 0 {
            self.set_material(material);
        }
    }

    /// Material imposed by the enclosing material node in the last traversal.
    fn material_override(&self) -> Option<MaterialHandle>;

    fn apply_material_override(&mut self, material: Option<MaterialHandle>);

    /// What actually gets drawn: the override if any, else the own material.
    fn effective_material(&self) -> Option<MaterialHandle> {
        self.material_override().or(self.material())
    }
}

/// Binds `material` to every primitive slot of `entity`.
pub(crate) fn bind_material(
    engine: &mut dyn RenderEngine,
    entity: Entity,
    material: MaterialHandle,
) {
    for primitive in 0..engine.primitive_count(entity) {
        engine.set_primitive_material(entity, primitive, material);
    }
}
