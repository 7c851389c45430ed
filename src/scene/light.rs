use glam::{Vec3, Vec4};

use super::bounds::BoundingBox;
use super::drawable::{Drawable, DrawableCore};
use crate::engine::{Entity, LightParams, LightType, RenderEngine};
use crate::errors::{GraphError, Result};

/// Homogeneous `w` below this is treated as a point at infinity.
const W_EPSILON: f32 = 1e-7;

/// Spot or point light positioned by the transforms above it.
#[derive(Debug, Clone)]
pub struct PositionalLight {
    core: DrawableCore,
    params: LightParams,
    initial_position: Vec4,
}

impl PositionalLight {
    /// Creates the light entity and its engine light component.
    pub fn new(engine: &mut dyn RenderEngine, params: LightParams) -> Result<Self> {
        if !params.light_type.is_positional() {
            return Err(GraphError::WrongKind {
                expected: "point or spot light",
                found: "sun or directional light",
            });
        }
        let entity = engine.create_entity();
        if let Err(e) = engine.create_light(entity, &params) {
            log::error!("Failed to create light component: {e}");
            engine.destroy_entity(entity);
            return Err(e);
        }
        Ok(Self {
            core: DrawableCore::new(entity, BoundingBox::default()),
            params,
            initial_position: params.position.extend(1.0),
        })
    }

    #[must_use]
    pub fn params(&self) -> &LightParams {
        &self.params
    }

    #[must_use]
    pub fn light_type(&self) -> LightType {
        self.params.light_type
    }

    /// Position in the light's own frame, before any transform.
    #[must_use]
    pub fn initial_position(&self) -> Vec3 {
        self.initial_position.truncate()
    }

    pub fn set_initial_position(&mut self, position: Vec3) {
        self.initial_position = position.extend(1.0);
    }
}

impl Drawable for PositionalLight {
    fn core(&self) -> &DrawableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DrawableCore {
        &mut self.core
    }

    fn pre_render(&mut self, engine: &mut dyn RenderEngine, renderables: &mut Vec<Entity>) {
        let p = self.core.final_matrix() * self.initial_position;
        if p.w.abs() > W_EPSILON {
            engine.set_light_position(self.core.entity(), p.truncate() / p.w);
        }
        renderables.push(self.core.entity());
    }

    fn release(&mut self, engine: &mut dyn RenderEngine) {
        if self.core.mark_released() {
            engine.destroy_entity(self.core.entity());
        }
    }
}
