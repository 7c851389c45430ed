//! Background Layer
//!
//! A textured full-screen quad drawn by its own view before the main view.
//! The layer owns every engine object it creates: view, camera, scene,
//! texture, material and the quad entity.

use glam::Vec3;

use super::bounds::BoundingBox;
use crate::engine::{
    CameraHandle, Entity, MaterialHandle, RenderEngine, SceneHandle, TextureHandle, TextureSampler,
    ViewHandle,
};
use crate::errors::Result;

/// Name of the sampler parameter the background material reads.
pub const BACKGROUND_TEXTURE_PARAM: &str = "texture";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundLayer {
    pub view: ViewHandle,
    pub scene: SceneHandle,
    pub camera: CameraHandle,
    pub texture: TextureHandle,
    pub material: MaterialHandle,
    pub renderable: Entity,
    pub width: u32,
    pub height: u32,
}

impl BackgroundLayer {
    /// Builds the layer. `pixels`, when given, is uploaded into the texture.
    ///
    /// Objects created before a failure are destroyed again.
    pub fn new(
        engine: &mut dyn RenderEngine,
        material_package: &[u8],
        width: u32,
        height: u32,
        channels: u8,
        pixels: Option<&[u8]>,
        sampler: TextureSampler,
    ) -> Result<Self> {
        let texture = engine.create_texture(width, height, channels, pixels)?;
        let material = match engine.create_material(material_package) {
            Ok(material) => material,
            Err(e) => {
                engine.destroy_texture(texture);
                return Err(e);
            }
        };
        engine.set_material_texture(material, BACKGROUND_TEXTURE_PARAM, texture, sampler);

        let renderable = engine.create_entity();
        let quad = BoundingBox::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0));
        if let Err(e) = engine.create_renderable(renderable, &quad, 1) {
            engine.destroy_entity(renderable);
            engine.destroy_material(material);
            engine.destroy_texture(texture);
            return Err(e);
        }
        engine.set_primitive_material(renderable, 0, material);

        let scene = engine.create_scene();
        engine.scene_add_entities(scene, &[renderable]);
        let camera = engine.create_camera();
        let view = engine.create_view();
        engine.set_view_scene(view, Some(scene));
        engine.set_view_camera(view, camera);

        Ok(Self {
            view,
            scene,
            camera,
            texture,
            material,
            renderable,
            width,
            height,
        })
    }

    pub fn release(self, engine: &mut dyn RenderEngine) {
        engine.set_view_scene(self.view, None);
        engine.destroy_view(self.view);
        engine.destroy_camera(self.camera);
        engine.destroy_scene(self.scene);
        engine.destroy_entity(self.renderable);
        engine.destroy_material(self.material);
        engine.destroy_texture(self.texture);
    }
}
