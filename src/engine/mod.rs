//! Rendering Engine Boundary
//!
//! The scene graph never talks to a GPU. Everything it needs from the
//! underlying renderer goes through [`RenderEngine`], which is passed in
//! explicitly when a [`SceneGraph`](crate::scene::SceneGraph) is built.
//!
//! - [`RenderEngine`]: entities, transforms, renderables, lights, materials,
//!   textures, scenes, views and frame submission
//! - [`AssetReader`]: synchronous asset lookup used by the loaders
//! - [`HeadlessEngine`]: in-memory engine that records every call

pub mod assets;
pub mod headless;
pub mod types;

pub use assets::{AssetReader, FsAssetReader, MemoryAssetReader};
pub use headless::HeadlessEngine;
pub use types::{
    BufferHandle, CameraHandle, CompareFunc, CompareMode, Entity, FrameInfo, GltfAsset,
    GltfHandle, LightParams, LightType, MagFilter, MaterialHandle, MaterialParameter, MeshBuffers,
    MinFilter, SceneHandle, TextureHandle, TextureSampler, ViewHandle, WrapMode,
};

use glam::{Mat4, Vec3};

use crate::errors::Result;
use crate::scene::BoundingBox;

/// Operations the scene graph consumes from a rendering engine.
///
/// All calls are synchronous. Destroy calls on unknown handles must be
/// harmless, since resources can be shared between nodes.
pub trait RenderEngine {
    // ========================================================================
    // Entities & transforms
    // ========================================================================

    fn create_entity(&mut self) -> Entity;

    fn destroy_entity(&mut self, entity: Entity);

    /// Writes the local matrix of the entity's transform component.
    fn set_transform(&mut self, entity: Entity, matrix: Mat4);

    /// Parents `child`'s transform component to `parent` (or detaches it).
    fn set_transform_parent(&mut self, child: Entity, parent: Option<Entity>);

    // ========================================================================
    // Renderables
    // ========================================================================

    /// Attaches a renderable component with `primitives` material slots.
    fn create_renderable(
        &mut self,
        entity: Entity,
        bounds: &BoundingBox,
        primitives: usize,
    ) -> Result<()>;

    /// Number of primitive slots of the entity's renderable, 0 if none.
    fn primitive_count(&self, entity: Entity) -> usize;

    fn set_primitive_material(&mut self, entity: Entity, primitive: usize, material: MaterialHandle);

    fn primitive_material(&self, entity: Entity, primitive: usize) -> Option<MaterialHandle>;

    // ========================================================================
    // Lights
    // ========================================================================

    fn create_light(&mut self, entity: Entity, params: &LightParams) -> Result<()>;

    fn set_light_position(&mut self, entity: Entity, position: Vec3);

    // ========================================================================
    // Materials & textures
    // ========================================================================

    /// Builds a material from a compiled material package.
    fn create_material(&mut self, package: &[u8]) -> Result<MaterialHandle>;

    fn destroy_material(&mut self, material: MaterialHandle);

    fn set_material_parameter(
        &mut self,
        material: MaterialHandle,
        name: &str,
        value: MaterialParameter,
    );

    fn set_material_texture(
        &mut self,
        material: MaterialHandle,
        name: &str,
        texture: TextureHandle,
        sampler: TextureSampler,
    );

    /// Creates a 2D texture, uploading `pixels` when given.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        channels: u8,
        pixels: Option<&[u8]>,
    ) -> Result<TextureHandle>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    // ========================================================================
    // Mesh & glTF loading hooks
    // ========================================================================

    /// Decodes a mesh blob into a renderable whose slots use `default_material`.
    fn load_mesh(
        &mut self,
        data: &[u8],
        default_material: Option<MaterialHandle>,
    ) -> Result<MeshBuffers>;

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    fn load_gltf(&mut self, data: &[u8], binary: bool) -> Result<GltfAsset>;

    /// Destroys the asset together with the entities it created.
    fn destroy_gltf(&mut self, asset: GltfHandle);

    // ========================================================================
    // Scenes, views, frames
    // ========================================================================

    fn create_scene(&mut self) -> SceneHandle;

    fn destroy_scene(&mut self, scene: SceneHandle);

    fn scene_add_entities(&mut self, scene: SceneHandle, entities: &[Entity]);

    /// Number of entities in the scene, lights included.
    fn scene_entity_count(&self, scene: SceneHandle) -> usize;

    fn create_view(&mut self) -> ViewHandle;

    fn destroy_view(&mut self, view: ViewHandle);

    fn create_camera(&mut self) -> CameraHandle;

    fn destroy_camera(&mut self, camera: CameraHandle);

    fn set_view_scene(&mut self, view: ViewHandle, scene: Option<SceneHandle>);

    fn set_view_camera(&mut self, view: ViewHandle, camera: CameraHandle);

    /// Returns `false` when the swapchain cannot take a frame right now.
    fn begin_frame(&mut self) -> bool;

    fn render_view(&mut self, view: ViewHandle);

    fn end_frame(&mut self);
}
