//! In-memory [`RenderEngine`] that records every call.
//!
//! Used by tests and tools that need to build and render a graph without a
//! GPU. All recorded state is public so callers can inspect what the graph
//! asked the engine to do.

use glam::{Mat4, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};

use super::RenderEngine;
use super::types::{
    BufferHandle, CameraHandle, Entity, GltfAsset, GltfHandle, LightParams, MaterialHandle,
    MaterialParameter, MeshBuffers, SceneHandle, TextureHandle, TextureSampler, ViewHandle,
};
use crate::errors::{GraphError, Result};
use crate::scene::BoundingBox;

/// Recorded state of one material instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedMaterial {
    pub package_len: usize,
    pub parameters: FxHashMap<String, MaterialParameter>,
    pub textures: FxHashMap<String, (TextureHandle, TextureSampler)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordedView {
    pub scene: Option<SceneHandle>,
    pub camera: Option<CameraHandle>,
}

#[derive(Debug, Clone)]
pub struct HeadlessEngine {
    next_id: u64,

    pub entities: FxHashSet<Entity>,
    pub transforms: FxHashMap<Entity, Mat4>,
    pub transform_parents: FxHashMap<Entity, Entity>,
    /// Primitive material slots per renderable entity.
    pub renderables: FxHashMap<Entity, Vec<Option<MaterialHandle>>>,
    pub lights: FxHashMap<Entity, LightParams>,

    pub materials: FxHashMap<MaterialHandle, RecordedMaterial>,
    pub textures: FxHashMap<TextureHandle, (u32, u32, u8)>,
    pub buffers: FxHashSet<BufferHandle>,
    pub gltf_assets: FxHashMap<GltfHandle, Vec<Entity>>,

    pub scenes: FxHashMap<SceneHandle, Vec<Entity>>,
    /// Total number of scenes ever created.
    pub scenes_created: usize,
    pub views: FxHashMap<ViewHandle, RecordedView>,
    pub cameras: FxHashSet<CameraHandle>,

    /// What `begin_frame` answers.
    pub frame_ready: bool,
    pub frames_rendered: usize,
    /// Views submitted during the last frame, in order.
    pub rendered_views: Vec<ViewHandle>,
    in_frame: bool,

    /// Primitive slots of meshes produced by `load_mesh`.
    pub mesh_primitive_count: usize,
    /// Part entities produced by `load_gltf`.
    pub gltf_part_count: usize,
    /// Bounds reported for loaded glTF assets.
    pub gltf_bounds: BoundingBox,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entities: FxHashSet::default(),
            transforms: FxHashMap::default(),
            transform_parents: FxHashMap::default(),
            renderables: FxHashMap::default(),
            lights: FxHashMap::default(),
            materials: FxHashMap::default(),
            textures: FxHashMap::default(),
            buffers: FxHashSet::default(),
            gltf_assets: FxHashMap::default(),
            scenes: FxHashMap::default(),
            scenes_created: 0,
            views: FxHashMap::default(),
            cameras: FxHashSet::default(),
            frame_ready: true,
            frames_rendered: 0,
            rendered_views: Vec::new(),
            in_frame: false,
            mesh_primitive_count: 1,
            gltf_part_count: 1,
            gltf_bounds: BoundingBox::new(Vec3::ZERO, Vec3::new(4.0, 2.0, 2.0)),
        }
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    #[must_use]
    pub fn transform_of(&self, entity: Entity) -> Option<Mat4> {
        self.transforms.get(&entity).copied()
    }

    #[must_use]
    pub fn scene_entities(&self, scene: SceneHandle) -> &[Entity] {
        self.scenes.get(&scene).map_or(&[][..], Vec::as_slice)
    }

    #[must_use]
    pub fn view_scene(&self, view: ViewHandle) -> Option<SceneHandle> {
        self.views.get(&view).and_then(|v| v.scene)
    }

    fn add_renderable(&mut self, entity: Entity, slots: usize, material: Option<MaterialHandle>) {
        self.renderables.insert(entity, vec![material; slots]);
    }
}

impl RenderEngine for HeadlessEngine {
    fn create_entity(&mut self) -> Entity {
        let entity = Entity(self.next() as u32);
        self.entities.insert(entity);
        entity
    }

    fn destroy_entity(&mut self, entity: Entity) {
        self.entities.remove(&entity);
        self.transforms.remove(&entity);
        self.transform_parents.remove(&entity);
        self.renderables.remove(&entity);
        self.lights.remove(&entity);
        for list in self.scenes.values_mut() {
            list.retain(|e| *e != entity);
        }
    }

    fn set_transform(&mut self, entity: Entity, matrix: Mat4) {
        self.transforms.insert(entity, matrix);
    }

    fn set_transform_parent(&mut self, child: Entity, parent: Option<Entity>) {
        match parent {
            Some(parent) => self.transform_parents.insert(child, parent),
            None => self.transform_parents.remove(&child),
        };
    }

    fn create_renderable(
        &mut self,
        entity: Entity,
        _bounds: &BoundingBox,
        primitives: usize,
    ) -> Result<()> {
        if !self.is_alive(entity) {
            return Err(GraphError::EngineObject("renderable"));
        }
        self.add_renderable(entity, primitives, None);
        Ok(())
    }

    fn primitive_count(&self, entity: Entity) -> usize {
        self.renderables.get(&entity).map_or(0, Vec::len)
    }

    fn set_primitive_material(&mut self, entity: Entity, primitive: usize, material: MaterialHandle) {
        if let Some(slot) = self
            .renderables
            .get_mut(&entity)
            .and_then(|slots| slots.get_mut(primitive))
        {
            *slot = Some(material);
        }
    }

    fn primitive_material(&self, entity: Entity, primitive: usize) -> Option<MaterialHandle> {
        self.renderables
            .get(&entity)
            .and_then(|slots| slots.get(primitive).copied().flatten())
    }

    fn create_light(&mut self, entity: Entity, params: &LightParams) -> Result<()> {
        if !self.is_alive(entity) {
            return Err(GraphError::EngineObject("light"));
        }
        self.lights.insert(entity, *params);
        Ok(())
    }

    fn set_light_position(&mut self, entity: Entity, position: Vec3) {
        if let Some(light) = self.lights.get_mut(&entity) {
            light.position = position;
        }
    }

    fn create_material(&mut self, package: &[u8]) -> Result<MaterialHandle> {
        if package.is_empty() {
            return Err(GraphError::EngineObject("material"));
        }
        let handle = MaterialHandle(self.next());
        self.materials.insert(
            handle,
            RecordedMaterial {
                package_len: package.len(),
                ..Default::default()
            },
        );
        Ok(handle)
    }

    fn destroy_material(&mut self, material: MaterialHandle) {
        self.materials.remove(&material);
    }

    fn set_material_parameter(
        &mut self,
        material: MaterialHandle,
        name: &str,
        value: MaterialParameter,
    ) {
        if let Some(recorded) = self.materials.get_mut(&material) {
            recorded.parameters.insert(name.to_string(), value);
        }
    }

    fn set_material_texture(
        &mut self,
        material: MaterialHandle,
        name: &str,
        texture: TextureHandle,
        sampler: TextureSampler,
    ) {
        if let Some(recorded) = self.materials.get_mut(&material) {
            recorded.textures.insert(name.to_string(), (texture, sampler));
        }
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        channels: u8,
        pixels: Option<&[u8]>,
    ) -> Result<TextureHandle> {
        let expected = width as usize * height as usize * channels as usize;
        if expected == 0 || pixels.is_some_and(|data| data.len() < expected) {
            return Err(GraphError::EngineObject("texture"));
        }
        let handle = TextureHandle(self.next());
        self.textures.insert(handle, (width, height, channels));
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
    }

    fn load_mesh(
        &mut self,
        data: &[u8],
        default_material: Option<MaterialHandle>,
    ) -> Result<MeshBuffers> {
        if data.is_empty() {
            return Err(GraphError::EngineObject("mesh"));
        }
        let renderable = self.create_entity();
        self.add_renderable(renderable, self.mesh_primitive_count, default_material);
        let vertex_buffer = BufferHandle(self.next());
        let index_buffer = BufferHandle(self.next());
        self.buffers.insert(vertex_buffer);
        self.buffers.insert(index_buffer);
        Ok(MeshBuffers {
            renderable,
            vertex_buffer,
            index_buffer,
            bounds: BoundingBox::default(),
        })
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
    }

    fn load_gltf(&mut self, data: &[u8], _binary: bool) -> Result<GltfAsset> {
        if data.is_empty() {
            return Err(GraphError::EngineObject("glTF asset"));
        }
        let handle = GltfHandle(self.next());
        let root = self.create_entity();
        let authored = MaterialHandle(self.next());
        self.materials.insert(authored, RecordedMaterial::default());

        let mut entities = Vec::with_capacity(self.gltf_part_count);
        for _ in 0..self.gltf_part_count {
            let part = self.create_entity();
            self.add_renderable(part, 1, Some(authored));
            self.transform_parents.insert(part, root);
            entities.push(part);
        }

        let mut owned = entities.clone();
        owned.push(root);
        self.gltf_assets.insert(handle, owned);

        Ok(GltfAsset {
            handle,
            root,
            entities,
            bounds: self.gltf_bounds,
        })
    }

    fn destroy_gltf(&mut self, asset: GltfHandle) {
        if let Some(owned) = self.gltf_assets.remove(&asset) {
            for entity in owned {
                self.destroy_entity(entity);
            }
        }
    }

    fn create_scene(&mut self) -> SceneHandle {
        let scene = SceneHandle(self.next());
        self.scenes.insert(scene, Vec::new());
        self.scenes_created += 1;
        scene
    }

    fn destroy_scene(&mut self, scene: SceneHandle) {
        self.scenes.remove(&scene);
    }

    fn scene_add_entities(&mut self, scene: SceneHandle, entities: &[Entity]) {
        if let Some(list) = self.scenes.get_mut(&scene) {
            for entity in entities {
                if !list.contains(entity) {
                    list.push(*entity);
                }
            }
        }
    }

    fn scene_entity_count(&self, scene: SceneHandle) -> usize {
        self.scene_entities(scene).len()
    }

    fn create_view(&mut self) -> ViewHandle {
        let view = ViewHandle(self.next());
        self.views.insert(view, RecordedView::default());
        view
    }

    fn destroy_view(&mut self, view: ViewHandle) {
        self.views.remove(&view);
    }

    fn create_camera(&mut self) -> CameraHandle {
        let camera = CameraHandle(self.next());
        self.cameras.insert(camera);
        camera
    }

    fn destroy_camera(&mut self, camera: CameraHandle) {
        self.cameras.remove(&camera);
    }

    fn set_view_scene(&mut self, view: ViewHandle, scene: Option<SceneHandle>) {
        self.views.entry(view).or_default().scene = scene;
    }

    fn set_view_camera(&mut self, view: ViewHandle, camera: CameraHandle) {
        self.views.entry(view).or_default().camera = Some(camera);
    }

    fn begin_frame(&mut self) -> bool {
        if self.frame_ready {
            self.in_frame = true;
            self.rendered_views.clear();
        }
        self.frame_ready
    }

    fn render_view(&mut self, view: ViewHandle) {
        if self.in_frame {
            self.rendered_views.push(view);
        }
    }

    fn end_frame(&mut self) {
        if self.in_frame {
            self.in_frame = false;
            self.frames_rendered += 1;
        }
    }
}
