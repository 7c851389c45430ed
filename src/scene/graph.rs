//! Scene Graph
//!
//! [`SceneGraph`] owns every node, the root, the engine-side scene and view,
//! and drives the render loop:
//!
//! ```text
//! start_updating() ──► mutate ──► end_updating(true) ──► render()
//!                                                          │
//!                           dirty? ── rebuild engine scene ┤
//!                                                          ▼
//!                         begin_frame ► background ► view ► callback ► end_frame
//! ```
//!
//! Mutations are expected to happen while the [`UpdateGate`] is held;
//! `render()` refuses to run while it is. The gate is a non-blocking
//! try-lock: losing the race returns `false` immediately.
//!
//! A dirty graph is never patched incrementally. The engine scene is
//! replaced and refilled from a fresh [`RenderVisitor`] traversal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use glam::{DMat4, Mat4, Vec3};
use rustc_hash::FxHashMap;

use super::affine::TransformOrder;
use super::background::BackgroundLayer;
use super::bounds::BoundingBox;
use super::composite::ChildListener;
use super::geometry::Geometry;
use super::light::PositionalLight;
use super::material::MaterialNode;
use super::multi_geometry::MultiGeometry;
use super::node::Node;
use super::transform::{Animator, Transform};
use super::visitor::{NodeVisitor, RenderVisitor, traverse};
use super::{NodeArena, NodeKey};
use crate::engine::{
    AssetReader, CameraHandle, Entity, FrameInfo, LightParams, LightType, MagFilter,
    MaterialHandle, MaterialParameter, MinFilter, RenderEngine, SceneHandle, TextureHandle,
    TextureSampler, ViewHandle, WrapMode,
};
use crate::errors::{GraphError, Result};
use crate::settings::SceneGraphSettings;

// ============================================================================
// Update gate
// ============================================================================

/// Non-blocking exclusive flag separating "graph is being mutated" from
/// "graph is being rendered".
///
/// Clones share the same flag, so a loader thread can hold the gate while
/// the render thread keeps calling `render()` (which then skips).
#[derive(Debug, Clone, Default)]
pub struct UpdateGate(Arc<AtomicBool>);

impl UpdateGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the gate. Returns `false` at once if it is already held.
    pub fn try_acquire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ============================================================================
// Scene listeners
// ============================================================================

/// Notified after every rebuild of the engine scene.
pub trait SceneListener: Send + Sync {
    fn on_scene_changed(&self, view: ViewHandle, scene: SceneHandle);
}

impl<F> SceneListener for F
where
    F: Fn(ViewHandle, SceneHandle) + Send + Sync,
{
    fn on_scene_changed(&self, view: ViewHandle, scene: SceneHandle) {
        self(view, scene);
    }
}

// ============================================================================
// SceneGraph
// ============================================================================

pub struct SceneGraph<E: RenderEngine> {
    engine: E,
    assets: Box<dyn AssetReader>,
    settings: SceneGraphSettings,

    view: ViewHandle,
    camera: CameraHandle,
    scene: SceneHandle,

    arena: NodeArena,
    root: Option<NodeKey>,
    dirty: bool,
    gate: UpdateGate,

    names: FxHashMap<String, NodeKey>,

    sun: Option<Entity>,
    /// Named directional lights, in insertion order.
    directional_lights: Vec<(String, Entity)>,
    background: Option<BackgroundLayer>,
    listeners: Vec<Weak<dyn SceneListener>>,
}

impl<E: RenderEngine> SceneGraph<E> {
    pub fn new(engine: E, assets: impl AssetReader + 'static) -> Self {
        Self::with_settings(engine, assets, SceneGraphSettings::default())
    }

    /// Creates the main view, camera and scene through `engine`.
    pub fn with_settings(
        mut engine: E,
        assets: impl AssetReader + 'static,
        settings: SceneGraphSettings,
    ) -> Self {
        let view = engine.create_view();
        let camera = engine.create_camera();
        let scene = engine.create_scene();
        engine.set_view_scene(view, Some(scene));
        engine.set_view_camera(view, camera);

        Self {
            engine,
            assets: Box::new(assets),
            settings,
            view,
            camera,
            scene,
            arena: NodeArena::new(),
            root: None,
            dirty: true,
            gate: UpdateGate::new(),
            names: FxHashMap::default(),
            sun: None,
            directional_lights: Vec::new(),
            background: None,
            listeners: Vec::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[inline]
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    #[inline]
    pub fn assets(&self) -> &dyn AssetReader {
        self.assets.as_ref()
    }

    #[inline]
    pub fn settings(&self) -> &SceneGraphSettings {
        &self.settings
    }

    #[inline]
    pub fn view(&self) -> ViewHandle {
        self.view
    }

    #[inline]
    pub fn camera(&self) -> CameraHandle {
        self.camera
    }

    /// The engine scene currently bound to the main view.
    #[inline]
    pub fn scene(&self) -> SceneHandle {
        self.scene
    }

    #[inline]
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    #[inline]
    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forces (or cancels) a rebuild on the next render.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.arena.get(key)
    }

    /// Mutable access to a node. Marks the node and the graph dirty.
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        let node = self.arena.get_mut(key)?;
        node.dirty = true;
        self.dirty = true;
        Some(node)
    }

    /// Last node registered under `name`.
    pub fn get_node(&self, name: &str) -> Option<NodeKey> {
        self.names
            .get(name)
            .copied()
            .filter(|key| self.arena.contains(*key))
    }

    fn node_or_err(&mut self, key: NodeKey) -> Result<&mut Node> {
        self.node_mut(key).ok_or(GraphError::NodeNotFound(key))
    }

    /// The transform payload of `key`.
    pub fn transform_mut(&mut self, key: NodeKey) -> Result<&mut Transform> {
        let node = self.node_or_err(key)?;
        let found = node.kind().type_name();
        node.as_transform_mut().ok_or(GraphError::WrongKind {
            expected: "transform",
            found,
        })
    }

    // ========================================================================
    // Update gate
    // ========================================================================

    /// A handle on the update gate, shareable with other threads.
    pub fn gate(&self) -> UpdateGate {
        self.gate.clone()
    }

    /// Takes the update gate. Returns `false` if an update is already running.
    pub fn start_updating(&self) -> bool {
        let acquired = self.gate.try_acquire();
        if !acquired {
            log::debug!("start_updating: update already in progress");
        }
        acquired
    }

    /// Sets the dirty flag to `set_dirty`, then releases the gate.
    pub fn end_updating(&mut self, set_dirty: bool) {
        self.dirty = set_dirty;
        self.gate.release();
    }

    #[inline]
    pub fn is_updating(&self) -> bool {
        self.gate.is_held()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    fn register(&mut self, key: NodeKey) -> NodeKey {
        if let Some(node) = self.arena.get(key) {
            let name = node.name();
            if !name.is_empty() {
                self.names.insert(name.to_string(), key);
            }
        }
        self.dirty = true;
        key
    }

    fn insert_new(&mut self, node: Node) -> NodeKey {
        let key = self.arena.insert_unchecked(node);
        self.register(key)
    }

    /// Takes ownership of a node built by the caller.
    ///
    /// Fails with [`GraphError::AlreadyAdopted`] if the node (or a clone of
    /// it) or its engine entity is already owned by this graph.
    pub fn adopt(&mut self, node: Node) -> Result<NodeKey> {
        let key = self.arena.insert(node)?;
        Ok(self.register(key))
    }

    // ========================================================================
    // Root
    // ========================================================================

    /// Returns the root, creating a group root when there is none or when
    /// `replace` is set. `None` names it after the settings' root name.
    pub fn make_root(&mut self, name: Option<&str>, replace: bool) -> NodeKey {
        if let Some(root) = self.root
            && !replace
        {
            return root;
        }
        let name = name.unwrap_or(&self.settings.root_name).to_string();
        let key = self.insert_new(Node::group(name));
        self.root = Some(key);
        key
    }

    /// Adopts a caller-built composite and makes it the root.
    pub fn adopt_root(&mut self, node: Node) -> Result<NodeKey> {
        if !node.is_composite() {
            return Err(GraphError::NotComposite(node.name().to_string()));
        }
        let key = self.adopt(node)?;
        self.root = Some(key);
        Ok(key)
    }

    /// Makes an owned composite the root.
    pub fn set_root(&mut self, key: NodeKey) -> Result<()> {
        let node = self.arena.get(key).ok_or(GraphError::NodeNotFound(key))?;
        if !node.is_composite() {
            return Err(GraphError::NotComposite(node.name().to_string()));
        }
        self.root = Some(key);
        self.dirty = true;
        Ok(())
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<bool> {
        let added = self.arena.add_child(parent, child)?;
        self.dirty |= added;
        Ok(added)
    }

    pub fn set_child(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        index: usize,
    ) -> Result<Option<NodeKey>> {
        let replaced = self.arena.set_child(parent, child, index)?;
        self.dirty = true;
        Ok(replaced)
    }

    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        let removed = self.arena.remove_child(parent, child);
        self.dirty |= removed;
        removed
    }

    pub fn remove_children(&mut self, parent: NodeKey, start: usize, count: usize) -> Vec<NodeKey> {
        let removed = self.arena.remove_children(parent, start, count);
        self.dirty |= !removed.is_empty();
        removed
    }

    pub fn add_child_listener(&mut self, parent: NodeKey, listener: ChildListener) -> Result<()> {
        self.arena.add_child_listener(parent, listener)
    }

    /// Removes a node from the graph, releasing its engine resources.
    ///
    /// Its children are detached, not destroyed.
    pub fn destroy_node(&mut self, key: NodeKey) -> Result<()> {
        let mut node = self.arena.remove(key).ok_or(GraphError::NodeNotFound(key))?;
        node.release(&mut self.engine);
        self.names.retain(|_, k| *k != key);
        if self.root == Some(key) {
            self.root = None;
        }
        self.dirty = true;
        Ok(())
    }

    // ========================================================================
    // Groups & transforms
    // ========================================================================

    pub fn make_group(&mut self, name: &str) -> NodeKey {
        self.insert_new(Node::group(name))
    }

    pub fn make_transform(&mut self, name: &str, transform: Transform) -> NodeKey {
        self.insert_new(Node::transform(name, transform))
    }

    pub fn make_affine_transform(
        &mut self,
        name: &str,
        order: TransformOrder,
        animator: Option<Animator>,
    ) -> NodeKey {
        let mut transform = Transform::affine(order);
        transform.set_animator(animator);
        self.make_transform(name, transform)
    }

    pub fn make_custom_transform(
        &mut self,
        name: &str,
        matrix: DMat4,
        animator: Option<Animator>,
    ) -> NodeKey {
        let mut transform = Transform::custom(matrix);
        transform.set_animator(animator);
        self.make_transform(name, transform)
    }

    /// Gives a drawable an owned transform applied after inherited ones.
    pub fn set_internal_transform(&mut self, key: NodeKey, transform: Option<Transform>) -> Result<()> {
        let node = self.node_or_err(key)?;
        let found = node.kind().type_name();
        let drawable = node.as_drawable_mut().ok_or(GraphError::WrongKind {
            expected: "drawable",
            found,
        })?;
        drawable.core_mut().set_internal_transform(transform);
        Ok(())
    }

    // ========================================================================
    // Materials
    // ========================================================================

    /// Material node around a caller-owned engine material.
    pub fn make_material(&mut self, name: &str, handle: Option<MaterialHandle>) -> NodeKey {
        self.insert_new(Node::material(name, MaterialNode::new(handle)))
    }

    pub fn make_material_from_package(&mut self, name: &str, package: &[u8]) -> Result<NodeKey> {
        let material = MaterialNode::from_package(&mut self.engine, package)?;
        Ok(self.insert_new(Node::material(name, material)))
    }

    pub fn make_material_from_file(&mut self, name: &str, path: &str) -> Result<NodeKey> {
        if self.assets.is_asset_dir(path) {
            return Err(GraphError::AssetIsDirectory(path.to_string()));
        }
        let package = self.assets.read_asset_vector(path)?;
        if package.is_empty() {
            return Err(GraphError::EmptyAsset(path.to_string()));
        }
        self.make_material_from_package(name, &package)
    }

    fn material_node_mut(&mut self, key: NodeKey) -> Result<(&mut MaterialNode, &mut E)> {
        let node = self.arena.get_mut(key).ok_or(GraphError::NodeNotFound(key))?;
        node.dirty = true;
        let found = node.kind().type_name();
        let material = node.as_material_mut().ok_or(GraphError::WrongKind {
            expected: "material",
            found,
        })?;
        self.dirty = true;
        Ok((material, &mut self.engine))
    }

    pub fn set_material_handle(&mut self, key: NodeKey, handle: Option<MaterialHandle>) -> Result<()> {
        let (material, engine) = self.material_node_mut(key)?;
        material.set_handle(engine, handle);
        Ok(())
    }

    pub fn set_material_parameter(
        &mut self,
        key: NodeKey,
        name: &str,
        value: MaterialParameter,
    ) -> Result<()> {
        let (material, engine) = self.material_node_mut(key)?;
        material.set_parameter(engine, name, value);
        Ok(())
    }

    pub fn set_material_texture(
        &mut self,
        key: NodeKey,
        name: &str,
        texture: TextureHandle,
        sampler: TextureSampler,
    ) -> Result<()> {
        let (material, engine) = self.material_node_mut(key)?;
        material.set_texture(engine, name, texture, sampler);
        Ok(())
    }

    // ========================================================================
    // Drawables
    // ========================================================================

    /// Geometry over an engine entity that already carries a renderable.
    pub fn make_geometry(
        &mut self,
        name: &str,
        entity: Entity,
        bounds: BoundingBox,
        material: Option<MaterialHandle>,
    ) -> Result<NodeKey> {
        let mut geometry = Geometry::new(entity, bounds);
        if let Some(material) = material {
            geometry = geometry.with_material(material);
        }
        self.adopt(Node::geometry(name, geometry))
    }

    /// Loads a mesh asset. Without `material` the settings' default
    /// material package is used.
    pub fn open_mesh(
        &mut self,
        name: &str,
        path: &str,
        material: Option<MaterialHandle>,
    ) -> Result<NodeKey> {
        let geometry = Geometry::open_mesh(
            &mut self.engine,
            self.assets.as_ref(),
            path,
            material,
            &self.settings.default_material_asset,
        )?;
        self.adopt(Node::geometry(name, geometry))
    }

    /// Empty multi geometry; parts are added with [`add_part`](Self::add_part).
    pub fn make_multi_geometry(&mut self, name: &str) -> Result<NodeKey> {
        let geometry = MultiGeometry::new(&mut self.engine);
        self.adopt(Node::multi_geometry(name, geometry))
    }

    /// Loads a glTF asset. `normalize` defaults to the settings' choice.
    pub fn open_gltf(&mut self, name: &str, path: &str, normalize: Option<bool>) -> Result<NodeKey> {
        let normalize = normalize.unwrap_or(self.settings.normalize_gltf);
        let geometry =
            MultiGeometry::open_gltf(&mut self.engine, self.assets.as_ref(), path, normalize)?;
        self.adopt(Node::multi_geometry(name, geometry))
    }

    /// Adds a part entity to a multi geometry.
    pub fn add_part(&mut self, key: NodeKey, local: Option<Mat4>) -> Result<Entity> {
        let node = self.arena.get_mut(key).ok_or(GraphError::NodeNotFound(key))?;
        let found = node.kind().type_name();
        let geometry = node.as_multi_geometry_mut().ok_or(GraphError::WrongKind {
            expected: "multi-geometry",
            found,
        })?;
        let part = geometry.add_part(&mut self.engine, local);
        node.dirty = true;
        self.dirty = true;
        Ok(part)
    }

    // ========================================================================
    // Lights
    // ========================================================================

    pub fn make_light(&mut self, name: &str, params: LightParams) -> Result<NodeKey> {
        let light = PositionalLight::new(&mut self.engine, params)?;
        self.adopt(Node::light(name, light))
    }

    /// Spot light with the settings' default intensity, falloff and cone.
    pub fn make_spotlight(
        &mut self,
        name: &str,
        position: Vec3,
        direction: Vec3,
        color: Vec3,
    ) -> Result<NodeKey> {
        let (inner, outer) = self.settings.spot_cone;
        let spot = LightType::FocusedSpot { inner, outer };
        let params = self.positional_params(spot, position, direction, color);
        self.make_light(name, params)
    }

    pub fn make_point_light(&mut self, name: &str, position: Vec3, color: Vec3) -> Result<NodeKey> {
        let params = self.positional_params(LightType::Point, position, Vec3::NEG_Y, color);
        self.make_light(name, params)
    }

    fn positional_params(
        &self,
        light_type: LightType,
        position: Vec3,
        direction: Vec3,
        color: Vec3,
    ) -> LightParams {
        LightParams {
            light_type,
            color,
            intensity: self.settings.light_intensity,
            efficiency: self.settings.light_efficiency,
            position,
            direction,
            falloff: self.settings.light_falloff,
            cast_shadows: false,
        }
    }

    fn create_global_light(&mut self, params: &LightParams) -> Result<Entity> {
        let entity = self.engine.create_entity();
        if let Err(e) = self.engine.create_light(entity, params) {
            log::error!("Failed to create light component: {e}");
            self.engine.destroy_entity(entity);
            return Err(e);
        }
        self.dirty = true;
        Ok(entity)
    }

    /// Adds (or replaces) the sun. It is part of every rebuilt scene.
    pub fn add_sunlight(&mut self, direction: Vec3) -> Result<Entity> {
        let entity = self.create_global_light(&LightParams::sun(direction))?;
        self.remove_sunlight();
        self.sun = Some(entity);
        Ok(entity)
    }

    pub fn remove_sunlight(&mut self) -> bool {
        let Some(sun) = self.sun.take() else {
            return false;
        };
        self.engine.destroy_entity(sun);
        self.dirty = true;
        true
    }

    #[inline]
    pub fn sunlight(&self) -> Option<Entity> {
        self.sun
    }

    /// Adds a directional light under `name`, replacing one of the same name.
    pub fn add_directional_light(
        &mut self,
        name: &str,
        color: Vec3,
        direction: Vec3,
        intensity: f32,
    ) -> Result<Entity> {
        let params = LightParams::directional(color, direction, intensity);
        let entity = self.create_global_light(&params)?;
        self.remove_directional_light(name);
        self.directional_lights.push((name.to_string(), entity));
        Ok(entity)
    }

    pub fn remove_directional_light(&mut self, name: &str) -> bool {
        let Some(i) = self.directional_lights.iter().position(|(n, _)| n == name) else {
            return false;
        };
        let (_, entity) = self.directional_lights.remove(i);
        self.engine.destroy_entity(entity);
        self.dirty = true;
        true
    }

    pub fn directional_light(&self, name: &str) -> Option<Entity> {
        self.directional_lights
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| *e)
    }

    // ========================================================================
    // Background
    // ========================================================================

    fn install_background(
        &mut self,
        width: u32,
        height: u32,
        channels: u8,
        pixels: Option<&[u8]>,
        sampler: TextureSampler,
    ) -> Result<()> {
        let package = self
            .assets
            .read_asset_vector(&self.settings.background_material_asset)?;
        let layer =
            BackgroundLayer::new(&mut self.engine, &package, width, height, channels, pixels, sampler)?;
        self.clear_background();
        self.background = Some(layer);
        Ok(())
    }

    /// Background layer with an empty RGBA texture to be filled by the caller.
    pub fn set_background(&mut self, width: u32, height: u32, sampler: TextureSampler) -> Result<()> {
        self.install_background(width, height, 4, None, sampler)
    }

    /// Background layer showing the given image.
    pub fn set_background_image(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<()> {
        let sampler = TextureSampler::new(MinFilter::Linear, MagFilter::Linear, WrapMode::ClampToEdge);
        self.install_background(width, height, channels, Some(pixels), sampler)
    }

    pub fn clear_background(&mut self) {
        if let Some(layer) = self.background.take() {
            layer.release(&mut self.engine);
        }
    }

    #[inline]
    pub fn background(&self) -> Option<&BackgroundLayer> {
        self.background.as_ref()
    }

    // ========================================================================
    // Animation
    // ========================================================================

    /// Transforms that currently carry an animator, as `(name, key)` sorted
    /// by name. Unnamed transforms are listed under their node id.
    ///
    /// The list is read from the live nodes, so animators installed or
    /// cleared through [`transform_mut`](Self::transform_mut) show up here.
    pub fn animated_transforms(&self) -> Vec<(String, NodeKey)> {
        let mut list: Vec<(String, NodeKey)> = self
            .arena
            .iter()
            .filter(|(_, node)| node.as_transform().is_some_and(Transform::is_animated))
            .map(|(key, node)| {
                let name = match node.name() {
                    "" => node.id().to_string(),
                    name => name.to_string(),
                };
                (name, key)
            })
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }

    /// Runs every animation hook once. Returns how many ran.
    pub fn animate(&mut self, dt: f64) -> usize {
        let keys: Vec<NodeKey> = self.animated_transforms().into_iter().map(|(_, k)| k).collect();
        let mut ran = 0;
        for key in keys {
            if let Some(node) = self.arena.get_mut(key)
                && let Some(transform) = node.as_transform_mut()
                && transform.animate(dt)
            {
                node.dirty = true;
                ran += 1;
            }
        }
        if ran > 0 {
            self.dirty = true;
        }
        ran
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Registers a listener by weak reference. Dropped listeners are pruned
    /// silently.
    pub fn add_scene_listener(&mut self, listener: Weak<dyn SceneListener>) {
        self.listeners.push(listener);
    }

    /// Registered listeners that are still alive.
    pub fn scene_listener_count(&self) -> usize {
        self.listeners.iter().filter(|l| l.strong_count() > 0).count()
    }

    // ========================================================================
    // Traversal & rendering
    // ========================================================================

    /// Runs `visitor` over the graph from the root.
    pub fn traverse<V: NodeVisitor + ?Sized>(&mut self, visitor: &mut V) {
        if let Some(root) = self.root {
            traverse(&mut self.arena, root, visitor);
        }
    }

    fn frame_info(&self) -> FrameInfo {
        FrameInfo {
            view: self.view,
            scene: self.scene,
            camera: self.camera,
            background_view: self.background.map(|b| b.view),
        }
    }

    /// Replaces the engine scene with a fresh compilation of the graph.
    fn rebuild(&mut self) {
        if self.engine.scene_entity_count(self.scene) > 0 {
            self.engine.set_view_scene(self.view, None);
            self.engine.destroy_scene(self.scene);
            self.scene = self.engine.create_scene();
        }

        let mut seed = Vec::with_capacity(1 + self.directional_lights.len());
        seed.extend(self.sun);
        seed.extend(self.directional_lights.iter().map(|(_, e)| *e));

        let mut visitor = RenderVisitor::with_renderables(&mut self.engine, seed);
        if let Some(root) = self.root {
            traverse(&mut self.arena, root, &mut visitor);
        }
        let renderables = visitor.into_renderables();
        log::debug!("Rebuilt scene with {} entities", renderables.len());

        self.engine.scene_add_entities(self.scene, &renderables);
        self.engine.set_view_scene(self.view, Some(self.scene));
        self.engine.set_view_camera(self.view, self.camera);

        let (view, scene) = (self.view, self.scene);
        self.listeners.retain(|weak| match weak.upgrade() {
            Some(listener) => {
                listener.on_scene_changed(view, scene);
                true
            }
            None => false,
        });

        self.arena.clear_dirty();
        self.dirty = false;
    }

    /// Renders one frame. See [`render_with`](Self::render_with).
    pub fn render(&mut self) -> bool {
        self.render_with(|_, _| {})
    }

    /// Renders one frame, calling `post_render` after the views were
    /// submitted and before the frame ends.
    ///
    /// Returns `false` without touching anything while an update is in
    /// progress, and `false` after any pending rebuild when the engine
    /// cannot begin a frame.
    pub fn render_with<F>(&mut self, post_render: F) -> bool
    where
        F: FnOnce(&mut E, FrameInfo),
    {
        if self.gate.is_held() {
            return false;
        }
        if self.dirty {
            self.rebuild();
        }
        if !self.engine.begin_frame() {
            log::warn!("Skipping frame: renderer not ready");
            return false;
        }
        if let Some(background) = &self.background {
            self.engine.render_view(background.view);
        }
        self.engine.render_view(self.view);
        let info = self.frame_info();
        post_render(&mut self.engine, info);
        self.engine.end_frame();
        true
    }
}

impl<E: RenderEngine> Drop for SceneGraph<E> {
    fn drop(&mut self) {
        for mut node in self.arena.drain() {
            node.release(&mut self.engine);
        }
        self.remove_sunlight();
        for (_, entity) in std::mem::take(&mut self.directional_lights) {
            self.engine.destroy_entity(entity);
        }
        self.clear_background();
        self.engine.set_view_scene(self.view, None);
        self.engine.destroy_scene(self.scene);
        self.engine.destroy_view(self.view);
        self.engine.destroy_camera(self.camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_is_exclusive_across_clones() {
        let gate = UpdateGate::new();
        let other = gate.clone();
        assert!(gate.try_acquire());
        assert!(!other.try_acquire());
        assert!(other.is_held());
        gate.release();
        assert!(other.try_acquire());
    }
}
