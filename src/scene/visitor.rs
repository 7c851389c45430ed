//! Traversal protocol
//!
//! [`traverse`] walks the graph from a start node and dispatches each node to
//! a [`NodeVisitor`] by kind:
//!
//! 1. the node is visited (`visit_*`, a no-op for plain groups)
//! 2. composite nodes then traverse their children in insertion order
//! 3. composite nodes finally get `on_post_traverse`
//!
//! Leaves receive no post hook. The walk uses an explicit work stack, so
//! depth is bounded by memory rather than the call stack. A node reachable
//! through several parents is visited once per path.
//!
//! [`RenderVisitor`] is the visitor that compiles the graph into the flat
//! entity list handed to the engine.

use glam::DMat4;
use rustc_hash::FxHashSet;

use super::NodeKey;
use super::arena::NodeArena;
use super::drawable::Drawable;
use super::material::MaterialNode;
use super::node::{Node, NodeKind};
use super::transform::{Transform, Transformable};
use crate::engine::{Entity, MaterialHandle, RenderEngine};

/// Per-kind callbacks of a traversal. Every method defaults to a no-op.
pub trait NodeVisitor {
    fn visit_group(&mut self, _key: NodeKey, _node: &Node) {}

    fn visit_transform(&mut self, _key: NodeKey, _transform: &Transform) {}

    fn visit_material(&mut self, _key: NodeKey, _material: &MaterialNode) {}

    fn visit_drawable(&mut self, _key: NodeKey, _drawable: &mut dyn Drawable) {}

    /// Called on a composite once all of its children were traversed.
    fn on_post_traverse(&mut self, _key: NodeKey, _node: &Node) {}
}

enum Step {
    Enter(NodeKey),
    Exit(NodeKey),
}

fn accept<V: NodeVisitor + ?Sized>(visitor: &mut V, key: NodeKey, node: &mut Node) {
    match node.kind_mut() {
        NodeKind::Group => visitor.visit_group(key, node),
        NodeKind::Transform(t) => visitor.visit_transform(key, t),
        NodeKind::Material(m) => visitor.visit_material(key, m),
        NodeKind::Geometry(g) => visitor.visit_drawable(key, g),
        NodeKind::MultiGeometry(g) => visitor.visit_drawable(key, g),
        NodeKind::Light(l) => visitor.visit_drawable(key, l),
    }
}

/// Walks the graph below (and including) `start`.
pub fn traverse<V: NodeVisitor + ?Sized>(arena: &mut NodeArena, start: NodeKey, visitor: &mut V) {
    let mut stack: Vec<Step> = Vec::with_capacity(64);
    stack.push(Step::Enter(start));

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(key) => {
                let Some(node) = arena.get_mut(key) else {
                    continue;
                };
                accept(visitor, key, node);

                if let Some(composite) = node.composite() {
                    stack.push(Step::Exit(key));
                    for &child in composite.children().iter().rev() {
                        stack.push(Step::Enter(child));
                    }
                }
            }
            Step::Exit(key) => {
                if let Some(node) = arena.get(key) {
                    visitor.on_post_traverse(key, node);
                }
            }
        }
    }
}

/// Accumulates transforms and material context while walking the graph,
/// and collects the entities to render.
///
/// - Transform: its matrix, pre-multiplied by the current top, is pushed on
///   entry and popped on exit.
/// - Material: its handle is pushed on entry and popped on exit, so an inner
///   material shadows an outer one only within its own subtree.
/// - Drawable: `world = top × internal`, the material override is set to the
///   current material (none outside any material subtree), then `pre_render`
///   runs. Entities already collected through another path are skipped.
pub struct RenderVisitor<'a> {
    engine: &'a mut dyn RenderEngine,
    matrix_stack: Vec<DMat4>,
    material_stack: Vec<Option<MaterialHandle>>,
    renderables: Vec<Entity>,
    seen: FxHashSet<Entity>,
    scratch: Vec<Entity>,
}

impl<'a> RenderVisitor<'a> {
    pub fn new(engine: &'a mut dyn RenderEngine) -> Self {
        Self::with_renderables(engine, Vec::new())
    }

    /// Starts with `seed` (e.g. global lights) already in the render list.
    pub fn with_renderables(engine: &'a mut dyn RenderEngine, seed: Vec<Entity>) -> Self {
        let mut visitor = Self {
            engine,
            matrix_stack: Vec::with_capacity(16),
            material_stack: Vec::new(),
            renderables: Vec::with_capacity(seed.len()),
            seen: FxHashSet::default(),
            scratch: Vec::new(),
        };
        visitor.collect(seed);
        visitor
    }

    fn collect(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            if self.seen.insert(entity) {
                self.renderables.push(entity);
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn matrix_depth(&self) -> usize {
        self.matrix_stack.len()
    }

    /// Accumulated matrix of the enclosing transforms.
    #[must_use]
    pub fn current_matrix(&self) -> DMat4 {
        self.matrix_stack.last().copied().unwrap_or(DMat4::IDENTITY)
    }

    #[inline]
    #[must_use]
    pub fn material_depth(&self) -> usize {
        self.material_stack.len()
    }

    /// Material of the innermost enclosing material node.
    #[must_use]
    pub fn current_material(&self) -> Option<MaterialHandle> {
        self.material_stack.last().copied().flatten()
    }

    #[must_use]
    pub fn renderables(&self) -> &[Entity] {
        &self.renderables
    }

    #[must_use]
    pub fn into_renderables(self) -> Vec<Entity> {
        self.renderables
    }
}

impl NodeVisitor for RenderVisitor<'_> {
    fn visit_transform(&mut self, _key: NodeKey, transform: &Transform) {
        let accumulated = self.current_matrix() * transform.matrix();
        self.matrix_stack.push(accumulated);
    }

    fn visit_material(&mut self, _key: NodeKey, material: &MaterialNode) {
        self.material_stack.push(material.handle());
    }

    fn visit_drawable(&mut self, _key: NodeKey, drawable: &mut dyn Drawable) {
        let internal = drawable
            .core()
            .internal_transform()
            .map_or(DMat4::IDENTITY, Transformable::matrix);
        let world = self.current_matrix() * internal;
        drawable.core_mut().set_final_matrix(world.as_mat4());

        let material = self.current_material();
        if let Some(materializable) = drawable.as_materializable_mut() {
            materializable.apply_material_override(material);
        }

        let mut produced = std::mem::take(&mut self.scratch);
        produced.clear();
        drawable.pre_render(&mut *self.engine, &mut produced);
        self.collect(produced.drain(..));
        self.scratch = produced;
    }

    fn on_post_traverse(&mut self, _key: NodeKey, node: &Node) {
        match node.kind() {
            NodeKind::Transform(_) => {
                self.matrix_stack.pop();
            }
            NodeKind::Material(_) => {
                self.material_stack.pop();
            }
            _ => {}
        }
    }
}
