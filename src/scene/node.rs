use bitflags::bitflags;
use smallvec::SmallVec;

use super::composite::Composite;
use super::drawable::{Drawable, Materializable};
use super::geometry::Geometry;
use super::light::PositionalLight;
use super::material::MaterialNode;
use super::multi_geometry::MultiGeometry;
use super::transform::Transform;
use super::{NodeId, NodeKey};
use crate::engine::RenderEngine;

bitflags! {
    /// What a node can do, derived from its kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeCapabilities: u8 {
        /// Holds an ordered child list.
        const COMPOSITE      = 1 << 0;
        const TRANSFORM      = 1 << 1;
        const MATERIAL       = 1 << 2;
        const DRAWABLE       = 1 << 3;
        const MATERIALIZABLE = 1 << 4;
    }
}

/// Closed set of node payloads.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Plain composite with no contribution of its own.
    Group,
    Transform(Transform),
    Material(MaterialNode),
    Geometry(Geometry),
    MultiGeometry(MultiGeometry),
    Light(PositionalLight),
}

impl NodeKind {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Transform(_) => "transform",
            NodeKind::Material(_) => "material",
            NodeKind::Geometry(_) => "geometry",
            NodeKind::MultiGeometry(_) => "multi-geometry",
            NodeKind::Light(_) => "light",
        }
    }

    #[must_use]
    pub fn capabilities(&self) -> NodeCapabilities {
        match self {
            NodeKind::Group => NodeCapabilities::COMPOSITE,
            NodeKind::Transform(_) => NodeCapabilities::COMPOSITE | NodeCapabilities::TRANSFORM,
            NodeKind::Material(_) => NodeCapabilities::COMPOSITE | NodeCapabilities::MATERIAL,
            NodeKind::Geometry(_) | NodeKind::MultiGeometry(_) => {
                NodeCapabilities::DRAWABLE | NodeCapabilities::MATERIALIZABLE
            }
            NodeKind::Light(_) => NodeCapabilities::DRAWABLE,
        }
    }
}

/// A scene graph node.
///
/// # Hierarchy
///
/// Links are stored as [`NodeKey`]s and only changed through the
/// [`NodeArena`](super::NodeArena), which keeps both directions in sync:
/// - `parents`: back references, a node may have several (the graph is a DAG)
/// - `composite`: ordered child list, present for composite kinds only
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    pub(crate) dirty: bool,
    pub(crate) parents: SmallVec<[NodeKey; 2]>,
    pub(crate) composite: Option<Composite>,
    kind: NodeKind,
}

impl Node {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        let composite = kind
            .capabilities()
            .contains(NodeCapabilities::COMPOSITE)
            .then(Composite::new);
        Self {
            id: NodeId::new(),
            name: name.into(),
            dirty: true,
            parents: SmallVec::new(),
            composite,
            kind,
        }
    }

    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    #[must_use]
    pub fn transform(name: impl Into<String>, transform: Transform) -> Self {
        Self::new(name, NodeKind::Transform(transform))
    }

    #[must_use]
    pub fn material(name: impl Into<String>, material: MaterialNode) -> Self {
        Self::new(name, NodeKind::Material(material))
    }

    #[must_use]
    pub fn geometry(name: impl Into<String>, geometry: Geometry) -> Self {
        Self::new(name, NodeKind::Geometry(geometry))
    }

    #[must_use]
    pub fn multi_geometry(name: impl Into<String>, geometry: MultiGeometry) -> Self {
        Self::new(name, NodeKind::MultiGeometry(geometry))
    }

    #[must_use]
    pub fn light(name: impl Into<String>, light: PositionalLight) -> Self {
        Self::new(name, NodeKind::Light(light))
    }

    // ========================================================================
    // Identity & state
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set at creation and on mutable access, cleared by each scene rebuild.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    #[must_use]
    pub fn capabilities(&self) -> NodeCapabilities {
        self.kind.capabilities()
    }

    #[inline]
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.composite.is_some()
    }

    // ========================================================================
    // Hierarchy (read-only)
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn parents(&self) -> &[NodeKey] {
        &self.parents
    }

    /// Child keys in insertion order; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        self.composite.as_ref().map_or(&[][..], Composite::children)
    }

    #[must_use]
    pub fn composite(&self) -> Option<&Composite> {
        self.composite.as_ref()
    }

    // ========================================================================
    // Capability views
    // ========================================================================

    #[must_use]
    pub fn as_transform(&self) -> Option<&Transform> {
        match &self.kind {
            NodeKind::Transform(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_transform_mut(&mut self) -> Option<&mut Transform> {
        match &mut self.kind {
            NodeKind::Transform(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_material(&self) -> Option<&MaterialNode> {
        match &self.kind {
            NodeKind::Material(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_material_mut(&mut self) -> Option<&mut MaterialNode> {
        match &mut self.kind {
            NodeKind::Material(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_drawable(&self) -> Option<&dyn Drawable> {
        match &self.kind {
            NodeKind::Geometry(g) => Some(g),
            NodeKind::MultiGeometry(g) => Some(g),
            NodeKind::Light(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_drawable_mut(&mut self) -> Option<&mut dyn Drawable> {
        match &mut self.kind {
            NodeKind::Geometry(g) => Some(g),
            NodeKind::MultiGeometry(g) => Some(g),
            NodeKind::Light(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_materializable(&self) -> Option<&dyn Materializable> {
        self.as_drawable().and_then(|d| d.as_materializable())
    }

    pub fn as_materializable_mut(&mut self) -> Option<&mut dyn Materializable> {
        self.as_drawable_mut().and_then(|d| d.as_materializable_mut())
    }

    #[must_use]
    pub fn as_multi_geometry(&self) -> Option<&MultiGeometry> {
        match &self.kind {
            NodeKind::MultiGeometry(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_multi_geometry_mut(&mut self) -> Option<&mut MultiGeometry> {
        match &mut self.kind {
            NodeKind::MultiGeometry(g) => Some(g),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_light(&self) -> Option<&PositionalLight> {
        match &self.kind {
            NodeKind::Light(l) => Some(l),
            _ => None,
        }
    }

    /// Releases whatever engine resources the payload owns.
    pub(crate) fn release(&mut self, engine: &mut dyn RenderEngine) {
        match &mut self.kind {
            NodeKind::Material(m) => m.release(engine),
            NodeKind::Geometry(g) => g.release(engine),
            NodeKind::MultiGeometry(g) => g.release(engine),
            NodeKind::Light(l) => l.release(engine),
            NodeKind::Group | NodeKind::Transform(_) => {}
        }
    }

    /// Drops hierarchy links copied from elsewhere, keeping listeners.
    pub(crate) fn unlink(&mut self) {
        self.parents.clear();
        if let Some(composite) = &mut self.composite {
            composite.clear_children();
        }
    }
}
