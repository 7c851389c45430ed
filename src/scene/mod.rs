//! Scene graph module
//!
//! Node storage, hierarchy and the render traversal:
//! - [`Node`]: named graph node wrapping one [`NodeKind`]
//! - [`NodeArena`]: owner of every node, parent/child links as key pairs
//! - [`Transform`] / [`AffineTransform`] / [`CustomTransform`]: matrix nodes
//! - [`Geometry`], [`MultiGeometry`], [`PositionalLight`]: drawables
//! - [`MaterialNode`]: subtree-scoped material override
//! - [`RenderVisitor`]: compiles the graph into a flat entity list
//! - [`SceneGraph`]: orchestrator (dirty tracking, update gate, render)

pub mod affine;
pub mod arena;
pub mod background;
pub mod bounds;
pub mod composite;
pub mod drawable;
pub mod geometry;
pub mod graph;
pub mod light;
pub mod material;
pub mod multi_geometry;
pub mod node;
pub mod transform;
pub mod visitor;

pub use affine::{AffineTransform, TransformOrder};
pub use arena::NodeArena;
pub use background::BackgroundLayer;
pub use bounds::BoundingBox;
pub use composite::{ChildListener, ChildOp, Composite};
pub use drawable::{Drawable, DrawableCore, Materializable};
pub use geometry::Geometry;
pub use graph::{SceneGraph, SceneListener, UpdateGate};
pub use light::PositionalLight;
pub use material::MaterialNode;
pub use multi_geometry::MultiGeometry;
pub use node::{Node, NodeCapabilities, NodeKind};
pub use transform::{Animator, CustomTransform, Transform, TransformKind, Transformable, animator};
pub use visitor::{NodeVisitor, RenderVisitor, traverse};

use std::fmt;

use slotmap::new_key_type;
use uuid::Uuid;

new_key_type! {
    /// Generational handle of a node inside a [`NodeArena`].
    pub struct NodeKey;
}

/// Stable node identity. Survives cloning, so a cloned node can be
/// recognized as already adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Uuid);

impl NodeId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
