#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod engine;
pub mod errors;
pub mod scene;
pub mod settings;

pub use engine::{AssetReader, FsAssetReader, HeadlessEngine, MemoryAssetReader, RenderEngine};
pub use errors::{GraphError, Result};
pub use scene::{
    AffineTransform, BoundingBox, CustomTransform, Drawable, Geometry, Materializable,
    MaterialNode, MultiGeometry, Node, NodeKey, NodeKind, NodeVisitor, PositionalLight,
    RenderVisitor, SceneGraph, Transform, TransformOrder, Transformable,
};
pub use settings::SceneGraphSettings;
