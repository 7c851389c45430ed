//! Scene Graph Settings
//!
//! Construction-time configuration for a [`SceneGraph`](crate::scene::SceneGraph).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lantern::settings::SceneGraphSettings;
//!
//! // Defaults: root named "Root", glTF assets normalized to the unit cube
//! let settings = SceneGraphSettings::default();
//!
//! // Keep authored glTF scale and ship materials from a custom folder
//! let settings = SceneGraphSettings {
//!     normalize_gltf: false,
//!     default_material_asset: "materials/baked_color.mat".to_string(),
//!     ..Default::default()
//! };
//!
//! let graph = SceneGraph::with_settings(engine, FsAssetReader::new("."), settings);
//! ```

use std::f32::consts::PI;

/// Luminous efficiency of a halogen bulb, the default for positional lights.
pub const EFFICIENCY_HALOGEN: f32 = 0.0707;

/// Configuration consumed by the scene graph and its node factories.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraphSettings {
    /// Name given to the root created by `make_root` when none is supplied.
    pub root_name: String,

    /// Material package used when a mesh is opened without any material.
    pub default_material_asset: String,

    /// Material package used to draw the background layer.
    pub background_material_asset: String,

    /// Whether glTF assets are rescaled to fit the unit cube by default.
    pub normalize_gltf: bool,

    /// Default luminous power of spot and point lights.
    pub light_intensity: f32,

    /// Default luminous efficiency of spot and point lights.
    pub light_efficiency: f32,

    /// Default falloff radius of spot and point lights.
    pub light_falloff: f32,

    /// Default `(inner, outer)` spot cone angles in radians.
    pub spot_cone: (f32, f32),
}

impl Default for SceneGraphSettings {
    fn default() -> Self {
        Self {
            root_name: "Root".to_string(),
            default_material_asset: "assets/bakedColor.cmat".to_string(),
            background_material_asset: "assets/bakedTexture".to_string(),
            normalize_gltf: true,
            light_intensity: 5000.0,
            light_efficiency: EFFICIENCY_HALOGEN,
            light_falloff: 2.0,
            spot_cone: (PI / 8.0, (PI / 8.0) * 1.1),
        }
    }
}
