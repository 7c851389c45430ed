//! Opaque engine handles and the plain-data descriptors exchanged with a
//! [`RenderEngine`](super::RenderEngine).

use glam::{Vec3, Vec4};

use crate::scene::BoundingBox;

/// Engine-side entity. Renderables, lights and part transforms all live on one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(pub u32);

macro_rules! engine_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u64);
        )*
    };
}

engine_handle! {
    /// Material instance owned by the engine.
    MaterialHandle,
    /// GPU texture.
    TextureHandle,
    /// Vertex or index buffer.
    BufferHandle,
    /// Engine scene: the flat entity set a view draws.
    SceneHandle,
    /// Render view (viewport + scene + camera).
    ViewHandle,
    CameraHandle,
    /// Loaded glTF asset, owner of its part entities.
    GltfHandle,
}

/// Result of loading a single mesh: one renderable plus its two buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBuffers {
    pub renderable: Entity,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub bounds: BoundingBox,
}

/// Result of loading a glTF asset.
#[derive(Debug, Clone, PartialEq)]
pub struct GltfAsset {
    pub handle: GltfHandle,
    /// Root entity every part entity is parented to.
    pub root: Entity,
    /// Part entities, in asset order.
    pub entities: Vec<Entity>,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightType {
    Sun {
        angular_radius: f32,
        halo_size: f32,
        halo_falloff: f32,
    },
    Directional,
    Point,
    FocusedSpot {
        inner: f32,
        outer: f32,
    },
}

impl LightType {
    /// Sun and directional lights are unaffected by the traversal.
    #[must_use]
    pub fn is_positional(&self) -> bool {
        matches!(self, LightType::Point | LightType::FocusedSpot { .. })
    }
}

/// Everything needed to build an engine light component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightParams {
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    pub efficiency: f32,
    pub position: Vec3,
    pub direction: Vec3,
    pub falloff: f32,
    pub cast_shadows: bool,
}

impl LightParams {
    /// Default sun: strong, shadow casting, with a visible disk.
    #[must_use]
    pub fn sun(direction: Vec3) -> Self {
        Self {
            light_type: LightType::Sun {
                angular_radius: 1.9,
                halo_size: 10.0,
                halo_falloff: 80.0,
            },
            color: Vec3::ONE,
            intensity: 110_000.0,
            efficiency: 1.0,
            position: Vec3::ZERO,
            direction,
            falloff: 0.0,
            cast_shadows: true,
        }
    }

    #[must_use]
    pub fn directional(color: Vec3, direction: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            color,
            intensity,
            efficiency: 1.0,
            position: Vec3::ZERO,
            direction,
            falloff: 0.0,
            cast_shadows: false,
        }
    }
}

/// A default value for a material parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialParameter {
    Bool(bool),
    Int(i32),
    Float(f32),
    Float3(Vec3),
    Float4(Vec4),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinFilter {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MagFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareMode {
    #[default]
    None,
    CompareToTexture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunc {
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Equal,
    NotEqual,
    Always,
    #[default]
    Never,
}

/// Sampler state bound alongside a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureSampler {
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub wrap_r: WrapMode,
    pub compare_mode: CompareMode,
    pub compare_func: CompareFunc,
}

impl TextureSampler {
    #[must_use]
    pub fn new(min_filter: MinFilter, mag_filter: MagFilter, wrap: WrapMode) -> Self {
        Self {
            min_filter,
            mag_filter,
            wrap_s: wrap,
            wrap_t: wrap,
            wrap_r: wrap,
            ..Default::default()
        }
    }
}

/// Handles passed to the post-render callback of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub view: ViewHandle,
    pub scene: SceneHandle,
    pub camera: CameraHandle,
    pub background_view: Option<ViewHandle>,
}
