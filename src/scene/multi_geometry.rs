use std::path::Path;
use std::time::Instant;

use glam::Mat4;

use super::bounds::BoundingBox;
use super::drawable::{Drawable, DrawableCore, Materializable, bind_material};
use crate::engine::{AssetReader, Entity, GltfHandle, MaterialHandle, RenderEngine};
use crate::errors::{GraphError, Result};

/// Multi-part drawable: a root entity with part entities parented to it,
/// either built by hand with [`add_part`](Self::add_part) or loaded from glTF.
#[derive(Debug, Clone)]
pub struct MultiGeometry {
    core: DrawableCore,
    root_material: Option<MaterialHandle>,
    material_override: Option<MaterialHandle>,
    parts: Vec<Entity>,
    part_materials: Vec<Option<MaterialHandle>>,
    /// Applied after the final matrix; fits loaded assets to the unit cube.
    normalization: Mat4,
    gltf: Option<GltfHandle>,
}

impl MultiGeometry {
    /// Creates an empty multi geometry with a fresh root entity.
    pub fn new(engine: &mut dyn RenderEngine) -> Self {
        let root = engine.create_entity();
        engine.set_transform(root, Mat4::IDENTITY);
        Self::from_root(root, BoundingBox::default())
    }

    fn from_root(root: Entity, bounds: BoundingBox) -> Self {
        Self {
            core: DrawableCore::new(root, bounds),
            root_material: None,
            material_override: None,
            parts: Vec::new(),
            part_materials: Vec::new(),
            normalization: Mat4::IDENTITY,
            gltf: None,
        }
    }

    /// Loads a `.gltf` or `.glb` asset. Directories and zip archives are rejected.
    pub fn open_gltf(
        engine: &mut dyn RenderEngine,
        assets: &dyn AssetReader,
        path: &str,
        normalize: bool,
    ) -> Result<Self> {
        if !assets.exists(path) {
            log::error!("{path} does not exist");
            return Err(GraphError::AssetNotFound(path.to_string()));
        }
        if assets.is_asset_dir(path) {
            log::error!("{path} is a directory but a gltf or glb file was expected");
            return Err(GraphError::AssetIsDirectory(path.to_string()));
        }

        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let binary = match extension.as_str() {
            "glb" => true,
            "gltf" => false,
            "zip" => {
                log::error!("Cannot open {path}: zip archives are not supported");
                return Err(GraphError::UnsupportedAsset(path.to_string()));
            }
            other => {
                log::warn!("Unexpected extension '{other}' for {path}, assuming JSON glTF");
                false
            }
        };

        let data = assets.read_asset_vector(path)?;
        if data.is_empty() {
            return Err(GraphError::EmptyAsset(path.to_string()));
        }

        let start = Instant::now();
        let asset = engine.load_gltf(&data, binary)?;
        log::info!(
            "Loaded {path} ({} parts) in {:.2?}",
            asset.entities.len(),
            start.elapsed()
        );

        let mut geometry = Self::from_root(asset.root, asset.bounds);
        geometry.part_materials = vec![None; asset.entities.len()];
        geometry.parts = asset.entities;
        geometry.gltf = Some(asset.handle);
        if normalize {
            geometry.normalization = asset.bounds.scale_to_unit_cube();
        }
        Ok(geometry)
    }

    /// Creates a part entity parented to the root, with an optional local matrix.
    pub fn add_part(&mut self, engine: &mut dyn RenderEngine, local: Option<Mat4>) -> Entity {
        let part = engine.create_entity();
        engine.set_transform_parent(part, Some(self.core.entity()));
        if let Some(local) = local {
            engine.set_transform(part, local);
        }
        self.parts.push(part);
        self.part_materials.push(None);
        part
    }

    #[must_use]
    pub fn parts(&self) -> &[Entity] {
        &self.parts
    }

    #[must_use]
    pub fn part(&self, index: usize) -> Option<Entity> {
        self.parts.get(index).copied()
    }

    #[must_use]
    pub fn normalization(&self) -> Mat4 {
        self.normalization
    }

    pub fn set_normalization(&mut self, normalization: Mat4) {
        self.normalization = normalization;
    }

    #[must_use]
    pub fn is_gltf(&self) -> bool {
        self.gltf.is_some()
    }
}

impl Drawable for MultiGeometry {
    fn core(&self) -> &DrawableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DrawableCore {
        &mut self.core
    }

    fn pre_render(&mut self, engine: &mut dyn RenderEngine, renderables: &mut Vec<Entity>) {
        let root = self.core.entity();
        engine.set_transform(root, self.core.final_matrix() * self.normalization);

        let root_material = self.effective_material();
        let has_part_materials = self.part_materials.iter().any(Option::is_some);
        if (root_material.is_some() || has_part_materials) && self.gltf.is_some() {
            log::warn!("Overriding gltf materials");
        }
        if let Some(material) = root_material {
            bind_material(engine, root, material);
        }
        for (part, material) in self.parts.iter().zip(&self.part_materials) {
            if let Some(material) = material {
                bind_material(engine, *part, *material);
            }
        }

        renderables.push(root);
        renderables.extend_from_slice(&self.parts);
    }

    fn release(&mut self, engine: &mut dyn RenderEngine) {
        if !self.core.mark_released() {
            return;
        }
        match self.gltf.take() {
            Some(asset) => engine.destroy_gltf(asset),
            None => {
                for part in self.parts.drain(..) {
                    engine.destroy_entity(part);
                }
                engine.destroy_entity(self.core.entity());
            }
        }
    }

    fn as_materializable(&self) -> Option<&dyn Materializable> {
        Some(self)
    }

    fn as_materializable_mut(&mut self) -> Option<&mut dyn Materializable> {
        Some(self)
    }
}

impl Materializable for MultiGeometry {
    /// Material bound to the root entity's primitives.
    fn material(&self) -> Option<MaterialHandle> {
        self.root_material
    }

    fn set_material(&mut self, material: Option<MaterialHandle>) {
        self.root_material = material;
    }

    fn material_at(&self, index: usize) -> Option<MaterialHandle> {
        self.part_materials.get(index).copied().flatten()
    }

    /// Ignored for indices past the last part.
    fn set_material_at(&mut self, index: usize, material: Option<MaterialHandle>) {
        if let Some(slot) = self.part_materials.get_mut(index) {
            *slot = material;
        }
    }

    fn material_override(&self) -> Option<MaterialHandle> {
        self.material_override
    }

    fn apply_material_override(&mut self, material: Option<MaterialHandle>) {
        self.material_override = material;
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::engine::{HeadlessEngine, MemoryAssetReader};

    #[test]
    fn open_gltf_validates_path() {
        let mut engine = HeadlessEngine::new();
        let assets = MemoryAssetReader::new()
            .with_asset("models/car/scene.gltf", b"{}".to_vec())
            .with_asset("models/car.zip", b"PK".to_vec());

        assert!(matches!(
            MultiGeometry::open_gltf(&mut engine, &assets, "models/car", true),
            Err(GraphError::AssetIsDirectory(_))
        ));
        assert!(matches!(
            MultiGeometry::open_gltf(&mut engine, &assets, "models/car.zip", true),
            Err(GraphError::UnsupportedAsset(_))
        ));
        assert!(matches!(
            MultiGeometry::open_gltf(&mut engine, &assets, "models/boat.glb", true),
            Err(GraphError::AssetNotFound(_))
        ));
    }

    #[test]
    fn normalized_gltf_root_fits_unit_cube() {
        let mut engine = HeadlessEngine::new();
        engine.gltf_part_count = 2;
        let assets = MemoryAssetReader::new().with_asset("duck.glb", b"glTF".to_vec());

        let mut geometry = MultiGeometry::open_gltf(&mut engine, &assets, "duck.glb", true).unwrap();
        let mut renderables = Vec::new();
        geometry.pre_render(&mut engine, &mut renderables);

        assert_eq!(renderables.len(), 3);
        assert_eq!(renderables[0], geometry.entity());

        let root = engine.transform_of(geometry.entity()).unwrap();
        let fitted = engine.gltf_bounds.transform(&root);
        assert!(fitted.center().length() < 1e-5);
        assert!((fitted.size().max_element() - 2.0).abs() < 1e-5);
        assert!(fitted.size().cmple(Vec3::splat(2.0 + 1e-5)).all());
    }

    #[test]
    fn part_materials_only_touch_their_part() {
        let mut engine = HeadlessEngine::new();
        let mut geometry = MultiGeometry::new(&mut engine);
        let a = geometry.add_part(&mut engine, None);
        let b = geometry.add_part(&mut engine, Some(Mat4::from_translation(Vec3::X)));
        engine.create_renderable(a, &BoundingBox::default(), 1).unwrap();
        engine.create_renderable(b, &BoundingBox::default(), 1).unwrap();

        let material = engine.create_material(b"pkg").unwrap();
        geometry.set_material_at(1, Some(material));
        geometry.set_material_at(5, Some(material));

        geometry.pre_render(&mut engine, &mut Vec::new());
        assert_eq!(engine.primitive_material(a, 0), None);
        assert_eq!(engine.primitive_material(b, 0), Some(material));
        assert_eq!(engine.transform_parents.get(&b), Some(&geometry.entity()));
    }
}
