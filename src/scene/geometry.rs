use super::bounds::BoundingBox;
use super::drawable::{Drawable, DrawableCore, Materializable, bind_material};
use crate::engine::{AssetReader, Entity, MaterialHandle, MeshBuffers, RenderEngine};
use crate::errors::{GraphError, Result};

/// Single-mesh drawable.
#[derive(Debug, Clone)]
pub struct Geometry {
    core: DrawableCore,
    material: Option<MaterialHandle>,
    material_override: Option<MaterialHandle>,
    /// Buffers created by `open_mesh`, released with the node.
    mesh: Option<MeshBuffers>,
    /// Fallback material created by `open_mesh`, released with the node.
    owned_material: Option<MaterialHandle>,
}

impl Geometry {
    /// Wraps an engine entity that already carries a renderable.
    #[must_use]
    pub fn new(entity: Entity, bounds: BoundingBox) -> Self {
        Self {
            core: DrawableCore::new(entity, bounds),
            material: None,
            material_override: None,
            mesh: None,
            owned_material: None,
        }
    }

    #[must_use]
    pub fn with_material(mut self, material: MaterialHandle) -> Self {
        self.material = Some(material);
        self
    }

    /// Loads a mesh blob through the engine.
    ///
    /// Without a `material`, the package at `default_material_path` is
    /// instantiated and owned by the geometry.
    pub fn open_mesh(
        engine: &mut dyn RenderEngine,
        assets: &dyn AssetReader,
        path: &str,
        material: Option<MaterialHandle>,
        default_material_path: &str,
    ) -> Result<Self> {
        if assets.is_asset_dir(path) {
            return Err(GraphError::AssetIsDirectory(path.to_string()));
        }
        let data = assets.read_asset_vector(path)?;
        if data.is_empty() {
            return Err(GraphError::EmptyAsset(path.to_string()));
        }

        let mut owned_material = None;
        let material = match material {
            Some(material) => material,
            None => {
                let package = assets.read_asset_vector(default_material_path)?;
                let created = engine.create_material(&package)?;
                owned_material = Some(created);
                created
            }
        };

        let mesh = match engine.load_mesh(&data, Some(material)) {
            Ok(mesh) => mesh,
            Err(e) => {
                log::error!("Failed to load mesh '{path}': {e}");
                if let Some(created) = owned_material {
                    engine.destroy_material(created);
                }
                return Err(e);
            }
        };

        Ok(Self {
            core: DrawableCore::new(mesh.renderable, mesh.bounds),
            material: Some(material),
            material_override: None,
            mesh: Some(mesh),
            owned_material,
        })
    }

    #[must_use]
    pub fn mesh(&self) -> Option<&MeshBuffers> {
        self.mesh.as_ref()
    }
}

impl Drawable for Geometry {
    fn core(&self) -> &DrawableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DrawableCore {
        &mut self.core
    }

    fn pre_render(&mut self, engine: &mut dyn RenderEngine, renderables: &mut Vec<Entity>) {
        let entity = self.core.entity();
        engine.set_transform(entity, self.core.final_matrix());
        match self.effective_material() {
            Some(material) => bind_material(engine, entity, material),
            None => log::debug!("Geometry {entity:?} has no material, drawing with current engine state"),
        }
        renderables.push(entity);
    }

    fn release(&mut self, engine: &mut dyn RenderEngine) {
        if !self.core.mark_released() {
            return;
        }
        if let Some(mesh) = self.mesh.take() {
            engine.destroy_buffer(mesh.vertex_buffer);
            engine.destroy_buffer(mesh.index_buffer);
        }
        if let Some(material) = self.owned_material.take() {
            engine.destroy_material(material);
        }
        engine.destroy_entity(self.core.entity());
    }

    fn as_materializable(&self) -> Option<&dyn Materializable> {
        Some(self)
    }

    fn as_materializable_mut(&mut self) -> Option<&mut dyn Materializable> {
        Some(self)
    }
}

impl Materializable for Geometry {
    fn material(&self) -> Option<MaterialHandle> {
        self.material
    }

    fn set_material(&mut self, material: Option<MaterialHandle>) {
        self.material = material;
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
    use super::*;
    use crate::engine::{HeadlessEngine, MemoryAssetReader};

    #[test]
    fn open_mesh_falls_back_to_default_material() {
        let mut engine = HeadlessEngine::new();
        let assets = MemoryAssetReader::new()
            .with_asset("meshes/cube.mesh", b"mesh".to_vec())
            .with_asset("assets/bakedColor.cmat", b"package".to_vec());

        let mut geometry =
            Geometry::open_mesh(&mut engine, &assets, "meshes/cube.mesh", None, "assets/bakedColor.cmat")
                .unwrap();
        let material = geometry.material().unwrap();
        assert!(engine.materials.contains_key(&material));

        geometry.release(&mut engine);
        geometry.release(&mut engine);
        assert!(!engine.materials.contains_key(&material));
        assert!(!engine.is_alive(geometry.entity()));
        assert!(engine.buffers.is_empty());
    }

    #[test]
    fn open_mesh_rejects_empty_and_missing_assets() {
        let mut engine = HeadlessEngine::new();
        let assets = MemoryAssetReader::new().with_asset("empty.mesh", Vec::new());

        assert!(matches!(
            Geometry::open_mesh(&mut engine, &assets, "empty.mesh", None, "m"),
            Err(GraphError::EmptyAsset(_))
        ));
        assert!(matches!(
            Geometry::open_mesh(&mut engine, &assets, "nope.mesh", None, "m"),
            Err(GraphError::AssetNotFound(_))
        ));
    }
}
