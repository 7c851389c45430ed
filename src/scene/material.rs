use rustc_hash::FxHashMap;

use crate::engine::{MaterialHandle, MaterialParameter, RenderEngine, TextureHandle, TextureSampler};

/// Composite payload that imposes its material on every materializable
/// drawable below it during traversal.
///
/// Parameters and texture bindings are remembered so that they can be
/// re-applied when the engine handle is swapped.
#[derive(Debug, Clone, Default)]
pub struct MaterialNode {
    handle: Option<MaterialHandle>,
    /// Whether `handle` was created for this node and dies with it.
    owns_handle: bool,
    parameters: FxHashMap<String, MaterialParameter>,
    textures: FxHashMap<String, (TextureHandle, TextureSampler)>,
}

impl MaterialNode {
    /// Wraps a handle owned by the caller.
    #[must_use]
    pub fn new(handle: Option<MaterialHandle>) -> Self {
        Self {
            handle,
            ..Default::default()
        }
    }

    /// Wraps a handle that is destroyed together with the node.
    #[must_use]
    pub fn owned(handle: MaterialHandle) -> Self {
        Self {
            handle: Some(handle),
            owns_handle: true,
            ..Default::default()
        }
    }

    /// Creates the engine material from a compiled package.
    pub fn from_package(engine: &mut dyn RenderEngine, package: &[u8]) -> crate::errors::Result<Self> {
        Ok(Self::owned(engine.create_material(package)?))
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<MaterialHandle> {
        self.handle
    }

    /// Swaps the engine handle and re-applies the stored bindings to it.
    ///
    /// A previously owned handle is destroyed; the new one is not owned.
    pub fn set_handle(&mut self, engine: &mut dyn RenderEngine, handle: Option<MaterialHandle>) {
        if self.owns_handle
            && let Some(old) = self.handle
            && Some(old) != handle
        {
            engine.destroy_material(old);
        }
        self.owns_handle = false;
        self.handle = handle;
        self.apply_bindings(engine);
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<MaterialParameter> {
        self.parameters.get(name).copied()
    }

    #[must_use]
    pub fn texture(&self, name: &str) -> Option<(TextureHandle, TextureSampler)> {
        self.textures.get(name).copied()
    }

    pub fn set_parameter(&mut self, engine: &mut dyn RenderEngine, name: &str, value: MaterialParameter) {
        self.parameters.insert(name.to_string(), value);
        match self.handle {
            Some(handle) => engine.set_material_parameter(handle, name, value),
            None => log::debug!("Material parameter '{name}' stored, no engine material yet"),
        }
    }

    pub fn set_texture(
        &mut self,
        engine: &mut dyn RenderEngine,
        name: &str,
        texture: TextureHandle,
        sampler: TextureSampler,
    ) {
        self.textures.insert(name.to_string(), (texture, sampler));
        match self.handle {
            Some(handle) => engine.set_material_texture(handle, name, texture, sampler),
            None => log::debug!("Material texture '{name}' stored, no engine material yet"),
        }
    }

    fn apply_bindings(&self, engine: &mut dyn RenderEngine) {
        let Some(handle) = self.handle else {
            return;
        };
        for (name, value) in &self.parameters {
            engine.set_material_parameter(handle, name, *value);
        }
        for (name, (texture, sampler)) in &self.textures {
            engine.set_material_texture(handle, name, *texture, *sampler);
        }
    }

    pub(crate) fn release(&mut self, engine: &mut dyn RenderEngine) {
        if self.owns_handle
            && let Some(handle) = self.handle.take()
        {
            engine.destroy_material(handle);
        }
        self.owns_handle = false;
    }
}
