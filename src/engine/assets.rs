use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::errors::{GraphError, Result};

/// Synchronous asset reader used by the mesh, material and glTF loaders.
///
/// Paths are relative to whatever root the reader was created with.
pub trait AssetReader: Send + Sync {
    fn exists(&self, path: &str) -> bool;

    /// Reads the whole asset into memory.
    fn read_asset_vector(&self, path: &str) -> Result<Vec<u8>>;

    fn is_asset_dir(&self, path: &str) -> bool;

    /// Copies every asset under `src_dir` into `dst_dir` on disk, returning
    /// the number of files written.
    fn copy_assets_to(&self, src_dir: &str, dst_dir: &Path) -> Result<usize>;
}

/// Local file reader
pub struct FsAssetReader {
    root_path: PathBuf,
}

impl FsAssetReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self { root_path }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

impl AssetReader for FsAssetReader {
    fn exists(&self, path: &str) -> bool {
        self.root_path.join(path).exists()
    }

    fn read_asset_vector(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.root_path.join(path);
        if !full.exists() {
            return Err(GraphError::AssetNotFound(path.to_string()));
        }
        if full.is_dir() {
            return Err(GraphError::AssetIsDirectory(path.to_string()));
        }
        Ok(fs::read(full)?)
    }

    fn is_asset_dir(&self, path: &str) -> bool {
        self.root_path.join(path).is_dir()
    }

    fn copy_assets_to(&self, src_dir: &str, dst_dir: &Path) -> Result<usize> {
        let src = self.root_path.join(src_dir);
        if !src.is_dir() {
            return Err(GraphError::AssetNotFound(src_dir.to_string()));
        }
        copy_dir(&src, dst_dir)
    }
}

/// In-memory reader keyed by `/`-separated paths.
///
/// A path is a directory when some stored asset lives below it.
#[derive(Debug, Default, Clone)]
pub struct MemoryAssetReader {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemoryAssetReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with_asset(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), data.into());
    }

    fn dir_prefix(path: &str) -> String {
        format!("{}/", path.trim_end_matches('/'))
    }
}

impl AssetReader for MemoryAssetReader {
    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path) || self.is_asset_dir(path)
    }

    fn read_asset_vector(&self, path: &str) -> Result<Vec<u8>> {
        match self.files.get(path) {
            Some(data) => Ok(data.clone()),
            None if self.is_asset_dir(path) => Err(GraphError::AssetIsDirectory(path.to_string())),
            None => Err(GraphError::AssetNotFound(path.to_string())),
        }
    }

    fn is_asset_dir(&self, path: &str) -> bool {
        let prefix = Self::dir_prefix(path);
        self.files.keys().any(|key| key.starts_with(&prefix))
    }

    fn copy_assets_to(&self, src_dir: &str, dst_dir: &Path) -> Result<usize> {
        let prefix = Self::dir_prefix(src_dir);
        let mut copied = 0;
        for (key, data) in &self.files {
            let Some(relative) = key.strip_prefix(&prefix) else {
                continue;
            };
            let target = dst_dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(target, data)?;
            copied += 1;
        }
        if copied == 0 {
            return Err(GraphError::AssetNotFound(src_dir.to_string()));
        }
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reader_distinguishes_files_and_dirs() {
        let reader = MemoryAssetReader::new()
            .with_asset("models/cube.glb", vec![1, 2, 3])
            .with_asset("models/textures/albedo.png", vec![4]);

        assert!(reader.exists("models/cube.glb"));
        assert!(reader.is_asset_dir("models"));
        assert!(reader.is_asset_dir("models/textures/"));
        assert!(!reader.is_asset_dir("models/cube.glb"));
        assert!(!reader.exists("models/sphere.glb"));

        assert_eq!(reader.read_asset_vector("models/cube.glb").unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            reader.read_asset_vector("models"),
            Err(GraphError::AssetIsDirectory(_))
        ));
        assert!(matches!(
            reader.read_asset_vector("missing.bin"),
            Err(GraphError::AssetNotFound(_))
        ));
    }

    #[test]
    fn fs_reader_reads_and_copies() {
        let root = std::env::temp_dir().join(format!("lantern-assets-{}", std::process::id()));
        let src = root.join("src/shaders");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("lit.mat"), b"mat").unwrap();

        let reader = FsAssetReader::new(root.join("src"));
        assert!(reader.exists("shaders/lit.mat"));
        assert!(reader.is_asset_dir("shaders"));
        assert_eq!(reader.read_asset_vector("shaders/lit.mat").unwrap(), b"mat");

        let dst = root.join("dst");
        assert_eq!(reader.copy_assets_to("shaders", &dst).unwrap(), 1);
        assert!(dst.join("lit.mat").is_file());

        fs::remove_dir_all(&root).unwrap();
    }
}
