/// Asset provider contract and a directory-backed implementation
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::LoadError;

/// Host-side source of model assets.
///
/// Binary content crosses the boundary base64-encoded; callers decode it
/// with `decode_base64`.
pub trait AssetProvider {
    fn read_asset_text(&self, name: &str) -> Result<String, LoadError>;
    fn read_asset_bytes(&self, name: &str) -> Result<String, LoadError>;
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>, LoadError> {
    Ok(STANDARD.decode(data.trim())?)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Serves assets from a single flat directory
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, LoadError> {
        if !is_plain_file_name(name) {
            return Err(LoadError::AssetUnavailable {
                name: name.to_string(),
                reason: "invalid asset name".to_string(),
            });
        }
        Ok(self.root.join(name))
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.resolve(name)?;
        std::fs::read(&path).map_err(|e| LoadError::AssetUnavailable {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

impl AssetProvider for DirectoryAssets {
    /// Lossy UTF-8: binary files still come back as (garbled) text
    fn read_asset_text(&self, name: &str) -> Result<String, LoadError> {
        let bytes = self.read(name)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_asset_bytes(&self, name: &str) -> Result<String, LoadError> {
        Ok(encode_base64(&self.read(name)?))
    }
}

/// No separators, no parent references, nothing hidden
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some_and(|f| f == std::ffi::OsStr::new(name))
}
