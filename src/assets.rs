//! Asynchronous asset access.
//!
//! Collision shapes and particle replays need external data (SDF volumes,
//! heightmap images, replay tables). Those are fetched through an
//! [`AssetLoader`], so hosts can serve them from disk, an archive, or the
//! network.
//!
//! | Loader | Source |
//! |--------|--------|
//! | [`FsLoader`] | files under a root directory |
//! | [`MemoryLoader`] | in-memory map, for tests and embedded assets |

use crate::error::AssetError;
use futures::future::{self, BoxFuture, FutureExt};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Source of named assets.
pub trait AssetLoader: Send + Sync {
    /// Fetch the raw bytes of `name`.
    fn load_bytes<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>>;

    /// Fetch `name` as UTF-8 text.
    fn load_text<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<String, AssetError>> {
        self.load_bytes(name)
            .map(move |bytes| {
                String::from_utf8(bytes?).map_err(|_| AssetError::NotText(name.to_string()))
            })
            .boxed()
    }
}

impl<L: AssetLoader + ?Sized> AssetLoader for Arc<L> {
    fn load_bytes<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>> {
        (**self).load_bytes(name)
    }
}

/// Loads assets from files relative to a root directory.
///
/// Reads are blocking: the returned future does the whole `std::fs::read`
/// when first polled. Fine under `pollster::block_on`; on an async runtime,
/// load from a blocking task.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl AssetLoader for FsLoader {
    fn load_bytes<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>> {
        let path = self.root.join(name);
        async move {
            match std::fs::read(&path) {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(AssetError::NotFound(name.to_string()))
                }
                Err(source) => Err(AssetError::Io { path, source }),
            }
        }
        .boxed()
    }
}

/// Serves assets from memory.
///
/// ```ignore
/// let loader = MemoryLoader::new()
///     .with_text("box.sdf", "2 2 2\n0 0 0\n1\n...")
///     .with_bytes("hills.png", png_bytes);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(name.into(), bytes.into());
    }

    pub fn with_bytes(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn with_text(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_bytes(name, text.into().into_bytes())
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetLoader for MemoryLoader {
    fn load_bytes<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>> {
        let result = self
            .assets
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(name.to_string()));
        future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_loader_serves_text() {
        let loader = MemoryLoader::new().with_text("particles.txt", "header\n");
        let text = pollster::block_on(loader.load_text("particles.txt")).unwrap();
        assert_eq!(text, "header\n");
    }

    #[test]
    fn test_memory_loader_missing_asset() {
        let loader = MemoryLoader::new();
        let err = pollster::block_on(loader.load_bytes("nope.sdf")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(name) if name == "nope.sdf"));
    }

    #[test]
    fn test_binary_asset_is_not_text() {
        let loader = MemoryLoader::new().with_bytes("img.png", vec![0xff, 0xfe, 0x00]);
        let err = pollster::block_on(loader.load_text("img.png")).unwrap_err();
        assert!(matches!(err, AssetError::NotText(_)));
    }

    #[test]
    fn test_fs_loader_reports_missing_file() {
        let loader = FsLoader::new(std::env::temp_dir().join("sphfluid-no-such-dir"));
        let err = pollster::block_on(loader.load_bytes("replay.txt")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }

    #[test]
    fn test_fs_loader_reads_file() {
        let dir = std::env::temp_dir().join(format!("sphfluid-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), "1 2 3").unwrap();

        let loader = FsLoader::new(&dir);
        let text = pollster::block_on(loader.load_text("a.txt")).unwrap();
        assert_eq!(text, "1 2 3");
        std::fs::remove_dir_all(&dir).ok();
    }
}
