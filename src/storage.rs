//! Uploaded archives on disk, addressed by paths relative to the media
//! directory.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs;

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative location of a dap archive
    pub fn dap_path(package_name: &str, version: &str) -> String {
        format!("daps/{}/{}-{}.dap", package_name, package_name, version)
    }

    fn resolve(&self, relative: &str) -> io::Result<PathBuf> {
        let path = Path::new(relative);
        if relative.is_empty() || !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid media path {}", relative),
            ));
        }
        Ok(self.root.join(path))
    }

    pub async fn save(&self, relative: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await
    }

    pub async fn read(&self, relative: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(relative)?).await
    }

    /// Missing files are not an error
    pub async fn delete(&self, relative: &str) -> io::Result<()> {
        match fs::remove_file(self.resolve(relative)?).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> MediaStorage {
        MediaStorage::new(std::env::temp_dir().join(format!("dapi-media-{}", uuid::Uuid::new_v4())))
    }

    #[tokio::test]
    async fn save_read_delete() {
        let storage = temp_storage();
        let path = MediaStorage::dap_path("foo", "1.0");
        assert_eq!(path, "daps/foo/foo-1.0.dap");

        storage.save(&path, b"archive").await.unwrap();
        assert_eq!(storage.read(&path).await.unwrap(), b"archive");
        storage.delete(&path).await.unwrap();
        storage.delete(&path).await.unwrap();
        assert!(storage.read(&path).await.is_err());

        let _ = std::fs::remove_dir_all(storage.root());
    }

    #[tokio::test]
    async fn refuses_escaping_paths() {
        let storage = temp_storage();
        assert!(storage.save("../evil", b"x").await.is_err());
        assert!(storage.save("/etc/passwd", b"x").await.is_err());
    }
}
