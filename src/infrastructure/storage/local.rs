use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;
use uuid::Uuid;

/// The shared upload directory. Final files are served by name; staging
/// files are dot-prefixed and never served.
#[derive(Clone, Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    pub async fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        info!("✅ Upload folder ready at {}", root.display());
        Ok(Self { root })
    }

    /// A fresh, unique path for an in-flight upload.
    pub fn staging_path(&self) -> PathBuf {
        self.root.join(format!(".staging-{}.part", Uuid::new_v4().simple()))
    }

    /// Resolve a servable file name. `None` for anything that could leave the
    /// directory or reach a hidden/staging file.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if is_servable_name(name) {
            Some(self.root.join(name))
        } else {
            None
        }
    }

    /// Move a staged file to its final name, replacing nothing silently.
    pub async fn promote(&self, staged: &Path, name: &str) -> io::Result<PathBuf> {
        let target = self.resolve(name).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("invalid upload name '{}'", name))
        })?;

        if fs::try_exists(&target).await? {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("upload '{}' already exists", name),
            ));
        }

        fs::rename(staged, &target).await?;
        Ok(target)
    }
}

pub fn is_servable_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && name != ".."
}
