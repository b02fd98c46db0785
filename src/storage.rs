use std::path::PathBuf;

use tracing::warn;

/// Filesystem home of uploaded avatar files. Only deletion lives here; the
/// upload/resize pipeline is an external concern and requests carry file
/// names, not bytes.
#[derive(Debug, Clone)]
pub struct AvatarStore {
    dir: PathBuf,
}

impl AvatarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Best-effort removal of a stored avatar file. Never fails the
    /// surrounding request: a miss or an IO error is logged and dropped.
    pub async fn remove(&self, file: &str) {
        if file.is_empty() {
            return;
        }
        let path = self.dir.join(file);
        if let Err(err) = tokio::fs::remove_file(&path).await {
            warn!("could not remove avatar {}: {}", path.display(), err);
        }
    }
}
