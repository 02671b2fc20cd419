//! One reusable temp file per session holding its latest submission.

use crate::session::SessionStore;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const SCRATCH_PREFIX: &str = "lintbox-";
const SCRATCH_SUFFIX: &str = ".py";

#[derive(Debug, thiserror::Error)]
pub enum ScratchError {
    #[error("scratch file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScratchError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub struct ScratchFiles {
    dir: PathBuf,
}

impl ScratchFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `source` to the session's scratch file, allocating it on first use.
    /// Existing contents are replaced.
    pub async fn write(
        &self,
        sessions: &SessionStore,
        session_id: &str,
        source: &str,
    ) -> Result<PathBuf, ScratchError> {
        let path = sessions.scratch_path_or_insert_with(session_id, || self.allocate())?;

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ScratchError::io(&path, e))?;
        file.write_all(source.as_bytes())
            .await
            .map_err(|e| ScratchError::io(&path, e))?;
        file.flush().await.map_err(|e| ScratchError::io(&path, e))?;
        drop(file);

        tracing::debug!(session = session_id, path = %path.display(), "scratch file written");
        Ok(path)
    }

    /// Delete the scratch file at `path`. A file that is already gone counts
    /// as removed.
    pub async fn remove(&self, path: &Path) -> Result<(), ScratchError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScratchError::io(path, e)),
        }
    }

    /// Create a uniquely named, persisted file in the scratch directory.
    fn allocate(&self) -> Result<PathBuf, ScratchError> {
        let file = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(SCRATCH_SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| ScratchError::io(&self.dir, e))?;
        let (_handle, path) = file.keep().map_err(|e| ScratchError::io(&self.dir, e.error))?;
        Ok(path)
    }
}
