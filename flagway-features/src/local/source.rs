//! Where datafiles come from.

use super::flag::Datafile;
use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Delivers the current datafile for an environment.
#[async_trait]
pub trait DatafileSource: Send + Sync {
    async fn fetch(&self, environment_key: &str) -> ProviderResult<Datafile>;
}

/// Reads `<dir>/<environment_key>.json`.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, environment_key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", environment_key))
    }
}

#[async_trait]
impl DatafileSource for FileSource {
    async fn fetch(&self, environment_key: &str) -> ProviderResult<Datafile> {
        let path = self.path_for(environment_key);
        let bytes = fs::read(&path)
            .await
            .map_err(|e| ProviderError::Source(format!("{}: {}", path.display(), e)))?;

        Ok(Datafile::from_slice(&bytes)?)
    }
}
