//! Persistence of reported risk points.
//!
//! Reads are point-in-time snapshots of an unordered collection; the
//! resolver takes one snapshot per resolution and never re-reads mid-loop.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::geo::RiskPoint;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("risk store read failed: {0}")]
    Read(String),
    #[error("risk store write failed: {0}")]
    Write(String),
}

/// Read/write access to the reported-hazard collection.
#[async_trait]
pub trait RiskRepository: Send + Sync {
    async fn read_all(&self) -> Result<Vec<RiskPoint>, RepositoryError>;
    async fn append(&self, point: RiskPoint) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<T: RiskRepository + ?Sized> RiskRepository for Arc<T> {
    async fn read_all(&self) -> Result<Vec<RiskPoint>, RepositoryError> {
        (**self).read_all().await
    }

    async fn append(&self, point: RiskPoint) -> Result<(), RepositoryError> {
        (**self).append(point).await
    }
}

/// Document store backed by a single JSON array file.
///
/// A missing file reads as an empty collection. Appends are
/// read-modify-write behind a mutex so concurrent reporters cannot corrupt
/// the document; duplicates are kept as-is.
pub struct JsonStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<RiskPoint>, RepositoryError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|err| RepositoryError::Read(err.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(RepositoryError::Read(err.to_string())),
        }
    }
}

#[async_trait]
impl RiskRepository for JsonStore {
    async fn read_all(&self) -> Result<Vec<RiskPoint>, RepositoryError> {
        self.load().await
    }

    async fn append(&self, point: RiskPoint) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut points = self.load().await?;
        points.push(point);
        let bytes = serde_json::to_vec_pretty(&points)
            .map_err(|err| RepositoryError::Write(err.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|err| RepositoryError::Write(err.to_string()))?;
        Ok(())
    }
}
