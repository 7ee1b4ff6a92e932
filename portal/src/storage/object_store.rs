//! Path-addressed object storage on local disk
//!
//! Stores uploaded files by bucket and object path, mirroring the layout of
//! the hosted storage service.
//!
//! Example: bucket "materials", path "10th/Math/1700000000000_k3j9x.pdf"
//! is stored at "objects/materials/10th/Math/1700000000000_k3j9x.pdf"

use crate::error::{AppError, Result};
use crate::gateway::{ListOptions, SortDirection, StoredObject};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Object store rooted at a local directory
#[derive(Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Create a new object store at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Initialize the object store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Object store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Write an object; with `upsert` false an existing object is a conflict
    ///
    /// Each write stages its bytes in its own hidden temp file. Without upsert
    /// the temp file is hard-linked into place, which fails if the target
    /// exists, so concurrent writers to one path never overwrite each other.
    pub async fn write(&self, bucket: &str, path: &str, data: &[u8], upsert: bool) -> Result<()> {
        let target = self.object_path(bucket, path)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let temp_path =
            target.with_file_name(format!(".{}.{}.part", file_name, Uuid::new_v4().simple()));

        let staged = stage(&temp_path, data).await;
        let committed = match staged {
            Ok(()) if upsert => fs::rename(&temp_path, &target).await.map_err(AppError::from),
            Ok(()) => match fs::hard_link(&temp_path, &target).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    Err(AppError::Conflict(format!("{}/{}", bucket, path)))
                }
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };

        if !upsert || committed.is_err() {
            if let Err(e) = fs::remove_file(&temp_path).await {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!("Failed to remove temp file {:?}: {}", temp_path, e);
                }
            }
        }
        committed?;

        tracing::debug!("Wrote object: {}/{} ({} bytes)", bucket, path, data.len());

        Ok(())
    }

    /// Read an object's bytes
    pub async fn read(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let target = self.object_path(bucket, path)?;

        if !fs::try_exists(&target).await? {
            return Err(AppError::NotFound(format!("{}/{}", bucket, path)));
        }

        Ok(fs::read(&target).await?)
    }

    /// Delete an object; deleting a missing object succeeds
    pub async fn delete(&self, bucket: &str, path: &str) -> Result<()> {
        let target = self.object_path(bucket, path)?;

        match fs::remove_file(&target).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        tracing::debug!("Deleted object: {}/{}", bucket, path);

        Ok(())
    }

    /// List files directly under `prefix`, sorted by creation time
    pub async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: &ListOptions,
    ) -> Result<Vec<StoredObject>> {
        let dir = if prefix.trim_matches('/').is_empty() {
            self.bucket_root(bucket)?
        } else {
            self.object_path(bucket, prefix)?
        };

        if !fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut found: Vec<(SystemTime, String)> = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }

            let created = metadata.created().or_else(|_| metadata.modified())?;
            found.push((created, name));
        }

        // Object names start with a millisecond timestamp, so the name breaks
        // ties between files created within the filesystem's time resolution.
        found.sort();
        if options.sort_by.order == SortDirection::Desc {
            found.reverse();
        }

        Ok(found
            .into_iter()
            .take(options.limit)
            .map(|(created, name)| StoredObject {
                name,
                created_at: Some(DateTime::<Utc>::from(created)),
            })
            .collect())
    }

    /// Get object store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_root(&self, bucket: &str) -> Result<PathBuf> {
        validate_segment(bucket)?;
        Ok(self.root.join(bucket))
    }

    /// Resolve an object path, refusing anything that escapes the bucket
    fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        let mut resolved = self.bucket_root(bucket)?;
        let relative = Path::new(path.trim_matches('/'));

        let mut segments = 0;
        for component in relative.components() {
            match component {
                Component::Normal(segment) => {
                    resolved.push(segment);
                    segments += 1;
                }
                _ => {
                    return Err(AppError::Validation(format!(
                        "Invalid object path: {}",
                        path
                    )))
                }
            }
        }

        if segments == 0 {
            return Err(AppError::Validation("Object path is empty".to_string()));
        }

        Ok(resolved)
    }
}

async fn stage(temp_path: &Path, data: &[u8]) -> Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0'])
    {
        return Err(AppError::Validation(format!(
            "Invalid bucket name: {}",
            segment
        )));
    }
    Ok(())
}
