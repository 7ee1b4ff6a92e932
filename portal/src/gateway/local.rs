//! Local gateway
//!
//! Serves the gateway operations from a SQLite database and an on-disk
//! object store. Public URLs are `file://` URLs into the store.

use super::{Gateway, ListOptions, StoredObject, Table, TableQuery, UploadOptions};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::storage::ObjectStore;
use serde_json::Value;
use std::path::Path;

/// Gateway backed by local files
#[derive(Clone)]
pub struct LocalGateway {
    repo: Repository,
    objects: ObjectStore,
}

impl LocalGateway {
    pub fn new(repo: Repository, objects: ObjectStore) -> Self {
        Self { repo, objects }
    }

    /// Open (or create) the local gateway inside a data directory
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let pool = create_pool(&data_dir.join("content.db")).await?;
        let objects = ObjectStore::new(data_dir.join("objects"));
        objects.initialize().await?;

        Ok(Self::new(Repository::new(pool), objects))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }
}

impl Gateway for LocalGateway {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>> {
        self.repo.select_rows(query).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        self.repo.insert_row(table, row).await
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: &[u8],
        options: &UploadOptions,
    ) -> Result<()> {
        self.objects.write(bucket, path, data, options.upsert).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "file://{}/{}/{}",
            self.objects.root().display(),
            bucket,
            path.trim_start_matches('/')
        )
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: &ListOptions,
    ) -> Result<Vec<StoredObject>> {
        self.objects.list(bucket, prefix, options).await
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<()> {
        self.objects.delete(bucket, path).await
    }
}
