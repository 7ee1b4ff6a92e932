//! Content gateway
//!
//! The hosted backend that owns every table and stored object. This module
//! defines the `Gateway` trait the rest of the application talks to, plus:
//! - `remote`: the Supabase implementation (PostgREST + Storage over HTTPS)
//! - `local`: a SQLite + on-disk implementation for offline use and tests

pub mod local;
pub mod query;
pub mod remote;

pub use local::LocalGateway;
pub use query::{
    Filter, ListOptions, Order, SortBy, SortDirection, StoredObject, Table, TableQuery,
    UploadOptions,
};
pub use remote::RemoteGateway;

use crate::database::{Announcement, CalendarEvent, Material};
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

/// Operations offered by the backend-as-a-service
///
/// Rows travel as JSON objects; use [`select_records`] and [`insert_record`]
/// for typed access.
pub trait Gateway: Send + Sync {
    /// Run a filtered, ordered row query
    fn select(&self, query: &TableQuery) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Insert one row and return it as stored (with id and timestamp)
    fn insert(&self, table: Table, row: Value) -> impl Future<Output = Result<Value>> + Send;

    /// Store bytes at `path` inside `bucket`
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: &[u8],
        options: &UploadOptions,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Publicly resolvable URL of an object; no network call
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// List objects directly under `prefix`
    fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: &ListOptions,
    ) -> impl Future<Output = Result<Vec<StoredObject>>> + Send;

    /// Delete an object
    fn remove(&self, bucket: &str, path: &str) -> impl Future<Output = Result<()>> + Send;
}

/// A typed row living in one gateway table
pub trait Record: DeserializeOwned + Send {
    const TABLE: Table;
}

impl Record for Material {
    const TABLE: Table = Table::Materials;
}

impl Record for Announcement {
    const TABLE: Table = Table::Announcements;
}

impl Record for CalendarEvent {
    const TABLE: Table = Table::CalendarEvents;
}

/// Run a query and decode every row as `R`
pub async fn select_records<G, R>(gateway: &G, query: &TableQuery) -> Result<Vec<R>>
where
    G: Gateway,
    R: Record,
{
    debug_assert_eq!(query.table, R::TABLE);
    let rows = gateway.select(query).await?;
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

/// Insert a payload into `R`'s table and decode the stored row
pub async fn insert_record<G, R, P>(gateway: &G, payload: &P) -> Result<R>
where
    G: Gateway,
    R: Record,
    P: Serialize + Sync,
{
    let row = serde_json::to_value(payload)?;
    let stored = gateway.insert(R::TABLE, row).await?;
    Ok(serde_json::from_value(stored)?)
}

/// Either gateway backend, chosen from settings at startup
#[derive(Clone)]
pub enum AnyGateway {
    Remote(RemoteGateway),
    Local(LocalGateway),
}

impl Gateway for AnyGateway {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>> {
        match self {
            AnyGateway::Remote(g) => g.select(query).await,
            AnyGateway::Local(g) => g.select(query).await,
        }
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        match self {
            AnyGateway::Remote(g) => g.insert(table, row).await,
            AnyGateway::Local(g) => g.insert(table, row).await,
        }
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: &[u8],
        options: &UploadOptions,
    ) -> Result<()> {
        match self {
            AnyGateway::Remote(g) => g.upload(bucket, path, data, options).await,
            AnyGateway::Local(g) => g.upload(bucket, path, data, options).await,
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        match self {
            AnyGateway::Remote(g) => g.public_url(bucket, path),
            AnyGateway::Local(g) => g.public_url(bucket, path),
        }
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: &ListOptions,
    ) -> Result<Vec<StoredObject>> {
        match self {
            AnyGateway::Remote(g) => g.list(bucket, prefix, options).await,
            AnyGateway::Local(g) => g.list(bucket, prefix, options).await,
        }
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<()> {
        match self {
            AnyGateway::Remote(g) => g.remove(bucket, path).await,
            AnyGateway::Local(g) => g.remove(bucket, path).await,
        }
    }
}
