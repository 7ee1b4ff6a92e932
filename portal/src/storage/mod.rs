//! Storage module
//!
//! Provides local object storage for uploaded materials and calendar images.

pub mod object_store;

pub use object_store::ObjectStore;
