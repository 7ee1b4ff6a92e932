//! EL BARAA school portal library
//!
//! Grade and subject browsing, announcements, calendar and the staff upload
//! flows, backed by a Supabase project or a local SQLite store.

pub mod access;
pub mod app;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod fetcher;
pub mod gateway;
pub mod navigation;
pub mod routes;
pub mod services;
pub mod storage;
