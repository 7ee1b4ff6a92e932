//! Command handlers behind the CLI
//!
//! This module organizes commands into logical submodules:
//! - `browse`: student views (grades, subjects, materials, announcements,
//!   calendar) and route resolution
//! - `portal`: staff actions (uploads, announcements, calendar events) and
//!   password hashing
//!
//! Every handler returns the rendered output so it can be printed or tested.

pub mod browse;
pub mod portal;

use crate::error::Result;
use serde::Serialize;

pub use browse::*;
pub use portal::*;

/// How command output is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render `value` as pretty JSON or through the text renderer
pub fn render<T, F>(format: OutputFormat, value: &T, text: F) -> Result<String>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Text => Ok(text(value)),
    }
}

