//! Route table
//!
//! Typed form of the portal's navigation surface. Routes parse from and
//! format to the path strings used by links, with pdf-viewer parameters
//! form-encoded.

use crate::config;
use crate::error::{AppError, Result};
use reqwest::Url;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Base used to resolve relative route strings
const ROUTE_BASE: &str = "http://portal.local/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    Home,
    Student,
    Announcements,
    Calendar,
    Subjects,
    Teacher,
    Admin,
    AdminDashboard,
    /// Embedded document viewer; an empty `file` shows "No PDF Selected"
    PdfViewer { file: String, name: String },
}

impl Route {
    /// Viewer link for a stored pdf
    pub fn pdf_viewer(file_url: &str, file_name: &str) -> Self {
        let name = if file_name.is_empty() {
            config::DEFAULT_PDF_NAME
        } else {
            file_name
        };

        Route::PdfViewer {
            file: file_url.to_string(),
            name: name.to_string(),
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Student => "/student",
            Route::Announcements => "/student/announcements",
            Route::Calendar => "/student/calendar",
            Route::Subjects => "/subjects",
            Route::Teacher => "/teacher",
            Route::Admin => "/admin",
            Route::AdminDashboard => "/admin/dashboard",
            Route::PdfViewer { .. } => "/pdf-viewer",
        }
    }

    /// Where the embedded viewer points, with the toolbar enabled
    pub fn embed_url(&self) -> Option<String> {
        match self {
            Route::PdfViewer { file, .. } if !file.is_empty() => {
                Some(format!("{}#toolbar=1&navpanes=1&scrollbar=1", file))
            }
            _ => None,
        }
    }

    /// Human-readable label for listings
    pub fn label(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Student => "Student Portal",
            Route::Announcements => "Announcements",
            Route::Calendar => "Calendar",
            Route::Subjects => "Subjects",
            Route::Teacher => "Teacher Portal",
            Route::Admin => "Admin Login",
            Route::AdminDashboard => "Admin Dashboard",
            Route::PdfViewer { .. } => "PDF Viewer",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::PdfViewer { file, name } => {
                let query = Url::parse_with_params(
                    ROUTE_BASE,
                    &[("file", file.as_str()), ("name", name.as_str())],
                )
                .map_err(|_| fmt::Error)?;
                write!(f, "{}?{}", self.path(), query.query().unwrap_or_default())
            }
            _ => f.write_str(self.path()),
        }
    }
}

impl FromStr for Route {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();
        // Only portal-relative paths; `//host` and `/\host` would leave the portal
        let mut chars = input.chars();
        if chars.next() != Some('/') || matches!(chars.next(), Some('/' | '\\')) {
            return Err(AppError::NotFound(format!("No route for {}", input)));
        }

        let base = Url::parse(ROUTE_BASE)
            .map_err(|e| AppError::Generic(format!("Invalid route base: {}", e)))?;
        let url = base
            .join(input)
            .map_err(|e| AppError::NotFound(format!("Invalid route {}: {}", s, e)))?;

        let path = url.path().trim_end_matches('/');

        let route = match path {
            "" => Route::Home,
            "/student" => Route::Student,
            "/student/announcements" => Route::Announcements,
            "/student/calendar" => Route::Calendar,
            "/subjects" => Route::Subjects,
            "/teacher" => Route::Teacher,
            "/admin" => Route::Admin,
            "/admin/dashboard" => Route::AdminDashboard,
            "/pdf-viewer" => {
                let mut file = String::new();
                let mut name = None;
                for (key, value) in url.query_pairs() {
                    match key.as_ref() {
                        "file" => file = value.into_owned(),
                        "name" => name = Some(value.into_owned()),
                        _ => {}
                    }
                }
                Route::PdfViewer {
                    file,
                    name: name
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| config::DEFAULT_PDF_NAME.to_string()),
                }
            }
            other => return Err(AppError::NotFound(format!("No route for {}", other))),
        };

        Ok(route)
    }
}
