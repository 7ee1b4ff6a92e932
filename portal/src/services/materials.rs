//! Materials browser
//!
//! Student-facing drill-down: grade list, subject list, then the materials
//! uploaded for that subject split into PDF documents and images.

use crate::catalog::{FileType, Grade};
use crate::config;
use crate::database::Material;
use crate::error::Result;
use crate::fetcher::{ContentFetcher, FetchState, FetchStatus, ResetPolicy};
use crate::gateway::{select_records, Gateway, Table, TableQuery};
use crate::navigation::{NavState, Navigator};
use crate::routes::Route;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

/// Filter key of a materials list
pub type MaterialKey = (Grade, &'static str);

/// Query for one subject's materials, newest first
pub fn materials_query(grade: Grade, subject: &str) -> TableQuery {
    TableQuery::from(Table::Materials)
        .eq("grade", grade.as_str())
        .eq("subject", subject)
        .order("uploaded_at", false)
}

/// Fetch one subject's materials
pub async fn fetch_materials<G: Gateway>(
    gateway: &G,
    grade: Grade,
    subject: &str,
) -> Result<Vec<Material>> {
    select_records(gateway, &materials_query(grade, subject)).await
}

/// Materials split by how they are displayed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterialGroups {
    pub pdfs: Vec<Material>,
    pub images: Vec<Material>,
}

impl MaterialGroups {
    /// Partition preserving order; unsupported types land in neither group
    pub fn partition(materials: &[Material]) -> Self {
        let mut groups = Self::default();
        for material in materials {
            match material.file_type {
                FileType::Pdf => groups.pdfs.push(material.clone()),
                FileType::Image => groups.images.push(material.clone()),
                FileType::Unsupported => {
                    tracing::debug!("Skipping material {} with unsupported type", material.id)
                }
            }
        }
        groups
    }

    pub fn is_empty(&self) -> bool {
        self.pdfs.is_empty() && self.images.is_empty()
    }
}

/// Where a material opens: pdfs in the viewer, images directly
pub fn material_link(material: &Material) -> String {
    match material.file_type {
        FileType::Pdf => Route::pdf_viewer(&material.file_url, &material.file_name).to_string(),
        FileType::Image | FileType::Unsupported => material.file_url.clone(),
    }
}

/// Everything needed to render the browser's current page
#[derive(Debug, Clone, Serialize)]
pub struct BrowserView {
    pub nav: NavState,
    pub title: String,
    pub breadcrumb: Vec<String>,
    pub subjects: Vec<&'static str>,
    pub loading: bool,
    pub groups: MaterialGroups,
    pub status: FetchStatus,
    pub empty_message: Option<&'static str>,
}

/// Drill-down browser over a gateway
pub struct MaterialsBrowser<G> {
    gateway: G,
    nav: Mutex<Navigator>,
    materials: ContentFetcher<MaterialKey, Material>,
}

impl<G: Gateway> MaterialsBrowser<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            nav: Mutex::new(Navigator::new()),
            materials: ContentFetcher::new("materials", ResetPolicy::Clear),
        }
    }

    fn nav(&self) -> MutexGuard<'_, Navigator> {
        self.nav.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> NavState {
        self.nav().state()
    }

    pub fn select_grade(&self, grade: Grade) -> NavState {
        let state = self.nav().select_grade(grade);
        self.materials.clear();
        state
    }

    /// Open a subject and load its materials.
    ///
    /// Only navigation errors are returned; a failed load shows as an empty
    /// list with `FetchStatus::Failed`.
    pub async fn select_subject(&self, subject: &str) -> Result<NavState> {
        let state = self.nav().select_subject(subject)?;
        self.load_current(state).await;
        Ok(state)
    }

    /// Reload the current subject, e.g. after an upload
    pub async fn refresh(&self) {
        let state = self.state();
        self.load_current(state).await;
    }

    async fn load_current(&self, state: NavState) {
        let NavState::Materials { grade, subject } = state else {
            return;
        };

        let gateway = &self.gateway;
        self.materials
            .fetch((grade, subject), |(grade, subject)| async move {
                fetch_materials(gateway, grade, subject).await
            })
            .await;
    }

    pub fn back(&self) -> bool {
        let moved = self.nav().back();
        if moved {
            self.materials.clear();
        }
        moved
    }

    pub fn reset(&self) {
        self.nav().reset();
        self.materials.clear();
    }

    pub fn materials(&self) -> FetchState<Material> {
        self.materials.snapshot()
    }

    pub fn groups(&self) -> MaterialGroups {
        MaterialGroups::partition(&self.materials.snapshot().data)
    }

    pub fn view(&self) -> BrowserView {
        let nav = self.state();
        let fetched = self.materials.snapshot();
        let groups = MaterialGroups::partition(&fetched.data);

        let subjects = match nav {
            NavState::Subjects { grade } => grade.subjects().to_vec(),
            _ => Vec::new(),
        };

        let empty_message = match nav {
            NavState::Materials { .. } if !fetched.loading && groups.is_empty() => {
                Some(config::EMPTY_MATERIALS_MESSAGE)
            }
            _ => None,
        };

        BrowserView {
            nav,
            title: nav.title(),
            breadcrumb: nav.breadcrumb(),
            subjects,
            loading: fetched.loading,
            groups,
            status: fetched.status,
            empty_message,
        }
    }
}
