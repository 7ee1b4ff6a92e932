//! Staff portal commands
//!
//! Teacher uploads and admin publishing. Each command verifies credentials
//! first and passes the resulting capability to the service.

use super::{render, OutputFormat};
use crate::access::{hash_password, Role};
use crate::app::AppState;
use crate::catalog::{FileType, Grade};
use crate::config;
use crate::database::Material;
use crate::error::Result;
use crate::services::calendar::parse_event_date;
use crate::services::materials::material_link;
use crate::services::uploads::{LocalFile, UploadModal};
use serde::Serialize;
use std::path::Path;

/// Admin login fields
#[derive(Debug, Clone)]
pub struct AdminLogin {
    pub username: String,
    pub password: String,
}

/// A material upload as entered in the teacher portal
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub grade: Grade,
    pub subject: &'a str,
    pub file_type: FileType,
    pub file: &'a Path,
    pub mime_type: Option<&'a str>,
    pub password: &'a str,
}

/// A finished upload and the size of the refreshed subject list
#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    #[serde(flatten)]
    pub material: Material,
    pub materials_listed: usize,
}

/// Upload a material through the teacher upload dialog
pub async fn upload_material(
    state: &AppState,
    request: UploadRequest<'_>,
    format: OutputFormat,
) -> Result<String> {
    let staff = state.verifier.verify_teacher(request.password)?;
    let file = LocalFile::read(request.file, request.mime_type).await?;

    let browser = state.browser();
    browser.select_grade(request.grade);
    browser.select_subject(request.subject).await?;

    let modal = UploadModal::new(state.uploader(), state.settings.ui.upload_success_delay());
    modal.open(request.grade, request.subject)?;
    modal.set_file_type(request.file_type);
    modal.select_file(file)?;

    let material = modal
        .submit(&staff, |material| {
            tracing::info!(
                "Upload complete for {} {}",
                material.grade,
                material.subject
            );
        })
        .await?;

    browser.refresh().await;
    let outcome = UploadOutcome {
        material,
        materials_listed: browser.materials().data.len(),
    };

    render(format, &outcome, |o| {
        let m = &o.material;
        format!(
            "File uploaded successfully!\n  {} ({}) -> {} / {}\n  {}\n  {} materials listed for this subject",
            m.file_name,
            m.file_type,
            m.grade,
            m.subject,
            material_link(m),
            o.materials_listed
        )
    })
}

/// Publish an announcement from the admin dashboard
pub async fn publish_announcement(
    state: &AppState,
    login: &AdminLogin,
    title: &str,
    message: &str,
    format: OutputFormat,
) -> Result<String> {
    let staff = state.verifier.verify_admin(&login.username, &login.password)?;
    let announcement = state
        .announcements()
        .publish(&staff, title, message)
        .await?;

    render(format, &announcement, |a| {
        format!("{}\n  {}", config::ANNOUNCEMENT_CREATED_MESSAGE, a.title)
    })
}

/// Add a calendar event, optionally with a calendar image
pub async fn add_calendar_event(
    state: &AppState,
    login: &AdminLogin,
    grade: Grade,
    title: &str,
    date: &str,
    image: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let staff = state.verifier.verify_admin(&login.username, &login.password)?;
    let event_date = parse_event_date(date)?;

    let image = match image {
        Some(path) => Some(LocalFile::read(path, None).await?),
        None => None,
    };

    let published = state
        .calendar()
        .publish_event(&staff, grade, title, event_date, image.as_ref())
        .await?;

    render(format, &published, |p| {
        let mut out = format!(
            "{}\n  {} on {} ({} grade)",
            config::EVENT_CREATED_MESSAGE,
            p.event.event_title,
            p.event.event_date,
            p.event.grade
        );
        if let Some(url) = &p.image_url {
            out.push_str(&format!("\n  Calendar image: {}", url));
        }
        if let Some(error) = &p.image_error {
            out.push_str(&format!("\n  Calendar image was not saved: {}", error));
        }
        out
    })
}

/// Produce an Argon2id hash for the settings file
pub fn hash_password_command(password: &str) -> Result<String> {
    hash_password(password)
}

/// Store a new staff password hash in the settings file
///
/// For the admin account `username` also renames the login; it is ignored
/// for the shared teacher password.
pub async fn set_staff_password(
    state: &AppState,
    role: Role,
    username: Option<&str>,
    password: &str,
) -> Result<String> {
    let hash = hash_password(password)?;
    let username = username.map(str::trim).filter(|u| !u.is_empty());

    let staff = state
        .settings_service
        .update_staff(|staff| match role {
            Role::Admin => {
                if let Some(username) = username {
                    staff.admin_username = username.to_string();
                }
                staff.admin_password_hash = Some(hash);
            }
            Role::Teacher => staff.teacher_password_hash = Some(hash),
        })
        .await?;

    tracing::info!("Updated {} password", role);

    Ok(match role {
        Role::Admin => format!(
            "Admin password updated for {} in {}",
            staff.admin_username,
            state.settings_service.path().display()
        ),
        Role::Teacher => format!(
            "Teacher password updated in {}",
            state.settings_service.path().display()
        ),
    })
}
