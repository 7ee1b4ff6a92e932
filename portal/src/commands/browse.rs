//! Student-facing commands
//!
//! Grade and subject listings, the materials page, announcements, the
//! calendar and route resolution.

use super::{render, OutputFormat};
use crate::app::AppState;
use crate::catalog::Grade;
use crate::config;
use crate::database::{Announcement, Material};
use crate::error::Result;
use crate::routes::Route;
use crate::services::calendar::CalendarView;
use crate::services::materials::{material_link, BrowserView};
use serde::Serialize;
use std::fmt::Write;

/// List the three grades
pub fn list_grades(format: OutputFormat) -> Result<String> {
    render(format, &Grade::ALL, |grades| {
        grades
            .iter()
            .map(|g| format!("{} Grade", g))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// List the subjects taught in a grade
pub fn list_subjects(state: &AppState, grade: Grade, format: OutputFormat) -> Result<String> {
    let browser = state.browser();
    browser.select_grade(grade);
    let view = browser.view();

    render(format, &view, |view| {
        let mut out = format!("{}\n", view.title);
        for subject in &view.subjects {
            let _ = writeln!(out, "  {}", subject);
        }
        out.trim_end().to_string()
    })
}

/// Show the materials page for one subject
pub async fn list_materials(
    state: &AppState,
    grade: Grade,
    subject: &str,
    format: OutputFormat,
) -> Result<String> {
    let browser = state.browser();
    browser.select_grade(grade);
    browser.select_subject(subject).await?;
    let view = browser.view();

    render(format, &view, render_materials)
}

fn render_material_line(out: &mut String, material: &Material) {
    let _ = writeln!(
        out,
        "  - {} ({})\n    {}",
        material.file_name,
        material.uploaded_at.format("%Y-%m-%d"),
        material_link(material)
    );
}

fn render_materials(view: &BrowserView) -> String {
    let mut out = format!("{}\n{}\n", view.breadcrumb.join(" / "), view.title);

    if let Some(message) = view.empty_message {
        out.push_str(message);
        return out;
    }

    if !view.groups.pdfs.is_empty() {
        out.push_str("\nPDF Documents\n");
        for material in &view.groups.pdfs {
            render_material_line(&mut out, material);
        }
    }

    if !view.groups.images.is_empty() {
        out.push_str("\nImages\n");
        for material in &view.groups.images {
            render_material_line(&mut out, material);
        }
    }

    out.trim_end().to_string()
}

/// Show the announcements feed
pub async fn list_announcements(state: &AppState, format: OutputFormat) -> Result<String> {
    let service = state.announcements();
    let feed = service.load().await;

    render(format, &feed, |feed| render_announcements(&feed.data))
}

fn render_announcements(announcements: &[Announcement]) -> String {
    if announcements.is_empty() {
        return config::EMPTY_ANNOUNCEMENTS_MESSAGE.to_string();
    }

    let mut out = String::new();
    for announcement in announcements {
        let _ = writeln!(
            out,
            "{} ({})\n  {}\n",
            announcement.title,
            announcement.created_at.format("%B %-d, %Y"),
            announcement.message
        );
    }
    out.trim_end().to_string()
}

/// Show the calendar for a grade
pub async fn show_calendar(state: &AppState, grade: Grade, format: OutputFormat) -> Result<String> {
    let service = state.calendar();
    let view = service.select_grade(grade).await;

    render(format, &view, render_calendar)
}

fn render_calendar(view: &CalendarView) -> String {
    let mut out = format!("{} Grade Calendar\n", view.grade);

    if let Some(url) = &view.image_url {
        let _ = writeln!(out, "Calendar image: {}", url);
    }

    if let Some(message) = &view.empty_message {
        out.push_str(message);
        return out;
    }

    for event in &view.events {
        let _ = writeln!(
            out,
            "  {}  {}",
            event.event_date.format("%A, %B %-d, %Y"),
            event.event_title
        );
    }
    out.trim_end().to_string()
}

#[derive(Debug, Serialize)]
struct ResolvedRoute {
    label: &'static str,
    link: String,
    #[serde(flatten)]
    route: Route,
    embed_url: Option<String>,
}

/// Parse a path and show the normalized route
pub fn resolve_route(path: &str, format: OutputFormat) -> Result<String> {
    let route: Route = path.parse()?;
    let resolved = ResolvedRoute {
        label: route.label(),
        link: route.to_string(),
        embed_url: route.embed_url(),
        route,
    };

    render(format, &resolved, |r| {
        let mut out = format!("{}: {}", r.label, r.link);
        match (&r.route, &r.embed_url) {
            (Route::PdfViewer { name, .. }, Some(embed)) => {
                let _ = write!(out, "\n  {} -> {}", name, embed);
            }
            (Route::PdfViewer { .. }, None) => out.push_str("\n  No PDF Selected"),
            _ => {}
        }
        out
    })
}
