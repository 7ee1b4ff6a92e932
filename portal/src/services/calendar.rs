//! Calendar service
//!
//! Per-grade calendar: events in date order plus the grade's most recent
//! calendar image, and admin publishing of new events.

use crate::access::{Role, StaffCapability};
use crate::catalog::{FileType, Grade};
use crate::database::{CalendarEvent, CalendarImage, NewCalendarEvent};
use crate::error::{AppError, Result};
use crate::fetcher::{ContentFetcher, FetchStatus, ResetPolicy};
use crate::gateway::{
    insert_record, select_records, Gateway, ListOptions, Table, TableQuery, UploadOptions,
};
use crate::services::uploads::{generate_object_name, LocalFile};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

/// Events for a grade, earliest first
pub fn events_query(grade: Grade) -> TableQuery {
    TableQuery::from(Table::CalendarEvents)
        .eq("grade", grade.as_str())
        .order("event_date", true)
}

/// Parse a `YYYY-MM-DD` event date
pub fn parse_event_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Event date must be YYYY-MM-DD, got {}", value)))
}

/// The newest image in a grade's folder, if any
pub async fn latest_image<G: Gateway>(
    gateway: &G,
    bucket: &str,
    grade: Grade,
) -> Result<Option<CalendarImage>> {
    let objects = gateway
        .list(bucket, grade.as_str(), &ListOptions::newest())
        .await?;

    Ok(objects.into_iter().next().map(|object| {
        let path = format!("{}/{}", grade, object.name);
        CalendarImage {
            grade,
            url: gateway.public_url(bucket, &path),
            path,
        }
    }))
}

/// Rendered calendar page
#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    pub grade: Grade,
    pub loading: bool,
    pub events: Vec<CalendarEvent>,
    pub status: FetchStatus,
    pub image_url: Option<String>,
    pub empty_message: Option<String>,
}

/// Result of publishing an event
#[derive(Debug, Clone, Serialize)]
pub struct PublishedEvent {
    pub event: CalendarEvent,
    pub image_url: Option<String>,
    /// Why the optional image could not be stored; the event exists anyway
    pub image_error: Option<String>,
}

/// Calendar page state and event publisher
pub struct CalendarService<G> {
    gateway: G,
    bucket: String,
    grade: Mutex<Grade>,
    events: ContentFetcher<Grade, CalendarEvent>,
    image: ContentFetcher<Grade, CalendarImage>,
}

impl<G: Gateway> CalendarService<G> {
    pub fn new(gateway: G, bucket: impl Into<String>) -> Self {
        Self {
            gateway,
            bucket: bucket.into(),
            grade: Mutex::new(Grade::Tenth),
            events: ContentFetcher::new("calendar events", ResetPolicy::Clear),
            image: ContentFetcher::new("calendar image", ResetPolicy::Keep),
        }
    }

    fn grade_lock(&self) -> MutexGuard<'_, Grade> {
        self.grade.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn selected_grade(&self) -> Grade {
        *self.grade_lock()
    }

    /// Switch the grade tab and load its events and image
    pub async fn select_grade(&self, grade: Grade) -> CalendarView {
        *self.grade_lock() = grade;
        self.load().await
    }

    /// Load events and image for the selected grade
    pub async fn load(&self) -> CalendarView {
        let grade = self.selected_grade();
        tokio::join!(self.load_events(grade), self.load_image(grade));
        self.view()
    }

    async fn load_events(&self, grade: Grade) {
        let gateway = &self.gateway;
        self.events
            .fetch(grade, |grade| async move {
                select_records(gateway, &events_query(grade)).await
            })
            .await;
    }

    async fn load_image(&self, grade: Grade) {
        let gateway = &self.gateway;
        let bucket = self.bucket.as_str();
        self.image
            .fetch(grade, |grade| async move {
                match latest_image(gateway, bucket, grade).await {
                    Ok(image) => Ok(image.into_iter().collect()),
                    Err(e) => {
                        tracing::warn!("No calendar image for {}: {}", grade, e);
                        Ok(Vec::new())
                    }
                }
            })
            .await;
    }

    pub fn view(&self) -> CalendarView {
        let grade = self.selected_grade();
        let events = self.events.snapshot();
        let image = self.image.snapshot();

        let empty_message = (!events.loading && events.data.is_empty()).then(|| {
            format!(
                "No calendar events available for {} grade at this time.",
                grade
            )
        });

        CalendarView {
            grade,
            loading: events.loading || image.loading,
            events: events.data,
            status: events.status,
            image_url: image.data.first().map(|i| i.url.clone()),
            empty_message,
        }
    }

    /// Create an event, optionally storing a calendar image first (admin only).
    ///
    /// The event is inserted even when the image upload fails; the failure is
    /// reported in `image_error`.
    pub async fn publish_event(
        &self,
        staff: &StaffCapability,
        grade: Grade,
        title: &str,
        event_date: NaiveDate,
        image: Option<&LocalFile>,
    ) -> Result<PublishedEvent> {
        staff.require(&[Role::Admin])?;

        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Event title is required".to_string()));
        }

        if let Some(file) = image {
            if !FileType::Image.accepts_mime(&file.mime_type) {
                return Err(AppError::Validation(
                    FileType::Image.mismatch_message().to_string(),
                ));
            }
        }

        let mut stored_path = None;
        let mut image_url = None;
        let mut image_error = None;

        if let Some(file) = image {
            let path = format!("{}/{}", grade, generate_object_name(&file.name));
            let options = UploadOptions::new(file.mime_type.clone());

            match self
                .gateway
                .upload(&self.bucket, &path, &file.data, &options)
                .await
            {
                Ok(()) => {
                    image_url = Some(self.gateway.public_url(&self.bucket, &path));
                    stored_path = Some(path);
                }
                Err(e) => {
                    tracing::warn!("Calendar image upload failed for {}: {}", grade, e);
                    image_error = Some(e.to_string());
                }
            }
        }

        let new_event = NewCalendarEvent {
            grade,
            event_title: title.to_string(),
            event_date,
        };

        let event: CalendarEvent = match insert_record(&self.gateway, &new_event).await {
            Ok(event) => event,
            Err(e) => {
                if let Some(path) = stored_path {
                    tracing::warn!("Event insert failed, removing image {}: {}", path, e);
                    if let Err(remove_err) = self.gateway.remove(&self.bucket, &path).await {
                        tracing::error!(
                            "Orphaned object {}/{} left in storage: {}",
                            self.bucket,
                            path,
                            remove_err
                        );
                    }
                }
                return Err(e);
            }
        };

        tracing::info!("Calendar event created: {} ({})", event.id, grade);

        Ok(PublishedEvent {
            event,
            image_url,
            image_error,
        })
    }
}
