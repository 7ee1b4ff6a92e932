//! Announcements service
//!
//! School-wide announcements: the student feed (newest first) and admin
//! publishing.

use crate::access::{Role, StaffCapability};
use crate::database::{Announcement, NewAnnouncement};
use crate::error::{AppError, Result};
use crate::fetcher::{ContentFetcher, FetchState, ResetPolicy};
use crate::gateway::{insert_record, select_records, Gateway, Table, TableQuery};

/// Feed query, newest first
pub fn announcements_query() -> TableQuery {
    TableQuery::from(Table::Announcements).order("created_at", false)
}

/// Announcements feed and publisher
pub struct AnnouncementsService<G> {
    gateway: G,
    feed: ContentFetcher<(), Announcement>,
}

impl<G: Gateway> AnnouncementsService<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            feed: ContentFetcher::new("announcements", ResetPolicy::Clear),
        }
    }

    /// Load the feed; a failure leaves it empty with a failed status
    pub async fn load(&self) -> FetchState<Announcement> {
        let gateway = &self.gateway;
        self.feed
            .fetch((), |_| async move {
                select_records(gateway, &announcements_query()).await
            })
            .await;
        self.feed.snapshot()
    }

    /// Publish an announcement (admin only)
    pub async fn publish(
        &self,
        staff: &StaffCapability,
        title: &str,
        message: &str,
    ) -> Result<Announcement> {
        staff.require(&[Role::Admin])?;

        let title = title.trim();
        let message = message.trim();
        if title.is_empty() || message.is_empty() {
            return Err(AppError::Validation(
                "Title and message are required".to_string(),
            ));
        }

        tracing::info!("Publishing announcement: {}", title);

        let announcement: Announcement = insert_record(
            &self.gateway,
            &NewAnnouncement {
                title: title.to_string(),
                message: message.to_string(),
            },
        )
        .await?;

        tracing::info!("Announcement created: {}", announcement.id);
        Ok(announcement)
    }
}
