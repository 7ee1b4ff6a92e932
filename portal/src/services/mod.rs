//! Services module
//!
//! Business logic services that coordinate between commands and the gateway.

pub mod announcements;
pub mod calendar;
pub mod materials;
pub mod settings;
pub mod uploads;

pub use announcements::AnnouncementsService;
pub use calendar::CalendarService;
pub use materials::{MaterialGroups, MaterialsBrowser};
pub use settings::{AppSettings, SettingsService, StaffCredentials};
pub use uploads::{LocalFile, MaterialUploader, UploadModal, UploadPhase};
