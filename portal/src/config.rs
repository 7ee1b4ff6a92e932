//! Application configuration constants
//!
//! Central location for table and bucket names, upload defaults
//! and display timings used throughout the application.

// ===== Gateway Tables =====

/// Table holding school-wide announcements
pub const ANNOUNCEMENTS_TABLE: &str = "announcements";
/// Table holding per-grade calendar events
pub const CALENDAR_EVENTS_TABLE: &str = "calendar_events";
/// Table holding uploaded material metadata
pub const MATERIALS_TABLE: &str = "materials";

// ===== Object Storage =====

/// Default bucket for study materials, laid out as `{grade}/{subject}/{file}`
pub const DEFAULT_MATERIALS_BUCKET: &str = "materials";
/// Default bucket for calendar images, laid out as `{grade}/{file}`
pub const DEFAULT_CALENDAR_BUCKET: &str = "calendar_images";

/// Cache lifetime sent with every upload, in seconds
pub const DEFAULT_CACHE_CONTROL_SECONDS: u32 = 3600;

/// Length of the random token appended to generated object names
pub const OBJECT_NAME_TOKEN_LEN: usize = 6;

/// Maximum length kept from an original file name
pub const MAX_FILE_NAME_LEN: usize = 255;

// ===== Network =====

/// Default timeout for a single gateway request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ===== Display Timings =====

/// How long the upload modal shows its confirmation before closing
pub const DEFAULT_UPLOAD_SUCCESS_DELAY_MS: u64 = 2_000;

// ===== Routes and Messages =====

/// Name shown by the pdf viewer when the link carries none
pub const DEFAULT_PDF_NAME: &str = "document.pdf";

/// Message rendered for empty and failed material lists alike
pub const EMPTY_MATERIALS_MESSAGE: &str = "No materials available yet.";

/// Message rendered when there are no announcements to show
pub const EMPTY_ANNOUNCEMENTS_MESSAGE: &str = "No announcements available at this time.";

/// Confirmation shown after an announcement is published
pub const ANNOUNCEMENT_CREATED_MESSAGE: &str = "Announcement created successfully!";

/// Confirmation shown after a calendar event is published
pub const EVENT_CREATED_MESSAGE: &str = "Calendar event created successfully!";
