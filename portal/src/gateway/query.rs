//! Gateway request descriptions
//!
//! Backend-neutral descriptions of table queries and storage calls. Both
//! gateway backends translate these into their own wire format.

use crate::config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tables exposed by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Announcements,
    CalendarEvents,
    Materials,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Announcements => config::ANNOUNCEMENTS_TABLE,
            Table::CalendarEvents => config::CALENDAR_EVENTS_TABLE,
            Table::Materials => config::MATERIALS_TABLE,
        }
    }

    /// Every column of the table, in schema order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Announcements => &["id", "title", "message", "created_at"],
            Table::CalendarEvents => &["id", "grade", "event_title", "event_date", "created_at"],
            Table::Materials => &[
                "id",
                "grade",
                "subject",
                "file_name",
                "file_url",
                "file_type",
                "uploaded_by",
                "uploaded_at",
            ],
        }
    }

    /// Column the gateway stamps with the insertion time
    pub fn timestamp_column(&self) -> &'static str {
        match self {
            Table::Materials => "uploaded_at",
            Table::Announcements | Table::CalendarEvents => "created_at",
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }
}

/// Equality filter on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

/// Sort order applied to a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A row query: equality filters, optional ordering, optional limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl TableQuery {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Value of the equality filter on `column`, if any
    pub fn filter_value(&self, column: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| f.column == column)
            .map(|f| f.value.as_str())
    }
}

/// Options sent with an object upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Cache lifetime in seconds
    pub cache_control: u32,
    /// Overwrite an existing object at the same path
    pub upsert: bool,
    pub content_type: String,
}

impl UploadOptions {
    /// Non-overwriting upload with the default cache lifetime
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            cache_control: config::DEFAULT_CACHE_CONTROL_SECONDS,
            upsert: false,
            content_type: content_type.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Column an object listing is sorted by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub column: String,
    pub order: SortDirection,
}

/// Options for listing objects under a prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: usize,
    pub sort_by: SortBy,
}

impl ListOptions {
    /// The single most recently created object
    pub fn newest() -> Self {
        Self {
            limit: 1,
            sort_by: SortBy {
                column: "created_at".to_string(),
                order: SortDirection::Desc,
            },
        }
    }
}

/// An entry returned by an object listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Name relative to the listed prefix
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = TableQuery::from(Table::Materials)
            .eq("grade", "10th")
            .eq("subject", "Math")
            .order("uploaded_at", false);

        assert_eq!(query.filter_value("grade"), Some("10th"));
        assert_eq!(query.filter_value("subject"), Some("Math"));
        assert_eq!(query.filter_value("id"), None);
        assert_eq!(
            query.order,
            Some(Order {
                column: "uploaded_at".to_string(),
                ascending: false
            })
        );
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_table_columns() {
        assert!(Table::Materials.has_column("file_url"));
        assert!(!Table::Materials.has_column("created_at"));
        assert_eq!(Table::Materials.timestamp_column(), "uploaded_at");
        assert_eq!(Table::CalendarEvents.timestamp_column(), "created_at");
        assert_eq!(Table::Announcements.name(), "announcements");
    }

    #[test]
    fn test_upload_options_never_overwrite_by_default() {
        let opts = UploadOptions::new("application/pdf");
        assert!(!opts.upsert);
        assert_eq!(opts.cache_control, 3600);
    }
}
