//! Static school catalog
//!
//! Grades and the subjects offered in each grade. This table is the single
//! source of truth for both the student subject browser and teacher uploads.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three grades the school serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "10th")]
    Tenth,
    #[serde(rename = "11th")]
    Eleventh,
    #[serde(rename = "12th")]
    Twelfth,
}

impl Grade {
    /// All grades in display order
    pub const ALL: [Grade; 3] = [Grade::Tenth, Grade::Eleventh, Grade::Twelfth];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Tenth => "10th",
            Grade::Eleventh => "11th",
            Grade::Twelfth => "12th",
        }
    }

    /// Subjects offered in this grade
    pub fn subjects(&self) -> &'static [&'static str] {
        match self {
            Grade::Tenth => TENTH_SUBJECTS,
            Grade::Eleventh => ELEVENTH_SUBJECTS,
            Grade::Twelfth => TWELFTH_SUBJECTS,
        }
    }

    /// Look up a subject by exact name, returning the catalog's own string
    pub fn subject(&self, name: &str) -> Option<&'static str> {
        self.subjects().iter().copied().find(|s| *s == name)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "10th" | "10" => Ok(Grade::Tenth),
            "11th" | "11" => Ok(Grade::Eleventh),
            "12th" | "12" => Ok(Grade::Twelfth),
            other => Err(AppError::Validation(format!("Unknown grade: {}", other))),
        }
    }
}

const TENTH_SUBJECTS: &[&str] = &[
    "Math",
    "Physics",
    "Science",
    "Arabic",
    "French",
    "English",
    "Technology",
    "History & Geography",
    "Islamic Education",
];

const ELEVENTH_SUBJECTS: &[&str] = &[
    "Math",
    "Physics",
    "Science",
    "Arabic",
    "French",
    "English",
    "History & Geography",
    "Islamic Education",
];

const TWELFTH_SUBJECTS: &[&str] = &[
    "Math",
    "Physics",
    "Science",
    "Arabic",
    "French",
    "English",
    "Philosophy",
    "History & Geography",
    "Islamic Education",
];

/// Kind of file a material holds
///
/// Rows written by other clients may carry any string here; those decode to
/// `Unsupported` and are never rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Image,
    #[serde(other)]
    Unsupported,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Image => "image",
            FileType::Unsupported => "unsupported",
        }
    }

    /// Whether a MIME type is acceptable for this tag
    pub fn accepts_mime(&self, mime_type: &str) -> bool {
        let mime = mime_type.trim().to_ascii_lowercase();
        match self {
            FileType::Pdf => mime.starts_with("application/pdf"),
            FileType::Image => mime.starts_with("image/"),
            FileType::Unsupported => false,
        }
    }

    /// Inline message shown when a file does not match this tag
    pub fn mismatch_message(&self) -> &'static str {
        match self {
            FileType::Pdf => "Please select a PDF file",
            FileType::Image => "Please select an image file",
            FileType::Unsupported => "Unsupported file type",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(FileType::Pdf),
            "image" | "img" => Ok(FileType::Image),
            other => Err(AppError::Validation(format!(
                "Unknown file type: {} (expected pdf or image)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_grade_has_subjects() {
        for grade in Grade::ALL {
            assert!(!grade.subjects().is_empty(), "{} has no subjects", grade);
        }
    }

    #[test]
    fn test_grade_specific_subjects() {
        assert!(Grade::Tenth.subject("Technology").is_some());
        assert!(Grade::Eleventh.subject("Technology").is_none());
        assert!(Grade::Twelfth.subject("Technology").is_none());

        assert!(Grade::Twelfth.subject("Philosophy").is_some());
        assert!(Grade::Tenth.subject("Philosophy").is_none());

        assert_eq!(Grade::Tenth.subjects().len(), 9);
        assert_eq!(Grade::Eleventh.subjects().len(), 8);
        assert_eq!(Grade::Twelfth.subjects().len(), 9);
    }

    #[test]
    fn test_grade_serde_uses_ordinal_strings() {
        assert_eq!(serde_json::to_string(&Grade::Eleventh).unwrap(), "\"11th\"");
        let grade: Grade = serde_json::from_str("\"12th\"").unwrap();
        assert_eq!(grade, Grade::Twelfth);
        assert!(serde_json::from_str::<Grade>("\"9th\"").is_err());
    }

    #[test]
    fn test_grade_from_str() {
        assert_eq!("10th".parse::<Grade>().unwrap(), Grade::Tenth);
        assert_eq!("11".parse::<Grade>().unwrap(), Grade::Eleventh);
        assert!("13th".parse::<Grade>().is_err());
    }

    #[test]
    fn test_file_type_accepts_mime() {
        assert!(FileType::Pdf.accepts_mime("application/pdf"));
        assert!(!FileType::Pdf.accepts_mime("image/png"));
        assert!(FileType::Image.accepts_mime("image/png"));
        assert!(FileType::Image.accepts_mime("IMAGE/JPEG"));
        assert!(!FileType::Image.accepts_mime("application/pdf"));
    }

    #[test]
    fn test_unknown_file_type_decodes_as_unsupported() {
        let ft: FileType = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(ft, FileType::Unsupported);
        let ft: FileType = serde_json::from_str("\"pdf\"").unwrap();
        assert_eq!(ft, FileType::Pdf);
    }
}
