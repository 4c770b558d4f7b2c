//! Extracted announcement documents.
//!
//! Text and tables are produced upstream by the PDF extraction step; this
//! module only models them and derives the publication date and title from
//! the filename (`YYYY-MM-DD_<title>.<ext>`).

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::disambiguate::normalize_width;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("filename '{0}' does not start with a YYYY-MM-DD publication date")]
    InvalidFilename(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A table as handed over by the extraction step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTable {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

/// On-disk body of an extracted document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocumentBody {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tables: Vec<DocumentTable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub filename: String,
    pub published: NaiveDate,
    pub title: String,
    pub text: String,
    pub tables: Vec<DocumentTable>,
}

impl Document {
    pub fn new(
        filename: &str,
        text: impl Into<String>,
        tables: Vec<DocumentTable>,
    ) -> Result<Self, DocumentError> {
        let (published, title) = parse_filename(filename)?;
        Ok(Self {
            filename: file_name(filename).to_string(),
            published,
            title,
            text: text.into(),
            tables,
        })
    }

    pub fn from_json(filename: &str, json: &str) -> Result<Self, DocumentError> {
        let body: DocumentBody = serde_json::from_str(json)?;
        Self::new(filename, body.text, body.tables)
    }
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Split a filename into its publication date and normalized title fragment.
pub fn parse_filename(filename: &str) -> Result<(NaiveDate, String), DocumentError> {
    let invalid = || DocumentError::InvalidFilename(filename.to_string());
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(invalid)?;

    let date_part = stem.get(..10).ok_or_else(invalid)?;
    let published = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| invalid())?;
    let title = normalize_width(&stem[10..])
        .trim_start_matches(['_', '-', ' '])
        .trim()
        .to_string();
    Ok((published, title))
}
