//! Stream configuration
//!
//! Options can be set in code with the `with_*` methods or picked up from the
//! environment with [`StreamOptions::from_env`]:
//!
//! - `SHEETSTREAM_METADATA_LEVEL`: `0` stores metadata parts uncompressed,
//!   `1`-`9` deflates them at that level (default `6`)
//! - `SHEETSTREAM_LARGE_SHEETS`: `1`/`true` writes sheet entries with ZIP64
//!   headers so a single sheet may exceed 4 GiB

use crate::stream::archive::EntryMethod;
use chrono::{DateTime, Utc};

pub const METADATA_LEVEL_ENV: &str = "SHEETSTREAM_METADATA_LEVEL";
pub const LARGE_SHEETS_ENV: &str = "SHEETSTREAM_LARGE_SHEETS";

const DEFAULT_METADATA_LEVEL: i64 = 6;

/// Options for how the container is written.
///
/// Sheet bodies are always stored uncompressed so rows reach the sink as they
/// are written; only the metadata parts written once at build time honour
/// `metadata_method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamOptions {
    /// Method for every non-sheet part
    pub metadata_method: EntryMethod,
    /// Write sheet entries with ZIP64 headers
    pub large_sheets: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        StreamOptions {
            metadata_method: EntryMethod::Deflated {
                level: Some(DEFAULT_METADATA_LEVEL),
            },
            large_sheets: false,
        }
    }
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata_method(mut self, method: EntryMethod) -> Self {
        self.metadata_method = method;
        self
    }

    pub fn with_large_sheets(mut self, large_sheets: bool) -> Self {
        self.large_sheets = large_sheets;
        self
    }

    /// Detect options from `SHEETSTREAM_METADATA_LEVEL` and `SHEETSTREAM_LARGE_SHEETS`
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var(METADATA_LEVEL_ENV).ok().as_deref(),
            std::env::var(LARGE_SHEETS_ENV).ok().as_deref(),
        )
    }

    fn from_values(metadata_level: Option<&str>, large_sheets: Option<&str>) -> Self {
        let mut options = Self::default();

        if let Some(raw) = metadata_level {
            match raw.trim().parse::<i64>() {
                Ok(0) => options.metadata_method = EntryMethod::Stored,
                Ok(level @ 1..=9) => {
                    options.metadata_method = EntryMethod::Deflated { level: Some(level) }
                }
                _ => log::warn!(
                    "ignoring {}={:?}: expected a level between 0 and 9",
                    METADATA_LEVEL_ENV,
                    raw
                ),
            }
        }

        if let Some(raw) = large_sheets {
            options.large_sheets = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        options
    }
}

/// Properties written to `docProps/core.xml` and `docProps/app.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentProperties {
    pub creator: String,
    pub application: String,
    /// Creation time; the generation time is used when unset
    pub created: Option<DateTime<Utc>>,
}

impl Default for DocumentProperties {
    fn default() -> Self {
        DocumentProperties {
            creator: "sheetstream".to_string(),
            application: "sheetstream".to_string(),
            created: None,
        }
    }
}

impl DocumentProperties {
    pub fn with_creator(mut self, creator: &str) -> Self {
        self.creator = creator.to_string();
        self
    }

    pub fn with_application(mut self, application: &str) -> Self {
        self.application = application.to_string();
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub(crate) fn created_or_now(&self) -> DateTime<Utc> {
        self.created.unwrap_or_else(Utc::now)
    }
}
