// src/mention_scan/mod.rs
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

pub mod collector;
pub mod dom;
pub mod expander;
pub mod field_extractor;
pub mod session;
pub mod snapshot;
pub mod time_parser;

pub use collector::{find_posts, PostCollector};
pub use dom::{DomError, Element};
pub use expander::ContentExpander;
pub use field_extractor::{FieldExtractor, PostFields};
pub use session::{Browser, BrowserGuard, ScrapeSession, SessionConfig};
pub use snapshot::{HtmlSnapshot, SnapshotBrowser};
pub use time_parser::ParseFailure;

/// Column headers of the exported sheet, in order.
pub const EXPORT_COLUMNS: [&str; 5] = [
    "Post Date",
    "Post Link",
    "Time Text",
    "Post Text",
    "Emails Found",
];

/// One post that passed every filter. `link` and `raw_time_text` are never
/// empty and `date` is inside the recency window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    #[serde(rename = "Post Date")]
    pub date: NaiveDate,
    #[serde(rename = "Post Link")]
    pub link: String,
    #[serde(rename = "Time Text")]
    pub raw_time_text: String,
    #[serde(rename = "Post Text")]
    pub text: String,
    #[serde(rename = "Emails Found", serialize_with = "serialize_emails")]
    pub emails: Vec<String>,
}

impl PostRecord {
    pub fn emails_joined(&self) -> String {
        self.emails.join(", ")
    }

    /// Cell values in [`EXPORT_COLUMNS`] order.
    pub fn to_row(&self) -> [String; 5] {
        [
            self.date.format("%Y-%m-%d").to_string(),
            self.link.clone(),
            self.raw_time_text.clone(),
            self.text.clone(),
            self.emails_joined(),
        ]
    }
}

fn serialize_emails<S: Serializer>(emails: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&emails.join(", "))
}
