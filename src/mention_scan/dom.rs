// src/mention_scan/dom.rs
//! Element-handle capability the extraction pipeline is written against.
//!
//! A live browser node and a node of a captured HTML snapshot look the same to
//! the pipeline: both can be queried, read and triggered.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("Element is no longer attached to the document: {0}")]
    Stale(String),

    #[error("Document unreachable: {0}")]
    Unreachable(String),

    #[error("Browser driver error: {0}")]
    Driver(String),
}

pub trait Element: Sized {
    /// All descendants matching a CSS selector, in document order.
    fn query(&self, selector: &str) -> Result<Vec<Self>, DomError>;

    fn attribute(&self, name: &str) -> Result<Option<String>, DomError>;

    /// Rendered text: runs of whitespace collapsed inside each line, line
    /// breaks kept between block-level children.
    fn text(&self) -> Result<String, DomError>;

    /// Text of the element's direct text children only, on one line.
    fn own_text(&self) -> Result<String, DomError>;

    fn is_visible(&self) -> Result<bool, DomError>;

    fn is_enabled(&self) -> Result<bool, DomError>;

    /// Activate the element programmatically, without scrolling it into view
    /// or checking for occlusion.
    fn trigger(&self) -> Result<(), DomError>;
}
