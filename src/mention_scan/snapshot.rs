// src/mention_scan/snapshot.rs
//! Element handles backed by a captured HTML page.
//!
//! A snapshot cannot re-render, so triggering an affordance is recorded
//! instead: a triggered element reports `aria-expanded="true"` and is no
//! longer visible, which is what a live page shows once "see more" is clicked.

use super::dom::{DomError, Element};
use super::session::Browser;
use crate::utils::{clean_lines, clean_text};
use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct HtmlSnapshot {
    html: Html,
    source: String,
    // Node addresses inside `html`; the tree is never mutated after parsing.
    triggered: RefCell<HashSet<usize>>,
}

impl HtmlSnapshot {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
            source: source.to_string(),
            triggered: RefCell::new(HashSet::new()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> SnapshotElement<'_> {
        SnapshotElement {
            snapshot: self,
            node: self.html.root_element(),
        }
    }

    pub fn triggered_count(&self) -> usize {
        self.triggered.borrow().len()
    }
}

#[derive(Clone, Copy)]
pub struct SnapshotElement<'a> {
    snapshot: &'a HtmlSnapshot,
    node: ElementRef<'a>,
}

impl<'a> SnapshotElement<'a> {
    fn key(&self) -> usize {
        self.node.value() as *const scraper::node::Element as usize
    }

    fn is_triggered(&self) -> bool {
        self.snapshot.triggered.borrow().contains(&self.key())
    }

    pub fn tag_name(&self) -> &str {
        self.node.value().name()
    }

    fn hides_itself(node: &ElementRef<'_>) -> bool {
        let element = node.value();
        if element.attr("hidden").is_some() {
            return true;
        }
        if element.attr("aria-hidden") == Some("true") {
            return true;
        }
        element
            .attr("style")
            .map(|style| {
                let style: String = style
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_lowercase();
                style.contains("display:none") || style.contains("visibility:hidden")
            })
            .unwrap_or(false)
    }
}

impl<'a> Element for SnapshotElement<'a> {
    fn query(&self, selector: &str) -> Result<Vec<Self>, DomError> {
        let parsed = Selector::parse(selector)
            .map_err(|_| DomError::InvalidSelector(selector.to_string()))?;

        Ok(self
            .node
            .select(&parsed)
            .map(|node| SnapshotElement {
                snapshot: self.snapshot,
                node,
            })
            .collect())
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, DomError> {
        if name == "aria-expanded" && self.is_triggered() {
            return Ok(Some("true".to_string()));
        }
        Ok(self.node.value().attr(name).map(str::to_string))
    }

    fn text(&self) -> Result<String, DomError> {
        let mut rendered = String::new();
        render_text(self.node, &mut rendered);
        Ok(clean_lines(&rendered))
    }

    fn own_text(&self) -> Result<String, DomError> {
        let own: String = self
            .node
            .children()
            .filter_map(|child| child.value().as_text().map(|text| &**text))
            .collect();
        Ok(clean_text(&own))
    }

    fn is_visible(&self) -> Result<bool, DomError> {
        if self.is_triggered() || Self::hides_itself(&self.node) {
            return Ok(false);
        }
        let hidden_ancestor = self
            .node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| Self::hides_itself(&ancestor));
        Ok(!hidden_ancestor)
    }

    fn is_enabled(&self) -> Result<bool, DomError> {
        let element = self.node.value();
        Ok(element.attr("disabled").is_none() && element.attr("aria-disabled") != Some("true"))
    }

    fn trigger(&self) -> Result<(), DomError> {
        self.snapshot.triggered.borrow_mut().insert(self.key());
        Ok(())
    }
}

/// Elements that start and end a line when rendered.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Never rendered.
const SKIPPED_TAGS: &[&str] = &["script", "style", "template", "noscript"];

/// Append the text under `node` the way a browser lays it out: inline
/// children run together, source whitespace is a plain space, and block
/// children and `<br>` break the line.
fn render_text(node: ElementRef<'_>, out: &mut String) {
    for child in node.children() {
        if let Some(text) = child.value().as_text() {
            out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            continue;
        }
        let Some(element) = ElementRef::wrap(child) else {
            continue;
        };
        let name = element.value().name();
        if name == "br" {
            out.push('\n');
        } else if SKIPPED_TAGS.contains(&name) {
            continue;
        } else if BLOCK_TAGS.contains(&name) {
            out.push('\n');
            render_text(element, out);
            out.push('\n');
        } else {
            render_text(element, out);
        }
    }
}

/// A `Browser` replaying pages captured from a logged-in session: the files
/// of a directory, in name order, stand for the feed after each scroll.
pub struct SnapshotBrowser {
    pages: Vec<PathBuf>,
    position: usize,
    current: Option<HtmlSnapshot>,
    current_url: String,
    closed: bool,
}

impl SnapshotBrowser {
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read snapshot directory: {}", dir.display()))?;

        let mut pages = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let is_html = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_lowercase().as_str(), "html" | "htm"))
                .unwrap_or(false);
            if path.is_file() && is_html {
                pages.push(path);
            }
        }
        pages.sort();

        if pages.is_empty() {
            anyhow::bail!("No .html snapshots found in {}", dir.display());
        }

        info!("Loaded {} page snapshots from {}", pages.len(), dir.display());
        Self::from_pages(pages)
    }

    pub fn from_pages(pages: Vec<PathBuf>) -> Result<Self> {
        if pages.is_empty() {
            anyhow::bail!("At least one page snapshot is required");
        }
        Ok(Self {
            pages,
            position: 0,
            current: None,
            current_url: "about:blank".to_string(),
            closed: false,
        })
    }

    fn load(&mut self, position: usize) -> Result<(), DomError> {
        let path = &self.pages[position];
        let source = std::fs::read_to_string(path)
            .map_err(|e| DomError::Unreachable(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded snapshot {}", path.display());
        self.current = Some(HtmlSnapshot::parse(&source));
        self.position = position;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), DomError> {
        if self.closed {
            return Err(DomError::Driver("browser session already closed".to_string()));
        }
        Ok(())
    }

    fn snapshot(&self) -> Result<&HtmlSnapshot, DomError> {
        self.ensure_open()?;
        self.current
            .as_ref()
            .ok_or_else(|| DomError::Unreachable("no page loaded".to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Browser for SnapshotBrowser {
    type Element<'a> = SnapshotElement<'a>;

    fn open(&mut self, url: &str) -> Result<(), DomError> {
        self.ensure_open()?;
        self.current_url = url.to_string();
        self.load(0)
    }

    fn current_url(&self) -> Result<String, DomError> {
        self.ensure_open()?;
        Ok(self.current_url.clone())
    }

    fn page_source(&self) -> Result<String, DomError> {
        Ok(self.snapshot()?.source().to_string())
    }

    fn scroll_to_bottom(&mut self) -> Result<(), DomError> {
        self.ensure_open()?;
        let next = (self.position + 1).min(self.pages.len() - 1);
        if next != self.position || self.current.is_none() {
            self.load(next)?;
        }
        Ok(())
    }

    fn document(&self) -> Result<SnapshotElement<'_>, DomError> {
        Ok(self.snapshot()?.root())
    }

    fn close(&mut self) -> Result<(), DomError> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}
