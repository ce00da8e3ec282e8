// src/mention_scan/field_extractor.rs
//! Best-effort lookup of the fields of one post.
//!
//! Every field has an ordered strategy list: stable structural signals
//! first, resilient text or DOM scans last. The first non-empty result wins.

use super::dom::{DomError, Element};
use tracing::debug;

pub const LINKEDIN_FEED_UPDATE_BASE: &str = "https://www.linkedin.com/feed/update/";

pub const TEXT_SELECTORS: &[&str] = &[
    ".feed-shared-text__text-view",
    ".feed-shared-update-v2__description",
    ".update-components-text",
    ".feed-shared-text",
    "[data-test-id='main-feed-activity-card'] .break-words",
];

pub const AUTHOR_SELECTORS: &[&str] = &[
    ".update-components-actor__name",
    ".feed-shared-actor__name",
    ".update-components-actor__title",
];

pub const TIME_TOKENS: &[&str] = &["ago", "h", "d", "w", "week", "day"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeStrategy {
    /// First `tag` element whose own text contains `needle`.
    InlineContaining {
        tag: &'static str,
        needle: &'static str,
    },
    /// First element matching `selector` whose text contains any token.
    TokenScan {
        selector: &'static str,
        tokens: &'static [&'static str],
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStrategy {
    /// `<base><last segment>` built from an `urn:li:activity:<id>` style
    /// attribute on the post root.
    UrnAttribute {
        attribute: &'static str,
        base: &'static str,
    },
    /// First anchor whose `href` contains `marker`.
    AnchorHref { marker: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFields {
    pub text: String,
    /// Lower-cased and trimmed; empty when the post carries no time signal.
    pub time_text: String,
    pub permalink: String,
    pub author: String,
}

#[derive(Debug, Clone)]
pub struct FieldExtractor {
    pub text: Vec<&'static str>,
    pub time: Vec<TimeStrategy>,
    pub link: Vec<LinkStrategy>,
    pub author: Vec<&'static str>,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self {
            text: TEXT_SELECTORS.to_vec(),
            time: vec![
                TimeStrategy::InlineContaining {
                    tag: "span",
                    needle: "ago",
                },
                TimeStrategy::TokenScan {
                    selector: "time, .visually-hidden",
                    tokens: TIME_TOKENS,
                },
            ],
            link: vec![
                LinkStrategy::UrnAttribute {
                    attribute: "data-urn",
                    base: LINKEDIN_FEED_UPDATE_BASE,
                },
                LinkStrategy::AnchorHref { marker: "activity" },
            ],
            author: AUTHOR_SELECTORS.to_vec(),
        }
    }
}

impl FieldExtractor {
    /// Extract all fields of `post`. Missing fields come back empty; only a
    /// failing element (detached, unreachable) is an error.
    pub fn extract<E: Element>(&self, post: &E) -> Result<PostFields, DomError> {
        Ok(PostFields {
            text: self.extract_text(post)?,
            time_text: self.extract_time_text(post)?,
            permalink: self.extract_permalink(post)?,
            author: first_text(post, &self.author)?,
        })
    }

    pub fn extract_text<E: Element>(&self, post: &E) -> Result<String, DomError> {
        first_text(post, &self.text)
    }

    pub fn extract_time_text<E: Element>(&self, post: &E) -> Result<String, DomError> {
        for strategy in &self.time {
            let found = match strategy {
                TimeStrategy::InlineContaining { tag, needle } => {
                    inline_containing(post, tag, needle)?
                }
                TimeStrategy::TokenScan { selector, tokens } => {
                    first_matching(post, selector, |text| {
                        tokens.iter().any(|token| text.contains(token))
                    })?
                }
            };
            if let Some(text) = found {
                return Ok(text);
            }
        }
        Ok(String::new())
    }

    pub fn extract_permalink<E: Element>(&self, post: &E) -> Result<String, DomError> {
        for strategy in &self.link {
            let found = match strategy {
                LinkStrategy::UrnAttribute { attribute, base } => post
                    .attribute(attribute)?
                    .and_then(|urn| urn_permalink(&urn, base)),
                LinkStrategy::AnchorHref { marker } => {
                    let mut href = None;
                    for anchor in query_or_skip(post, "a")? {
                        if let Some(candidate) = anchor.attribute("href")? {
                            if candidate.contains(marker) {
                                href = Some(candidate);
                                break;
                            }
                        }
                    }
                    href
                }
            };
            if let Some(link) = found {
                return Ok(link);
            }
        }
        Ok(String::new())
    }
}

/// "urn:li:activity:7123" with base ".../feed/update/" gives
/// ".../feed/update/7123".
fn urn_permalink(urn: &str, base: &str) -> Option<String> {
    let id = urn.trim().rsplit(':').next()?.trim();
    if id.is_empty() {
        return None;
    }
    Some(format!("{}{}", base, id))
}

fn first_text<E: Element>(post: &E, selectors: &[&str]) -> Result<String, DomError> {
    for selector in selectors {
        if let Some(element) = query_or_skip(post, selector)?.into_iter().next() {
            let text = element.text()?.trim().to_string();
            if !text.is_empty() {
                return Ok(text);
            }
        }
    }
    Ok(String::new())
}

/// Lower-cased text of the first `tag` whose own text nodes contain
/// `needle`, compared case-sensitively. A wrapper whose descendants carry the
/// needle does not match; the descendant itself does.
fn inline_containing<E: Element>(
    post: &E,
    tag: &str,
    needle: &str,
) -> Result<Option<String>, DomError> {
    for element in query_or_skip(post, tag)? {
        if element.own_text()?.contains(needle) {
            let text = element.text()?.trim().to_lowercase();
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }
    Ok(None)
}

/// Lower-cased, trimmed text of the first `selector` match accepted by
/// `accept`, which sees the lower-cased text.
fn first_matching<E: Element>(
    post: &E,
    selector: &str,
    accept: impl Fn(&str) -> bool,
) -> Result<Option<String>, DomError> {
    for element in query_or_skip(post, selector)? {
        let text = element.text()?.trim().to_lowercase();
        if !text.is_empty() && accept(&text) {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

/// A selector the document engine rejects disables that strategy only.
fn query_or_skip<E: Element>(post: &E, selector: &str) -> Result<Vec<E>, DomError> {
    match post.query(selector) {
        Ok(elements) => Ok(elements),
        Err(DomError::InvalidSelector(selector)) => {
            debug!("Strategy disabled, invalid selector: {}", selector);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention_scan::snapshot::HtmlSnapshot;

    fn first_post(snapshot: &HtmlSnapshot) -> crate::mention_scan::snapshot::SnapshotElement<'_> {
        snapshot.root().query("div.post").unwrap()[0]
    }

    #[test]
    fn test_structured_post() {
        let snapshot = HtmlSnapshot::parse(
            r#"<div class="post" data-urn="urn:li:activity:7123456789">
                 <span class="update-components-actor__name">Jane Roe</span>
                 <span class="update-components-actor__sub-description">3 days ago •</span>
                 <div class="feed-shared-update-v2__description">  Proud to work with @Acme  </div>
                 <div class="feed-shared-text">fallback text</div>
                 <a href="https://www.linkedin.com/in/jane">profile</a>
               </div>"#,
        );
        let fields = FieldExtractor::default()
            .extract(&first_post(&snapshot))
            .unwrap();

        assert_eq!(fields.text, "Proud to work with @Acme");
        assert_eq!(fields.time_text, "3 days ago •");
        assert_eq!(
            fields.permalink,
            "https://www.linkedin.com/feed/update/7123456789"
        );
        assert_eq!(fields.author, "Jane Roe");
    }

    #[test]
    fn test_text_skips_empty_matches() {
        let snapshot = HtmlSnapshot::parse(
            r#"<div class="post">
                 <div class="feed-shared-text__text-view">   </div>
                 <div class="update-components-text">Second choice</div>
               </div>"#,
        );
        let text = FieldExtractor::default()
            .extract_text(&first_post(&snapshot))
            .unwrap();
        assert_eq!(text, "Second choice");
    }

    #[test]
    fn test_missing_text_is_empty_not_an_error() {
        let snapshot = HtmlSnapshot::parse(r#"<div class="post"><img src="x.png"></div>"#);
        let fields = FieldExtractor::default()
            .extract(&first_post(&snapshot))
            .unwrap();
        assert_eq!(fields, PostFields::default());
    }

    #[test]
    fn test_time_falls_back_to_hidden_and_time_elements() {
        let snapshot = HtmlSnapshot::parse(
            r#"<div class="post">
                 <span>Follow</span>
                 <span class="visually-hidden"></span>
                 <time>2W</time>
                 <span class="visually-hidden">5d</span>
               </div>"#,
        );
        let time_text = FieldExtractor::default()
            .extract_time_text(&first_post(&snapshot))
            .unwrap();
        assert_eq!(time_text, "2w");
    }

    #[test]
    fn test_inline_ago_wins_over_token_scan() {
        let snapshot = HtmlSnapshot::parse(
            r#"<div class="post">
                 <time>1w</time>
                 <span>  2 Hours ago </span>
               </div>"#,
        );
        let time_text = FieldExtractor::default()
            .extract_time_text(&first_post(&snapshot))
            .unwrap();
        assert_eq!(time_text, "2 hours ago");
    }

    #[test]
    fn test_inline_ago_is_case_sensitive() {
        let snapshot = HtmlSnapshot::parse(
            r#"<div class="post">
                 <span>3 DAYS AGO</span>
                 <time>1w</time>
               </div>"#,
        );
        let time_text = FieldExtractor::default()
            .extract_time_text(&first_post(&snapshot))
            .unwrap();
        assert_eq!(time_text, "1w");
    }

    #[test]
    fn test_nested_actor_sub_description() {
        let snapshot = HtmlSnapshot::parse(
            r#"<div class="post" data-urn="urn:li:activity:7001">
                 <div class="update-components-actor">
                   <span class="update-components-actor__name">Jane Roe</span>
                   <span class="update-components-actor__sub-description">
                     <span aria-hidden="true">2d • </span>
                     <span class="visually-hidden">2 days ago</span>
                   </span>
                 </div>
                 <div class="update-components-text">
                   Congrats to the team at <a href="/company/acme">@Acme</a>! Send CVs to
                   talent@<b>acme</b>.io
                 </div>
               </div>"#,
        );
        let fields = FieldExtractor::default()
            .extract(&first_post(&snapshot))
            .unwrap();

        assert_eq!(fields.time_text, "2 days ago");
        assert_eq!(
            fields.text,
            "Congrats to the team at @Acme! Send CVs to talent@acme.io"
        );
        assert_eq!(fields.author, "Jane Roe");
    }

    #[test]
    fn test_permalink_falls_back_to_activity_anchor() {
        let snapshot = HtmlSnapshot::parse(
            r#"<div class="post" data-urn="  ">
                 <a href="https://www.linkedin.com/company/acme">Acme</a>
                 <a>no href</a>
                 <a href="https://www.linkedin.com/posts/jane_activity-7000-abcd">post</a>
                 <a href="https://www.linkedin.com/posts/other_activity-8000">other</a>
               </div>"#,
        );
        let link = FieldExtractor::default()
            .extract_permalink(&first_post(&snapshot))
            .unwrap();
        assert_eq!(link, "https://www.linkedin.com/posts/jane_activity-7000-abcd");
    }

    #[test]
    fn test_permalink_empty_when_nothing_matches() {
        let snapshot = HtmlSnapshot::parse(
            r#"<div class="post"><a href="https://example.com/about">about</a></div>"#,
        );
        let link = FieldExtractor::default()
            .extract_permalink(&first_post(&snapshot))
            .unwrap();
        assert!(link.is_empty());
    }

    #[test]
    fn test_invalid_selector_only_disables_that_strategy() {
        let snapshot = HtmlSnapshot::parse(
            r#"<div class="post"><p class="body">Hello</p></div>"#,
        );
        let extractor = FieldExtractor {
            text: vec!["p:contains('Hello')", "p.body"],
            ..FieldExtractor::default()
        };
        assert_eq!(
            extractor.extract_text(&first_post(&snapshot)).unwrap(),
            "Hello"
        );
    }

    #[test]
    fn test_urn_permalink() {
        assert_eq!(
            urn_permalink("urn:li:activity:42", "https://x/"),
            Some("https://x/42".to_string())
        );
        assert_eq!(urn_permalink("urn:li:activity:", "https://x/"), None);
    }
}
