// src/mention_scan/collector.rs
use super::dom::{DomError, Element};
use super::expander::{ContentExpander, DEFAULT_SETTLE_DELAY};
use super::field_extractor::FieldExtractor;
use super::time_parser::{self, ParseFailure};
use super::PostRecord;
use crate::config::ScrapeParameters;
use crate::utils::{extract_emails, truncate_text};
use chrono::NaiveDate;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Post-root selectors, most specific first. The first one that matches
/// anything decides the post set.
pub const POST_SELECTORS: &[&str] = &[
    "[data-urn*='urn:li:activity']",
    ".feed-shared-update-v2",
    ".update-components-actor",
    "article",
];

/// Locate post roots under `document` using [`POST_SELECTORS`].
pub fn find_posts<E: Element>(document: &E) -> Result<Vec<E>, DomError> {
    for selector in POST_SELECTORS {
        let posts = document.query(selector)?;
        if !posts.is_empty() {
            info!("Found {} posts using selector: {}", posts.len(), selector);
            return Ok(posts);
        }
    }
    warn!("No posts found with any selector");
    Ok(Vec::new())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoTimeText,
    UnparseableTime,
    OutsideWindow,
    NoPermalink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PostOutcome {
    Kept(PostRecord),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub seen: usize,
    pub kept: usize,
    pub no_time_text: usize,
    pub unparseable_time: usize,
    pub outside_window: usize,
    pub no_permalink: usize,
    pub failed: usize,
}

impl CollectionStats {
    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NoTimeText => self.no_time_text += 1,
            SkipReason::UnparseableTime => self.unparseable_time += 1,
            SkipReason::OutsideWindow => self.outside_window += 1,
            SkipReason::NoPermalink => self.no_permalink += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostCollector {
    expander: ContentExpander,
    extractor: FieldExtractor,
}

impl PostCollector {
    pub fn new(expander: ContentExpander, extractor: FieldExtractor) -> Self {
        Self {
            expander,
            extractor,
        }
    }

    /// Collector with the post-scoped expander and default field strategies.
    pub fn with_settle_delay(delay: Duration) -> Self {
        Self::new(
            ContentExpander::for_post().with_settle_delay(delay),
            FieldExtractor::default(),
        )
    }

    pub fn collect<E: Element>(
        &self,
        posts: &[E],
        params: &ScrapeParameters,
        reference: NaiveDate,
    ) -> Vec<PostRecord> {
        self.collect_with_stats(posts, params, reference).0
    }

    /// Process `posts` in encounter order. A post that fails is logged and
    /// skipped; it never ends the pass.
    pub fn collect_with_stats<E: Element>(
        &self,
        posts: &[E],
        params: &ScrapeParameters,
        reference: NaiveDate,
    ) -> (Vec<PostRecord>, CollectionStats) {
        info!("Processing {} posts...", posts.len());

        let mut records = Vec::new();
        let mut stats = CollectionStats {
            seen: posts.len(),
            ..CollectionStats::default()
        };

        for (index, post) in posts.iter().enumerate() {
            match self.process_post(post, params, reference) {
                Ok(PostOutcome::Kept(record)) => {
                    info!(
                        "Found post {}: {} - {}",
                        records.len() + 1,
                        record.date,
                        record.link
                    );
                    records.push(record);
                }
                Ok(PostOutcome::Skipped(reason)) => {
                    debug!("Skipping post {}: {:?}", index + 1, reason);
                    stats.record_skip(reason);
                }
                Err(e) => {
                    warn!("Error processing post {}: {}", index + 1, e);
                    stats.failed += 1;
                }
            }
        }

        stats.kept = records.len();
        info!(
            "Kept {} of {} posts ({} without time, {} unparseable, {} too old, {} without link, {} failed)",
            stats.kept,
            stats.seen,
            stats.no_time_text,
            stats.unparseable_time,
            stats.outside_window,
            stats.no_permalink,
            stats.failed
        );
        (records, stats)
    }

    fn process_post<E: Element>(
        &self,
        post: &E,
        params: &ScrapeParameters,
        reference: NaiveDate,
    ) -> Result<PostOutcome, DomError> {
        self.expander.expand(post);

        let fields = self.extractor.extract(post)?;

        if fields.time_text.is_empty() {
            return Ok(PostOutcome::Skipped(SkipReason::NoTimeText));
        }

        let date = match time_parser::parse(&fields.time_text, reference) {
            Ok(date) => date,
            Err(failure) => {
                log_parse_failure(&failure);
                return Ok(PostOutcome::Skipped(SkipReason::UnparseableTime));
            }
        };

        let age_days = (reference - date).num_days();
        if age_days > i64::from(params.recency_window_days()) {
            return Ok(PostOutcome::Skipped(SkipReason::OutsideWindow));
        }

        if fields.permalink.is_empty() {
            return Ok(PostOutcome::Skipped(SkipReason::NoPermalink));
        }

        if !fields.author.is_empty() {
            debug!("Post by {} mentions {}", fields.author, params.target_mention());
        }

        Ok(PostOutcome::Kept(PostRecord {
            date,
            link: fields.permalink,
            raw_time_text: fields.time_text,
            emails: extract_emails(&fields.text),
            text: truncate_text(&fields.text),
        }))
    }
}

impl Default for PostCollector {
    fn default() -> Self {
        Self::with_settle_delay(DEFAULT_SETTLE_DELAY)
    }
}

fn log_parse_failure(failure: &ParseFailure) {
    debug!("Unusable time text: {}", failure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention_scan::snapshot::HtmlSnapshot;
    use chrono::Days;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    fn collector() -> PostCollector {
        PostCollector::with_settle_delay(Duration::ZERO)
    }

    fn params(window: i64) -> ScrapeParameters {
        ScrapeParameters::new("Acme", window, 1).unwrap()
    }

    fn post(urn: &str, time: &str, text: &str) -> String {
        format!(
            r#"<div class="feed-shared-update-v2" data-urn="urn:li:activity:{urn}">
                 <time>{time}</time>
                 <div class="update-components-text">{text}</div>
               </div>"#
        )
    }

    fn page(posts: &[String]) -> HtmlSnapshot {
        HtmlSnapshot::parse(&format!("<html><body>{}</body></html>", posts.join("\n")))
    }

    #[test]
    fn test_end_to_end_three_posts() {
        let snapshot = page(&[
            post("1", "2d", "Great work by Acme"),
            post("2", "3 weeks", "Old news about Acme"),
            r#"<div class="feed-shared-update-v2" data-urn="urn:li:activity:3">
                 <div class="update-components-text">No time signal</div>
               </div>"#
                .to_string(),
        ]);
        let posts = find_posts(&snapshot.root()).unwrap();
        assert_eq!(posts.len(), 3);

        let (records, stats) = collector().collect_with_stats(&posts, &params(7), reference());

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.link, "https://www.linkedin.com/feed/update/1");
        assert_eq!(record.raw_time_text, "2d");
        assert_eq!(record.date, reference().checked_sub_days(Days::new(2)).unwrap());
        assert_eq!(record.text, "Great work by Acme");
        assert!(record.emails.is_empty());

        assert_eq!(stats.outside_window, 1);
        assert_eq!(stats.no_time_text, 1);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let snapshot = page(&[post("1", "7 days ago", "on the edge"), post("2", "8d", "too old")]);
        let posts = find_posts(&snapshot.root()).unwrap();

        let records = collector().collect(&posts, &params(7), reference());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_time_text, "7 days ago");
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 3, 13).unwrap());
    }

    #[test]
    fn test_unparseable_time_and_missing_link_are_skipped() {
        let snapshot = page(&[
            post("1", "edited", "no digits"),
            r#"<article><time>1d</time><a href="https://example.com/about">x</a></article>"#
                .to_string(),
        ]);
        let posts = find_posts(&snapshot.root()).unwrap();
        assert_eq!(posts.len(), 1, "first matching selector decides the post set");

        let article_snapshot = page(&[
            r#"<article><time>1d</time><a href="https://example.com/about">x</a></article>"#
                .to_string(),
        ]);
        let articles = find_posts(&article_snapshot.root()).unwrap();

        let (records, stats) = collector().collect_with_stats(&posts, &params(30), reference());
        assert!(records.is_empty());
        assert_eq!(stats.unparseable_time, 1);

        let (records, stats) = collector().collect_with_stats(&articles, &params(30), reference());
        assert!(records.is_empty());
        assert_eq!(stats.no_permalink, 1);
    }

    #[test]
    fn test_emails_and_truncation() {
        let long_text = format!("contact me at a.b+tag@sub.example.co {}", "x".repeat(600));
        let snapshot = page(&[post("9", "1 hour ago", &long_text)]);
        let posts = find_posts(&snapshot.root()).unwrap();

        let records = collector().collect(&posts, &params(7), reference());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].emails, vec!["a.b+tag@sub.example.co".to_string()]);
        assert_eq!(records[0].date, reference());
        assert_eq!(records[0].text.chars().count(), 503);
        assert!(records[0].text.ends_with("..."));
    }

    #[test]
    fn test_post_expansion_runs_before_extraction() {
        let snapshot = page(&[r#"<div data-urn="urn:li:activity:5">
                 <span>5 days ago</span>
                 <button aria-label="see more">…see more</button>
                 <div class="feed-shared-text">body</div>
               </div>"#
            .to_string()]);
        let posts = find_posts(&snapshot.root()).unwrap();

        let records = collector().collect(&posts, &params(7), reference());
        assert_eq!(records.len(), 1);
        assert_eq!(snapshot.triggered_count(), 1);
    }

    #[test]
    fn test_feed_markup_with_nested_actor_and_inline_caption() {
        let snapshot = page(&[r#"<div class="feed-shared-update-v2" data-urn="urn:li:activity:7002">
                 <div class="update-components-actor">
                   <span class="update-components-actor__name">
                     <span aria-hidden="true">Jane Roe</span>
                   </span>
                   <span class="update-components-actor__sub-description">
                     <span aria-hidden="true">3d • Edited • </span>
                     <span class="visually-hidden">3 days ago</span>
                   </span>
                 </div>
                 <div class="update-components-text">
                   <p>Hire<b>d</b>! Thanks <a href="/company/acme/">@Acme</a>.</p>
                   <p>Questions: hr@<span>acme</span>.io</p>
                 </div>
               </div>"#
            .to_string()]);
        let posts = find_posts(&snapshot.root()).unwrap();

        let records = collector().collect(&posts, &params(7), reference());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.raw_time_text, "3 days ago");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 17).unwrap());
        assert_eq!(record.text, "Hired! Thanks @Acme.\nQuestions: hr@acme.io");
        assert_eq!(record.emails, vec!["hr@acme.io".to_string()]);
        assert_eq!(record.link, "https://www.linkedin.com/feed/update/7002");
    }

    #[derive(Clone)]
    enum FakePost<'a> {
        Healthy(crate::mention_scan::snapshot::SnapshotElement<'a>),
        Broken,
    }

    impl<'a> Element for FakePost<'a> {
        fn query(&self, selector: &str) -> Result<Vec<Self>, DomError> {
            match self {
                FakePost::Healthy(inner) => {
                    Ok(inner.query(selector)?.into_iter().map(FakePost::Healthy).collect())
                }
                FakePost::Broken => Err(DomError::Stale("post was re-rendered".to_string())),
            }
        }
        fn attribute(&self, name: &str) -> Result<Option<String>, DomError> {
            match self {
                FakePost::Healthy(inner) => inner.attribute(name),
                FakePost::Broken => Err(DomError::Stale("post was re-rendered".to_string())),
            }
        }
        fn text(&self) -> Result<String, DomError> {
            match self {
                FakePost::Healthy(inner) => inner.text(),
                FakePost::Broken => Err(DomError::Stale("post was re-rendered".to_string())),
            }
        }
        fn own_text(&self) -> Result<String, DomError> {
            match self {
                FakePost::Healthy(inner) => inner.own_text(),
                FakePost::Broken => Err(DomError::Stale("post was re-rendered".to_string())),
            }
        }
        fn is_visible(&self) -> Result<bool, DomError> {
            match self {
                FakePost::Healthy(inner) => inner.is_visible(),
                FakePost::Broken => Ok(false),
            }
        }
        fn is_enabled(&self) -> Result<bool, DomError> {
            match self {
                FakePost::Healthy(inner) => inner.is_enabled(),
                FakePost::Broken => Ok(false),
            }
        }
        fn trigger(&self) -> Result<(), DomError> {
            match self {
                FakePost::Healthy(inner) => inner.trigger(),
                FakePost::Broken => Err(DomError::Stale("post was re-rendered".to_string())),
            }
        }
    }

    #[test]
    fn test_failing_post_does_not_abort_collection() {
        let snapshot = page(&[post("1", "1d", "first"), post("2", "2d", "second")]);
        let found = find_posts(&snapshot.root()).unwrap();
        let posts = vec![
            FakePost::Healthy(found[0]),
            FakePost::Broken,
            FakePost::Healthy(found[1]),
        ];

        let (records, stats) = collector().collect_with_stats(&posts, &params(7), reference());
        let links: Vec<_> = records.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://www.linkedin.com/feed/update/1",
                "https://www.linkedin.com/feed/update/2"
            ]
        );
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.kept, 2);
    }
}
