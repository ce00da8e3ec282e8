// src/mention_scan/session.rs
//! Drives one scrape run over a browser: login wait, search, scrolling with
//! page-wide expansion, then a single collection pass at the end.

use super::collector::{find_posts, PostCollector};
use super::dom::{DomError, Element};
use super::expander::ContentExpander;
use super::PostRecord;
use crate::config::ScrapeParameters;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rocket::http::RawStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const LINKEDIN_BASE_URL: &str = "https://www.linkedin.com";

/// Markers in the page source of an empty search result page.
const NO_RESULTS_MARKERS: &[&str] = &["No results", "0 results"];

/// URL fragments that only appear once the user is signed in.
const SIGNED_IN_URL_MARKERS: &[&str] = &["feed", "mynetwork", "jobs"];

pub trait Browser {
    type Element<'a>: Element
    where
        Self: 'a;

    fn open(&mut self, url: &str) -> Result<(), DomError>;

    fn current_url(&self) -> Result<String, DomError>;

    fn page_source(&self) -> Result<String, DomError>;

    fn scroll_to_bottom(&mut self) -> Result<(), DomError>;

    /// Root element of the currently loaded page.
    fn document(&self) -> Result<Self::Element<'_>, DomError>;

    /// Terminate the underlying browser session.
    fn close(&mut self) -> Result<(), DomError>;
}

/// Owns the browser for one run and closes it on every exit path.
pub struct BrowserGuard<B: Browser> {
    browser: B,
    released: bool,
}

impl<B: Browser> BrowserGuard<B> {
    pub fn new(browser: B) -> Self {
        Self {
            browser,
            released: false,
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut B {
        &mut self.browser
    }

    pub fn release(&mut self) -> Result<(), DomError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        info!("Closing browser...");
        self.browser.close()
    }
}

impl<B: Browser> Drop for BrowserGuard<B> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to close browser: {}", e);
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginWait {
    pub login_url: String,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LoginWait {
    fn default() -> Self {
        Self {
            login_url: format!("{}/login", LINKEDIN_BASE_URL),
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: String,
    pub login: Option<LoginWait>,
    /// Pause after each "see more" trigger.
    pub expand_settle: Duration,
    /// Pause after each scroll, for the feed to load more posts.
    pub scroll_settle: Duration,
    /// Pause after navigation and after the final expansion.
    pub page_settle: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: LINKEDIN_BASE_URL.to_string(),
            login: None,
            expand_settle: Duration::from_millis(500),
            scroll_settle: Duration::from_secs(5),
            page_settle: Duration::from_secs(3),
        }
    }
}

impl SessionConfig {
    pub fn without_delays() -> Self {
        Self {
            expand_settle: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            page_settle: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Candidate search pages for `mention`, best first: quoted mention,
    /// plain mention, then the global search.
    pub fn search_urls(&self, mention: &str) -> Vec<String> {
        let encoded = RawStr::new(mention).percent_encode();
        let mention = encoded.as_str();
        vec![
            format!(
                "{}/search/results/content/?keywords=%22%40{}%22&origin=SWITCH_SEARCH_VERTICAL",
                self.base_url, mention
            ),
            format!(
                "{}/search/results/content/?keywords=%40{}&searchId=&origin=SWITCH_SEARCH_VERTICAL",
                self.base_url, mention
            ),
            format!(
                "{}/search/results/all/?keywords=%40{}&origin=GLOBAL_SEARCH_HEADER",
                self.base_url, mention
            ),
        ]
    }
}

pub struct ScrapeSession<B: Browser> {
    guard: BrowserGuard<B>,
    params: ScrapeParameters,
    config: SessionConfig,
    reference: NaiveDate,
    page_expander: ContentExpander,
    collector: PostCollector,
}

impl<B: Browser> ScrapeSession<B> {
    pub fn new(browser: B, params: ScrapeParameters, config: SessionConfig) -> Self {
        let page_expander = ContentExpander::for_page().with_settle_delay(config.expand_settle);
        let collector = PostCollector::with_settle_delay(config.expand_settle);
        Self {
            guard: BrowserGuard::new(browser),
            params,
            config,
            reference: chrono::Local::now().date_naive(),
            page_expander,
            collector,
        }
    }

    pub fn with_reference_date(mut self, reference: NaiveDate) -> Self {
        self.reference = reference;
        self
    }

    /// Run to completion. `progress` receives a percentage and a message at
    /// each milestone. The browser is closed whatever the outcome.
    pub fn run(mut self, progress: &mut dyn FnMut(u8, &str)) -> Result<Vec<PostRecord>> {
        let outcome = self.drive(progress);
        if let Err(e) = self.guard.release() {
            warn!("Failed to close browser: {}", e);
        }
        outcome
    }

    fn drive(&mut self, progress: &mut dyn FnMut(u8, &str)) -> Result<Vec<PostRecord>> {
        if let Some(login) = self.config.login.clone() {
            progress(2, "Waiting for login...");
            self.wait_for_login(&login)?;
        }

        progress(
            5,
            &format!("Searching for mentions of @{}", self.params.target_mention()),
        );
        self.search_mentions();
        self.select_posts_filter();

        let total = self.params.scroll_iterations();
        info!("Scrolling to load posts ({} times)...", total);
        for i in 1..=total {
            self.guard
                .browser_mut()
                .scroll_to_bottom()
                .context("Failed to scroll the results page")?;
            debug!("Scroll {}/{}", i, total);

            let document = self
                .guard
                .browser()
                .document()
                .context("Results page is not reachable")?;
            self.page_expander.expand(&document);
            pause(self.config.scroll_settle);

            let percent = 10 + (70 * u64::from(i) / u64::from(total)) as u8;
            progress(percent, &format!("Scroll {}/{}", i, total));
        }

        info!("Final expansion of all 'See more' sections...");
        let document = self
            .guard
            .browser()
            .document()
            .context("Results page is not reachable")?;
        self.page_expander.expand(&document);
        pause(self.config.page_settle);

        progress(85, "Extracting posts data...");
        let posts = find_posts(&document).context("Failed to locate posts on the page")?;
        let records = self.collector.collect(&posts, &self.params, self.reference);

        info!("Scraping complete! Found {} posts", records.len());
        Ok(records)
    }

    fn wait_for_login(&mut self, login: &LoginWait) -> Result<()> {
        info!("Opening login page, waiting for manual login...");
        self.guard
            .browser_mut()
            .open(&login.login_url)
            .context("Failed to open the login page")?;

        let started = Instant::now();
        while started.elapsed() < login.timeout {
            pause(login.poll_interval);
            if self.is_signed_in() {
                info!("Login detected");
                return Ok(());
            }
        }

        anyhow::bail!(
            "Login timeout - please login within {} seconds",
            login.timeout.as_secs()
        )
    }

    fn is_signed_in(&self) -> bool {
        let browser = self.guard.browser();
        if let Ok(url) = browser.current_url() {
            if SIGNED_IN_URL_MARKERS.iter().any(|marker| url.contains(marker)) {
                return true;
            }
        }
        browser
            .document()
            .and_then(|document| document.query(".global-nav"))
            .map(|nav| !nav.is_empty())
            .unwrap_or(false)
    }

    fn search_mentions(&mut self) {
        let urls = self.config.search_urls(self.params.target_mention());

        for url in &urls {
            if let Err(e) = self.guard.browser_mut().open(url) {
                debug!("Search page failed to open {}: {}", url, e);
                continue;
            }
            pause(self.config.page_settle);

            match self.guard.browser().page_source() {
                Ok(source) if !NO_RESULTS_MARKERS.iter().any(|m| source.contains(m)) => {
                    info!("Successfully found results with URL: {}", url);
                    return;
                }
                Ok(_) => debug!("No results at {}", url),
                Err(e) => debug!("Could not read {}: {}", url, e),
            }
        }

        warn!("May not have found optimal search results. Proceeding with last attempt...");
    }

    /// Narrow the results to posts when the page offers that filter: a
    /// button labelled exactly "Posts".
    fn select_posts_filter(&mut self) {
        let Ok(document) = self.guard.browser().document() else {
            return;
        };
        let Ok(buttons) = document.query("button") else {
            return;
        };

        for button in buttons {
            let is_posts_filter = button
                .text()
                .map(|text| text.trim().eq_ignore_ascii_case("posts"))
                .unwrap_or(false);
            if is_posts_filter {
                match button.trigger() {
                    Ok(()) => {
                        debug!("Applied 'Posts' filter");
                        pause(self.config.page_settle);
                    }
                    Err(e) => debug!("Could not apply 'Posts' filter: {}", e),
                }
                return;
            }
        }
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
