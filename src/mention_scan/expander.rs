// src/mention_scan/expander.rs
use super::dom::{DomError, Element};
use std::time::Duration;
use tracing::{debug, info};

/// One way of recognising a "see more" control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Affordance {
    Css(&'static str),
    /// A `<button>` whose text contains the needle, ignoring case.
    ButtonText(&'static str),
}

/// Page-wide pattern list, most specific first.
pub const PAGE_AFFORDANCES: &[Affordance] = &[
    Affordance::Css("button[aria-label*='see more']"),
    Affordance::Css("button[aria-label*='See more']"),
    Affordance::Css("button.feed-shared-inline-show-more-text__see-more-less-toggle"),
    Affordance::Css("button[data-tracking-control-name='public_post_feed-text-see-more']"),
    Affordance::Css(".feed-shared-text__see-more"),
    Affordance::Css("span.feed-shared-text__see-more-link"),
    Affordance::ButtonText("see more"),
    Affordance::Css("[aria-expanded='false']"),
];

/// Patterns re-checked inside each post, for controls rendered after the
/// page-wide pass.
pub const POST_AFFORDANCES: &[Affordance] = &[
    Affordance::Css("button[aria-label*='see more']"),
    Affordance::Css(".feed-shared-text__see-more"),
    Affordance::Css("button.feed-shared-inline-show-more-text__see-more-less-toggle"),
];

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ContentExpander {
    affordances: Vec<Affordance>,
    settle_delay: Duration,
}

impl ContentExpander {
    pub fn new(affordances: Vec<Affordance>) -> Self {
        Self {
            affordances,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn for_page() -> Self {
        Self::new(PAGE_AFFORDANCES.to_vec())
    }

    pub fn for_post() -> Self {
        Self::new(POST_AFFORDANCES.to_vec())
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Trigger every visible, enabled affordance under `root` and return how
    /// many were triggered. Already-expanded content yields zero.
    pub fn expand<E: Element>(&self, root: &E) -> usize {
        let mut expanded = 0;

        for affordance in &self.affordances {
            let candidates = match Self::find(root, affordance) {
                Ok(candidates) => candidates,
                Err(e) => {
                    debug!("Skipping affordance {:?}: {}", affordance, e);
                    continue;
                }
            };

            for candidate in candidates {
                match self.try_trigger(&candidate) {
                    Ok(true) => expanded += 1,
                    Ok(false) => {}
                    Err(e) => debug!("Could not trigger {:?}: {}", affordance, e),
                }
            }
        }

        if expanded > 0 {
            info!("Expanded {} 'See more' sections", expanded);
        }
        expanded
    }

    fn find<E: Element>(root: &E, affordance: &Affordance) -> Result<Vec<E>, DomError> {
        match affordance {
            Affordance::Css(selector) => root.query(selector),
            Affordance::ButtonText(needle) => {
                let mut matches = Vec::new();
                for button in root.query("button")? {
                    match button.text() {
                        Ok(text) if text.to_lowercase().contains(needle) => matches.push(button),
                        Ok(_) => {}
                        Err(e) => debug!("Skipping unreadable button: {}", e),
                    }
                }
                Ok(matches)
            }
        }
    }

    fn try_trigger<E: Element>(&self, candidate: &E) -> Result<bool, DomError> {
        if !(candidate.is_visible()? && candidate.is_enabled()?) {
            return Ok(false);
        }
        candidate.trigger()?;
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }
        Ok(true)
    }
}

impl Default for ContentExpander {
    fn default() -> Self {
        Self::for_page()
    }
}
