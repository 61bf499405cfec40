use crate::collected::CollectedSet;
use crate::config::PaginateConfig;
use crate::driver::{DriverError, LocatorSpec, PageDriver, PageElement};
use crate::stagnation::StagnationTracker;
use crate::utils::settle;
use regex::Regex;
use thiserror::Error;
use url::Url;

/// Errors that prevent a pagination run from starting or proceeding.
///
/// A scroll failure mid-run is deliberately not here: it ends the run but
/// surfaces the partial collection instead of an error.
#[derive(Debug, Error)]
pub enum PaginateError {
    #[error("invalid feed url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid accept_pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// States of the pagination engine over one feed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedState {
    /// Scroll to cause more feed items to render, then settle.
    Revealing,
    /// Scan the slot window and collect unseen identifiers.
    Harvesting,
    /// Read the anchor and decide whether the feed has stagnated.
    Checking,
    /// Terminal: the stagnation threshold was reached.
    Exhausted,
}

/// Run the pagination engine over the feed at `feed_url` and return the
/// collected identifiers in first-seen order.
///
/// There is no maximum cycle count; termination rests entirely on the
/// stagnation heuristic. A driver error while scrolling ends the run early
/// and returns whatever was collected up to that point.
pub async fn collect<D: PageDriver>(
    driver: &mut D,
    feed_url: &str,
    config: &PaginateConfig,
) -> Result<Vec<String>, PaginateError> {
    let base = Url::parse(feed_url)?;
    let accept = config.accept_regex()?;

    ::log::info!("opening feed page: {}", feed_url);
    driver.navigate(feed_url).await?;
    settle(config.initial_settle()).await;

    let mut collected = CollectedSet::new();
    let mut tracker = StagnationTracker::new(config.stagnation_threshold);
    let mut state = FeedState::Revealing;
    let mut cycle = 0u32;

    loop {
        match state {
            FeedState::Revealing => {
                cycle += 1;
                ::log::info!("cycle {}: revealing more of the feed", cycle);
                if let Err(e) = driver.scroll_by(config.scroll_step_px).await {
                    ::log::error!(
                        "scroll failed, keeping the {} identifiers collected so far: {}",
                        collected.len(),
                        e
                    );
                    return Ok(collected.into_all());
                }
                settle(config.reveal_settle()).await;
                state = FeedState::Harvesting;
            }
            FeedState::Harvesting => {
                let new = harvest_window(driver, &base, accept.as_ref(), config, &mut collected)
                    .await;
                ::log::info!(
                    "cycle {}: {} new identifiers, {} collected in total",
                    cycle,
                    new,
                    collected.len()
                );
                state = FeedState::Checking;
            }
            FeedState::Checking => {
                let anchor = read_slot(driver, config, 1).await;
                let exhausted = tracker.observe(anchor.as_deref());
                state = if exhausted {
                    ::log::info!(
                        "anchor unchanged for {} consecutive cycles, feed exhausted",
                        tracker.repeats()
                    );
                    FeedState::Exhausted
                } else {
                    FeedState::Revealing
                };
            }
            FeedState::Exhausted => {
                return Ok(collected.into_all());
            }
        }
    }
}

/// Scan the slot window once, collecting every readable, accepted, unseen
/// identifier. Absent or unreadable slots are skipped; partial harvests are
/// normal since the window may exceed the number of rendered slots.
async fn harvest_window<D: PageDriver>(
    driver: &mut D,
    base: &Url,
    accept: Option<&Regex>,
    config: &PaginateConfig,
    collected: &mut CollectedSet,
) -> usize {
    let mut new = 0;
    for slot in 1..=config.scan_window {
        let Some(href) = read_slot(driver, config, slot).await else {
            ::log::debug!("slot {}: nothing readable", slot);
            continue;
        };
        let resolved = match base.join(&href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                ::log::debug!("slot {}: unresolvable href {}: {}", slot, href, e);
                continue;
            }
        };
        if let Some(pattern) = accept {
            if !pattern.is_match(&resolved) {
                ::log::debug!("slot {}: rejected by accept pattern: {}", slot, resolved);
                continue;
            }
        }
        if collected.add(&resolved) {
            new += 1;
            ::log::info!("slot {}: collected #{}: {}", slot, collected.len(), resolved);
        } else {
            ::log::debug!("slot {}: duplicate, skipped: {}", slot, resolved);
        }
    }
    new
}

/// Read the link href at one slot position. Falls back to reading the href
/// property through a script when the attribute is unset, which happens on
/// links the page populates dynamically.
async fn read_slot<D: PageDriver>(
    driver: &mut D,
    config: &PaginateConfig,
    slot: usize,
) -> Option<String> {
    let locator = config.slot_locator_for(slot);
    let element = match driver.locate(&locator, config.slot_timeout()).await {
        Ok(Some(element)) => element,
        Ok(None) => return None,
        Err(e) => {
            ::log::debug!("slot {} lookup failed: {}", slot, e);
            return None;
        }
    };
    match element.attribute("href").await {
        Ok(Some(href)) if !href.is_empty() => Some(href),
        Ok(_) => script_href(driver, &locator).await,
        Err(e) => {
            ::log::debug!("slot {} href read failed: {}", slot, e);
            None
        }
    }
}

/// Script fallback for hrefs the attribute read could not see.
async fn script_href<D: PageDriver>(driver: &mut D, locator: &LocatorSpec) -> Option<String> {
    let LocatorSpec::XPath(xpath) = locator else {
        return None;
    };
    // serde_json quoting is valid JS string syntax, including for
    // non-ASCII expressions.
    let quoted = serde_json::to_string(xpath).ok()?;
    let code = format!(
        "return document.evaluate({}, document, null, \
         XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue.href;",
        quoted
    );
    match driver.run_script(&code).await {
        Ok(serde_json::Value::String(href)) if !href.is_empty() => Some(href),
        Ok(_) => None,
        Err(e) => {
            ::log::debug!("script href read via {} failed: {}", locator, e);
            None
        }
    }
}
