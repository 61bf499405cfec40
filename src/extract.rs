use crate::driver::{LocatorSpec, PageDriver, PageElement};
use crate::utils::settle;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Describes one extractable field: where it lives and how hard to try.
///
/// The primary locator is the expected-stable layout and gets the retry
/// policy; fallbacks exist to tolerate layout drift and are tried once each,
/// since retrying the same drifted layout is not expected to help.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as it appears on records (e.g. "author").
    pub name: String,

    /// Expected-stable locator, retried per the policy below.
    pub primary: LocatorSpec,

    /// Alternative locators, each tried exactly once after the primary
    /// has exhausted its attempts.
    #[serde(default)]
    pub fallbacks: Vec<LocatorSpec>,

    /// How long a single lookup may wait for the element to appear.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Total attempts on the primary locator.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between failed primary attempts.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

fn default_attempt_timeout_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    60
}

impl FieldSpec {
    pub fn new(name: &str, primary: LocatorSpec) -> Self {
        Self {
            name: name.to_string(),
            primary,
            fallbacks: Vec::new(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
        }
    }

    pub fn with_fallback(mut self, locator: LocatorSpec) -> Self {
        self.fallbacks.push(locator);
        self
    }

    pub fn with_attempts(mut self, max_attempts: u32, backoff_secs: u64) -> Self {
        self.max_attempts = max_attempts;
        self.backoff_secs = backoff_secs;
        self
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

/// Outcome of extracting one field from one page.
///
/// `Present("")` means the locator resolved to an element with blank text,
/// which is distinct from `Absent` (no locator resolved at all).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "text")]
pub enum ExtractionResult {
    Present(String),
    Absent,
}

impl ExtractionResult {
    pub fn is_present(&self) -> bool {
        matches!(self, ExtractionResult::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ExtractionResult::Absent)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractionResult::Present(text) => Some(text),
            ExtractionResult::Absent => None,
        }
    }
}

/// Extract one field from the current page.
///
/// The primary locator gets up to `max_attempts` bounded lookups with a
/// backoff pause between failures; fallbacks are then tried once each, in
/// order. Nothing resolving is an `Absent` result, never an error.
pub async fn extract<D: PageDriver>(driver: &mut D, spec: &FieldSpec) -> ExtractionResult {
    let max_attempts = spec.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        if let Some(text) = try_locator(driver, &spec.primary, spec.attempt_timeout()).await {
            ::log::info!(
                "field '{}' resolved via primary locator {} on attempt {}",
                spec.name,
                spec.primary,
                attempt
            );
            return ExtractionResult::Present(text);
        }
        ::log::debug!(
            "field '{}': attempt {}/{} on {} found nothing",
            spec.name,
            attempt,
            max_attempts,
            spec.primary
        );
        if attempt < max_attempts {
            ::log::info!(
                "field '{}': waiting {}s before retry",
                spec.name,
                spec.backoff_secs
            );
            settle(spec.backoff()).await;
        }
    }

    for fallback in &spec.fallbacks {
        if let Some(text) = try_locator(driver, fallback, spec.attempt_timeout()).await {
            ::log::info!(
                "field '{}' resolved via fallback locator {}",
                spec.name,
                fallback
            );
            return ExtractionResult::Present(text);
        }
        ::log::debug!("field '{}': fallback {} found nothing", spec.name, fallback);
    }

    ::log::warn!(
        "field '{}' not found after {} primary attempts and {} fallbacks",
        spec.name,
        max_attempts,
        spec.fallbacks.len()
    );
    ExtractionResult::Absent
}

/// One bounded lookup. Driver-level errors are logged and treated the same
/// as a miss; the retry policy above decides whether to try again.
async fn try_locator<D: PageDriver>(
    driver: &mut D,
    locator: &LocatorSpec,
    timeout: Duration,
) -> Option<String> {
    let element = match driver.locate(locator, timeout).await {
        Ok(Some(element)) => element,
        Ok(None) => return None,
        Err(e) => {
            ::log::debug!("locator {} failed: {}", locator, e);
            return None;
        }
    };
    match element.text().await {
        Ok(text) => Some(text),
        Err(e) => {
            ::log::debug!("text read via {} failed: {}", locator, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{MockDriver, MockElement};

    fn author_spec() -> FieldSpec {
        FieldSpec::new("author", LocatorSpec::xpath("//div[1]/a[2]/span"))
            .with_fallback(LocatorSpec::css(".author-container .username"))
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_after_k_failures_with_k_plus_one_attempts() {
        let spec = author_spec();
        let mut driver = MockDriver::new();
        driver.enqueue_misses(&spec.primary, 2);
        driver.enqueue(&spec.primary, Some(MockElement::with_text("Ada")));

        let result = extract(&mut driver, &spec).await;
        assert_eq!(result, ExtractionResult::Present("Ada".to_string()));
        assert_eq!(driver.attempts_for(&spec.primary), 3);
        assert_eq!(driver.attempts_for(&spec.fallbacks[0]), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_primary_falls_through_to_fallback() {
        let spec = author_spec();
        let mut driver = MockDriver::new();
        driver.enqueue(&spec.fallbacks[0], Some(MockElement::with_text("Grace")));

        let result = extract(&mut driver, &spec).await;
        assert_eq!(result, ExtractionResult::Present("Grace".to_string()));
        assert_eq!(driver.attempts_for(&spec.primary), 3);
        assert_eq!(driver.attempts_for(&spec.fallbacks[0]), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn all_locators_failing_yields_absent() {
        let spec = author_spec();
        let mut driver = MockDriver::new();

        let result = extract(&mut driver, &spec).await;
        assert_eq!(result, ExtractionResult::Absent);
        assert_eq!(driver.attempts_for(&spec.primary), 3);
        assert_eq!(driver.attempts_for(&spec.fallbacks[0]), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_text_is_present_not_absent() {
        let spec = FieldSpec::new("title", LocatorSpec::css("#detail-title")).with_attempts(1, 0);
        let mut driver = MockDriver::new();
        driver.enqueue(&spec.primary, Some(MockElement::with_text("")));

        let result = extract(&mut driver, &spec).await;
        assert_eq!(result, ExtractionResult::Present(String::new()));
        assert!(result.is_present());
    }

    #[tokio::test(start_paused = true)]
    async fn fallbacks_are_not_retried() {
        let spec = FieldSpec::new("body", LocatorSpec::css("#a"))
            .with_attempts(1, 0)
            .with_fallback(LocatorSpec::css("#b"))
            .with_fallback(LocatorSpec::css("#c"));
        let mut driver = MockDriver::new();
        driver.enqueue(&spec.fallbacks[1], Some(MockElement::with_text("text")));

        let result = extract(&mut driver, &spec).await;
        assert_eq!(result, ExtractionResult::Present("text".to_string()));
        assert_eq!(driver.attempts_for(&spec.fallbacks[0]), 1);
        assert_eq!(driver.attempts_for(&spec.fallbacks[1]), 1);
    }
}
