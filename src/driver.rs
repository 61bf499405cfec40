use fantoccini::elements::Element;
use fantoccini::error::{CmdError, NewSessionError};
use fantoccini::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a page driver.
///
/// Locator misses are not errors; `PageDriver::locate` reports them as
/// `Ok(None)`. This type covers failures of the driver itself.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No browser session could be established.
    #[error("failed to establish webdriver session: {0}")]
    Session(#[from] NewSessionError),

    /// A command against an established session failed.
    #[error("webdriver command failed: {0}")]
    Command(#[from] CmdError),

    /// Driver failure outside the webdriver protocol.
    #[error("driver failure: {0}")]
    Other(String),
}

impl DriverError {
    /// True when the underlying browser session is gone and no further
    /// commands can succeed. Callers treat this as run-fatal.
    pub fn is_session_lost(&self) -> bool {
        match self {
            DriverError::Command(e) => e.to_string().contains("Unable to find session"),
            DriverError::Other(msg) => msg.contains("session lost"),
            DriverError::Session(_) => false,
        }
    }
}

/// A description of where to find an element within a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorSpec {
    /// CSS selector
    Css(String),
    /// XPath expression
    XPath(String),
}

impl LocatorSpec {
    pub fn css(selector: impl Into<String>) -> Self {
        LocatorSpec::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        LocatorSpec::XPath(expression.into())
    }

    /// Borrowed fantoccini form of this locator.
    pub fn as_locator(&self) -> fantoccini::Locator<'_> {
        match self {
            LocatorSpec::Css(s) => fantoccini::Locator::Css(s),
            LocatorSpec::XPath(s) => fantoccini::Locator::XPath(s),
        }
    }
}

impl fmt::Display for LocatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorSpec::Css(s) => write!(f, "css:{}", s),
            LocatorSpec::XPath(s) => write!(f, "xpath:{}", s),
        }
    }
}

/// A handle to a located element.
pub trait PageElement {
    /// Visible text of the element. An empty string is a valid result.
    async fn text(&self) -> Result<String, DriverError>;

    /// Value of the named attribute, if set.
    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError>;
}

/// The browser-driving collaborator: navigation and DOM queries.
///
/// All waiting for asynchronous rendering happens above this trait via fixed
/// settle durations; `locate` only bounds how long a single lookup may poll.
pub trait PageDriver {
    type Handle: PageElement;

    /// Navigate the page to the given URL.
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Look up a single element, waiting up to `timeout` for it to appear.
    /// Absence (including a lookup that times out) is `Ok(None)`.
    async fn locate(
        &mut self,
        locator: &LocatorSpec,
        timeout: Duration,
    ) -> Result<Option<Self::Handle>, DriverError>;

    /// Look up all elements matching the locator, waiting up to `timeout`
    /// for at least one to appear. No matches yields an empty vec.
    async fn locate_all(
        &mut self,
        locator: &LocatorSpec,
        timeout: Duration,
    ) -> Result<Vec<Self::Handle>, DriverError>;

    /// Run a script in the page and return its result.
    async fn run_script(&mut self, code: &str) -> Result<serde_json::Value, DriverError>;

    /// Scroll the page vertically by the given number of pixels.
    async fn scroll_by(&mut self, delta_px: i64) -> Result<(), DriverError>;

    /// Close the browser session.
    async fn close(self) -> Result<(), DriverError>;
}

/// WebDriver URLs to try when the configured one is unreachable.
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// A fantoccini-backed page driver.
pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    /// Connect to a WebDriver server, falling back through a list of common
    /// alternative URLs if the configured one is unreachable.
    pub async fn connect(webdriver_url: &str) -> Result<Self, DriverError> {
        let first_err = match ClientBuilder::native().connect(webdriver_url).await {
            Ok(client) => {
                ::log::debug!("connected to WebDriver at {}", webdriver_url);
                return Ok(Self { client });
            }
            Err(e) => {
                ::log::error!("failed to connect to WebDriver at {}: {}", webdriver_url, e);
                e
            }
        };

        for url in FALLBACK_WEBDRIVER_URLS.iter() {
            if *url == webdriver_url {
                continue;
            }
            ::log::info!("trying fallback WebDriver URL: {}", url);
            if let Ok(client) = ClientBuilder::native().connect(url).await {
                ::log::debug!("connected to fallback WebDriver at {}", url);
                return Ok(Self { client });
            }
        }

        ::log::error!("failed to connect to any WebDriver server");
        ::log::error!(
            "make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(first_err.into())
    }
}

impl PageElement for Element {
    async fn text(&self) -> Result<String, DriverError> {
        Ok(Element::text(self).await?)
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self.attr(name).await?)
    }
}

impl PageDriver for WebDriverPage {
    type Handle = Element;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        Ok(self.client.goto(url).await?)
    }

    async fn locate(
        &mut self,
        locator: &LocatorSpec,
        timeout: Duration,
    ) -> Result<Option<Self::Handle>, DriverError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(locator.as_locator())
            .await
        {
            Ok(element) => Ok(Some(element)),
            Err(CmdError::WaitTimeout) => Ok(None),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn locate_all(
        &mut self,
        locator: &LocatorSpec,
        timeout: Duration,
    ) -> Result<Vec<Self::Handle>, DriverError> {
        // find_all returns immediately, so wait for the first match to give
        // late-rendering lists a chance to appear.
        if self.locate(locator, timeout).await?.is_none() {
            return Ok(Vec::new());
        }
        Ok(self.client.find_all(locator.as_locator()).await?)
    }

    async fn run_script(&mut self, code: &str) -> Result<serde_json::Value, DriverError> {
        Ok(self.client.execute(code, Vec::new()).await?)
    }

    async fn scroll_by(&mut self, delta_px: i64) -> Result<(), DriverError> {
        let code = format!("window.scrollTo(0, window.pageYOffset + {});", delta_px);
        self.client.execute(&code, Vec::new()).await?;
        Ok(())
    }

    async fn close(self) -> Result<(), DriverError> {
        Ok(self.client.close().await?)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet, VecDeque};

    /// A scripted element for driver-consumer tests.
    #[derive(Debug, Clone, Default)]
    pub struct MockElement {
        pub text: Option<String>,
        pub attrs: HashMap<String, String>,
    }

    impl MockElement {
        pub fn with_text(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                attrs: HashMap::new(),
            }
        }

        pub fn with_attr(name: &str, value: &str) -> Self {
            let mut attrs = HashMap::new();
            attrs.insert(name.to_string(), value.to_string());
            Self {
                text: Some(String::new()),
                attrs,
            }
        }
    }

    impl PageElement for MockElement {
        async fn text(&self) -> Result<String, DriverError> {
            self.text
                .clone()
                .ok_or_else(|| DriverError::Other("stale element".to_string()))
        }

        async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
            Ok(self.attrs.get(name).cloned())
        }
    }

    /// Scripted driver. Lookups are answered from per-locator queues first,
    /// then from the current feed window (a sliding window of slot -> href
    /// maps advanced by scroll calls), then reported as misses.
    #[derive(Default)]
    pub struct MockDriver {
        pub lookups: HashMap<String, VecDeque<Option<MockElement>>>,
        /// Every locate call, in order, keyed by locator string.
        pub attempts: Vec<String>,
        pub navigations: Vec<String>,
        pub failing_navigations: HashSet<String>,
        pub session_lost_navigations: HashSet<String>,
        /// Post-scroll feed windows: locator key -> absolute or relative href.
        pub feed: Vec<HashMap<String, String>>,
        pub scrolls: usize,
        /// 1-based index of the scroll call that should fail.
        pub fail_scroll_at: Option<usize>,
        pub scripts: Vec<String>,
        /// Scripted `run_script` results, consumed in order; `Null` once
        /// the queue runs dry.
        pub script_results: VecDeque<serde_json::Value>,
    }

    impl MockDriver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn enqueue(&mut self, locator: &LocatorSpec, outcome: Option<MockElement>) {
            self.lookups
                .entry(locator.to_string())
                .or_default()
                .push_back(outcome);
        }

        pub fn enqueue_misses(&mut self, locator: &LocatorSpec, count: usize) {
            for _ in 0..count {
                self.enqueue(locator, None);
            }
        }

        /// Add a feed window, formatting `template` with each slot index.
        pub fn push_feed_window(&mut self, template: &str, entries: &[(usize, &str)]) {
            let window = entries
                .iter()
                .map(|(slot, href)| {
                    let locator =
                        LocatorSpec::xpath(template.replace("{index}", &slot.to_string()));
                    (locator.to_string(), href.to_string())
                })
                .collect();
            self.feed.push(window);
        }

        pub fn attempts_for(&self, locator: &LocatorSpec) -> usize {
            let key = locator.to_string();
            self.attempts.iter().filter(|a| **a == key).count()
        }

        fn current_window(&self) -> Option<&HashMap<String, String>> {
            if self.scrolls == 0 {
                return None;
            }
            let index = (self.scrolls - 1).min(self.feed.len().checked_sub(1)?);
            self.feed.get(index)
        }
    }

    impl PageDriver for MockDriver {
        type Handle = MockElement;

        async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
            self.navigations.push(url.to_string());
            if self.session_lost_navigations.contains(url) {
                return Err(DriverError::Other("session lost".to_string()));
            }
            if self.failing_navigations.contains(url) {
                return Err(DriverError::Other(format!("navigation to {} failed", url)));
            }
            Ok(())
        }

        async fn locate(
            &mut self,
            locator: &LocatorSpec,
            _timeout: Duration,
        ) -> Result<Option<Self::Handle>, DriverError> {
            let key = locator.to_string();
            self.attempts.push(key.clone());
            if let Some(queue) = self.lookups.get_mut(&key) {
                if let Some(outcome) = queue.pop_front() {
                    return Ok(outcome);
                }
            }
            if let Some(window) = self.current_window() {
                if let Some(href) = window.get(&key) {
                    return Ok(Some(MockElement::with_attr("href", href)));
                }
            }
            Ok(None)
        }

        async fn locate_all(
            &mut self,
            locator: &LocatorSpec,
            timeout: Duration,
        ) -> Result<Vec<Self::Handle>, DriverError> {
            Ok(self.locate(locator, timeout).await?.into_iter().collect())
        }

        async fn run_script(&mut self, code: &str) -> Result<serde_json::Value, DriverError> {
            self.scripts.push(code.to_string());
            Ok(self
                .script_results
                .pop_front()
                .unwrap_or(serde_json::Value::Null))
        }

        async fn scroll_by(&mut self, _delta_px: i64) -> Result<(), DriverError> {
            self.scrolls += 1;
            if self.fail_scroll_at == Some(self.scrolls) {
                return Err(DriverError::Other("scroll failed".to_string()));
            }
            Ok(())
        }

        async fn close(self) -> Result<(), DriverError> {
            Ok(())
        }
    }
}
