use crate::driver::LocatorSpec;
use crate::extract::FieldSpec;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for a harvest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Feed pagination settings
    #[serde(default)]
    pub paginate: PaginateConfig,

    /// Per-page field extraction settings
    #[serde(default)]
    pub extract: ExtractConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            paginate: PaginateConfig::default(),
            extract: ExtractConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: Self = serde_json::from_str(&contents)?;
        // Surface a bad accept pattern at load time rather than mid-run.
        config.paginate.accept_regex()?;
        Ok(config)
    }
}

/// Settings for the pagination engine.
///
/// The threshold and settle durations are empirical; the defaults are the
/// values observed to work on the reference feed, all overridable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginateConfig {
    /// Locator template for one feed slot; `{index}` is replaced with the
    /// 1-based slot position.
    #[serde(default = "default_slot_locator")]
    pub slot_locator: String,

    /// How many slot positions to scan per cycle. The window may exceed the
    /// number of rendered slots; missing slots are skipped.
    #[serde(default = "default_scan_window")]
    pub scan_window: usize,

    /// Consecutive identical anchors before the feed is declared exhausted.
    #[serde(default = "default_stagnation_threshold")]
    pub stagnation_threshold: u32,

    /// Vertical scroll distance per reveal action, in pixels.
    #[serde(default = "default_scroll_step_px")]
    pub scroll_step_px: i64,

    /// Pause after navigating to the feed page.
    #[serde(default = "default_initial_settle_secs")]
    pub initial_settle_secs: u64,

    /// Pause after each reveal action.
    #[serde(default = "default_reveal_settle_secs")]
    pub reveal_settle_secs: u64,

    /// How long one slot lookup may wait.
    #[serde(default = "default_slot_timeout_secs")]
    pub slot_timeout_secs: u64,

    /// Regex a resolved identifier must match to be collected.
    #[serde(default = "default_accept_pattern")]
    pub accept_pattern: Option<String>,
}

impl Default for PaginateConfig {
    fn default() -> Self {
        Self {
            slot_locator: default_slot_locator(),
            scan_window: default_scan_window(),
            stagnation_threshold: default_stagnation_threshold(),
            scroll_step_px: default_scroll_step_px(),
            initial_settle_secs: default_initial_settle_secs(),
            reveal_settle_secs: default_reveal_settle_secs(),
            slot_timeout_secs: default_slot_timeout_secs(),
            accept_pattern: default_accept_pattern(),
        }
    }
}

impl PaginateConfig {
    /// The locator for the given 1-based slot position.
    pub fn slot_locator_for(&self, slot: usize) -> LocatorSpec {
        LocatorSpec::xpath(self.slot_locator.replace("{index}", &slot.to_string()))
    }

    /// Compiled accept pattern, if one is configured.
    pub fn accept_regex(&self) -> Result<Option<Regex>, regex::Error> {
        self.accept_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
    }

    pub fn initial_settle(&self) -> Duration {
        Duration::from_secs(self.initial_settle_secs)
    }

    pub fn reveal_settle(&self) -> Duration {
        Duration::from_secs(self.reveal_settle_secs)
    }

    pub fn slot_timeout(&self) -> Duration {
        Duration::from_secs(self.slot_timeout_secs)
    }
}

/// Settings for the content harvest pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Pause after navigating to each content page.
    #[serde(default = "default_page_settle_secs")]
    pub page_settle_secs: u64,

    /// The field schema: one spec per extracted field, applied in order.
    /// Extending the schema means adding a spec here, not branching code.
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldSpec>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            page_settle_secs: default_page_settle_secs(),
            fields: default_fields(),
        }
    }
}

impl ExtractConfig {
    pub fn page_settle(&self) -> Duration {
        Duration::from_secs(self.page_settle_secs)
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_slot_locator() -> String {
    "/html/body/div[2]/div[1]/div[2]/div[2]/div/div/div[3]/div[1]/section[{index}]/div/a[2]"
        .to_string()
}

fn default_scan_window() -> usize {
    20
}

fn default_stagnation_threshold() -> u32 {
    3
}

fn default_scroll_step_px() -> i64 {
    800
}

fn default_initial_settle_secs() -> u64 {
    15
}

fn default_reveal_settle_secs() -> u64 {
    3
}

fn default_slot_timeout_secs() -> u64 {
    3
}

fn default_accept_pattern() -> Option<String> {
    Some("/search_result/".to_string())
}

fn default_page_settle_secs() -> u64 {
    3
}

/// The reference schema: author, title, body. Primary locators are the
/// observed stable layout; CSS fallbacks cover layout drift. Only the
/// author field has shown transient rendering, so only it retries.
fn default_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(
            "author",
            LocatorSpec::xpath(
                "/html/body/div[2]/div[1]/div[2]/div[2]/div/div[1]/div[4]/div[1]/div/div[1]/a[2]/span",
            ),
        )
        .with_fallback(LocatorSpec::css(".author-container .username")),
        FieldSpec::new(
            "title",
            LocatorSpec::xpath(
                "/html/body/div[2]/div[1]/div[2]/div[2]/div/div[1]/div[4]/div[2]/div[1]/div[1]",
            ),
        )
        .with_fallback(LocatorSpec::css("#detail-title"))
        .with_attempts(1, 0),
        FieldSpec::new(
            "body",
            LocatorSpec::xpath(
                "/html/body/div[2]/div[1]/div[2]/div[2]/div/div[1]/div[4]/div[2]/div[1]/div[2]/span/span[1]",
            ),
        )
        .with_fallback(LocatorSpec::css("#detail-desc .note-text"))
        .with_attempts(1, 0),
    ]
}
