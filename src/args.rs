use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scroll-harvest")]
#[command(about = "Collects identifiers from an infinite-scroll feed and harvests page content")]
#[command(version)]
pub struct Args {
    /// What to run: feed collection, content extraction, or both
    #[arg(short, long, value_enum, default_value_t = Mode::Full)]
    pub mode: Mode,

    /// Feed (search results) page URL; required for collect and full modes
    #[arg(short, long)]
    pub feed_url: Option<String>,

    /// Identifier list file (written by collect, read by extract)
    #[arg(short, long, default_value = "collected_urls.txt")]
    pub id_list: PathBuf,

    /// Directory for harvested record files
    #[arg(short, long, default_value = "records")]
    pub out_dir: PathBuf,

    /// WebDriver server URL (overrides the config file and WEBDRIVER_URL)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Paginate the feed and persist the collected identifier list
    Collect,
    /// Read an identifier list and harvest content records
    Extract,
    /// Collect, then harvest, with the same browser session
    Full,
}
