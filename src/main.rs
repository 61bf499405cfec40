use clap::Parser;
use scroll_harvest::config::HarvestConfig;
use scroll_harvest::driver::{PageDriver, WebDriverPage};
use scroll_harvest::{harvest, paginate, persist};

mod args;
use args::{Args, Mode};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match HarvestConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("failed to load config {}: {}", path.display(), e);
                return;
            }
        },
        None => HarvestConfig::default(),
    };

    // Config file < WEBDRIVER_URL environment variable < --webdriver-url flag
    if let Ok(url) = std::env::var("WEBDRIVER_URL") {
        if !url.is_empty() {
            config.webdriver_url = url;
        }
    }
    if let Some(url) = &args.webdriver_url {
        config.webdriver_url = url.clone();
    }

    println!("Note: harvesting requires a WebDriver server (e.g. chromedriver).");
    println!(
        "Set WEBDRIVER_URL or --webdriver-url if not using the default {}",
        config.webdriver_url
    );

    let mut driver = match WebDriverPage::connect(&config.webdriver_url).await {
        Ok(driver) => driver,
        Err(e) => {
            ::log::error!("could not open a browser session: {}", e);
            return;
        }
    };

    let identifiers = match args.mode {
        Mode::Collect | Mode::Full => {
            let Some(feed_url) = &args.feed_url else {
                ::log::error!("--feed-url is required for {:?} mode", args.mode);
                close_driver(driver).await;
                return;
            };
            let identifiers = match paginate::collect(&mut driver, feed_url, &config.paginate).await
            {
                Ok(identifiers) => identifiers,
                Err(e) => {
                    ::log::error!("pagination failed: {}", e);
                    close_driver(driver).await;
                    return;
                }
            };
            ::log::info!("collected {} identifiers from the feed", identifiers.len());
            if let Err(e) = persist::write_identifier_list(&args.id_list, &identifiers) {
                ::log::error!(
                    "failed to write identifier list {}: {}",
                    args.id_list.display(),
                    e
                );
            }
            identifiers
        }
        Mode::Extract => match persist::read_identifier_list(&args.id_list) {
            Ok(identifiers) => identifiers,
            Err(e) => {
                ::log::error!(
                    "failed to read identifier list {}: {}",
                    args.id_list.display(),
                    e
                );
                close_driver(driver).await;
                return;
            }
        },
    };

    if matches!(args.mode, Mode::Extract | Mode::Full) {
        let report = harvest::harvest(&mut driver, &identifiers, &config.extract).await;
        for record in &report.records {
            if let Err(e) = persist::write_record(&args.out_dir, record) {
                ::log::warn!("failed to write record for {}: {}", record.url, e);
            }
        }
        let json_path = args.out_dir.join("records.json");
        if let Err(e) = persist::write_records_json(&json_path, &report.records) {
            ::log::warn!("failed to write {}: {}", json_path.display(), e);
        }
        ::log::info!(
            "harvested {} of {} pages",
            report.records.len(),
            identifiers.len()
        );
        if let Some(e) = report.fatal {
            ::log::error!("harvest stopped early, partial output kept: {}", e);
        }
    }

    close_driver(driver).await;
    ::log::info!("done");
}

async fn close_driver(driver: WebDriverPage) {
    if let Err(e) = driver.close().await {
        ::log::warn!("failed to close browser session: {}", e);
    }
}
