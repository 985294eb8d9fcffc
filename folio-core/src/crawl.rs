use crate::report::SeedReport;
use chrono::Utc;
use folio_capture::{BrowserSession, CrawlSession, Crawler, SessionLauncher, StopFlag};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub urls: Vec<String>,
    /// Seeds crawled at the same time, each with its own browser.
    pub workers: usize,
    pub max_depth: usize,
    /// Settle time after every navigation.
    pub delay: Duration,
    pub archive_root: PathBuf,
    pub login_poll_interval: Duration,
    pub show_progress_bars: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            workers: 1,
            max_depth: 3,
            delay: Duration::from_secs(3),
            archive_root: PathBuf::from("pdfs"),
            login_poll_interval: Duration::from_secs(1),
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Crawl every seed into `options.archive_root`.
///
/// Seeds run as independent workers, at most `options.workers` at a time,
/// each with its own browser session and visited set. A seed that cannot
/// start is reported with an error; the others carry on. Reports come back
/// in seed order.
pub async fn execute_crawl<L: SessionLauncher>(
    options: CrawlOptions,
    launcher: &L,
    stop: StopFlag,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<Vec<SeedReport>, String> {
    let CrawlOptions {
        urls,
        workers,
        max_depth,
        delay,
        archive_root,
        login_poll_interval,
        show_progress_bars,
    } = options;

    if urls.is_empty() {
        return Err("No seed URLs to crawl".to_string());
    }

    std::fs::create_dir_all(&archive_root).map_err(|e| {
        format!(
            "Failed to create archive directory {}: {}",
            archive_root.display(),
            e
        )
    })?;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));
    let page_callback: folio_capture::ProgressCallback = {
        let pb = progress_bar.clone();
        let count = processed_count.clone();
        Arc::new(move |depth: usize, url: String| {
            let n = count.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(ref pb) = pb {
                pb.set_message(format!("[{} pages] depth {}: {}", n, depth, url));
            }
        })
    };

    let crawler = Crawler::new()
        .with_login_poll_interval(login_poll_interval)
        .with_progress_callback(page_callback);

    let total = urls.len();
    let reports: Vec<SeedReport> = stream::iter(urls.into_iter().enumerate())
        .map(|(idx, seed)| {
            if let Some(ref callback) = progress_callback
                && total > 1
            {
                callback(format!("Crawling seed {}/{}: {}", idx + 1, total, seed));
            }
            run_seed(
                &crawler,
                launcher,
                seed,
                max_depth,
                delay,
                &archive_root,
                stop.clone(),
            )
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    for report in &reports {
        if let (Some(callback), Some(error)) = (&progress_callback, &report.error) {
            callback(format!("[!]  Failed to crawl {}: {}", report.seed, error));
        }
    }

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!("Crawl complete! {} pages processed", total));
    }

    Ok(reports)
}

/// One seed worker. The session is closed before returning, whatever the
/// crawl did.
async fn run_seed<L: SessionLauncher>(
    crawler: &Crawler,
    launcher: &L,
    seed: String,
    max_depth: usize,
    delay: Duration,
    archive_root: &Path,
    stop: StopFlag,
) -> SeedReport {
    let mut report = SeedReport::new(seed.clone(), Utc::now());

    let url = match Url::parse(&seed) {
        Ok(url) => url,
        Err(e) => {
            warn!("Skipping invalid seed {}: {}", seed, e);
            report.error = Some(format!("Invalid seed URL: {}", e));
            report.finished_at = Utc::now();
            return report;
        }
    };

    if stop.is_requested() {
        report.error = Some("Crawl cancelled".to_string());
        report.finished_at = Utc::now();
        return report;
    }

    let mut session = match launcher.launch().await {
        Ok(session) => session,
        Err(e) => {
            warn!("Could not start browser for {}: {}", seed, e);
            report.error = Some(e.to_string());
            report.finished_at = Utc::now();
            return report;
        }
    };

    let mut state = CrawlSession::new(url, max_depth, delay, stop);
    report.pages = crawler.crawl(&mut session, &mut state, archive_root).await;
    session.close().await;

    report.finished_at = Utc::now();
    info!(
        "Seed {} finished: {} pages visited",
        seed,
        state.visited().len()
    );
    report
}
