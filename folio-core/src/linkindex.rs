//! Link sheets: one CSV per seed page listing every labelled anchor.
//!
//! Unlike the crawl, this does not filter by host or depth. It records what a
//! reader sees on the page: each anchor's `title` attribute (or visible text)
//! next to its address.

use crate::crawl::CrawlProgressCallback;
use folio_capture::export::archive_name;
use folio_capture::session::{Element, Selector};
use folio_capture::{BrowserSession, CaptureError, SessionLauncher, StopFlag};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const UNKNOWN_TITLE: &str = "Unknown";

pub const SHEET_HEADERS: [&str; 3] = ["No.", "Title", "URL"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSheet {
    pub page_title: String,
    pub entries: Vec<LinkEntry>,
}

pub struct LinkIndexOptions {
    pub urls: Vec<String>,
    pub workers: usize,
    pub delay: Duration,
    pub output_dir: PathBuf,
}

impl Default for LinkIndexOptions {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            workers: 1,
            delay: Duration::from_secs(3),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Outcome of one seed's link sheet.
#[derive(Debug, Clone, Serialize)]
pub struct LinkSheetReport {
    pub seed: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub links: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_script_link(href: &str) -> bool {
    href.starts_with("javascript:") || href.starts_with("void(0)")
}

/// Labelled, navigable anchors in document order.
pub fn sheet_entries(anchors: &[Element]) -> Vec<LinkEntry> {
    anchors
        .iter()
        .filter_map(|anchor| {
            let url = anchor.attr("href")?;
            if is_script_link(url) {
                return None;
            }
            let title = anchor
                .attr("title")
                .unwrap_or_else(|| anchor.trimmed_text());
            if title.is_empty() {
                return None;
            }
            Some(LinkEntry {
                title: title.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Load `url` and read its heading and anchors.
pub async fn collect_links<S: BrowserSession>(
    session: &mut S,
    url: &Url,
    delay: Duration,
) -> Result<LinkSheet, CaptureError> {
    session.navigate(url).await?;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let page_title = match session.query(&Selector::css("h1")).await? {
        Some(heading) if !heading.trimmed_text().is_empty() => heading.trimmed_text().to_string(),
        _ => UNKNOWN_TITLE.to_string(),
    };

    let anchors = session.query_all(&Selector::css("a")).await?;
    let entries = sheet_entries(&anchors);
    debug!(
        "{}: {} anchors, {} kept for the sheet",
        url,
        anchors.len(),
        entries.len()
    );

    Ok(LinkSheet {
        page_title,
        entries,
    })
}

pub fn sheet_path(output_dir: &Path, page_title: &str) -> PathBuf {
    output_dir.join(format!("{}.csv", archive_name(page_title)))
}

/// Write `<output_dir>/<title>.csv` with 1-based numbering.
pub fn write_link_sheet(sheet: &LinkSheet, output_dir: &Path) -> Result<PathBuf, String> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| format!("Failed to create {}: {}", output_dir.display(), e))?;

    let path = sheet_path(output_dir, &sheet.page_title);
    let file =
        File::create(&path).map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    let mut writer = csv::Writer::from_writer(file);

    let write_err = |e: csv::Error| format!("Failed to write {}: {}", path.display(), e);
    writer.write_record(SHEET_HEADERS).map_err(write_err)?;
    for (idx, entry) in sheet.entries.iter().enumerate() {
        let number = (idx + 1).to_string();
        writer
            .write_record([number.as_str(), entry.title.as_str(), entry.url.as_str()])
            .map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|e| format!("Failed to flush {}: {}", path.display(), e))?;

    info!("Link sheet saved: {} ({} links)", path.display(), sheet.entries.len());
    Ok(path)
}

/// Build one link sheet per seed, `options.workers` seeds at a time.
pub async fn execute_link_index<L: SessionLauncher>(
    options: LinkIndexOptions,
    launcher: &L,
    stop: StopFlag,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<Vec<LinkSheetReport>, String> {
    let LinkIndexOptions {
        urls,
        workers,
        delay,
        output_dir,
    } = options;

    if urls.is_empty() {
        return Err("No seed URLs to index".to_string());
    }

    let total = urls.len();
    let reports = stream::iter(urls.into_iter().enumerate())
        .map(|(idx, seed)| {
            if let Some(ref callback) = progress_callback {
                callback(format!("Indexing {}/{}: {}", idx + 1, total, seed));
            }
            index_seed(launcher, seed, delay, &output_dir, stop.clone())
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    Ok(reports)
}

async fn index_seed<L: SessionLauncher>(
    launcher: &L,
    seed: String,
    delay: Duration,
    output_dir: &Path,
    stop: StopFlag,
) -> LinkSheetReport {
    let mut report = LinkSheetReport {
        seed: seed.clone(),
        path: None,
        links: 0,
        error: None,
    };

    let url = match Url::parse(&seed) {
        Ok(url) => url,
        Err(e) => {
            report.error = Some(format!("Invalid seed URL: {}", e));
            return report;
        }
    };
    if stop.is_requested() {
        report.error = Some(CaptureError::Cancelled.to_string());
        return report;
    }

    let mut session = match launcher.launch().await {
        Ok(session) => session,
        Err(e) => {
            warn!("Could not start browser for {}: {}", seed, e);
            report.error = Some(e.to_string());
            return report;
        }
    };

    let collected = collect_links(&mut session, &url, delay).await;
    session.close().await;

    match collected {
        Ok(sheet) => {
            report.links = sheet.entries.len();
            match write_link_sheet(&sheet, output_dir) {
                Ok(path) => report.path = Some(path),
                Err(e) => report.error = Some(e),
            }
        }
        Err(e) => {
            warn!("Failed to index {}: {}", seed, e);
            report.error = Some(e.to_string());
        }
    }
    report
}
