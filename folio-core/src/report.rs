// Crawl reports: console summary and JSON export

use crate::crawl::extract_url_path;
use chrono::{DateTime, Utc};
use colored::Colorize;
use folio_capture::{ExportOutcome, PageRecord, PageStatus};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything one seed worker produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedReport {
    pub seed: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages: Vec<PageRecord>,
    /// Set when the seed could not run at all (e.g. the browser never came up).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SeedReport {
    pub fn new(seed: String, started_at: DateTime<Utc>) -> Self {
        Self {
            seed,
            started_at,
            finished_at: started_at,
            pages: Vec::new(),
            error: None,
        }
    }

    pub fn summary(&self) -> CrawlSummary {
        let mut summary = CrawlSummary::default();
        summary.add(self);
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub seeds: usize,
    pub pages: usize,
    pub archived: usize,
    pub already_present: usize,
    pub deleted: usize,
    pub migrated: usize,
    pub failed_exports: usize,
    pub errors: usize,
}

impl CrawlSummary {
    pub fn from_reports(reports: &[SeedReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            summary.add(report);
        }
        summary
    }

    fn add(&mut self, report: &SeedReport) {
        self.seeds += 1;
        if report.error.is_some() {
            self.errors += 1;
        }
        for page in &report.pages {
            self.pages += 1;
            match page.export {
                Some(ExportOutcome::Written(_)) => self.archived += 1,
                Some(ExportOutcome::AlreadyExists(_)) => self.already_present += 1,
                Some(ExportOutcome::Failed(_)) => self.failed_exports += 1,
                None => {}
            }
            if matches!(page.status, Some(PageStatus::Deleted(_))) {
                self.deleted += 1;
            }
            if page.migrated_to.is_some() {
                self.migrated += 1;
            }
            if page.error.is_some() {
                self.errors += 1;
            }
        }
    }
}

fn page_tag(page: &PageRecord) -> String {
    if page.error.is_some() {
        return format!("{}", "ERR ".red().bold());
    }
    match (&page.status, &page.export) {
        (Some(PageStatus::Deleted(_)), _) => format!("{}", "GONE".yellow()),
        (_, Some(ExportOutcome::Written(_))) => format!("{}", "PDF ".green()),
        (_, Some(ExportOutcome::AlreadyExists(_))) => format!("{}", "HAVE".cyan()),
        (_, Some(ExportOutcome::Failed(_))) => format!("{}", "FAIL".red()),
        _ => format!("{}", "----".bright_black()),
    }
}

/// Render the text summary shown after a crawl.
pub fn generate_crawl_report(reports: &[SeedReport]) -> String {
    let summary = CrawlSummary::from_reports(reports);
    let divider = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n";

    let mut report = String::new();
    report.push_str(divider);
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Seeds: {}\n", summary.seeds));
    report.push_str(&format!("  Pages visited: {}\n", summary.pages));
    report.push_str(&format!("  PDFs written: {}\n", summary.archived));
    report.push_str(&format!("  Already archived: {}\n", summary.already_present));
    report.push_str(&format!("  Deleted pages: {}\n", summary.deleted));
    report.push_str(&format!("  Migrated pages: {}\n", summary.migrated));
    report.push_str(&format!("  Failed exports: {}\n", summary.failed_exports));
    report.push_str(&format!("  Errors: {}\n", summary.errors));
    report.push('\n');
    report.push_str(divider);

    for seed in reports {
        let elapsed = seed.finished_at - seed.started_at;
        report.push_str(&format!("## {}\n", seed.seed));
        if let Some(ref error) = seed.error {
            report.push_str(&format!("  {} {}\n\n", "✗".red().bold(), error));
            continue;
        }
        report.push_str(&format!(
            "  {} pages in {}s\n\n",
            seed.pages.len(),
            elapsed.num_seconds()
        ));

        for page in &seed.pages {
            let indent = "  ".repeat(page.depth);
            let mut line = format!(
                "  {} {}{}",
                page_tag(page),
                indent,
                extract_url_path(&page.url)
            );
            if let Some(ref title) = page.title {
                line.push_str(&format!(" {}", title.bright_white()));
            }
            if let Some(ref target) = page.migrated_to {
                line.push_str(&format!(" {} {}", "→".blue(), target));
            }
            if let Some(ref error) = page.error {
                line.push_str(&format!(" {}", error.bright_black()));
            }
            report.push_str(&line);
            report.push('\n');
        }
        report.push('\n');
    }

    report
}

/// Write the seed reports as pretty JSON, creating parent directories.
pub fn write_json_report(path: &Path, reports: &[SeedReport]) -> Result<(), String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }

    let json = serde_json::to_string_pretty(reports)
        .map_err(|e| format!("Failed to serialize report: {}", e))?;
    fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}
