use crate::classify::{ClassifierRules, classify, page_title, wait_for_login};
use crate::error::{CaptureError, Result};
use crate::export::{archive_name, export_page};
use crate::links::{extract_links, normalize_url};
use crate::result::{ExportOutcome, PageOutcome, PageRecord, PageStatus};
use crate::session::{BrowserSession, PageLayout};
use crate::stop::StopFlag;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Called with `(depth, url)` before each page is loaded.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// State of one seed's crawl. Never shared between seeds.
#[derive(Debug)]
pub struct CrawlSession {
    seed: Url,
    max_depth: usize,
    delay: Duration,
    visited: HashSet<String>,
    stop: StopFlag,
}

impl CrawlSession {
    pub fn new(seed: Url, max_depth: usize, delay: Duration, stop: StopFlag) -> Self {
        Self {
            seed,
            max_depth,
            delay,
            visited: HashSet::new(),
            stop,
        }
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(&normalize_url(url))
    }

    /// Returns false if the URL was already in the set.
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(normalize_url(url))
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_requested()
    }
}

/// A pending visit on the traversal stack.
struct Frame {
    url: Url,
    depth: usize,
    parent_dir: PathBuf,
}

pub struct Crawler {
    rules: ClassifierRules,
    layout: PageLayout,
    login_poll_interval: Duration,
    max_migration_hops: usize,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new() -> Self {
        Self {
            rules: ClassifierRules::default(),
            layout: PageLayout::default(),
            login_poll_interval: Duration::from_secs(1),
            max_migration_hops: 5,
            progress_callback: None,
        }
    }

    pub fn with_rules(mut self, rules: ClassifierRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_layout(mut self, layout: PageLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_login_poll_interval(mut self, interval: Duration) -> Self {
        self.login_poll_interval = interval;
        self
    }

    pub fn with_max_migration_hops(mut self, hops: usize) -> Self {
        self.max_migration_hops = hops;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Depth-first crawl of the seed's subtree into `archive_dir`.
    ///
    /// Children are visited in document order, each subtree finishing before
    /// the next sibling starts. Page errors are recorded and the walk goes on;
    /// only cancellation ends it early.
    pub async fn crawl<S: BrowserSession>(
        &self,
        session: &mut S,
        state: &mut CrawlSession,
        archive_dir: &Path,
    ) -> Vec<PageRecord> {
        info!(
            "Starting crawl of {} (max depth {})",
            state.seed(),
            state.max_depth()
        );

        let mut stack = vec![Frame {
            url: state.seed().clone(),
            depth: 0,
            parent_dir: archive_dir.to_path_buf(),
        }];
        let mut records = Vec::new();

        while let Some(frame) = stack.pop() {
            if state.stop_requested() {
                info!("Stop requested, abandoning remaining pages");
                break;
            }
            if frame.depth > state.max_depth() || state.is_visited(&frame.url) {
                debug!("Skipping {} (depth {})", frame.url, frame.depth);
                continue;
            }

            match self.visit(session, state, &frame).await {
                Ok((record, children)) => {
                    records.push(record);
                    // reversed so the first link is popped first
                    stack.extend(children.into_iter().rev());
                }
                Err(CaptureError::Cancelled) => {
                    info!("Crawl cancelled at {}", frame.url);
                    records.push(PageRecord::with_error(
                        frame.url.to_string(),
                        frame.depth,
                        CaptureError::Cancelled.to_string(),
                    ));
                    break;
                }
                Err(e) => {
                    warn!("Error processing {}: {}", frame.url, e);
                    records.push(PageRecord::with_error(
                        frame.url.to_string(),
                        frame.depth,
                        e.to_string(),
                    ));
                }
            }
        }

        info!(
            "Crawl of {} complete. Visited {} pages",
            state.seed(),
            state.visited.len()
        );
        records
    }

    async fn visit<S: BrowserSession>(
        &self,
        session: &mut S,
        state: &mut CrawlSession,
        frame: &Frame,
    ) -> Result<(PageRecord, Vec<Frame>)> {
        state.mark_visited(&frame.url);
        if let Some(ref callback) = self.progress_callback {
            callback(frame.depth, frame.url.to_string());
        }
        info!("Depth {}: processing {}", frame.depth, frame.url);

        let mut record = PageRecord::new(frame.url.to_string(), frame.depth);
        self.load(session, state, &frame.url).await?;

        let Some(page_url) = self.settle_status(session, state, &frame.url, &mut record).await?
        else {
            return Ok((record, Vec::new()));
        };

        let title = page_title(session, &self.rules).await;
        info!("Page title: {}", title);

        let expand = frame.depth < state.max_depth();
        let mut dir = frame.parent_dir.clone();
        let mut dir_error = None;
        if expand {
            let page_dir = frame.parent_dir.join(archive_name(&title));
            match tokio::fs::create_dir_all(&page_dir).await {
                Ok(()) => {
                    debug!("Archive directory: {}", page_dir.display());
                    dir = page_dir;
                }
                // children fall back to the parent directory
                Err(e) => {
                    warn!("Cannot create {}: {}", page_dir.display(), e);
                    dir_error = Some(format!("{}: {}", page_dir.display(), e));
                }
            }
        }

        let export = match dir_error {
            Some(reason) => ExportOutcome::Failed(reason),
            None => export_page(session, &title, &dir, &self.layout).await,
        };
        if let Some(path) = export.path() {
            debug!("Archived {} as {}", page_url, path.display());
        } else if let ExportOutcome::Failed(ref reason) = export {
            warn!("PDF export failed for {}: {}", page_url, reason);
        }
        record.export = Some(export);

        if !expand {
            debug!("Max depth {} reached at {}", state.max_depth(), page_url);
            record.title = Some(title);
            return Ok((record, Vec::new()));
        }

        let links = match extract_links(session, &page_url, &state.visited).await {
            Ok(links) => links,
            Err(e) => {
                warn!("Failed to extract links from {}: {}", page_url, e);
                record.error = Some(e.to_string());
                Vec::new()
            }
        };
        info!("Found {} followable links on {}", links.len(), page_url);

        let outcome = PageOutcome {
            status: PageStatus::Alive,
            title,
            extracted_links: links,
        };
        record.absorb(&outcome);

        let children = outcome
            .extracted_links
            .into_iter()
            .map(|url| Frame {
                url,
                depth: frame.depth + 1,
                parent_dir: dir.clone(),
            })
            .collect();

        Ok((record, children))
    }

    /// Navigate and let dynamic content settle.
    async fn load<S: BrowserSession>(
        &self,
        session: &mut S,
        state: &CrawlSession,
        url: &Url,
    ) -> Result<()> {
        if state.stop_requested() {
            return Err(CaptureError::Cancelled);
        }
        session.navigate(url).await?;
        if !state.delay.is_zero() {
            tokio::time::sleep(state.delay).await;
        }
        Ok(())
    }

    /// Classify until the page is alive. Returns the URL of the live
    /// document, or `None` when the page is deleted.
    async fn settle_status<S: BrowserSession>(
        &self,
        session: &mut S,
        state: &mut CrawlSession,
        url: &Url,
        record: &mut PageRecord,
    ) -> Result<Option<Url>> {
        let mut current = url.clone();
        let mut hops = 0;

        loop {
            match classify(session, &self.rules, &current).await? {
                PageStatus::Alive => {
                    record.status = Some(PageStatus::Alive);
                    return Ok(Some(current));
                }
                PageStatus::Deleted(notice) => {
                    warn!("Page unavailable ({}), skipping: {}", notice, current);
                    record.status = Some(PageStatus::Deleted(notice));
                    return Ok(None);
                }
                PageStatus::Migrated(target) => {
                    hops += 1;
                    if hops > self.max_migration_hops {
                        return Err(CaptureError::MigrationLoop(url.to_string()));
                    }
                    info!("Content migrated: {} -> {}", current, target);
                    record.migrated_to = Some(target.to_string());
                    if !state.mark_visited(&target) {
                        info!("Migration target already visited, skipping: {}", target);
                        record.status = Some(PageStatus::Migrated(target));
                        return Ok(None);
                    }
                    self.load(session, state, &target).await?;
                    current = target;
                }
                PageStatus::RequiresLogin => {
                    wait_for_login(session, &self.rules, &state.stop, self.login_poll_interval)
                        .await?;
                }
            }
        }
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}
