//! Page classification.
//!
//! Classification runs in two steps: [`probe_page`] asks the session a fixed
//! set of questions, then [`decide`] applies an ordered list of pure checks
//! to the answers. Content-status checks come before the login check, so a
//! removed page is reported as deleted even when it also lacks the
//! authenticated-content marker.

use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CaptureError, Result};
use crate::result::PageStatus;
use crate::session::{BrowserSession, Selector};
use crate::stop::StopFlag;

/// Markers used to recognise page states.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    /// Present only when the content is unlocked for the viewer.
    pub content_marker: Selector,
    /// Tried in order for the page title.
    pub title_selectors: Vec<Selector>,
    pub fallback_title: String,
    pub migration_notice: String,
    pub migration_link_label: String,
    pub removal_notices: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            content_marker: Selector::css(".rich_media_title"),
            title_selectors: vec![Selector::css(".rich_media_title"), Selector::css("h1")],
            fallback_title: "Untitled".to_string(),
            migration_notice: "该公众号已迁移".to_string(),
            migration_link_label: "访问文章".to_string(),
            removal_notices: vec![
                "该内容已被发布者删除".to_string(),
                "此内容因违规无法查看".to_string(),
                "该公众号已被屏蔽".to_string(),
                "该内容已被投诉".to_string(),
                "抱歉，此内容已被删除".to_string(),
            ],
        }
    }
}

/// Answers gathered from the current document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageProbe {
    pub removal_notice: Option<String>,
    pub migration_notice: bool,
    pub migration_href: Option<String>,
    pub authenticated: bool,
}

pub async fn probe_page<S: BrowserSession>(
    session: &S,
    rules: &ClassifierRules,
) -> Result<PageProbe> {
    let mut probe = PageProbe::default();

    for notice in &rules.removal_notices {
        if !session
            .query_all(&Selector::text_contains(notice.as_str()))
            .await?
            .is_empty()
        {
            probe.removal_notice = Some(notice.clone());
            break;
        }
    }

    probe.migration_notice = !session
        .query_all(&Selector::text_contains(rules.migration_notice.as_str()))
        .await?
        .is_empty();

    if probe.migration_notice {
        probe.migration_href = session
            .query(&Selector::link_text(rules.migration_link_label.as_str()))
            .await?
            .and_then(|el| el.href_or_parent().map(str::to_string));
    }

    probe.authenticated = session.query(&rules.content_marker).await?.is_some();

    Ok(probe)
}

/// Ordered checks: deleted, migrated, login wall, alive.
pub fn decide(probe: &PageProbe, page_url: &Url) -> Result<PageStatus> {
    if let Some(ref notice) = probe.removal_notice {
        return Ok(PageStatus::Deleted(notice.clone()));
    }

    if probe.migration_notice {
        let target = probe
            .migration_href
            .as_deref()
            .and_then(|href| page_url.join(href).ok())
            .ok_or_else(|| CaptureError::UnresolvedMigration(page_url.to_string()))?;
        return Ok(PageStatus::Migrated(target));
    }

    if !probe.authenticated {
        return Ok(PageStatus::RequiresLogin);
    }

    Ok(PageStatus::Alive)
}

pub async fn classify<S: BrowserSession>(
    session: &S,
    rules: &ClassifierRules,
    page_url: &Url,
) -> Result<PageStatus> {
    let probe = probe_page(session, rules).await?;
    debug!("Probe for {}: {:?}", page_url, probe);
    decide(&probe, page_url)
}

/// Best available title; never fails.
pub async fn page_title<S: BrowserSession>(session: &S, rules: &ClassifierRules) -> String {
    for selector in &rules.title_selectors {
        match session.query(selector).await {
            Ok(Some(el)) if !el.trimmed_text().is_empty() => {
                return el.trimmed_text().to_string();
            }
            Ok(_) => {}
            Err(e) => debug!("Title lookup {:?} failed: {}", selector, e),
        }
    }

    match session.document_title().await {
        Ok(Some(title)) if !title.trim().is_empty() => title.trim().to_string(),
        _ => rules.fallback_title.clone(),
    }
}

/// Block until the authenticated-content marker shows up.
///
/// The operator completes the login in the visible browser window. The stop
/// flag is checked before every poll.
pub async fn wait_for_login<S: BrowserSession>(
    session: &S,
    rules: &ClassifierRules,
    stop: &StopFlag,
    interval: Duration,
) -> Result<()> {
    warn!("Login required. Complete the login in the browser window; the crawl resumes automatically.");

    loop {
        if stop.is_requested() {
            return Err(CaptureError::Cancelled);
        }
        match session.query(&rules.content_marker).await {
            Ok(Some(_)) => {
                info!("Login detected, continuing");
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => debug!("Login poll failed: {}", e),
        }
        tokio::time::sleep(interval).await;
    }
}
