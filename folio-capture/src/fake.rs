//! Scripted in-memory browser for tests.
//!
//! A [`FakeSite`] maps URLs to [`FakePage`]s; a [`FakeSession`] walks the
//! site and records every navigation and render into a shared [`FakeLog`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

use crate::error::{CaptureError, Result};
use crate::links::normalize_url;
use crate::session::{BrowserSession, Element, PageLayout, Selector, SessionLauncher};

pub const MARKER_SELECTOR: &str = ".rich_media_title";

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    title: Option<String>,
    elements: Vec<(String, Element)>,
    texts: Vec<String>,
    pdf: Option<Vec<u8>>,
    locked_polls: usize,
    fail_navigation: bool,
}

impl FakePage {
    /// An unlocked article page whose heading marker holds `title`.
    pub fn article(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            elements: vec![(MARKER_SELECTOR.to_string(), Element::with_text(title))],
            pdf: Some(format!("%PDF-1.4 {}", title).into_bytes()),
            ..Default::default()
        }
    }

    /// A page without the authenticated-content marker.
    pub fn blank() -> Self {
        Self {
            pdf: Some(b"%PDF-1.4".to_vec()),
            ..Default::default()
        }
    }

    pub fn with_document_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn element(mut self, selector: &str, element: Element) -> Self {
        self.elements.push((selector.to_string(), element));
        self
    }

    pub fn link(self, href: &str) -> Self {
        let element = Element::with_text(href).with_attr("href", href);
        self.element("a", element)
    }

    pub fn labelled_link(self, href: &str, label: &str) -> Self {
        let element = Element::with_text(label).with_attr("href", href);
        self.element("a", element)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.texts.push(text.to_string());
        self
    }

    /// Hide the marker until it has been queried `polls` times.
    pub fn login_after(mut self, polls: usize) -> Self {
        self.locked_polls = polls;
        self
    }

    pub fn without_pdf(mut self) -> Self {
        self.pdf = None;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_navigation = true;
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        let key = Url::parse(url)
            .map(|u| normalize_url(&u))
            .unwrap_or_else(|_| url.to_string());
        self.pages.insert(key, page);
        self
    }

    fn get(&self, url: &Url) -> Option<&FakePage> {
        self.pages.get(&normalize_url(url))
    }
}

#[derive(Debug, Default)]
pub struct FakeLog {
    pub navigations: Vec<String>,
    pub renders: Vec<String>,
    pub launched: usize,
    pub closed: usize,
}

impl FakeLog {
    pub fn navigation_count(&self, url: &str) -> usize {
        self.navigations.iter().filter(|u| u.as_str() == url).count()
    }
}

pub struct FakeSession {
    site: Arc<FakeSite>,
    log: Arc<Mutex<FakeLog>>,
    current: Option<Url>,
    marker_polls: Mutex<usize>,
}

impl FakeSession {
    pub fn new(site: FakeSite) -> Self {
        Self::shared(Arc::new(site), Arc::new(Mutex::new(FakeLog::default())))
    }

    pub fn shared(site: Arc<FakeSite>, log: Arc<Mutex<FakeLog>>) -> Self {
        Self {
            site,
            log,
            current: None,
            marker_polls: Mutex::new(0),
        }
    }

    pub fn log(&self) -> Arc<Mutex<FakeLog>> {
        self.log.clone()
    }

    fn current_page(&self) -> Result<&FakePage> {
        let url = self
            .current
            .as_ref()
            .ok_or_else(|| CaptureError::Session("no document loaded".to_string()))?;
        self.site
            .get(url)
            .ok_or_else(|| CaptureError::Session(format!("no such page: {}", url)))
    }

    fn marker_unlocked(&self, page: &FakePage) -> bool {
        let mut polls = self.marker_polls.lock().unwrap_or_else(|e| e.into_inner());
        if *polls >= page.locked_polls {
            return true;
        }
        *polls += 1;
        false
    }
}

impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        if let Ok(mut log) = self.log.lock() {
            log.navigations.push(url.to_string());
        }
        let page = self
            .site
            .get(url)
            .ok_or_else(|| CaptureError::Session(format!("no such page: {}", url)))?;
        if page.fail_navigation {
            return Err(CaptureError::Session(format!("navigation failed: {}", url)));
        }
        self.current = Some(url.clone());
        if let Ok(mut polls) = self.marker_polls.lock() {
            *polls = 0;
        }
        Ok(())
    }

    async fn query_all(&self, selector: &Selector) -> Result<Vec<Element>> {
        let page = self.current_page()?;
        let found = match selector {
            Selector::Css(css) => {
                if css == MARKER_SELECTOR && !self.marker_unlocked(page) {
                    return Ok(Vec::new());
                }
                page.elements
                    .iter()
                    .filter(|(s, _)| s == css)
                    .map(|(_, e)| e.clone())
                    .collect()
            }
            Selector::TextContains(needle) => page
                .texts
                .iter()
                .filter(|t| t.contains(needle.as_str()))
                .map(|t| Element::with_text(t.clone()))
                .chain(
                    page.elements
                        .iter()
                        .filter(|(_, e)| e.text.contains(needle.as_str()))
                        .map(|(_, e)| e.clone()),
                )
                .collect(),
            Selector::LinkText(needle) => page
                .elements
                .iter()
                .filter(|(s, e)| s == "a" && e.text.contains(needle.as_str()))
                .map(|(_, e)| e.clone())
                .collect(),
        };
        Ok(found)
    }

    async fn document_title(&self) -> Result<Option<String>> {
        Ok(self.current_page()?.title.clone())
    }

    async fn render_pdf(&self, _layout: &PageLayout) -> Result<Option<Vec<u8>>> {
        let page = self.current_page()?;
        if let (Ok(mut log), Some(url)) = (self.log.lock(), self.current.as_ref()) {
            log.renders.push(url.to_string());
        }
        Ok(page.pdf.clone())
    }

    async fn close(self) {
        if let Ok(mut log) = self.log.lock() {
            log.closed += 1;
        }
    }
}

/// Hands out [`FakeSession`]s over one shared site and log.
pub struct FakeLauncher {
    site: Arc<FakeSite>,
    log: Arc<Mutex<FakeLog>>,
    fail: bool,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            log: Arc::new(Mutex::new(FakeLog::default())),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<FakeLog>> {
        self.log.clone()
    }
}

impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession> {
        if self.fail {
            return Err(CaptureError::Launch {
                attempts: 1,
                reason: "browser binary not found".to_string(),
            });
        }
        if let Ok(mut log) = self.log.lock() {
            log.launched += 1;
        }
        Ok(FakeSession::shared(self.site.clone(), self.log.clone()))
    }
}
