//! Chromium-backed browser session over the DevTools protocol.

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CaptureError, Result};
use crate::session::{BrowserSession, Element, PageLayout, Selector, SessionLauncher};

/// Launch settings for the Chromium process.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Persistent profile, so a login survives across runs.
    pub profile_dir: Option<PathBuf>,
    pub chrome_executable: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub request_timeout: Duration,
    pub launch_attempts: usize,
    pub launch_backoff: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            profile_dir: None,
            chrome_executable: None,
            window_size: (1920, 1080),
            request_timeout: Duration::from_secs(60),
            launch_attempts: 3,
            launch_backoff: Duration::from_secs(2),
        }
    }
}

impl BrowserOptions {
    fn to_config(&self) -> std::result::Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.window_size.0, self.window_size.1)
            .request_timeout(self.request_timeout)
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--log-level=3")
            .arg("--silent");

        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(ref dir) = self.profile_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(ref exe) = self.chrome_executable {
            builder = builder.chrome_executable(exe);
        }

        builder.build()
    }
}

pub struct ChromeLauncher {
    options: BrowserOptions,
}

impl ChromeLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    async fn launch_once(&self) -> Result<ChromeSession> {
        let config = self.options.to_config().map_err(CaptureError::Session)?;
        let (browser, mut handler) = Browser::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(e.into());
            }
        };

        Ok(ChromeSession {
            browser,
            page,
            handler,
        })
    }
}

impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self) -> Result<ChromeSession> {
        let attempts = self.options.launch_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.launch_once().await {
                Ok(session) => {
                    info!("Browser session started (headless: {})", self.options.headless);
                    return Ok(session);
                }
                Err(e) => {
                    warn!("Browser launch attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.options.launch_backoff).await;
                    }
                }
            }
        }

        Err(CaptureError::Launch {
            attempts,
            reason: last_error,
        })
    }
}

pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.page.goto(url.as_str()).await?;
        Ok(())
    }

    async fn query_all(&self, selector: &Selector) -> Result<Vec<Element>> {
        let script = snapshot_script(selector);
        let elements = self.page.evaluate(script).await?.into_value::<Vec<Element>>()?;
        Ok(elements)
    }

    async fn document_title(&self) -> Result<Option<String>> {
        Ok(self.page.get_title().await?)
    }

    async fn render_pdf(&self, layout: &PageLayout) -> Result<Option<Vec<u8>>> {
        let params = PrintToPdfParams::builder()
            .landscape(layout.landscape)
            .display_header_footer(layout.display_header_footer)
            .print_background(layout.print_background)
            .prefer_css_page_size(layout.prefer_css_page_size)
            .paper_width(layout.paper_width)
            .paper_height(layout.paper_height)
            .margin_top(layout.margin_top)
            .margin_bottom(layout.margin_bottom)
            .margin_left(layout.margin_left)
            .margin_right(layout.margin_right)
            .scale(layout.scale)
            .build();

        let data = self.page.pdf(params).await?;
        Ok((!data.is_empty()).then_some(data))
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process wait failed: {}", e);
        }
        self.handler.abort();
        info!("Browser session closed");
    }
}

/// Builds the script that snapshots matching elements as JSON.
fn snapshot_script(selector: &Selector) -> String {
    let (kind, expression) = match selector {
        Selector::Css(css) => ("css", css.clone()),
        Selector::TextContains(text) => {
            ("xpath", format!("//*[contains(text(), {})]", xpath_literal(text)))
        }
        Selector::LinkText(text) => {
            ("xpath", format!("//a[contains(text(), {})]", xpath_literal(text)))
        }
    };
    // serde_json string encoding doubles as a JS string literal
    let expression = serde_json::Value::String(expression).to_string();

    format!(
        r#"(() => {{
  const kind = "{kind}";
  const expr = {expression};
  let nodes = [];
  if (kind === "css") {{
    nodes = Array.from(document.querySelectorAll(expr));
  }} else {{
    const found = document.evaluate(expr, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    for (let i = 0; i < found.snapshotLength; i++) nodes.push(found.snapshotItem(i));
  }}
  const snap = (el) => {{
    const attributes = {{}};
    for (const attr of Array.from(el.attributes || [])) attributes[attr.name] = attr.value;
    if (typeof el.href === "string" && el.href) attributes.href = el.href;
    return {{ text: (el.innerText || el.textContent || "").trim(), attributes, parent: null }};
  }};
  return nodes.map((el) => {{
    const out = snap(el);
    const linked = el.parentElement ? el.parentElement.closest("[href]") : null;
    if (linked) out.parent = snap(linked);
    return out;
  }});
}})()"#
    )
}

fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
