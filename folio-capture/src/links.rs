use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::session::{BrowserSession, Selector};

/// Visited-set key: the URL without its fragment.
pub fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Client-side pseudo links and fragment-only references.
pub fn is_pseudo_link(href: &str) -> bool {
    let href = href.trim();
    href.starts_with("javascript:") || href.starts_with("void(0)") || href.starts_with('#')
}

/// Resolve `href` against the page it was found on.
pub fn resolve_link(origin: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || is_pseudo_link(href) {
        return None;
    }
    origin.join(href).ok()
}

pub fn is_same_host(url: &Url, origin: &Url) -> bool {
    match (url.host_str(), origin.host_str()) {
        (Some(host), Some(origin_host)) => host == origin_host,
        _ => false,
    }
}

/// Keep navigable, same-host, unvisited links in the order given.
pub fn filter_links<'a>(
    hrefs: impl IntoIterator<Item = &'a str>,
    origin: &Url,
    visited: &HashSet<String>,
) -> Vec<Url> {
    let mut links = Vec::new();

    for href in hrefs {
        let Some(url) = resolve_link(origin, href) else {
            debug!("  -> Skipping non-navigable link: {:?}", href);
            continue;
        };
        if !is_same_host(&url, origin) {
            debug!("  -> Cross-domain, skipping: {}", url);
            continue;
        }
        if visited.contains(&normalize_url(&url)) {
            debug!("  -> Already visited: {}", url);
            continue;
        }
        links.push(url);
    }

    links
}

/// Links of the current document that the crawl may follow.
pub async fn extract_links<S: BrowserSession>(
    session: &S,
    origin: &Url,
    visited: &HashSet<String>,
) -> Result<Vec<Url>> {
    let anchors = session.query_all(&Selector::css("a")).await?;
    debug!("Found {} anchors on {}", anchors.len(), origin);
    Ok(filter_links(
        anchors.iter().filter_map(|a| a.attr("href")),
        origin,
        visited,
    ))
}
