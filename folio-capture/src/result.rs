use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// What the classifier concluded about the current document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PageStatus {
    Alive,
    /// Removed or blocked; carries the matched notice.
    Deleted(String),
    /// Content moved; carries the address found behind the notice.
    Migrated(Url),
    RequiresLogin,
}

/// Classification, title and discovered links of one page visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub status: PageStatus,
    pub title: String,
    pub extracted_links: Vec<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExportOutcome {
    Written(PathBuf),
    /// The target was already on disk; nothing was rendered.
    AlreadyExists(PathBuf),
    Failed(String),
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ExportOutcome::Failed(_))
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ExportOutcome::Written(p) | ExportOutcome::AlreadyExists(p) => Some(p),
            ExportOutcome::Failed(_) => None,
        }
    }
}

/// Report entry for one visited URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrated_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportOutcome>,
    pub links_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageRecord {
    pub fn new(url: String, depth: usize) -> Self {
        Self {
            url,
            depth,
            status: None,
            migrated_to: None,
            title: None,
            export: None,
            links_found: 0,
            error: None,
        }
    }

    pub fn with_error(url: String, depth: usize, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(url, depth)
        }
    }

    pub fn absorb(&mut self, outcome: &PageOutcome) {
        self.status = Some(outcome.status.clone());
        self.title = Some(outcome.title.clone());
        self.links_found = outcome.extracted_links.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_outcome_success() {
        assert!(ExportOutcome::Written(PathBuf::from("a.pdf")).is_success());
        assert!(ExportOutcome::AlreadyExists(PathBuf::from("a.pdf")).is_success());
        assert!(!ExportOutcome::Failed("no data".into()).is_success());
        assert_eq!(ExportOutcome::Failed("x".into()).path(), None);
    }

    #[test]
    fn test_page_status_serializes_tagged() {
        let json = serde_json::to_string(&PageStatus::Deleted("gone".into())).unwrap();
        assert_eq!(json, r#"{"kind":"deleted","detail":"gone"}"#);
        let json = serde_json::to_string(&PageStatus::Alive).unwrap();
        assert_eq!(json, r#"{"kind":"alive"}"#);
    }

    #[test]
    fn test_record_with_error_has_no_status() {
        let record = PageRecord::with_error("https://example.com/".into(), 1, "boom".into());
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert!(record.status.is_none());
    }

    #[test]
    fn test_record_absorbs_outcome() {
        let mut record = PageRecord::new("https://example.com/".into(), 0);
        record.absorb(&PageOutcome {
            status: PageStatus::Alive,
            title: "Home".into(),
            extracted_links: vec![Url::parse("https://example.com/b").unwrap()],
        });
        assert_eq!(record.status, Some(PageStatus::Alive));
        assert_eq!(record.title.as_deref(), Some("Home"));
        assert_eq!(record.links_found, 1);
    }
}
