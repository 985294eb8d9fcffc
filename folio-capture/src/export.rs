use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::result::ExportOutcome;
use crate::session::{BrowserSession, PageLayout};

pub const FALLBACK_NAME: &str = "Untitled";

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strip path-hostile characters, keeping alphanumerics, spaces, `-` and `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !INVALID_CHARS.contains(c))
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Directory and file stem for a page title.
pub fn archive_name(title: &str) -> String {
    let name = sanitize_filename(title);
    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

pub fn document_path(dir: &Path, title: &str) -> PathBuf {
    dir.join(format!("{}.pdf", archive_name(title)))
}

/// Render the current document into `dir`, unless it is already there.
pub async fn export_page<S: BrowserSession>(
    session: &S,
    title: &str,
    dir: &Path,
    layout: &PageLayout,
) -> ExportOutcome {
    let target = document_path(dir, title);

    match tokio::fs::try_exists(&target).await {
        Ok(true) => {
            info!("PDF already exists, skipping: {}", target.display());
            return ExportOutcome::AlreadyExists(target);
        }
        Ok(false) => {}
        Err(e) => {
            warn!("Cannot inspect {}: {}", target.display(), e);
            return ExportOutcome::Failed(e.to_string());
        }
    }

    info!("Rendering PDF: {}", target.display());
    let data = match session.render_pdf(layout).await {
        Ok(Some(data)) => data,
        Ok(None) => {
            warn!("Renderer returned no data for {}", target.display());
            return ExportOutcome::Failed("renderer returned no data".to_string());
        }
        Err(e) => {
            warn!("Rendering failed for {}: {}", target.display(), e);
            return ExportOutcome::Failed(e.to_string());
        }
    };

    match tokio::fs::write(&target, &data).await {
        Ok(()) => {
            info!("PDF saved: {} ({} bytes)", target.display(), data.len());
            ExportOutcome::Written(target)
        }
        Err(e) => {
            warn!("Failed to write {}: {}", target.display(), e);
            ExportOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakePage, FakeSession, FakeSite};
    use crate::session::BrowserSession;
    use tempfile::TempDir;
    use url::Url;

    #[test]
    fn test_sanitize_strips_invalid_chars() {
        assert_eq!(sanitize_filename(r#"a<b>c:d"e/f\g|h?i*j"#), "abcdefghij");
        assert_eq!(sanitize_filename("  Hello, World!  "), "Hello World");
        assert_eq!(sanitize_filename("rust_2024-notes"), "rust_2024-notes");
    }

    #[test]
    fn test_sanitize_keeps_unicode_letters() {
        assert_eq!(sanitize_filename("深度学习：入门"), "深度学习入门");
    }

    #[test]
    fn test_archive_name_fallback() {
        assert_eq!(archive_name("???"), FALLBACK_NAME);
        assert_eq!(archive_name("B"), "B");
    }

    #[test]
    fn test_document_path() {
        let path = document_path(Path::new("pdfs/A"), "B: part 2");
        assert_eq!(path, PathBuf::from("pdfs/A/B part 2.pdf"));
    }

    async fn session_on(page: FakePage) -> FakeSession {
        let site = FakeSite::new().page("https://example.com/a", page);
        let mut session = FakeSession::new(site);
        session
            .navigate(&Url::parse("https://example.com/a").unwrap())
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_export_writes_rendered_bytes() {
        let dir = TempDir::new().unwrap();
        let session = session_on(FakePage::article("A")).await;

        let outcome = export_page(&session, "A", dir.path(), &PageLayout::default()).await;

        let path = dir.path().join("A.pdf");
        assert_eq!(outcome, ExportOutcome::Written(path.clone()));
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.4 A");
    }

    #[tokio::test]
    async fn test_export_skips_existing_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A.pdf");
        std::fs::write(&path, b"old").unwrap();
        let session = session_on(FakePage::article("A")).await;

        let outcome = export_page(&session, "A", dir.path(), &PageLayout::default()).await;

        assert_eq!(outcome, ExportOutcome::AlreadyExists(path.clone()));
        assert_eq!(std::fs::read(path).unwrap(), b"old");
        assert!(session.log().lock().unwrap().renders.is_empty());
    }

    #[tokio::test]
    async fn test_export_without_data_is_a_failure() {
        let dir = TempDir::new().unwrap();
        let session = session_on(FakePage::article("A").without_pdf()).await;

        let outcome = export_page(&session, "A", dir.path(), &PageLayout::default()).await;

        assert!(!outcome.is_success());
        assert!(!dir.path().join("A.pdf").exists());
    }

    #[tokio::test]
    async fn test_export_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let session = session_on(FakePage::article("A")).await;

        let outcome = export_page(&session, "A", &missing, &PageLayout::default()).await;

        assert!(matches!(outcome, ExportOutcome::Failed(_)));
    }
}
