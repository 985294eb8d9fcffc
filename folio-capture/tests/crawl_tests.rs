// Traversal tests against a scripted browser session

use folio_capture::fake::{FakePage, FakeSession, FakeSite};
use folio_capture::links::normalize_url;
use folio_capture::session::Element;
use folio_capture::{CrawlSession, Crawler, ExportOutcome, PageRecord, PageStatus, StopFlag};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn crawler() -> Crawler {
    Crawler::new().with_login_poll_interval(Duration::from_millis(1))
}

async fn run(
    site: FakeSite,
    seed: &str,
    depth: usize,
    root: &Path,
) -> (FakeSession, Vec<PageRecord>) {
    let mut session = FakeSession::new(site);
    let mut state = CrawlSession::new(url(seed), depth, Duration::ZERO, StopFlag::new());
    let records = crawler().crawl(&mut session, &mut state, root).await;
    (session, records)
}

fn navigations(session: &FakeSession) -> Vec<String> {
    session.log().lock().unwrap().navigations.clone()
}

// ============================================================================
// Scope and archive layout
// ============================================================================

#[tokio::test]
async fn test_follows_only_same_domain_navigable_links() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page(
            "https://example.com/a",
            FakePage::article("A")
                .link("https://example.com/b")
                .link("https://other.com/x")
                .link("javascript:void(0)"),
        )
        .page("https://example.com/b", FakePage::article("B"))
        .page("https://other.com/x", FakePage::article("X"));

    let (session, records) = run(site, "https://example.com/a", 2, root.path()).await;

    assert_eq!(
        navigations(&session),
        vec!["https://example.com/a", "https://example.com/b"]
    );
    assert!(root.path().join("A").join("A.pdf").is_file());
    assert!(root.path().join("A").join("B").join("B.pdf").is_file());
    assert!(!root.path().join("A").join("X.pdf").exists());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].links_found, 1);
}

#[tokio::test]
async fn test_depth_zero_visits_only_seed() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page(
            "https://example.com/a",
            FakePage::article("A").link("https://example.com/b"),
        )
        .page("https://example.com/b", FakePage::article("B"));

    let (session, records) = run(site, "https://example.com/a", 0, root.path()).await;

    assert_eq!(navigations(&session), vec!["https://example.com/a"]);
    assert!(root.path().join("A.pdf").is_file());
    assert!(!root.path().join("A").exists());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].links_found, 0);
}

#[tokio::test]
async fn test_depth_bound_and_leaf_placement() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page("https://example.com/a", FakePage::article("A").link("/b"))
        .page("https://example.com/b", FakePage::article("B").link("/c"))
        .page("https://example.com/c", FakePage::article("C").link("/d"))
        .page("https://example.com/d", FakePage::article("D"));

    let (session, _) = run(site, "https://example.com/a", 2, root.path()).await;

    let visited = navigations(&session);
    assert!(!visited.contains(&"https://example.com/d".to_string()));
    assert_eq!(visited.len(), 3);
    // C sits at max depth: written next to B, no directory of its own
    assert!(root.path().join("A/B/C.pdf").is_file());
    assert!(!root.path().join("A/B/C").exists());
}

#[tokio::test]
async fn test_children_visited_in_document_order_depth_first() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page(
            "https://example.com/a",
            FakePage::article("A").link("/b").link("/c"),
        )
        .page("https://example.com/b", FakePage::article("B").link("/b1"))
        .page("https://example.com/b1", FakePage::article("B1"))
        .page("https://example.com/c", FakePage::article("C"));

    let (session, _) = run(site, "https://example.com/a", 2, root.path()).await;

    assert_eq!(
        navigations(&session),
        vec![
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/b1",
            "https://example.com/c"
        ]
    );
}

// ============================================================================
// Visited set
// ============================================================================

#[tokio::test]
async fn test_cycles_and_duplicate_links_visit_once() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page(
            "https://example.com/a",
            FakePage::article("A").link("/b").link("/c").link("/b"),
        )
        .page(
            "https://example.com/b",
            FakePage::article("B").link("/a").link("/c#section"),
        )
        .page("https://example.com/c", FakePage::article("C").link("/b"));

    let (session, _) = run(site, "https://example.com/a", 3, root.path()).await;

    let visited: Vec<String> = navigations(&session)
        .iter()
        .map(|u| normalize_url(&url(u)))
        .collect();
    assert_eq!(visited.len(), 3);
    for page in ["https://example.com/a", "https://example.com/b", "https://example.com/c"] {
        let count = visited.iter().filter(|u| u.as_str() == page).count();
        assert_eq!(count, 1, "{} navigated more than once", page);
    }
}

#[tokio::test]
async fn test_failed_page_is_not_retried_and_siblings_continue() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page(
            "https://example.com/a",
            FakePage::article("A").link("/broken").link("/c").link("/broken"),
        )
        .page("https://example.com/broken", FakePage::article("Broken").failing())
        .page("https://example.com/c", FakePage::article("C"));

    let (session, records) = run(site, "https://example.com/a", 1, root.path()).await;

    let log = session.log();
    assert_eq!(log.lock().unwrap().navigation_count("https://example.com/broken"), 1);
    assert!(root.path().join("A/C.pdf").is_file());

    let broken = records
        .iter()
        .find(|r| r.url == "https://example.com/broken")
        .unwrap();
    assert!(broken.error.is_some());
}

// ============================================================================
// Classification branches
// ============================================================================

#[tokio::test]
async fn test_deleted_page_contributes_nothing() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page(
            "https://example.com/a",
            FakePage::article("A").link("/gone").link("/c"),
        )
        .page(
            "https://example.com/gone",
            FakePage::blank().text("该内容已被发布者删除").link("/hidden"),
        )
        .page("https://example.com/hidden", FakePage::article("Hidden"))
        .page("https://example.com/c", FakePage::article("C"));

    let (session, records) = run(site, "https://example.com/a", 2, root.path()).await;

    let visited = navigations(&session);
    assert!(!visited.contains(&"https://example.com/hidden".to_string()));
    assert!(root.path().join("A/C/C.pdf").is_file());

    let gone = records
        .iter()
        .find(|r| r.url == "https://example.com/gone")
        .unwrap();
    assert_eq!(gone.status, Some(PageStatus::Deleted("该内容已被发布者删除".into())));
    assert!(gone.export.is_none());
}

#[tokio::test]
async fn test_migration_is_followed_in_place() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page(
            "https://example.com/old",
            FakePage::blank()
                .text("该公众号已迁移")
                .labelled_link("https://example.com/new", "访问文章"),
        )
        .page(
            "https://example.com/new",
            FakePage::article("New").link("/b").link("/old"),
        )
        .page("https://example.com/b", FakePage::article("B"));

    let (session, records) = run(site, "https://example.com/old", 1, root.path()).await;

    assert_eq!(
        navigations(&session),
        vec![
            "https://example.com/old",
            "https://example.com/new",
            "https://example.com/b"
        ]
    );
    assert!(root.path().join("New/New.pdf").is_file());
    assert!(root.path().join("New/B.pdf").is_file());
    assert_eq!(records[0].url, "https://example.com/old");
    assert_eq!(records[0].migrated_to.as_deref(), Some("https://example.com/new"));
    assert_eq!(records[0].status, Some(PageStatus::Alive));
}

#[tokio::test]
async fn test_scope_follows_the_migrated_host() {
    let root = TempDir::new().unwrap();
    let button = Element::with_text("访问文章")
        .with_parent(Element::default().with_attr("href", "https://new.example.org/x"));
    let site = FakeSite::new()
        .page(
            "https://old.example.com/a",
            FakePage::blank().text("该公众号已迁移").element("a", button),
        )
        .page(
            "https://new.example.org/x",
            FakePage::article("X")
                .link("https://new.example.org/y")
                .link("https://old.example.com/z"),
        )
        .page("https://new.example.org/y", FakePage::article("Y"))
        .page("https://old.example.com/z", FakePage::article("Z"));

    let (session, _) = run(site, "https://old.example.com/a", 1, root.path()).await;

    let visited = navigations(&session);
    assert!(visited.contains(&"https://new.example.org/y".to_string()));
    assert!(!visited.contains(&"https://old.example.com/z".to_string()));
}

#[tokio::test]
async fn test_migration_to_visited_page_is_not_reloaded() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page(
            "https://example.com/a",
            FakePage::article("A").link("/b").link("/c"),
        )
        .page("https://example.com/b", FakePage::article("B"))
        .page(
            "https://example.com/c",
            FakePage::blank()
                .text("该公众号已迁移")
                .labelled_link("https://example.com/b", "访问文章"),
        );

    let (session, records) = run(site, "https://example.com/a", 1, root.path()).await;

    assert_eq!(
        navigations(&session),
        vec![
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/c"
        ]
    );
    let moved = records
        .iter()
        .find(|r| r.url == "https://example.com/c")
        .unwrap();
    assert_eq!(moved.migrated_to.as_deref(), Some("https://example.com/b"));
    assert_eq!(
        moved.status,
        Some(PageStatus::Migrated(url("https://example.com/b")))
    );
    assert!(moved.export.is_none());
    assert!(moved.error.is_none());
}

#[tokio::test]
async fn test_unresolved_migration_abandons_page() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new().page(
        "https://example.com/old",
        FakePage::article("Old").text("该公众号已迁移"),
    );

    let (_, records) = run(site, "https://example.com/old", 1, root.path()).await;

    assert_eq!(records.len(), 1);
    assert!(records[0].error.as_deref().unwrap().contains("no redirect link"));
    assert!(!root.path().join("Old").exists());
}

#[tokio::test]
async fn test_login_wall_waits_then_archives() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new().page(
        "https://example.com/a",
        FakePage::article("A").login_after(3),
    );

    let (_, records) = run(site, "https://example.com/a", 0, root.path()).await;

    assert_eq!(records[0].status, Some(PageStatus::Alive));
    assert!(root.path().join("A.pdf").is_file());
}

// ============================================================================
// Export behaviour
// ============================================================================

#[tokio::test]
async fn test_rerun_does_not_rerender_existing_documents() {
    let root = TempDir::new().unwrap();
    let site = || {
        FakeSite::new()
            .page("https://example.com/a", FakePage::article("A").link("/b"))
            .page("https://example.com/b", FakePage::article("B"))
    };

    let (first, _) = run(site(), "https://example.com/a", 1, root.path()).await;
    assert_eq!(first.log().lock().unwrap().renders.len(), 2);

    let (second, records) = run(site(), "https://example.com/a", 1, root.path()).await;
    assert!(second.log().lock().unwrap().renders.is_empty());
    assert!(records
        .iter()
        .all(|r| matches!(r.export, Some(ExportOutcome::AlreadyExists(_)))));
}

#[tokio::test]
async fn test_export_failure_does_not_block_discovery() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page(
            "https://example.com/a",
            FakePage::article("A").without_pdf().link("/b"),
        )
        .page("https://example.com/b", FakePage::article("B"));

    let (_, records) = run(site, "https://example.com/a", 1, root.path()).await;

    assert!(matches!(records[0].export, Some(ExportOutcome::Failed(_))));
    assert!(!root.path().join("A/A.pdf").exists());
    assert!(root.path().join("A/B.pdf").is_file());
}

// ============================================================================
// Cancellation and progress
// ============================================================================

#[tokio::test]
async fn test_stop_flag_prevents_navigation() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new().page("https://example.com/a", FakePage::article("A"));
    let mut session = FakeSession::new(site);
    let stop = StopFlag::new();
    stop.request();
    let mut state = CrawlSession::new(url("https://example.com/a"), 2, Duration::ZERO, stop);

    let records = crawler().crawl(&mut session, &mut state, root.path()).await;

    assert!(records.is_empty());
    assert!(navigations(&session).is_empty());
}

#[tokio::test]
async fn test_progress_callback_sees_each_visit() {
    let root = TempDir::new().unwrap();
    let site = FakeSite::new()
        .page("https://example.com/a", FakePage::article("A").link("/b"))
        .page("https://example.com/b", FakePage::article("B"));
    let seen: Arc<Mutex<Vec<(usize, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let mut session = FakeSession::new(site);
    let mut state = CrawlSession::new(
        url("https://example.com/a"),
        1,
        Duration::ZERO,
        StopFlag::new(),
    );
    crawler()
        .with_progress_callback(Arc::new(move |depth, url| {
            seen_clone.lock().unwrap().push((depth, url));
        }))
        .crawl(&mut session, &mut state, root.path())
        .await;

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            (0, "https://example.com/a".to_string()),
            (1, "https://example.com/b".to_string())
        ]
    );
}

#[tokio::test]
async fn test_unwritable_directory_still_follows_links() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("A")).unwrap();
    // a plain file where B's directory should go
    std::fs::write(root.path().join("A").join("B"), b"in the way").unwrap();
    let site = FakeSite::new()
        .page("https://example.com/a", FakePage::article("A").link("/b"))
        .page("https://example.com/b", FakePage::article("B").link("/c"))
        .page("https://example.com/c", FakePage::article("C"));

    let (session, records) = run(site, "https://example.com/a", 2, root.path()).await;

    assert_eq!(
        navigations(&session),
        vec![
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/c"
        ]
    );
    let b = &records[1];
    assert!(b.error.is_none());
    assert!(matches!(b.export, Some(ExportOutcome::Failed(_))));
    assert_eq!(b.links_found, 1);
    // C lands in B's parent directory
    assert!(root.path().join("A").join("C.pdf").is_file());
}
