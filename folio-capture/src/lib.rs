pub mod chrome;
pub mod classify;
pub mod crawler;
pub mod error;
pub mod export;
#[cfg(any(test, feature = "testing"))]
pub mod fake;
pub mod links;
pub mod result;
pub mod session;
pub mod stop;

pub use chrome::{BrowserOptions, ChromeLauncher, ChromeSession};
pub use classify::ClassifierRules;
pub use crawler::{CrawlSession, Crawler, ProgressCallback};
pub use error::CaptureError;
pub use result::{ExportOutcome, PageOutcome, PageRecord, PageStatus};
pub use session::{BrowserSession, PageLayout, SessionLauncher};
pub use stop::StopFlag;
