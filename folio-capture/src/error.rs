use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Browser protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Browser session error: {0}")]
    Session(String),

    #[error("Failed to launch browser after {attempts} attempts: {reason}")]
    Launch { attempts: usize, reason: String },

    #[error("Migration notice found but no redirect link on {0}")]
    UnresolvedMigration(String),

    #[error("Too many migration hops starting at {0}")]
    MigrationLoop(String),

    #[error("DOM snapshot could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Crawl cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CaptureError>;
