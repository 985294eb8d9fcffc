pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    expand_path, load_urls_from_file, load_urls_from_source, parse_url_line,
};

// Re-export report functionality from folio-core
pub use folio_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl, extract_url_path};
pub use folio_core::report::{SeedReport, generate_crawl_report};
