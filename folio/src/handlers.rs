use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use folio_capture::{BrowserOptions, ChromeLauncher, StopFlag};
use folio_core::clean::{CleanOutcome, clean_paths};
use folio_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl};
use folio_core::linkindex::{LinkIndexOptions, execute_link_index};
use folio_core::report::{generate_crawl_report, write_json_report};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use url::Url;

// Helper functions for crawl handler

/// Load URLs from either a single URL argument or a file
pub fn load_urls_from_source(
    url: Option<&Url>,
    input_file: Option<&Path>,
) -> Result<Vec<String>, String> {
    if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else if let Some(input_file) = input_file {
        load_urls_from_file(input_file)
    } else {
        Err("Either --url or --input must be provided".to_string())
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read URL file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim()))
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, adding http:// when it has no scheme
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("{}  Skipping invalid URL '{}'", "⚠".yellow(), line);
    None
}

/// Expand `~` and environment variables in a path argument
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

/// Logs go to stderr so they interleave cleanly with the progress spinner.
pub fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(debug)
        .with_writer(std::io::stderr)
        .try_init();
}

fn seed_urls(sub_matches: &ArgMatches) -> Result<Vec<String>> {
    let url = sub_matches.get_one::<Url>("url");
    let input = sub_matches
        .get_one::<String>("input")
        .map(|raw| expand_path(raw));

    load_urls_from_source(url, input.as_deref()).map_err(anyhow::Error::msg)
}

fn browser_options(sub_matches: &ArgMatches, headless: bool) -> BrowserOptions {
    let chrome_executable = sub_matches
        .try_get_one::<String>("chrome")
        .ok()
        .flatten()
        .map(|raw| expand_path(raw));
    let profile_dir = sub_matches
        .try_get_one::<String>("profile")
        .ok()
        .flatten()
        .map(|raw| expand_path(raw));

    BrowserOptions {
        headless,
        profile_dir,
        chrome_executable,
        ..Default::default()
    }
}

fn print_line_callback() -> CrawlProgressCallback {
    Arc::new(|msg: String| {
        println!("{}", msg);
    })
}

pub async fn handle_crawl(sub_matches: &ArgMatches, stop: StopFlag) -> Result<()> {
    let debug = sub_matches.get_flag("debug");
    init_tracing(debug);

    let urls = seed_urls(sub_matches)?;
    let max_depth = *sub_matches.get_one::<usize>("depth").unwrap_or(&3);
    let delay = *sub_matches.get_one::<u64>("delay").unwrap_or(&3);
    let workers = (*sub_matches.get_one::<usize>("workers").unwrap_or(&1)).max(1);
    let visible = sub_matches.get_flag("visible");
    let archive_root = expand_path(
        sub_matches
            .get_one::<String>("output")
            .map(String::as_str)
            .unwrap_or("pdfs"),
    );
    let report_path = sub_matches
        .get_one::<String>("report")
        .map(|raw| expand_path(raw));

    let mut browser = browser_options(sub_matches, !visible);
    if workers > 1 && browser.profile_dir.take().is_some() {
        println!(
            "{} A browser profile cannot be shared between workers; each worker uses a fresh one",
            "⚠".yellow().bold()
        );
    }
    if let Some(ref profile) = browser.profile_dir {
        fs::create_dir_all(profile)
            .with_context(|| format!("Failed to create profile directory {}", profile.display()))?;
    }

    println!("\n{} Archiving {} seed(s)", "→".blue().bold(), urls.len());
    println!("Workers: {}", workers);
    println!("Max depth: {}", max_depth);
    println!("Delay: {}s", delay);
    println!("Archive: {}", archive_root.display().to_string().bright_white());
    println!(
        "Browser: {}\n",
        if visible { "visible" } else { "headless" }
    );

    let options = CrawlOptions {
        urls,
        workers,
        max_depth,
        delay: Duration::from_secs(delay),
        archive_root,
        login_poll_interval: Duration::from_secs(1),
        show_progress_bars: !debug,
    };

    let launcher = ChromeLauncher::new(browser);
    let reports = execute_crawl(options, &launcher, stop.clone(), Some(print_line_callback()))
        .await
        .map_err(anyhow::Error::msg)
        .context("Crawl failed")?;

    if stop.is_requested() {
        println!("\n{} Crawl interrupted\n", "✗".yellow().bold());
    } else {
        println!("\n{} Crawl complete!\n", "✓".green().bold());
    }

    print!("{}", generate_crawl_report(&reports));

    if let Some(path) = report_path {
        write_json_report(&path, &reports).map_err(anyhow::Error::msg)?;
        println!(
            "{} Report saved to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }

    Ok(())
}

pub async fn handle_links(sub_matches: &ArgMatches, stop: StopFlag) -> Result<()> {
    init_tracing(false);

    let urls = seed_urls(sub_matches)?;
    let delay = *sub_matches.get_one::<u64>("delay").unwrap_or(&3);
    let workers = (*sub_matches.get_one::<usize>("workers").unwrap_or(&4)).max(1);
    let output_dir = expand_path(
        sub_matches
            .get_one::<String>("output")
            .map(String::as_str)
            .unwrap_or("."),
    );

    println!("\n{} Indexing links on {} page(s)\n", "→".blue().bold(), urls.len());

    let options = LinkIndexOptions {
        urls,
        workers,
        delay: Duration::from_secs(delay),
        output_dir,
    };
    let launcher = ChromeLauncher::new(browser_options(sub_matches, true));
    let reports = execute_link_index(options, &launcher, stop, Some(print_line_callback()))
        .await
        .map_err(anyhow::Error::msg)?;

    println!();
    let mut failures = 0;
    for report in &reports {
        match (&report.path, &report.error) {
            (Some(path), None) => println!(
                "{} {} → {} ({} links)",
                "✓".green().bold(),
                report.seed,
                path.display().to_string().bright_white(),
                report.links
            ),
            (_, error) => {
                failures += 1;
                println!(
                    "{} {}: {}",
                    "✗".red().bold(),
                    report.seed,
                    error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    if failures == reports.len() {
        bail!("No link sheets were written");
    }
    Ok(())
}

pub fn handle_clean(sub_matches: &ArgMatches) -> Result<()> {
    let all = sub_matches.get_flag("all");
    let cache = sub_matches.get_flag("cache");

    if !all && !cache {
        println!(
            "Nothing to clean. Use {} for the browser profile or {} for everything.",
            "--cache".cyan(),
            "--all".cyan()
        );
        return Ok(());
    }

    let mut targets = Vec::new();
    if let Some(profile) = sub_matches.get_one::<String>("profile") {
        targets.push(expand_path(profile));
    }
    if all && let Some(archive) = sub_matches.get_one::<String>("archive") {
        targets.push(expand_path(archive));
    }

    let outcomes = clean_paths(targets.iter().map(PathBuf::as_path));
    let mut failed = false;
    for outcome in &outcomes {
        let shown = outcome.path().display().to_string();
        match outcome {
            CleanOutcome::Removed(_) => println!("{} Removed {}", "✓".green().bold(), shown),
            CleanOutcome::Missing(_) => println!("{} Not present: {}", "→".blue(), shown),
            CleanOutcome::Failed(_, e) => {
                failed = true;
                println!("{} Could not remove {}: {}", "✗".red().bold(), shown, e);
            }
        }
    }

    if failed {
        bail!("Cleanup incomplete");
    }
    println!("{} Cleanup complete", "✓".green().bold());
    Ok(())
}
