use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) const DEFAULT_PROFILE_DIR: &str = "~/.cache/folio/profile";

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("folio")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("folio")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl from each seed URL, saving every same-domain page as a PDF in a \
                directory tree that mirrors the link structure.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("A single seed URL (overrides --input)")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(false)
                        .help("Newline-delimited file of seed URLs")
                        .default_value("urls.txt"),
                )
                .arg(
                    arg!(-d --"depth" <NUM>)
                        .required(false)
                        .help("Maximum link depth below each seed")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3"),
                )
                .arg(
                    arg!(-t --"delay" <SECONDS>)
                        .required(false)
                        .help("Seconds to let each page settle after loading")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("3"),
                )
                .arg(
                    arg!(-v --"visible")
                        .required(false)
                        .help("Show the browser window (needed to complete a login)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-D --"debug")
                        .required(false)
                        .help("Verbose logging")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Archive root directory")
                        .default_value("pdfs"),
                )
                .arg(
                    arg!(-w --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("Seeds crawled concurrently, each in its own browser")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                )
                .arg(
                    arg!(--"profile" <PATH>)
                        .required(false)
                        .help("Browser profile directory, kept between runs so logins persist")
                        .default_value(DEFAULT_PROFILE_DIR),
                )
                .arg(
                    arg!(--"chrome" <PATH>)
                        .required(false)
                        .help("Path to the Chrome/Chromium executable"),
                )
                .arg(
                    arg!(--"report" <PATH>)
                        .required(false)
                        .help("Also write the crawl report as JSON to this file"),
                ),
        )
        .subcommand(
            command!("links")
                .about("Write a CSV sheet of every labelled link on each seed page")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("A single page URL (overrides --input)")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(false)
                        .help("Newline-delimited file of page URLs")
                        .default_value("urls.txt"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Directory for the CSV sheets")
                        .default_value("."),
                )
                .arg(
                    arg!(-t --"delay" <SECONDS>)
                        .required(false)
                        .help("Seconds to let each page settle after loading")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("3"),
                )
                .arg(
                    arg!(-w --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("Pages processed concurrently")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4"),
                )
                .arg(
                    arg!(--"chrome" <PATH>)
                        .required(false)
                        .help("Path to the Chrome/Chromium executable"),
                ),
        )
        .subcommand(
            command!("clean")
                .about("Remove the browser profile and/or the PDF archive")
                .arg(
                    arg!(-c --"cache")
                        .required(false)
                        .help("Remove the browser profile directory")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-a --"all")
                        .required(false)
                        .help("Remove the browser profile and the archive")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"archive" <PATH>)
                        .required(false)
                        .help("Archive root to remove with --all")
                        .default_value("pdfs"),
                )
                .arg(
                    arg!(--"profile" <PATH>)
                        .required(false)
                        .help("Browser profile directory to remove")
                        .default_value(DEFAULT_PROFILE_DIR),
                ),
        )
}
