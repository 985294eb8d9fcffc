use colored::Colorize;
use commands::command_argument_builder;
use folio::handlers::{handle_clean, handle_crawl, handle_links};
use folio_capture::StopFlag;
use folio_core::print_banner;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    let stop = StopFlag::new();
    spawn_interrupt_handler(stop.clone());

    let result = match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command, stop).await,
        Some(("links", primary_command)) => handle_links(primary_command, stop).await,
        Some(("clean", primary_command)) => handle_clean(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

/// Ctrl-C, plus SIGTERM on unix.
struct ShutdownSignals {
    #[cfg(unix)]
    term: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            term: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> std::io::Result<()> {
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = self.term.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> std::io::Result<()> {
        tokio::signal::ctrl_c().await
    }
}

/// The first signal asks workers to wind down and close their browsers; a
/// second one exits immediately.
fn spawn_interrupt_handler(stop: StopFlag) {
    let mut signals = match ShutdownSignals::install() {
        Ok(signals) => signals,
        Err(e) => {
            eprintln!("{} Cannot listen for shutdown signals: {}", "⚠".yellow().bold(), e);
            return;
        }
    };

    tokio::spawn(async move {
        if signals.recv().await.is_err() {
            return;
        }
        eprintln!(
            "\n{} Interrupt received, finishing the current page. Press Ctrl-C again to abort.",
            "⚠".yellow().bold()
        );
        stop.request();

        if signals.recv().await.is_ok() {
            std::process::exit(130);
        }
    });
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
