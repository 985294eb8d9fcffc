pub mod clean;
pub mod crawl;
pub mod linkindex;
pub mod report;

use colored::Colorize;

const BANNER: &str = r#"
   ___       _ _
  / __\___  | (_) ___
 / _\/ _ \ | | |/ _ \
/ / | (_) || | | (_) |
\/   \___/ |_|_|\___/
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "depth-bounded page archiver".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
