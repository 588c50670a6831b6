//! Atrium CLI entry point
//!
//! Parses command-line arguments, runs the selected command, and renders
//! fatal errors through the user-friendly display layer before exiting
//! non-zero.

use anyhow::Result;
use atrium_cli::cli;
use atrium_cli::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
