//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// meetnow - create an instant Google Meet call and copy the link
#[derive(Debug, Parser)]
#[command(name = "meetnow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Name of the meeting
    #[arg(long, short, default_value = "Instant meeting")]
    pub name: String,

    /// Duration of the meeting in minutes
    #[arg(long, short, default_value = "60")]
    pub duration: u32,

    /// Path to the Google OAuth credentials JSON file
    #[arg(long, env = "MEETNOW_CREDENTIALS")]
    pub credentials_file: Option<PathBuf>,

    /// Path to the token cache file
    #[arg(long, env = "MEETNOW_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Local port for the OAuth callback listener
    #[arg(long, default_value = "8080")]
    pub port: u16,

    /// Seconds to wait for the authorization redirect
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Time zone for the event body
    #[arg(long, default_value = "UTC")]
    pub time_zone: String,

    /// Do not copy the meeting link to the clipboard
    #[arg(long)]
    pub no_clipboard: bool,

    /// Do not open the browser automatically
    #[arg(long)]
    pub no_browser: bool,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,
}
