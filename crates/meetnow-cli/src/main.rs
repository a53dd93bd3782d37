//! meetnow CLI entry point.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use meetnow_cli::actions;
use meetnow_cli::cli::Cli;
use meetnow_cli::error::{CliError, CliResult};

use meetnow_google::{
    Authorizer, CalendarClient, CallbackServer, CodeReceiver, Credentials, GoogleConfig, relay,
};

/// Deadline for draining the callback listener on the way out.
const STOP_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = build_config(&cli)?;

    let (tx, mut rx) = relay();
    let server = CallbackServer::bind(config.callback_port, tx)
        .await
        .map_err(|e| {
            CliError::Config(format!(
                "failed to bind callback listener on port {}: {}",
                config.callback_port, e
            ))
        })?;
    let handle = server.spawn();

    // The listener socket is released on every path out of the flow,
    // success or failure.
    let result = create_meeting(&cli, config, &mut rx).await;
    handle.stop(STOP_DEADLINE).await;
    let link = result?;

    println!("{}", link);
    if !cli.no_clipboard {
        actions::copy_to_clipboard(&link)?;
    }

    Ok(())
}

fn build_config(cli: &Cli) -> CliResult<GoogleConfig> {
    let credentials_path = cli
        .credentials_file
        .clone()
        .unwrap_or_else(GoogleConfig::default_credentials_path);
    let credentials = Credentials::from_file(&credentials_path)?;

    let mut config = GoogleConfig::new(credentials)
        .with_callback_port(cli.port)
        .with_approval_timeout(Duration::from_secs(cli.timeout))
        .with_time_zone(cli.time_zone.clone())
        .with_open_browser(!cli.no_browser);

    if let Some(ref path) = cli.token_file {
        config = config.with_token_path(path);
    }

    config.validate()?;
    Ok(config)
}

async fn create_meeting(
    cli: &Cli,
    config: GoogleConfig,
    codes: &mut CodeReceiver,
) -> CliResult<String> {
    let http_timeout = config.http_timeout;
    let time_zone = config.time_zone.clone();

    let authorizer = Authorizer::new(config);
    let token = authorizer.authorize(codes).await?;

    let calendar =
        CalendarClient::new(&token.access_token, http_timeout).with_time_zone(time_zone);
    let link = calendar
        .create_instant_meeting(&cli.name, chrono::Duration::minutes(i64::from(cli.duration)))
        .await?;

    Ok(link)
}
