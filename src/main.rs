//! squad-rcon - Command line RCON client for Squad servers

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use squad_rcon::config::{self, Config};
use squad_rcon::events::{classify_listing, PushEvent};
use squad_rcon::{Observers, Rcon};

/// squad-rcon - Administer a Squad server over RCON
#[derive(Parser)]
#[command(name = "squad-rcon")]
#[command(author = "squad-rcon Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Run RCON commands and watch server events", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Server host (overrides config)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server RCON port (overrides config)
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// RCON password (overrides config)
    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one command and print the reply
    Exec {
        /// Command and arguments, e.g. `AdminBroadcast hello`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Print server events until interrupted
    Listen,

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };
    let config = config.with_overrides(cli.host, cli.port, cli.password);

    match cli.command {
        Commands::Exec { command } => {
            run_exec(config, command.join(" ")).await?;
        }
        Commands::Listen => {
            run_listen(config).await?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

async fn connect(config: &Config, observers: Arc<Observers>) -> anyhow::Result<Rcon> {
    if config.server.password.is_empty() {
        anyhow::bail!("No RCON password set. Use --password or the [server] section of the config file.");
    }

    let rcon = Rcon::dial_with(
        config.network.clone(),
        observers,
        &config.server.host,
        config.server.port,
        &config.server.password,
    )
    .await?;

    Ok(rcon)
}

/// Run a single command
async fn run_exec(config: Config, command: String) -> anyhow::Result<()> {
    let observers = Arc::new(Observers::new());
    observers.on_close(|error| {
        if let Some(error) = error {
            tracing::error!("{}", error);
        }
    });

    let rcon = connect(&config, observers).await?;
    let body = rcon.execute(&command).await?;

    match classify_listing(&body, &command) {
        Some(listing) => println!("{}", serde_json::to_string_pretty(&listing)?),
        None => println!("{}", body),
    }

    rcon.close().await;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("Could not serialize event: {}", e),
    }
}

/// Observers that print typed events as JSON and report why the connection closed.
/// Raw lines are only logged, at debug level.
fn listen_observers(closed_tx: mpsc::UnboundedSender<Option<String>>) -> Arc<Observers> {
    let observers = Arc::new(Observers::new());
    observers.on_close(move |error| {
        let _ = closed_tx.send(error.map(|e| e.to_string()));
    });
    observers.on_data(|line| tracing::debug!("{}", line));
    observers.on_warn(|warn| print_json(&PushEvent::Warn(warn)));
    observers.on_kick(|kick| print_json(&PushEvent::Kick(kick)));
    observers.on_message(|message| print_json(&PushEvent::Chat(message)));
    observers.on_possess_admin_camera(|camera| print_json(&PushEvent::PossessedAdminCamera(camera)));
    observers
        .on_unpossess_admin_camera(|camera| print_json(&PushEvent::UnpossessedAdminCamera(camera)));
    observers.on_squad_created(|created| print_json(&PushEvent::SquadCreated(created)));
    observers
}

/// Print events until Ctrl+C or the server goes away
async fn run_listen(config: Config) -> anyhow::Result<()> {
    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
    let observers = listen_observers(closed_tx);

    let rcon = connect(&config, observers).await?;
    tracing::info!("Listening for events from {}", rcon.peer_addr());

    tokio::select! {
        reason = closed_rx.recv() => {
            if let Some(Some(reason)) = reason {
                anyhow::bail!("Connection closed: {}", reason);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            rcon.close().await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["squad-rcon", "--port", "27165", "exec", "AdminBroadcast", "hello", "all"]).unwrap();
        assert_eq!(cli.port, Some(27165));
        match cli.command {
            Commands::Exec { command } => assert_eq!(command.join(" "), "AdminBroadcast hello all"),
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn test_listen_observers_handle_close() {
        let (closed_tx, _closed_rx) = mpsc::unbounded_channel();
        let observers = listen_observers(closed_tx);

        // Without one a lost connection would exit the process
        assert!(observers.has_close_observer());
    }

    #[test]
    fn test_exec_requires_command() {
        assert!(Cli::try_parse_from(["squad-rcon", "exec"]).is_err());
    }
}
