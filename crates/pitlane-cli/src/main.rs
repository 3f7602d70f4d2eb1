//! pitlane CLI
//!
//! Command-line interface for a race light controller: drive the LED, lap
//! counter, start lights and racer display, or watch them live.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pitlane_core::{Config, Endpoint, StateSyncClient};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "pitlane")]
#[command(about = "pitlane - Race light controller client")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ~/.config/pitlane/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Controller base URL, overrides the config file
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Control the indicator LED
    Led {
        #[command(subcommand)]
        command: LedCommands,
    },
    /// Control the lap counter
    Lap {
        #[command(subcommand)]
        command: LapCommands,
    },
    /// Control the start-sequence traffic light
    Light {
        #[command(subcommand)]
        command: LightCommands,
    },
    /// Show or set the racer name
    Racer {
        #[command(subcommand)]
        command: RacerCommands,
    },
    /// Show the state of every family
    Status,
    /// Check whether the controller is reachable
    Probe,
    /// Poll continuously and print changes (Ctrl-C to stop)
    Watch,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum LedCommands {
    On,
    Off,
    Toggle,
    Status,
}

#[derive(Subcommand)]
enum LapCommands {
    /// Count one lap
    #[command(alias = "inc")]
    Increment,
    /// Reset the counter to zero
    Reset,
    Status,
}

#[derive(Subcommand)]
enum LightCommands {
    /// Begin the start sequence
    Start,
    Stop,
    /// Step back to the previous phase
    Previous,
    /// Stop a running previous-phase sequence
    PreviousStop,
    Status,
}

#[derive(Subcommand)]
enum RacerCommands {
    /// Show the current racer name
    Name,
    /// Set the racer name (at most 10 characters)
    Set {
        /// New racer name
        name: String,
    },
    /// Show the name currently on the display
    Display,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (base_url, poll_interval_ms, watch.lap_ms, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

impl LedCommands {
    fn endpoint(&self) -> Endpoint {
        match self {
            LedCommands::On => Endpoint::LedOn,
            LedCommands::Off => Endpoint::LedOff,
            LedCommands::Toggle => Endpoint::LedToggle,
            LedCommands::Status => Endpoint::LedStatus,
        }
    }
}

impl LapCommands {
    fn endpoint(&self) -> Endpoint {
        match self {
            LapCommands::Increment => Endpoint::LapIncrement,
            LapCommands::Reset => Endpoint::LapReset,
            LapCommands::Status => Endpoint::LapStatus,
        }
    }
}

impl LightCommands {
    fn endpoint(&self) -> Endpoint {
        match self {
            LightCommands::Start => Endpoint::TrafficLightStart,
            LightCommands::Stop => Endpoint::TrafficLightStop,
            LightCommands::Previous => Endpoint::TrafficLightPrevious,
            LightCommands::PreviousStop => Endpoint::TrafficLightPreviousStop,
            LightCommands::Status => Endpoint::TrafficLightStatus,
        }
    }
}

impl RacerCommands {
    fn endpoint(&self) -> Result<Endpoint> {
        Ok(match self {
            RacerCommands::Name => Endpoint::RacerName,
            RacerCommands::Set { name } => Endpoint::set_racer_name(name)?,
            RacerCommands::Display => Endpoint::RacerDisplay,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't talk to the device
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let mut config = Config::load_with_cli_override(cli.config.as_ref())?;
    if let Some(url) = cli.url {
        config.base_url = url;
    }
    init_logging(&config);

    let client = StateSyncClient::from_config(&config)?;

    match cli.command {
        Commands::Led { command } => {
            commands::device::run(&client, command.endpoint(), &output).await
        }
        Commands::Lap { command } => {
            commands::device::run(&client, command.endpoint(), &output).await
        }
        Commands::Light { command } => {
            commands::device::run(&client, command.endpoint(), &output).await
        }
        Commands::Racer { command } => {
            commands::device::run(&client, command.endpoint()?, &output).await
        }
        Commands::Status => commands::status::show(&client, &output).await,
        Commands::Probe => commands::status::probe(&client, &output).await,
        Commands::Watch => commands::watch::run(client, &config, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging (only if PITLANE_LOG is set)
///
/// Logs go to `log_file` when configured, otherwise to stderr so they never
/// mix with command output on stdout.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("PITLANE_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "pitlane_core={},pitlane_cli={}",
        log_level, log_level
    ));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match config.log_file {
        Some(ref log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };
            // Ignore error if already initialized
            let _ = builder.with_ansi(false).with_writer(log_file).try_init();
            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitlane_core::RacerName;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subcommands_map_to_endpoints() {
        let cli = parse(&["pitlane", "led", "toggle"]);
        let Commands::Led { command } = cli.command else {
            panic!("expected led command");
        };
        assert_eq!(command.endpoint(), Endpoint::LedToggle);

        let cli = parse(&["pitlane", "lap", "inc"]);
        let Commands::Lap { command } = cli.command else {
            panic!("expected lap command");
        };
        assert_eq!(command.endpoint(), Endpoint::LapIncrement);

        let cli = parse(&["pitlane", "light", "previous-stop"]);
        let Commands::Light { command } = cli.command else {
            panic!("expected light command");
        };
        assert_eq!(command.endpoint(), Endpoint::TrafficLightPreviousStop);
    }

    #[test]
    fn test_racer_set_validates_name() {
        let cli = parse(&["pitlane", "racer", "set", "Casalis"]);
        let Commands::Racer { command } = cli.command else {
            panic!("expected racer command");
        };
        assert_eq!(
            command.endpoint().unwrap(),
            Endpoint::SetRacerName(RacerName::new("Casalis").unwrap())
        );

        let cli = parse(&["pitlane", "racer", "set", "Maximilian Sr"]);
        let Commands::Racer { command } = cli.command else {
            panic!("expected racer command");
        };
        assert!(command.endpoint().is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["pitlane", "status", "--json", "--url", "http://10.0.0.5"]);
        assert!(cli.json);
        assert_eq!(cli.url.as_deref(), Some("http://10.0.0.5"));
        assert!(matches!(cli.command, Commands::Status));
    }
}
