use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for periboard
#[derive(Parser, Debug)]
#[command(
    name = "periboard",
    version = env!("CARGO_PKG_VERSION"),
    about = "Host-side control tool for the periboard peripheral controller board",
    long_about = "Control tool for the periboard peripheral controller: serial device discovery, board diagnostics, z-stage motion, and ADC calibration read-out."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress logging output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Serial port of the board; skips discovery
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Talk to an in-process simulated board instead of hardware
    #[arg(long, global = true)]
    pub sim: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe serial ports for attached boards
    Discover {
        /// Per-port probe timeout in milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,

        /// Settle delay after opening each port, in milliseconds
        #[arg(long, default_value = "2500")]
        settling_ms: u64,
    },
    /// Show board identity and diagnostics
    Info,
    /// Z-stage motion and state commands
    Zstage(ZStageArgs),
    /// ADC commands
    Adc(AdcArgs),
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Z-stage arguments
#[derive(ClapArgs, Debug)]
pub struct ZStageArgs {
    /// Z-stage subcommand
    #[command(subcommand)]
    pub command: ZStageCommand,
}

/// ADC arguments
#[derive(ClapArgs, Debug)]
pub struct AdcArgs {
    /// ADC subcommand
    #[command(subcommand)]
    pub command: AdcCommand,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Z-stage subcommands
#[derive(Subcommand, Debug)]
pub enum ZStageCommand {
    /// Read the current position
    Position,
    /// Start a move to an absolute position
    MoveTo {
        /// Target position in steps
        #[arg(allow_negative_numbers = true)]
        position: i32,
    },
    /// Home the stage
    Home,
    /// Raise the stage to the configured up position and wait
    Up,
    /// Lower the stage to the configured down position
    Down,
    /// Read every z-stage field
    State,
    /// Change one or more settings
    Set {
        /// Enable or disable the motor driver
        #[arg(long)]
        motor_enabled: Option<bool>,

        /// Enable or disable micro-stepping
        #[arg(long)]
        micro_stepping: Option<bool>,

        /// Enable or disable the home limit stop
        #[arg(long)]
        home_stop: Option<bool>,

        /// Enable or disable the engaged limit stop
        #[arg(long)]
        engaged_stop: Option<bool>,

        /// Motor speed in RPM
        #[arg(long)]
        rpm: Option<u32>,
    },
}

/// ADC subcommands
#[derive(Subcommand, Debug)]
pub enum AdcCommand {
    /// Read the MAX11210 calibration registers
    Calibration,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Create default configuration
    Init {
        /// Output file path (defaults to the per-user config)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<String>,
    },
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_zstage_move() {
        let args = Args::try_parse_from(["periboard", "zstage", "move-to", "10"]).unwrap();
        match args.command {
            Command::Zstage(ZStageArgs {
                command: ZStageCommand::MoveTo { position },
            }) => assert_eq!(position, 10),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_sim_flag_after_subcommand() {
        let args = Args::try_parse_from(["periboard", "info", "--sim"]).unwrap();
        assert!(args.sim);
    }

    #[test]
    fn test_parse_set_flags() {
        let args = Args::try_parse_from([
            "periboard", "zstage", "set", "--motor-enabled", "true", "--rpm", "20",
        ])
        .unwrap();
        match args.command {
            Command::Zstage(ZStageArgs {
                command:
                    ZStageCommand::Set {
                        motor_enabled,
                        rpm,
                        micro_stepping,
                        ..
                    },
            }) => {
                assert_eq!(motor_enabled, Some(true));
                assert_eq!(rpm, Some(20));
                assert_eq!(micro_stepping, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
