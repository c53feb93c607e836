use clap::{Parser, Subcommand, ValueEnum};
use common::Mode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stalegun")]
#[command(about = "Stalegun - cross-venue fair-value quote engine")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to the venues and start quoting
    Run {
        /// Path to the configuration file
        #[arg(short, long, default_value = "stalegun.yaml")]
        config: PathBuf,

        /// Override the configured coin (e.g. ETH)
        #[arg(long)]
        coin: Option<String>,

        /// Override the initial quoting mode
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Override the configured log format
        #[arg(long, value_enum)]
        log_format: Option<LogFormatArg>,
    },

    /// Validate configuration without connecting
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "stalegun.yaml")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "stalegun.yaml")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    /// Quote the price we would buy at
    Buying,
    /// Quote the price we would sell at
    Selling,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Buying => Mode::Buying,
            ModeArg::Selling => Mode::Selling,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
    Compact,
}

impl LogFormatArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormatArg::Pretty => "pretty",
            LogFormatArg::Json => "json",
            LogFormatArg::Compact => "compact",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "stalegun", "run", "--config", "cfg.yaml", "--coin", "eth", "--mode", "selling",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { config, coin, mode, log_format } => {
                assert_eq!(config, PathBuf::from("cfg.yaml"));
                assert_eq!(coin.as_deref(), Some("eth"));
                assert_eq!(mode.map(Mode::from), Some(Mode::Selling));
                assert!(log_format.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validate_default_path() {
        let cli = Cli::try_parse_from(["stalegun", "validate"]).unwrap();
        match cli.command {
            Commands::Validate { config } => assert_eq!(config, PathBuf::from("stalegun.yaml")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["stalegun", "run", "--mode", "hodl"]).is_err());
    }
}
