//! CLI argument definitions for the brainstorm binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use brainstorm_core::types::PhaseMode;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "BRAINSTORM_CONFIG";

/// Brainstorm - voice-guided intake and timed idea phases.
#[derive(Parser, Debug)]
#[command(name = "brainstorm", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Do not narrate replies.
    #[arg(long = "mute", global = true)]
    pub mute: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the intake conversation in the terminal (default).
    Chat,
    /// Run a countdown for an idea-generation phase.
    Phase {
        /// untimed, lightning or deep-dive.
        #[arg(short = 'm', long = "mode", default_value = "lightning")]
        mode: PhaseMode,
    },
    /// Write the default configuration to the config path.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long = "force")]
        force: bool,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > BRAINSTORM_CONFIG env var > ~/.brainstorm/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            if !p.trim().is_empty() {
                return PathBuf::from(p);
            }
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| config_level.to_string())
    }

    /// The subcommand to run, `chat` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".brainstorm").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".brainstorm").join("config.toml");
    }
    PathBuf::from("config.toml")
}
