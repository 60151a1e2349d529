//! Configuration and CLI argument handling

use std::num::NonZeroU32;

use clap::{Parser, ValueEnum};

use crate::state::{parse_minutes, HandlerPolicy};

/// Which notification service backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// The desktop notification service (notify-rust)
    Desktop,
    /// Keep notifications in-process and log them when they fire
    Memory,
}

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "focus-timer")]
#[command(about = "A focus timer that notifies you when the session is over")]
#[command(version)]
pub struct Config {
    /// Initial timer duration in minutes
    #[arg(short, long, default_value = "25", value_parser = parse_minutes)]
    pub minutes: NonZeroU32,

    /// Notification backend
    #[arg(long, value_enum, default_value_t = Backend::Desktop)]
    pub backend: Backend,

    /// Do not play a sound with notifications
    #[arg(long)]
    pub silent: bool,

    /// Application name shown on desktop notifications
    #[arg(long, default_value = "Focus Timer")]
    pub app_name: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Foreground presentation policy for notifications
    pub fn handler_policy(&self) -> HandlerPolicy {
        HandlerPolicy {
            play_sound: !self.silent,
            ..HandlerPolicy::default()
        }
    }
}
