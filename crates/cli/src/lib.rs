pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use storefront_core::config::{ConfigOverrides, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "storefront",
    about = "Storefront shopping assistant CLI",
    long_about = "Chat with the storefront assistant, inspect its intent catalog, explain how a message is scored, and inspect effective configuration.",
    after_help = "Examples:\n  storefront chat --seed 7\n  storefront score \"where is my order?\"\n  storefront score \"what about fees\" --last-topic payment\n  storefront intents\n  storefront config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a storefront.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive conversation on stdin/stdout")]
    Chat {
        #[arg(long, help = "Seed for reply phrasing and typing delays")]
        seed: Option<u64>,
        #[arg(long, help = "Lower bound of the simulated typing delay")]
        min_delay_ms: Option<u64>,
        #[arg(long, help = "Upper bound of the simulated typing delay")]
        max_delay_ms: Option<u64>,
        #[arg(long, help = "Log level (trace|debug|info|warn|error)")]
        log_level: Option<String>,
        #[arg(long, value_parser = parse_log_format, help = "Log format (compact|pretty|json)")]
        log_format: Option<LogFormat>,
    },
    #[command(about = "List the built-in intents with their patterns, keywords and priority")]
    Intents,
    #[command(about = "Score a message against every intent and report the winner")]
    Score {
        message: String,
        #[arg(long, help = "Topic of the previous turn, used for the context boost")]
        last_topic: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse::<LogFormat>().map_err(|error| error.to_string())
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { seed, min_delay_ms, max_delay_ms, log_level, log_format } => {
            commands::chat::run(commands::chat::ChatOptions {
                config_path: cli.config,
                overrides: ConfigOverrides {
                    log_level,
                    log_format,
                    typing_delay_min_ms: min_delay_ms,
                    typing_delay_max_ms: max_delay_ms,
                    seed,
                },
            })
        }
        Command::Intents => commands::intents::run(),
        Command::Score { message, last_topic } => commands::score::run(&message, last_topic),
        Command::Config => commands::config::run(cli.config),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
