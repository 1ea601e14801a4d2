//! Wrought - on-demand merging, minification and caching of script/style groups.

#![allow(dead_code)]

mod cache;
mod cli;
mod config;
mod core;
mod extract;
mod fingerprint;
mod locator;
mod logger;
mod manager;
mod model;
mod processor;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{AppConfig, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    cli::serve::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = init_config(AppConfig::load(cli)?);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(config),
        Commands::Check { groups, .. } => cli::check::check_model(&config, groups),
    }
}
