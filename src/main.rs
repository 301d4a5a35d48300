mod api;
mod cli;
mod commands;
mod config;
mod engine;
mod enums;
mod manifest;
mod provider;
mod resource;
mod state;
mod ui;
mod validators;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use declarative::Cancellation;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub state: PathBuf,
    pub manifest: PathBuf,
    /// Set by the interrupt handler
    pub cancel: Cancellation,
}

impl Context {
    /// Operation context sharing the interrupt token
    pub fn operation(&self) -> declarative::Context {
        declarative::Context::with_cancellation(self.cancel.clone())
    }
}

/// First interrupt cancels outstanding requests, a second one exits
fn install_interrupt_handler(cancel: Cancellation) {
    let result = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            std::process::exit(130);
        }
        cancel.cancel();
        ui::warn("Interrupted, cancelling outstanding requests (press Ctrl-C again to exit)");
    });
    if let Err(e) = result {
        log::debug!("interrupt handler not installed: {e}");
    }
}

fn main() {
    if let Err(e) = run() {
        ui::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        state: cli.state,
        manifest: cli.manifest,
        cancel: Cancellation::new(),
    };
    install_interrupt_handler(ctx.cancel.clone());
    log::trace!("verbosity {}", ctx.verbose);

    match cli.command {
        Command::Plan => commands::plan::run(&ctx),
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Refresh => commands::refresh::run(&ctx),
        Command::Import { kind, name, id } => commands::import::run(&ctx, &kind, &name, &id),
        Command::Destroy { auto_approve } => commands::destroy::run(&ctx, auto_approve),
        Command::Platform => commands::platform::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "stacklet-provider", &mut io::stdout());
            Ok(())
        }
    }
}
