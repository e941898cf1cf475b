//! The `ssm` CLI entry point: parses arguments, wires up logging from
//! `--debug`/`--verbose`, and dispatches to one subcommand handler.
//!
//! Grounded on `ssm_frontend.py`'s verb dispatch, ported the way
//! `alpm-lint/src/main.rs` wires `clap` + `simplelog` together.

use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

mod cli;
mod commands;
mod config;
mod error;
mod output;

use cli::{Cli, Command, CommonArgs};
use ssm_domain::SSM_VERSION;

fn common_args(command: &Command) -> CommonArgs {
    match command {
        Command::Build(args) => args.common.clone(),
        Command::Cloned(args) => args.common.clone(),
        Command::Created(args) => args.common.clone(),
        Command::Diffd(args) => args.common.clone(),
        Command::Find(args) => args.common.clone(),
        Command::Install(args) => args.common.clone(),
        Command::Invd(args) => args.common.clone(),
        Command::Listd(args) => args.common.clone(),
        Command::Makepkg(args) => args.common.clone(),
        Command::Publish(args) => args.common.clone(),
        Command::Uninstall(args) => args.common.clone(),
        Command::Unpublish(args) => args.common.clone(),
        Command::Upgraded(args) => args.common.clone(),
        Command::Version => CommonArgs::default(),
    }
}

fn log_level(common: &CommonArgs) -> LevelFilter {
    if common.debug {
        LevelFilter::Debug
    } else if common.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if matches!(cli.command, Command::Version) {
        println!("ssm {SSM_VERSION}");
        return ExitCode::SUCCESS;
    }

    let common = common_args(&cli.command);
    if let Err(error) = TermLogger::init(
        log_level(&common),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("error: failed to initialize logger:\n{error}");
        return ExitCode::FAILURE;
    }

    // Config's `disabled_publish_platforms`/`list_for_all_platforms`
    // replace the original's `globls` module state; loaded once here
    // and passed by reference into the handlers that need it, rather
    // than read from a module singleton (Design Note "Global mutable
    // state").
    let config = config::load_config();

    let result = match cli.command {
        Command::Build(args) => commands::build(args),
        Command::Cloned(args) => commands::cloned(args),
        Command::Created(args) => commands::created(args),
        Command::Diffd(args) => commands::diffd(args),
        Command::Find(args) => commands::find(args),
        Command::Install(args) => commands::install(args),
        Command::Invd(args) => commands::invd(args),
        Command::Listd(args) => commands::listd(args, &config),
        Command::Makepkg(args) => commands::makepkg(args),
        Command::Publish(args) => commands::publish(args, &config),
        Command::Uninstall(args) => commands::uninstall(args),
        Command::Unpublish(args) => commands::unpublish(args, &config),
        Command::Upgraded(args) => commands::upgraded(args),
        Command::Version => unreachable!("handled above"),
    };

    if let Err(error) = result {
        eprintln!("error: {error}");
        if common.debug {
            let mut source = std::error::Error::source(&error);
            while let Some(err) = source {
                eprintln!("  caused by: {err}");
                source = err.source();
            }
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
