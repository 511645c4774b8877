//! Hotcuts - Main entry point
//!
//! Command-line front-end over the shortcut resolution library.

use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::CommandFactory;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use hotcuts::cli::{join_args, Cli, Commands};
use hotcuts::{executor, AppSettings, ShortcutParams, SystemLauncher};

/// Initialize tracing to stderr; `RUST_LOG` overrides the default level
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Main application entry point
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let Some(command) = cli.command.as_ref() else {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    };

    let settings = AppSettings::load(cli.settings.as_deref());
    let verbose = cli.verbose || settings.as_ref().is_ok_and(|s| s.log);
    init_logging(verbose);

    let result = settings.and_then(|mut settings| {
        settings.apply_overrides(cli.file.clone(), cli.profile.clone(), cli.selector.clone());
        settings.validate()?;
        run(&cli, command, &settings)
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            for (depth, cause) in e.chain().enumerate() {
                if depth == 0 {
                    eprintln!("Error: {cause}");
                } else {
                    eprintln!("  caused by: {cause}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, command: &Commands, settings: &AppSettings) -> Result<ExitCode> {
    let start = Instant::now();
    let params = settings.shortcut_params()?;
    debug!("Using {:?}, profile {:?}", params.file, params.profile);

    let code = match command {
        Commands::Run { input, args } => {
            let launcher = SystemLauncher::new(cli.dry_run);
            let params = params.with_shortcut(input).with_args(join_args(args));
            if executor::run_input(&params, &launcher)? {
                ExitCode::SUCCESS
            } else {
                eprintln!("{}", not_found(&params));
                ExitCode::FAILURE
            }
        }
        Commands::Show { shortcut } => {
            let params = params.with_shortcut(shortcut);
            match executor::resolve(&params)? {
                Some(spec) => {
                    println!("{}", spec.executable());
                    println!("{}", spec.params());
                    ExitCode::SUCCESS
                }
                None => {
                    eprintln!("{}", not_found(&params));
                    ExitCode::FAILURE
                }
            }
        }
        Commands::List { resolved: false } => {
            for name in executor::enumerate_names(&params)? {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Commands::List { resolved: true } => {
            for (name, spec) in executor::shortcuts(&params)? {
                println!("{name}\t{}\t{}", spec.executable(), spec.params());
            }
            ExitCode::SUCCESS
        }
        Commands::Complete { prefix } => {
            for name in executor::complete(&params, prefix)? {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Commands::Validate => {
            let shortcuts = executor::shortcuts(&params)
                .with_context(|| format!("Validation of {:?} failed", params.file))?;
            println!(
                "{:?}: {} shortcuts resolved in profile {:?}",
                params.file,
                shortcuts.len(),
                params.profile
            );
            ExitCode::SUCCESS
        }
    };

    if cli.timed {
        println!("Elapsed: {:.3} ms", start.elapsed().as_secs_f64() * 1000.0);
    }
    info!("Finished in {:?}", start.elapsed());

    Ok(code)
}

fn not_found(params: &ShortcutParams) -> String {
    format!(
        "Could not find shortcut \"{}\" for profile \"{}\" in xml file {:?}",
        params.shortcut, params.profile, params.file
    )
}
