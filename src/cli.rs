use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hotcuts - resolve and launch named program shortcuts
#[derive(Parser)]
#[command(name = "hotcuts")]
#[command(about = "Resolve and launch program shortcuts from a template-based XML shortcuts file")]
#[command(version)]
pub struct Cli {
    /// Shortcuts file to load (default: Shortcuts.xml)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Profile to use (default: the first profile in the file)
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Program whose first line of output names the profile to use
    #[arg(short, long, global = true)]
    pub selector: Option<PathBuf>,

    /// Settings file (default: <config dir>/hotcuts/settings.json)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Print what would be launched instead of launching it
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Report how long resolution and launching took
    #[arg(long, global = true)]
    pub timed: bool,

    /// Log debug information to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch a file, directory or shortcut
    Run {
        /// Existing path to open, or the name of a shortcut
        input: String,

        /// Extra arguments appended to the shortcut's parameters
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the resolved executable and parameters of a shortcut
    Show {
        /// Shortcut name
        shortcut: String,
    },
    /// List every shortcut of the profile
    List {
        /// Also print each shortcut's executable and parameters
        #[arg(short, long)]
        resolved: bool,
    },
    /// Print shortcut names starting with a prefix
    Complete {
        /// Prefix to match, ignoring case
        prefix: String,
    },
    /// Resolve every shortcut of the profile and report errors
    Validate,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

/// Join extra arguments into one argument string, quoting where needed
pub fn join_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                format!("\"{arg}\"")
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
