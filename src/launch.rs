//! Launching resolved shortcuts
//!
//! [`LaunchSpecification`] is the end product of resolution: an executable
//! path plus one argument string. Starting it is delegated to a
//! [`ProcessLauncher`], so front-ends and tests can swap the real
//! [`SystemLauncher`] for something else.
//!
//! Programs started by [`SystemLauncher`] run in their own session with no
//! stdio attached. A background thread reaps each one, so the caller never
//! blocks and a long-running front-end does not collect zombies.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::error::{HotcutsError, Result};

/// A concrete program to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpecification {
    executable: String,
    params: String,
}

impl LaunchSpecification {
    pub fn new(executable: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            params: params.into(),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// The argument string, exactly as resolved
    pub fn params(&self) -> &str {
        &self.params
    }

    /// Append caller-supplied arguments, separated by a single space
    pub fn with_extra_args(mut self, extra: &str) -> Self {
        let extra = extra.trim();
        if !extra.is_empty() {
            if !self.params.is_empty() {
                self.params.push(' ');
            }
            self.params.push_str(extra);
        }
        self
    }

    /// Directory containing the executable, when it has one
    pub fn working_directory(&self) -> Option<PathBuf> {
        Path::new(&self.executable)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    /// The argument string split into individual arguments
    pub fn arguments(&self) -> Vec<String> {
        split_arguments(&self.params)
    }

    pub fn to_request(&self) -> LaunchRequest {
        LaunchRequest {
            program: PathBuf::from(&self.executable),
            args: self.arguments(),
            working_dir: self.working_directory(),
        }
    }

    /// Start the program with `extra_args` appended to the argument string
    pub fn launch(&self, launcher: &dyn ProcessLauncher, extra_args: &str) -> Result<()> {
        let spec = self.clone().with_extra_args(extra_args);
        launcher
            .spawn(&spec.to_request())
            .map_err(|e| HotcutsError::launch(&spec.executable, e))
    }
}

/// Everything a launcher needs to start one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchRequest {
    /// Request that opens an existing file or directory with the desktop's
    /// default handler
    pub fn open(path: &Path, args: &str) -> Self {
        let (opener, mut leading): (&str, Vec<String>) = if cfg!(target_os = "macos") {
            ("open", Vec::new())
        } else if cfg!(windows) {
            ("cmd", vec!["/C".into(), "start".into(), String::new()])
        } else {
            ("xdg-open", Vec::new())
        };
        leading.push(path.display().to_string());
        leading.extend(split_arguments(args));

        Self {
            program: PathBuf::from(opener),
            args: leading,
            working_dir: None,
        }
    }

    /// Human readable command line, for logs and dry runs
    pub fn display(&self) -> String {
        let mut line = quote_argument(&self.program.display().to_string());
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote_argument(arg));
        }
        line
    }
}

/// Process launcher seam
pub trait ProcessLauncher {
    /// Start the process described by `request` without waiting for it
    fn spawn(&self, request: &LaunchRequest) -> std::io::Result<()>;
}

/// Launcher backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher {
    /// Log and print the command line instead of starting anything
    pub dry_run: bool,
}

impl SystemLauncher {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl ProcessLauncher for SystemLauncher {
    fn spawn(&self, request: &LaunchRequest) -> std::io::Result<()> {
        if self.dry_run {
            info!("[DRY RUN] Would launch: {}", request.display());
            println!("[DRY RUN] {}", request.display());
            return Ok(());
        }

        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .in_new_session();
        if let Some(dir) = request.working_dir.as_ref().filter(|dir| dir.is_dir()) {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn()?;
        info!("Launched {} (pid {})", request.display(), child.id());
        reap(child)?;
        Ok(())
    }
}

/// Wait for `child` on a detached thread
fn reap(mut child: Child) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    thread::Builder::new()
        .name(format!("reap-{}", child.id()))
        .spawn(move || {
            let status = child.wait()?;
            debug!("Process {} exited with {}", child.id(), status);
            Ok(status)
        })
}

/// Extension trait for `std::process::Command` to detach launched programs
pub trait CommandSession {
    /// Run the command as the leader of a new session, away from our
    /// terminal and process group
    fn in_new_session(&mut self) -> &mut Self;
}

impl CommandSession for Command {
    #[cfg(unix)]
    fn in_new_session(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setsid().map_err(std::io::Error::other)?;
                Ok(())
            });
        }
        self
    }

    #[cfg(not(unix))]
    fn in_new_session(&mut self) -> &mut Self {
        self
    }
}

/// Split an argument string on whitespace, honoring double quotes
///
/// `\"` produces a literal quote; any other backslash is kept as-is so
/// Windows paths survive untouched.
pub fn split_arguments(params: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = params.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
                has_token = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }

    args
}

fn quote_argument(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}
