//! Front-end operations
//!
//! Every call here opens the shortcuts file afresh, resolves, and returns;
//! nothing is cached between calls. Engine errors come back as
//! [`HotcutsError::Document`] with the dotted path of the failing node.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{HotcutsError, Result};
use crate::launch::{LaunchRequest, LaunchSpecification, ProcessLauncher};
use crate::resolver::{LoadError, ShortcutFile};

/// Default shortcuts document, relative to the working directory
pub const DEFAULT_SHORTCUTS_FILE: &str = "Shortcuts.xml";

/// What to resolve: file, profile filter, shortcut name and extra arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutParams {
    pub file: PathBuf,
    /// Empty selects the first profile
    pub profile: String,
    pub shortcut: String,
    /// Appended to the resolved argument string on launch
    pub args: String,
}

impl Default for ShortcutParams {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_SHORTCUTS_FILE),
            profile: String::new(),
            shortcut: String::new(),
            args: String::new(),
        }
    }
}

impl ShortcutParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = file.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = shortcut.into();
        self
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }
}

/// Load a shortcuts file, converting load failures to [`HotcutsError`]
pub fn open(file: &Path) -> Result<ShortcutFile> {
    ShortcutFile::load(file).map_err(|e| match e {
        LoadError::Parse(source) => HotcutsError::load(file, source),
        LoadError::Resolve { path, source } => HotcutsError::Document { path, source },
    })
}

/// Resolve one shortcut; `Ok(None)` if the profile or shortcut is unknown
pub fn resolve(params: &ShortcutParams) -> Result<Option<LaunchSpecification>> {
    let file = open(&params.file)?;
    file.get_shortcut(&params.profile, &params.shortcut)
        .map_err(|e| HotcutsError::document(file.document(), e))
}

/// Names of every shortcut in the selected profile, in enumeration order
pub fn enumerate_names(params: &ShortcutParams) -> Result<Vec<String>> {
    let file = open(&params.file)?;
    file.shortcut_names(&params.profile)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| HotcutsError::document(file.document(), e))
}

/// Names starting with `prefix`, ignoring case
pub fn complete(params: &ShortcutParams, prefix: &str) -> Result<Vec<String>> {
    let file = open(&params.file)?;
    file.complete(&params.profile, prefix)
        .map_err(|e| HotcutsError::document(file.document(), e))
}

/// Every shortcut of the selected profile, materialized
pub fn shortcuts(params: &ShortcutParams) -> Result<Vec<(String, LaunchSpecification)>> {
    let file = open(&params.file)?;
    file.shortcuts(&params.profile)
        .map_err(|e| HotcutsError::document(file.document(), e))
}

/// Resolve `params.shortcut` and launch it with `params.args` appended
///
/// Returns `Ok(false)` when there is no such shortcut.
pub fn execute_shortcut(params: &ShortcutParams, launcher: &dyn ProcessLauncher) -> Result<bool> {
    let Some(spec) = resolve(params)? else {
        debug!(
            "No shortcut {:?} in profile {:?} of {:?}",
            params.shortcut, params.profile, params.file
        );
        return Ok(false);
    };

    info!("Executing shortcut {:?}: {}", params.shortcut, spec.executable());
    spec.launch(launcher, &params.args)?;
    Ok(true)
}

/// Open `path` with the desktop's default handler if it exists
///
/// Returns `Ok(false)` when `path` is neither a file nor a directory.
pub fn execute_file_system(
    path: &Path,
    args: &str,
    launcher: &dyn ProcessLauncher,
) -> Result<bool> {
    if path.as_os_str().is_empty() || !(path.is_file() || path.is_dir()) {
        return Ok(false);
    }

    info!("Opening {:?}", path);
    launcher
        .spawn(&LaunchRequest::open(path, args))
        .map_err(|e| HotcutsError::launch(path.display().to_string(), e))?;
    Ok(true)
}

/// Treat `params.shortcut` as a filesystem path first, then as a shortcut
pub fn run_input(params: &ShortcutParams, launcher: &dyn ProcessLauncher) -> Result<bool> {
    if execute_file_system(Path::new(&params.shortcut), &params.args, launcher)? {
        return Ok(true);
    }
    execute_shortcut(params, launcher)
}

/// Run a profile selector program and return the first line it prints
///
/// An empty result means the selector had no opinion; callers fall back to
/// their configured profile.
pub fn select_profile(selector: &Path) -> Result<String> {
    debug!("Running profile selector {:?}", selector);

    let output = Command::new(selector)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| HotcutsError::profile_selector(selector, e.to_string()))?;

    if !output.status.success() {
        return Err(HotcutsError::profile_selector(
            selector,
            format!("exited with {}", output.status),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let profile = stdout.lines().next().unwrap_or_default().trim().to_string();
    if profile.is_empty() {
        warn!("Profile selector {:?} printed nothing", selector);
    } else {
        info!("Profile selector chose {:?}", profile);
    }

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_defaults() {
        let params = ShortcutParams::new();
        assert_eq!(params.file, PathBuf::from("Shortcuts.xml"));
        assert!(params.profile.is_empty());
        assert!(params.shortcut.is_empty());
        assert!(params.args.is_empty());
    }

    #[test]
    fn test_params_builder() {
        let params = ShortcutParams::new()
            .with_file("/etc/hotcuts.xml")
            .with_profile("Dev")
            .with_shortcut("editor")
            .with_args("notes.txt");
        assert_eq!(params.file, PathBuf::from("/etc/hotcuts.xml"));
        assert_eq!(params.profile, "Dev");
        assert_eq!(params.shortcut, "editor");
        assert_eq!(params.args, "notes.txt");
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let params = ShortcutParams::new().with_file("/definitely/not/here.xml");
        let err = resolve(&params).unwrap_err();
        assert!(matches!(err, HotcutsError::Load { .. }));
    }

    #[test]
    fn test_missing_selector_is_reported() {
        let err = select_profile(Path::new("/definitely/not/a/selector")).unwrap_err();
        assert!(matches!(err, HotcutsError::ProfileSelector { .. }));
    }
}
