// Executor and settings tests for hotcuts
//
// Launches go through a recording ProcessLauncher so no real programs are
// started. The profile selector tests run small sh scripts on unix.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hotcuts::{
    execute_file_system, execute_shortcut, run_input, AppSettings, HotcutsError, LaunchRequest,
    ProcessLauncher, ShortcutParams,
};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingLauncher {
    requests: RefCell<Vec<LaunchRequest>>,
}

impl RecordingLauncher {
    fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.borrow().clone()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn spawn(&self, request: &LaunchRequest) -> io::Result<()> {
        self.requests.borrow_mut().push(request.clone());
        Ok(())
    }
}

struct FailingLauncher;

impl ProcessLauncher for FailingLauncher {
    fn spawn(&self, _request: &LaunchRequest) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"))
    }
}

const SHORTCUTS: &str = r#"<Shortcuts>
    <Define name="bin" value="/usr/local/bin"/>
    <Profile name="Dev">
        <Shortcut name="Editor"><Path>{bin}/editor</Path><Params>--wait "two words"</Params></Shortcut>
        <Shortcut name="Shell"><Path>sh</Path></Shortcut>
    </Profile>
    <Profile name="Home">
        <Shortcut name="Music"><Path>{bin}/music</Path></Shortcut>
    </Profile>
</Shortcuts>"#;

fn setup() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let file = dir.path().join("Shortcuts.xml");
    fs::write(&file, SHORTCUTS).expect("write shortcuts");
    (dir, file)
}

#[test]
fn test_execute_shortcut_appends_args() {
    let (_dir, file) = setup();
    let launcher = RecordingLauncher::default();
    let params = ShortcutParams::new()
        .with_file(&file)
        .with_shortcut("editor")
        .with_args("notes.txt");

    assert!(execute_shortcut(&params, &launcher).unwrap());

    let requests = launcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].program, PathBuf::from("/usr/local/bin/editor"));
    assert_eq!(requests[0].args, vec!["--wait", "two words", "notes.txt"]);
    assert_eq!(requests[0].working_dir, Some(PathBuf::from("/usr/local/bin")));
}

#[test]
fn test_execute_shortcut_without_params_or_args() {
    let (_dir, file) = setup();
    let launcher = RecordingLauncher::default();
    let params = ShortcutParams::new().with_file(&file).with_shortcut("SHELL");

    assert!(execute_shortcut(&params, &launcher).unwrap());
    let requests = launcher.requests();
    assert_eq!(requests[0].program, PathBuf::from("sh"));
    assert!(requests[0].args.is_empty());
    assert_eq!(requests[0].working_dir, None);
}

#[test]
fn test_unknown_shortcut_launches_nothing() {
    let (_dir, file) = setup();
    let launcher = RecordingLauncher::default();
    let params = ShortcutParams::new()
        .with_file(&file)
        .with_profile("Dev")
        .with_shortcut("Music");

    assert!(!execute_shortcut(&params, &launcher).unwrap());
    assert!(launcher.requests().is_empty());
}

#[test]
fn test_launch_failure_is_launch_error() {
    let (_dir, file) = setup();
    let params = ShortcutParams::new().with_file(&file).with_shortcut("Editor");

    let err = execute_shortcut(&params, &FailingLauncher).unwrap_err();
    match err {
        HotcutsError::Launch { executable, .. } => {
            assert_eq!(executable, "/usr/local/bin/editor");
        }
        other => panic!("expected launch error, got {other}"),
    }
}

#[test]
fn test_execute_file_system_opens_existing_paths() {
    let (dir, file) = setup();
    let launcher = RecordingLauncher::default();

    assert!(execute_file_system(&file, "", &launcher).unwrap());
    assert!(execute_file_system(dir.path(), "", &launcher).unwrap());
    assert!(!execute_file_system(&dir.path().join("missing"), "", &launcher).unwrap());
    assert!(!execute_file_system(Path::new(""), "", &launcher).unwrap());

    let requests = launcher.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].args.contains(&file.display().to_string()));
}

#[test]
fn test_run_input_prefers_filesystem() {
    let (dir, file) = setup();
    let launcher = RecordingLauncher::default();

    // An existing path is opened directly, the document is never read
    let params = ShortcutParams::new()
        .with_file(dir.path().join("not-a-shortcuts-file.xml"))
        .with_shortcut(file.display().to_string());
    assert!(run_input(&params, &launcher).unwrap());

    let params = ShortcutParams::new()
        .with_file(&file)
        .with_profile("home")
        .with_shortcut("music");
    assert!(run_input(&params, &launcher).unwrap());

    let params = params.with_shortcut("nothing");
    assert!(!run_input(&params, &launcher).unwrap());

    let requests = launcher.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].program, PathBuf::from("/usr/local/bin/music"));
}

#[test]
fn test_settings_file_drives_params() {
    let (dir, file) = setup();
    let settings_path = dir.path().join("settings.json");
    fs::write(
        &settings_path,
        format!(
            r#"{{ "shortcuts_file": {:?}, "profile": "Home", "log": true }}"#,
            file.display().to_string()
        ),
    )
    .unwrap();

    let settings = AppSettings::load(Some(settings_path.as_path())).unwrap();
    assert!(settings.log);
    settings.validate().unwrap();

    let params = settings.shortcut_params().unwrap();
    assert_eq!(params.file, file);
    assert_eq!(params.profile, "Home");
    assert_eq!(hotcuts::enumerate_names(&params).unwrap(), vec!["Music"]);
}

#[cfg(unix)]
mod selector {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_select_profile_reads_first_line() {
        let dir = TempDir::new().unwrap();
        let selector = script(dir.path(), "pick.sh", "echo '  Home  '\necho Dev");
        assert_eq!(hotcuts::select_profile(&selector).unwrap(), "Home");
    }

    #[test]
    fn test_select_profile_failure() {
        let dir = TempDir::new().unwrap();
        let selector = script(dir.path(), "fail.sh", "exit 3");
        let err = hotcuts::select_profile(&selector).unwrap_err();
        assert!(matches!(err, HotcutsError::ProfileSelector { .. }));
    }

    #[test]
    fn test_selector_overrides_profile() {
        let (dir, file) = setup();
        let chosen = script(dir.path(), "home.sh", "echo Home");
        let silent = script(dir.path(), "silent.sh", "true");

        let mut settings = AppSettings::default();
        settings.apply_overrides(Some(file), Some("Dev".to_string()), Some(chosen));
        assert_eq!(settings.shortcut_params().unwrap().profile, "Home");

        settings.apply_overrides(None, None, Some(silent));
        assert_eq!(settings.shortcut_params().unwrap().profile, "Dev");
    }
}
