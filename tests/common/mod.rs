use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

/// Captured outcome of one binary invocation. `log_path` holds a transcript
/// for assertion messages.
pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn follow_binary() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_follow") {
        return PathBuf::from(path);
    }
    // target/<profile>/deps/<test> → target/<profile>/follow
    let candidate = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(|dir| dir.join("follow")));
    match candidate {
        Some(path) if path.exists() => path,
        _ => panic!("follow binary not found; build with the cli feature"),
    }
}

fn transcript_path(case_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("follow-test-logs");
    fs::create_dir_all(&dir).expect("create transcript dir");
    let slug: String = case_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    dir.join(format!("{slug}-{stamp}.log"))
}

/// Run the binary with a scratch `HOME` and no `FOLLOW_*` overrides, so the
/// user's own configuration never leaks into a test. Stdin is the null device,
/// so the binary never sees a terminal.
pub fn run_cli_case(case_name: &str, home: &Path, args: &[&str]) -> CmdResult {
    let bin = follow_binary();
    let mut command = Command::new(&bin);
    command.args(args).env("HOME", home).stdin(Stdio::null());
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("FOLLOW_") {
            command.env_remove(key);
        }
    }
    let output = command.output().expect("run follow");

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    let mut transcript = String::new();
    let _ = writeln!(transcript, "case={case_name}");
    let _ = writeln!(transcript, "bin={} args={args:?}", bin.display());
    let _ = writeln!(transcript, "status={}", output.status);
    let _ = writeln!(transcript, "--- stdout ---\n{stdout}");
    let _ = writeln!(transcript, "--- stderr ---\n{stderr}");
    let log_path = transcript_path(case_name);
    fs::write(&log_path, transcript).expect("write transcript");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
