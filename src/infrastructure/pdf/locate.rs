use std::{
    env,
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::{process::Command, time::timeout};

use super::{PathCheck, VersionProbe};

#[cfg(windows)]
pub const BINARY_NAME: &str = "wkhtmltopdf.exe";
#[cfg(not(windows))]
pub const BINARY_NAME: &str = "wkhtmltopdf";

/// Common install locations. Only reported by diagnostics; resolution uses
/// the configured override and the PATH.
pub const WELL_KNOWN_PATHS: &[&str] = &[
    "/usr/local/bin/wkhtmltopdf",
    "/usr/bin/wkhtmltopdf",
    "/opt/homebrew/bin/wkhtmltopdf",
    "/opt/wkhtmltopdf/bin/wkhtmltopdf",
    r"C:\Program Files\wkhtmltopdf\bin\wkhtmltopdf.exe",
    r"C:\Program Files (x86)\wkhtmltopdf\bin\wkhtmltopdf.exe",
];

/// Picks the renderer binary once at startup: configured override first,
/// then the first match on the PATH.
pub fn resolve_binary(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(
            "Configured renderer path {} does not exist; falling back to PATH lookup",
            path.display()
        );
    }

    search_path(BINARY_NAME)
}

pub fn search_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    search_in(&paths, name)
}

pub fn search_in(paths: &OsStr, name: &str) -> Option<PathBuf> {
    env::split_paths(paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

pub fn check_path(path: &Path) -> PathCheck {
    PathCheck {
        path: path.display().to_string(),
        exists: path.is_file(),
    }
}

pub fn well_known_checks() -> Vec<PathCheck> {
    WELL_KNOWN_PATHS
        .iter()
        .map(|p| check_path(Path::new(p)))
        .collect()
}

/// Runs `<binary> --version` with a bounded wait.
pub async fn probe_version(binary: Option<&Path>, wait: Duration) -> VersionProbe {
    let Some(binary) = binary else {
        return VersionProbe::NotRun;
    };

    let mut command = Command::new(binary);
    command
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => return VersionProbe::Failed(e.to_string()),
    };

    match timeout(wait, child.wait_with_output()).await {
        Err(_) => VersionProbe::TimedOut(wait),
        Ok(Err(e)) => VersionProbe::Failed(e.to_string()),
        Ok(Ok(output)) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            VersionProbe::Reported(version)
        }
        Ok(Ok(output)) => VersionProbe::Failed(format!(
            "{}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )),
    }
}
