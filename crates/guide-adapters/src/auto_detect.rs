//! Locating the backend's program before the first call.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use guide_proto::InvocationError;
use thiserror::Error;
use tracing::debug;

use crate::CliBackend;

/// The backend's program could not be found anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name} CLI not found (looked for `{command}`). {install_hint}")]
pub struct NoBackendError {
    pub name: String,
    pub command: String,
    pub install_hint: String,
}

impl From<NoBackendError> for InvocationError {
    fn from(err: NoBackendError) -> Self {
        InvocationError::CliNotFound {
            command: err.name,
            remediation: err.install_hint,
        }
    }
}

/// Resolves the program for `backend`.
///
/// An explicit path is used as-is if it is an executable file. A bare name
/// is searched on `PATH`, then in the backend's fallback locations.
pub fn detect_backend(backend: &CliBackend) -> Result<PathBuf, NoBackendError> {
    let path_var = std::env::var_os("PATH");
    let home = std::env::var_os("HOME").map(PathBuf::from);
    resolve_program(backend, path_var.as_deref(), home.as_deref())
}

fn resolve_program(
    backend: &CliBackend,
    path_var: Option<&OsStr>,
    home: Option<&Path>,
) -> Result<PathBuf, NoBackendError> {
    let not_found = || NoBackendError {
        name: backend.name.clone(),
        command: backend.command.clone(),
        install_hint: backend.install_hint.clone(),
    };

    let command = Path::new(&backend.command);
    if has_path_component(command) {
        return if is_executable(command) {
            Ok(command.to_path_buf())
        } else {
            Err(not_found())
        };
    }

    if let Some(found) = path_var.and_then(|paths| search_path(&backend.command, paths)) {
        debug!("Found {} on PATH at {}", backend.name, found.display());
        return Ok(found);
    }

    for candidate in &backend.fallback_paths {
        let Some(path) = expand_home(candidate, home) else {
            continue;
        };
        if is_executable(&path) {
            debug!("Found {} at fallback location {}", backend.name, path.display());
            return Ok(path);
        }
    }

    Err(not_found())
}

fn has_path_component(command: &Path) -> bool {
    command.is_absolute() || command.components().count() > 1
}

fn search_path(command: &str, paths: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| executable_names(command).map(move |name| dir.join(name)))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn executable_names(command: &str) -> impl Iterator<Item = String> {
    [command.to_string(), format!("{command}.exe"), format!("{command}.cmd")].into_iter()
}

#[cfg(not(windows))]
fn executable_names(command: &str) -> impl Iterator<Item = String> {
    std::iter::once(command.to_string())
}

fn expand_home(candidate: &str, home: Option<&Path>) -> Option<PathBuf> {
    match candidate.strip_prefix("~/") {
        Some(rest) => home.map(|home| home.join(rest)),
        None => Some(PathBuf::from(candidate)),
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
