use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Errors for resolving the home directory
#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("HOME environment variable is not set")]
    HomeMissing,
    #[error("APPDATA environment variable is not set")]
    AppDataMissing,
    #[error("home_dir must be an absolute path (after ~ expansion): {0}")]
    AbsoluteRequired(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if !raw.starts_with('~') {
        return Ok(PathBuf::from(raw));
    }

    #[cfg(target_os = "windows")]
    let home = env::var("USERPROFILE")
        .or_else(|_| env::var("HOME"))
        .map_err(|_| HomeDirError::HomeMissing)?;
    #[cfg(not(target_os = "windows"))]
    let home = env::var("HOME").map_err(|_| HomeDirError::HomeMissing)?;

    if raw == "~" {
        return Ok(PathBuf::from(home));
    }
    let rest = raw.trim_start_matches('~').trim_start_matches(['/', '\\']);
    Ok(Path::new(&home).join(rest))
}

/// Normalize and resolve the home directory path.
///
/// - A provided path gets `~` expanded and must end up absolute.
/// - Otherwise `$HOME/<default_subdir>` (`%APPDATA%` on Windows) is used.
///
/// If `create` is true, the directory is created if missing.
pub fn resolve_home_dir(
    config_home: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match config_home {
        Some(raw) => {
            let expanded = expand_tilde(&raw)?;
            if !expanded.is_absolute() {
                return Err(HomeDirError::AbsoluteRequired(raw));
            }
            expanded
        }
        None => default_base()?.join(default_subdir),
    };

    if create {
        fs::create_dir_all(&path)?;
    }
    Ok(path)
}

#[cfg(target_os = "windows")]
fn default_base() -> Result<PathBuf, HomeDirError> {
    env::var("APPDATA")
        .map(PathBuf::from)
        .map_err(|_| HomeDirError::AppDataMissing)
}

#[cfg(not(target_os = "windows"))]
fn default_base() -> Result<PathBuf, HomeDirError> {
    env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| HomeDirError::HomeMissing)
}
