// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine default locations of the dotfile repository, the stage, the tag
//! configuration, and dotmgr's own configuration file. None of these
//! functions check if the path returned actually exists.

use std::path::{Path, PathBuf};

/// Location of tag configuration relative to home or the repository.
pub const TAG_CONFIG_PATH: &str = ".config/dotmgr/tags.conf";

/// Determine absolute path to user's home directory.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to dotfile repository.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_repository_dir() -> Result<PathBuf> {
    home_dir().map(|path| path.join("repositories").join("dotfiles"))
}

/// Determine default absolute path to stage directory.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/dotmgr/stage`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_stage_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("dotmgr").join("stage"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to tag configuration.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_tag_config_path() -> Result<PathBuf> {
    home_dir().map(|path| path.join(TAG_CONFIG_PATH))
}

/// Absolute path to tag configuration inside a dotfile repository.
pub fn bootstrap_tag_config_path(repository: impl AsRef<Path>) -> PathBuf {
    repository.as_ref().join(TAG_CONFIG_PATH)
}

/// Determine absolute path to dotmgr's configuration file.
///
/// Uses `$XDG_CONFIG_HOME/dotmgr/config.toml`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn config_file_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("dotmgr").join("config.toml"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
