// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Dotmgr needs to know three locations: the dotfile repository, the stage,
//! and the tag configuration. Each location is resolved in the following
//! order, where later sources win:
//!
//! 1. Built-in defaults, see [`crate::path`].
//! 2. Optional settings file at `$XDG_CONFIG_HOME/dotmgr/config.toml`.
//! 3. Environment variables `$DOTMGR_REPO`, `$DOTMGR_STAGE`, and
//!    `$DOTMGR_TAG_CONF`.
//! 4. Bootstrap mode, which always reads the tag configuration from the
//!    repository itself.
//!
//! # Settings File Layout
//!
//! ```toml
//! [paths]
//! repository = "~/src/dotfiles"
//! stage = "$XDG_DATA_HOME/dotmgr/stage"
//! tag_config = "~/.config/dotmgr/tags.conf"
//! ```
//!
//! Every key is optional. Values undergo shell expansion.

use crate::path::{
    bootstrap_tag_config_path, config_file_path, default_repository_dir, default_stage_dir,
    default_tag_config_path, home_dir,
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Environment variable overriding repository location.
pub const REPOSITORY_ENV: &str = "DOTMGR_REPO";

/// Environment variable overriding stage location.
pub const STAGE_ENV: &str = "DOTMGR_STAGE";

/// Environment variable overriding tag configuration location.
pub const TAG_CONFIG_ENV: &str = "DOTMGR_TAG_CONF";

/// Settings file layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Locations of files dotmgr works with.
    #[serde(default)]
    pub paths: PathSettings,
}

impl Settings {
    /// Load settings file if it exists.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ReadSettings`] if settings file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if settings file is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(Self::default());
        }

        debug!("using settings at {}", path.display());
        read_to_string(path)
            .map_err(|err| ConfigError::ReadSettings {
                source: err,
                path: path.to_path_buf(),
            })?
            .parse()
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every configured path.
        for path in [
            &mut settings.paths.repository,
            &mut settings.paths.stage,
            &mut settings.paths.tag_config,
        ]
        .into_iter()
        .flatten()
        {
            *path = expand(path.as_str())?;
        }

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Configured locations.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PathSettings {
    /// Path to dotfile repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Path to stage directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    /// Path to tag configuration file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_config: Option<String>,
}

/// Resolved locations for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Dotfile repository holding generic dotfiles.
    pub repository: PathBuf,

    /// Stage holding host-specific dotfiles.
    pub stage: PathBuf,

    /// Tag configuration file.
    pub tag_config: PathBuf,

    /// Home directory that stage files are linked into.
    pub home: PathBuf,
}

impl Layout {
    /// Resolve layout from settings file, environment, and bootstrap flag.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if home directory is unknown.
    /// - Return [`ConfigError::ReadSettings`] or
    ///   [`ConfigError::Deserialize`] if settings file is broken.
    /// - Return [`ConfigError::ShellExpansion`] if an environment variable
    ///   cannot be expanded.
    pub fn load(bootstrap: bool) -> Result<Self> {
        let settings = Settings::load(config_file_path()?)?;
        Self::resolve(&settings, bootstrap)
    }

    /// Resolve layout from given settings.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if home directory is unknown.
    /// - Return [`ConfigError::ShellExpansion`] if an environment variable
    ///   cannot be expanded.
    pub fn resolve(settings: &Settings, bootstrap: bool) -> Result<Self> {
        let repository = match override_from(REPOSITORY_ENV, &settings.paths.repository)? {
            Some(path) => path,
            None => default_repository_dir()?,
        };
        let stage = match override_from(STAGE_ENV, &settings.paths.stage)? {
            Some(path) => path,
            None => default_stage_dir()?,
        };
        let tag_config = if bootstrap {
            bootstrap_tag_config_path(&repository)
        } else {
            match override_from(TAG_CONFIG_ENV, &settings.paths.tag_config)? {
                Some(path) => path,
                None => default_tag_config_path()?,
            }
        };

        let layout = Self {
            repository,
            stage,
            tag_config,
            home: home_dir()?,
        };
        debug!("resolved layout {layout:?}");

        Ok(layout)
    }

    /// Check that dotfile repository exists.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::RepositoryMissing`] if it does not.
    pub fn ensure_repository(&self) -> Result<()> {
        if !self.repository.exists() {
            return Err(ConfigError::RepositoryMissing {
                path: self.repository.clone(),
            });
        }

        Ok(())
    }

    /// Create stage directory if needed.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::CreateStage`] if stage cannot be created.
    pub fn ensure_stage(&self) -> Result<()> {
        mkdirp::mkdirp(&self.stage).map_err(|err| ConfigError::CreateStage {
            source: err,
            path: self.stage.clone(),
        })?;

        Ok(())
    }
}

fn override_from(var: &str, configured: &Option<String>) -> Result<Option<PathBuf>> {
    if let Ok(value) = std::env::var(var) {
        return Ok(Some(PathBuf::from(expand(value.as_str())?)));
    }

    Ok(configured.as_ref().map(PathBuf::from))
}

fn expand(value: &str) -> Result<String> {
    Ok(shellexpand::full(value)
        .map_err(ConfigError::ShellExpansion)?
        .into_owned())
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Settings file cannot be read.
    #[error("failed to read settings at {:?}", path.display())]
    ReadSettings {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Home directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] crate::path::NoWayHome),

    /// Dotfile repository does not exist.
    #[error(
        "dotfile repository {:?} does not exist, set $DOTMGR_REPO to change its path",
        path.display()
    )]
    RepositoryMissing { path: PathBuf },

    /// Stage directory cannot be created.
    #[error("failed to create stage at {:?}", path.display())]
    CreateStage {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
