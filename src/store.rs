// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile stores.
//!
//! Dotmgr keeps dotfiles in two places: the __repository__ holds their
//! generic form, and the __stage__ holds their host-specific form. Both are
//! plain directories addressed through relative dotfile paths, e.g.,
//! `.bashrc` or `.config/nvim/init.lua`, so both are modeled by the same
//! [`DotfileStore`] type.

use ignore::WalkBuilder;
use std::{
    fs::{read_to_string, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Name of version control metadata directory that is never walked.
pub const GIT_DIR: &str = ".git";

/// Directory of dotfiles addressed by relative paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotfileStore {
    root: PathBuf,
}

impl DotfileStore {
    /// Construct new dotfile store at root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Absolute path of dotfile in this store.
    pub fn path(&self, dotfile: impl AsRef<Path>) -> PathBuf {
        self.root.join(dotfile.as_ref())
    }

    /// Check if store holds dotfile as regular file.
    pub fn contains(&self, dotfile: impl AsRef<Path>) -> bool {
        self.path(dotfile).is_file()
    }

    /// Read full content of dotfile.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Read`] if dotfile cannot be read.
    pub fn read(&self, dotfile: impl AsRef<Path>) -> Result<String> {
        let path = self.path(dotfile);
        read_to_string(&path).map_err(|err| StoreError::Read { source: err, path })
    }

    /// Write full content of dotfile.
    ///
    /// Creates missing parent directories first.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CreateDir`] if parent directories cannot be
    ///   created.
    /// - Return [`StoreError::Write`] if dotfile cannot be written.
    pub fn write(&self, dotfile: impl AsRef<Path>, content: impl AsRef<str>) -> Result<()> {
        let path = self.path(dotfile);
        ensure_parent_dir(&path)?;
        write(&path, content.as_ref().as_bytes())
            .map_err(|err| StoreError::Write { source: err, path })
    }

    /// List all dotfiles in store as relative paths.
    ///
    /// Walks the store depth first in file name order. Directories named
    /// `.git` and any path in `excluded` are skipped along with everything
    /// below them. Hidden files are included, and ignore files are not
    /// honored.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Walk`] if a directory cannot be traversed.
    #[instrument(skip(self, excluded), level = "debug")]
    pub fn walk(
        &self,
        excluded: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> Result<Vec<PathBuf>> {
        let excluded: Vec<PathBuf> = excluded.into_iter().map(Into::into).collect();
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                // INVARIANT: Never descend into git metadata or dotmgr's own bookkeeping.
                entry.file_name() != GIT_DIR && !excluded.iter().any(|path| path == entry.path())
            })
            .build();

        let mut dotfiles = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }

            // INVARIANT: Walker only yields paths below root.
            if let Ok(dotfile) = entry.path().strip_prefix(&self.root) {
                debug!("found {}", dotfile.display());
                dotfiles.push(dotfile.to_path_buf());
            }
        }

        Ok(dotfiles)
    }
}

/// Create all missing parent directories of path.
///
/// # Errors
///
/// - Return [`StoreError::CreateDir`] if a directory cannot be created.
pub fn ensure_parent_dir(path: impl AsRef<Path>) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        mkdirp::mkdirp(parent).map_err(|err| StoreError::CreateDir {
            source: err,
            path: parent.to_path_buf(),
        })?;
    }

    Ok(())
}

/// Dotfile store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Dotfile cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Dotfile cannot be written.
    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Directory cannot be traversed.
    #[error(transparent)]
    Walk(#[from] ignore::Error),
}

impl StoreError {
    /// Check if error was caused by a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => {
                source.kind() == ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
