// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Symlink synchronization between stage and home.
//!
//! Specialized dotfiles live on the stage. The user's home directory only
//! holds symlinks into the stage, so editing `~/.bashrc` edits the staged
//! copy, which can then be generalized back into the repository.

use crate::store::{ensure_parent_dir, StoreError};

use std::{
    fs::remove_file,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Symlinks from home directory into stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeLinks {
    home: PathBuf,
}

impl HomeLinks {
    /// Construct new symlink manager for home directory.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        self.home.as_path()
    }

    /// Absolute path of dotfile in home directory.
    pub fn path(&self, dotfile: impl AsRef<Path>) -> PathBuf {
        self.home.join(dotfile.as_ref())
    }

    /// Check if dotfile in home directory is a symlink.
    pub fn is_linked(&self, dotfile: impl AsRef<Path>) -> bool {
        self.path(dotfile).is_symlink()
    }

    /// Link dotfile in home directory to target.
    ///
    /// Nothing happens if anything already exists at the dotfile's location
    /// in home, including dangling symlinks. Missing parent directories are
    /// created. Returns true if a new symlink was created.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::CreateDir`] if parent directories cannot be
    ///   created.
    /// - Return [`LinkError::Symlink`] if symlink cannot be created.
    #[instrument(skip(self, dotfile, target), level = "debug")]
    pub fn link(&self, dotfile: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<bool> {
        let link = self.path(dotfile);
        if link.symlink_metadata().is_ok() {
            return Ok(false);
        }

        info!(
            "create symlink {} -> {}",
            link.display(),
            target.as_ref().display()
        );
        ensure_parent_dir(&link)?;
        symlink(target.as_ref(), &link).map_err(|err| LinkError::Symlink {
            source: err,
            link: link.clone(),
        })?;

        Ok(true)
    }

    /// Remove symlink of dotfile from home directory.
    ///
    /// Only symlinks are removed. A missing symlink, or a regular file in its
    /// place, is reported and left alone. Returns true if a symlink was
    /// removed.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Remove`] if symlink cannot be removed.
    #[instrument(skip(self, dotfile), level = "debug")]
    pub fn unlink(&self, dotfile: impl AsRef<Path>) -> Result<bool> {
        let link = self.path(dotfile.as_ref());
        if link.symlink_metadata().is_err() {
            warn!("symlink for {} not found", dotfile.as_ref().display());
            return Ok(false);
        }

        if !link.is_symlink() {
            warn!("{} is not a symlink, leaving it alone", link.display());
            return Ok(false);
        }

        info!("remove symlink {}", link.display());
        remove_file(&link).map_err(|err| LinkError::Remove {
            source: err,
            link: link.clone(),
        })?;

        Ok(true)
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Symlink management error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Parent directories of symlink cannot be created.
    #[error(transparent)]
    CreateDir(#[from] StoreError),

    /// Symlink cannot be created.
    #[error("failed to create symlink at {:?}", link.display())]
    Symlink {
        #[source]
        source: std::io::Error,
        link: PathBuf,
    },

    /// Symlink cannot be removed.
    #[error("failed to remove symlink at {:?}", link.display())]
    Remove {
        #[source]
        source: std::io::Error,
        link: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs::{read_link, write};

    #[sealed_test]
    fn link_creates_parent_dirs() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let links = HomeLinks::new(root.join("home"));
        let target = root.join("stage/.config/app/conf");

        assert!(links.link(".config/app/conf", &target)?);
        assert!(links.is_linked(".config/app/conf"));
        assert_eq!(read_link(links.path(".config/app/conf"))?, target);

        Ok(())
    }

    #[sealed_test]
    fn link_never_replaces_existing_entries() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let links = HomeLinks::new(&root);
        write(root.join(".bashrc"), "# mine\n")?;

        assert!(!links.link(".bashrc", root.join("stage/.bashrc"))?);
        assert!(!links.is_linked(".bashrc"));

        // Dangling symlinks count as existing.
        assert!(links.link(".vimrc", root.join("nowhere"))?);
        assert!(!links.link(".vimrc", root.join("stage/.vimrc"))?);
        assert_eq!(read_link(links.path(".vimrc"))?, root.join("nowhere"));

        Ok(())
    }

    #[sealed_test]
    fn unlink_only_removes_symlinks() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let links = HomeLinks::new(&root);
        write(root.join(".bashrc"), "# mine\n")?;
        links.link(".vimrc", root.join("stage/.vimrc"))?;

        assert!(links.unlink(".vimrc")?);
        assert!(!links.is_linked(".vimrc"));
        assert!(!links.unlink(".vimrc")?);
        assert!(!links.unlink(".bashrc")?);
        assert!(root.join(".bashrc").is_file());

        Ok(())
    }
}
