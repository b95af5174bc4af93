// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile management.
//!
//! A managed dotfile exists in three places:
//!
//! 1. The __repository__ holds its generic form.
//! 2. The __stage__ holds its specific form for the current host.
//! 3. The __home__ directory holds a symlink to the staged copy.
//!
//! [`Manager`] moves dotfiles between these places. Specializing reads a
//! dotfile from the repository and writes its specific form to the stage.
//! Generalizing does the reverse. Bulk operations walk a whole store and
//! handle each dotfile independently in file name order.

use crate::{
    config::Layout,
    link::{HomeLinks, LinkError},
    section::{self, SectionError},
    store::{ensure_parent_dir, DotfileStore, StoreError},
    tags::TagSet,
};

use std::{
    fs::{copy, remove_dir_all, remove_file, rename},
    path::{Path, PathBuf},
};
use tracing::{error, info, instrument, warn};

/// Result of transforming a single dotfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Transformed dotfile was written.
    Written,

    /// Source dotfile is empty, so nothing was written.
    Empty,

    /// Dotfile is not on stage, so nothing was written.
    NotOnStage,
}

/// Dotfile manager for one host.
#[derive(Debug)]
pub struct Manager {
    repository: DotfileStore,
    stage: DotfileStore,
    links: HomeLinks,
    tag_config: PathBuf,
    tags: TagSet,
}

impl Manager {
    /// Construct new dotfile manager.
    pub fn new(layout: &Layout, tags: TagSet) -> Self {
        Self {
            repository: DotfileStore::new(&layout.repository),
            stage: DotfileStore::new(&layout.stage),
            links: HomeLinks::new(&layout.home),
            tag_config: layout.tag_config.clone(),
            tags,
        }
    }

    pub fn repository(&self) -> &DotfileStore {
        &self.repository
    }

    pub fn stage(&self) -> &DotfileStore {
        &self.stage
    }

    pub fn links(&self) -> &HomeLinks {
        &self.links
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Turn user supplied dotfile path into path relative to home.
    ///
    /// Absolute paths inside home lose their home prefix. Everything else is
    /// returned unchanged.
    pub fn dotfile_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        path.strip_prefix(self.links.home())
            .unwrap_or(path)
            .to_path_buf()
    }

    /// Specialize dotfile from repository onto stage.
    ///
    /// # Errors
    ///
    /// - Return [`ManagerError::SourceMissing`] if dotfile is not in
    ///   repository.
    /// - Return [`ManagerError::Section`] if comment marker cannot be
    ///   identified.
    /// - Return [`ManagerError::Store`] if reading or writing fails.
    #[instrument(skip(self, dotfile), level = "debug")]
    pub fn specialize(&self, dotfile: impl AsRef<Path>) -> Result<Outcome> {
        let dotfile = dotfile.as_ref();
        info!("specialize {}", dotfile.display());
        let generic = self.repository.read(dotfile).map_err(|err| {
            if err.is_not_found() {
                ManagerError::SourceMissing {
                    path: self.repository.path(dotfile),
                }
            } else {
                ManagerError::Store(err)
            }
        })?;

        let specific = section::specialize(&generic, &self.tags).map_err(|err| {
            ManagerError::Section {
                source: err,
                path: self.repository.path(dotfile),
            }
        })?;
        let Some(specific) = specific else {
            return Ok(Outcome::Empty);
        };
        self.stage.write(dotfile, specific)?;

        Ok(Outcome::Written)
    }

    /// Specialize every dotfile in repository.
    ///
    /// Skips the stage and the tag configuration if they live inside the
    /// repository. Failing dotfiles are reported and skipped, except for
    /// dotfiles whose comment marker cannot be identified, which abort the
    /// whole run.
    ///
    /// # Errors
    ///
    /// - Return [`ManagerError::Section`] if comment marker of any dotfile
    ///   cannot be identified.
    /// - Return [`ManagerError::Store`] if repository cannot be walked.
    #[instrument(skip(self), level = "debug")]
    pub fn specialize_all(&self) -> Result<Vec<PathBuf>> {
        info!("specialize all dotfiles");
        let dotfiles = self
            .repository
            .walk([self.stage.root().to_path_buf(), self.tag_config.clone()])?;

        let mut written = Vec::new();
        for dotfile in dotfiles {
            match self.specialize(&dotfile) {
                Ok(Outcome::Written) => written.push(dotfile),
                Ok(_) => {}
                Err(err @ ManagerError::Section { .. }) => return Err(err),
                Err(err) => error!("{err}"),
            }
        }

        Ok(written)
    }

    /// Generalize dotfile from stage into repository.
    ///
    /// Dotfiles that are not on stage are reported and skipped, because
    /// generalizing is allowed on dotfiles that are not managed yet.
    ///
    /// # Errors
    ///
    /// - Return [`ManagerError::Section`] if comment marker cannot be
    ///   identified.
    /// - Return [`ManagerError::Store`] if reading or writing fails.
    #[instrument(skip(self, dotfile), level = "debug")]
    pub fn generalize(&self, dotfile: impl AsRef<Path>) -> Result<Outcome> {
        let dotfile = dotfile.as_ref();
        info!("generalize {}", dotfile.display());
        let specific = match self.stage.read(dotfile) {
            Ok(specific) => specific,
            Err(err) if err.is_not_found() => {
                warn!(
                    "{0} is not handled by dotmgr, add it with `dotmgr add {0}`",
                    dotfile.display()
                );
                return Ok(Outcome::NotOnStage);
            }
            Err(err) => return Err(err.into()),
        };

        let generic = section::generalize(&specific, &self.tags).map_err(|err| {
            ManagerError::Section {
                source: err,
                path: self.stage.path(dotfile),
            }
        })?;
        let Some(generic) = generic else {
            return Ok(Outcome::Empty);
        };
        self.repository.write(dotfile, generic)?;

        Ok(Outcome::Written)
    }

    /// Generalize every dotfile on stage.
    ///
    /// # Errors
    ///
    /// - Return [`ManagerError::Section`] if comment marker of any dotfile
    ///   cannot be identified.
    /// - Return [`ManagerError::Store`] if stage cannot be walked, or a
    ///   dotfile cannot be read or written.
    #[instrument(skip(self), level = "debug")]
    pub fn generalize_all(&self) -> Result<Vec<PathBuf>> {
        info!("generalize all dotfiles");
        let mut written = Vec::new();
        for dotfile in self.stage.walk(Vec::<PathBuf>::new())? {
            if self.generalize(&dotfile)? == Outcome::Written {
                written.push(dotfile);
            }
        }

        Ok(written)
    }

    /// Link staged dotfile into home directory.
    ///
    /// # Errors
    ///
    /// - Return [`ManagerError::Link`] if symlink cannot be created.
    pub fn link(&self, dotfile: impl AsRef<Path>) -> Result<bool> {
        Ok(self
            .links
            .link(dotfile.as_ref(), self.stage.path(dotfile.as_ref()))?)
    }

    /// Create missing symlinks for every dotfile on stage.
    ///
    /// # Errors
    ///
    /// - Return [`ManagerError::Store`] if stage cannot be walked.
    /// - Return [`ManagerError::Link`] if a symlink cannot be created.
    #[instrument(skip(self), level = "debug")]
    pub fn link_all(&self) -> Result<Vec<PathBuf>> {
        let mut linked = Vec::new();
        for dotfile in self.stage.walk(Vec::<PathBuf>::new())? {
            if self.link(&dotfile)? {
                linked.push(dotfile);
            }
        }

        Ok(linked)
    }

    /// Put dotfile from home directory under management.
    ///
    /// Moves the dotfile onto the stage, links it back into home, and
    /// generalizes it into the repository. Dotfiles that are already
    /// symlinks in home are left alone. Returns true if the generic form was
    /// written into the repository. Empty dotfiles are still moved and
    /// linked, but nothing is written for them.
    ///
    /// # Errors
    ///
    /// - Return [`ManagerError::HomeMissing`] if dotfile does not exist in
    ///   home.
    /// - Return [`ManagerError::Move`] if dotfile cannot be moved.
    /// - Return [`ManagerError::Link`] if symlink cannot be created.
    /// - Return [`ManagerError::Section`] if comment marker cannot be
    ///   identified.
    #[instrument(skip(self, dotfile), level = "debug")]
    pub fn add(&self, dotfile: impl AsRef<Path>) -> Result<bool> {
        let dotfile = dotfile.as_ref();
        let home = self.links.path(dotfile);
        if self.links.is_linked(dotfile) {
            info!("{} is already a symlink", home.display());
            return Ok(false);
        }

        if !home.is_file() {
            return Err(ManagerError::HomeMissing { path: home });
        }

        let staged = self.stage.path(dotfile);
        info!("move dotfile {} => {}", home.display(), staged.display());
        ensure_parent_dir(&staged)?;
        move_file(&home, &staged).map_err(|err| ManagerError::Move {
            source: err,
            from: home.clone(),
            to: staged.clone(),
        })?;

        self.link(dotfile)?;
        let outcome = self.generalize(dotfile)?;

        Ok(outcome == Outcome::Written)
    }

    /// Remove dotfile from stage along with its symlink.
    ///
    /// # Errors
    ///
    /// - Return [`ManagerError::Link`] if symlink cannot be removed.
    /// - Return [`ManagerError::Remove`] if staged dotfile cannot be removed.
    #[instrument(skip(self, dotfile), level = "debug")]
    pub fn remove(&self, dotfile: impl AsRef<Path>) -> Result<()> {
        let dotfile = dotfile.as_ref();
        info!("remove {} and its symlink", dotfile.display());
        self.links.unlink(dotfile)?;

        let staged = self.stage.path(dotfile);
        if let Err(err) = remove_file(&staged) {
            if err.kind() != std::io::ErrorKind::NotFound {
                return Err(ManagerError::Remove {
                    source: err,
                    path: staged,
                });
            }
            warn!("{} is not on stage", dotfile.display());
        }

        Ok(())
    }

    /// Remove every dotfile and symlink, then the stage itself.
    ///
    /// # Errors
    ///
    /// - Return [`ManagerError::Store`] if stage cannot be walked.
    /// - Return [`ManagerError::Link`] if a symlink cannot be removed.
    /// - Return [`ManagerError::Remove`] if stage cannot be removed.
    #[instrument(skip(self), level = "debug")]
    pub fn clean(&self) -> Result<()> {
        info!("clean stage {}", self.stage.root().display());
        if !self.stage.root().exists() {
            return Ok(());
        }

        for dotfile in self.stage.walk(Vec::<PathBuf>::new())? {
            self.remove(&dotfile)?;
        }

        remove_dir_all(self.stage.root()).map_err(|err| ManagerError::Remove {
            source: err,
            path: self.stage.root().to_path_buf(),
        })?;

        Ok(())
    }
}

fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    // INVARIANT: Fall back to copy and remove when rename cannot cross file systems.
    if rename(from, to).is_err() {
        copy(from, to)?;
        remove_file(from)?;
    }

    Ok(())
}

/// Dotfile management error types.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Dotfile to specialize does not exist in repository.
    #[error("dotfile {:?} not found in repository", path.display())]
    SourceMissing { path: PathBuf },

    /// Dotfile to add does not exist in home directory.
    #[error("dotfile {:?} not found", path.display())]
    HomeMissing { path: PathBuf },

    /// Dotfile cannot be moved onto stage.
    #[error("failed to move {:?} to {:?}", from.display(), to.display())]
    Move {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Staged dotfile or stage cannot be removed.
    #[error("failed to remove {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Comment marker cannot be identified.
    #[error("cannot transform {:?}", path.display())]
    Section {
        #[source]
        source: SectionError,
        path: PathBuf,
    },

    /// Dotfile store cannot be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Symlink cannot be managed.
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Friendly result alias :3
pub type Result<T, E = ManagerError> = std::result::Result<T, E>;
