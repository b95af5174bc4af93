// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile repository version control.
//!
//! The dotfile repository is a regular Git repository whose working tree
//! holds generic dotfiles. Dotmgr commits dotfiles that it adds, updates, or
//! removes through libgit2. Anything that may need user interaction, e.g.,
//! pushing, pulling, or arbitrary Git commands, is delegated to the Git
//! binary so it can use the user's own credential setup.

use crate::{
    store::{DotfileStore, StoreError},
    tags::TagConfig,
};

use auth_git2::GitAuthenticator;
use git2::{build::RepoBuilder, Config, FetchOptions, RemoteCallbacks, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Command,
    time,
};
use tracing::{debug, info, instrument, warn};

/// Git repository holding generic dotfiles.
pub struct DotfileRepository {
    repository: Repository,
}

impl std::fmt::Debug for DotfileRepository {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("DotfileRepository")
            .field("path", &self.repository.path())
            .finish()
    }
}

impl DotfileRepository {
    /// Open existing dotfile repository.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::NotARepository`] if path is not a Git
    ///   repository.
    #[instrument(skip(path), level = "debug")]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        debug!("open repository {}", path.as_ref().display());
        let repository =
            Repository::open(path.as_ref()).map_err(|err| RepositoryError::NotARepository {
                source: err,
                path: path.as_ref().to_path_buf(),
            })?;

        Ok(Self { repository })
    }

    /// Initialize dotfile repository.
    ///
    /// Reuses an existing repository at path. Creates and commits an initial
    /// tag configuration for target host if the repository does not have
    /// one yet.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::Git2`] if libgit2 operations fail.
    /// - Return [`RepositoryError::Store`] if tag configuration cannot be
    ///   written.
    #[instrument(skip(path, tag_config, hostname), level = "debug")]
    pub fn init(
        path: impl AsRef<Path>,
        tag_config: impl AsRef<Path>,
        hostname: impl Into<String>,
    ) -> Result<Self> {
        let repository = match Repository::open(path.as_ref()) {
            Ok(repository) => repository,
            Err(_) => {
                info!("initialize repository in {}", path.as_ref().display());
                Repository::init(path.as_ref())?
            }
        };
        let repository = Self { repository };

        let store = DotfileStore::new(path.as_ref());
        if !store.contains(tag_config.as_ref()) {
            info!("create initial tag configuration");
            store.write(tag_config.as_ref(), TagConfig::initial(hostname).to_string())?;
            repository.add(tag_config.as_ref())?;
        }

        Ok(repository)
    }

    /// Clone dotfile repository from remote.
    ///
    /// Clone progress is displayed through a progress bar. Credentials are
    /// requested through Git's credential helpers, the SSH agent, or a
    /// terminal prompt.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::Git2`] if libgit2 operations fail.
    /// - Return [`RepositoryError::IndicatifStyleTemplate`] if progress bar
    ///   cannot be styled.
    #[instrument(skip(url, path), level = "debug")]
    pub fn clone(url: impl AsRef<str>, path: impl AsRef<Path>) -> Result<Self> {
        info!("clone {} into {}", url.as_ref(), path.as_ref().display());
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(url.as_ref().to_string());
        bar.enable_steady_tick(time::Duration::from_millis(100));

        let authenticator = GitAuthenticator::default();
        let config = Config::open_default()?;

        let mut throttle = time::Instant::now();
        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&config));
        rc.transfer_progress(|progress| {
            if throttle.elapsed() > time::Duration::from_millis(10) {
                throttle = time::Instant::now();
                bar.set_length(progress.total_objects() as u64);
                bar.set_position(progress.received_objects() as u64);
            }
            true
        });

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(rc);
        let repository = RepoBuilder::new()
            .fetch_options(fo)
            .clone(url.as_ref(), path.as_ref());
        bar.finish_and_clear();

        Ok(Self {
            repository: repository?,
        })
    }

    /// Absolute path to working tree.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::Bare`] if repository has no working tree.
    pub fn workdir(&self) -> Result<&Path> {
        self.repository.workdir().ok_or_else(|| RepositoryError::Bare {
            path: self.repository.path().to_path_buf(),
        })
    }

    /// Check if dotfile is tracked.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::Git2`] if index cannot be read.
    pub fn is_tracked(&self, dotfile: impl AsRef<Path>) -> Result<bool> {
        Ok(self.repository.index()?.get_path(dotfile.as_ref(), 0).is_some())
    }

    /// Stage and commit new dotfile.
    ///
    /// Dotfiles that are already tracked are skipped. Returns true if a
    /// commit was made.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::Git2`] if libgit2 operations fail.
    #[instrument(skip(self, dotfile), level = "debug")]
    pub fn add(&self, dotfile: impl AsRef<Path>) -> Result<bool> {
        let dotfile = dotfile.as_ref();
        if self.is_tracked(dotfile)? {
            debug!("{} is already tracked, skipping commit", dotfile.display());
            return Ok(false);
        }

        self.stage_and_commit(dotfile, format!("Add {}", dotfile.display()))?;

        Ok(true)
    }

    /// Stage and commit changes to dotfile.
    ///
    /// Unchanged dotfiles are skipped. Uses `Update <dotfile>` as commit
    /// message if no message is given. Returns true if a commit was made.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::Git2`] if libgit2 operations fail.
    #[instrument(skip(self, dotfile, message), level = "debug")]
    pub fn update(&self, dotfile: impl AsRef<Path>, message: Option<&str>) -> Result<bool> {
        let dotfile = dotfile.as_ref();
        if self.repository.status_file(dotfile)?.is_empty() {
            debug!("{} has not changed, skipping commit", dotfile.display());
            return Ok(false);
        }

        let message = match message {
            Some(message) => message.to_string(),
            None => format!("Update {}", dotfile.display()),
        };
        self.stage_and_commit(dotfile, message)?;

        Ok(true)
    }

    /// Remove dotfile from index and commit its removal.
    ///
    /// The dotfile itself stays in the working tree. Untracked dotfiles are
    /// skipped. Returns true if a commit was made.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::Git2`] if libgit2 operations fail.
    #[instrument(skip(self, dotfile), level = "debug")]
    pub fn remove(&self, dotfile: impl AsRef<Path>) -> Result<bool> {
        let dotfile = dotfile.as_ref();
        if !self.is_tracked(dotfile)? {
            warn!("{} is not tracked, skipping commit", dotfile.display());
            return Ok(false);
        }

        info!("commit removal of {}", dotfile.display());
        let mut index = self.repository.index()?;
        index.remove_path(dotfile)?;
        index.write()?;
        self.commit_index(format!("Remove {}", dotfile.display()))?;

        Ok(true)
    }

    /// Push to upstream.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::Syscall`] if Git binary fails.
    pub fn push(&self) -> Result<()> {
        info!("push to upstream");
        self.execute(["push"])
    }

    /// Pull from upstream.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::Syscall`] if Git binary fails.
    pub fn pull(&self) -> Result<()> {
        info!("pull from upstream");
        self.execute(["pull"])
    }

    /// Run Git binary on repository through current process.
    ///
    /// # Errors
    ///
    /// - Return [`RepositoryError::Bare`] if repository has no working tree.
    /// - Return [`RepositoryError::Syscall`] if Git binary fails.
    pub fn execute(&self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Result<()> {
        let mut bin_args: Vec<OsString> = vec!["-C".into(), self.workdir()?.into()];
        bin_args.extend(args.into_iter().map(Into::into));
        debug!("execute git {bin_args:?}");
        syscall_interactive("git", bin_args)
    }

    fn stage_and_commit(&self, dotfile: &Path, message: impl AsRef<str>) -> Result<()> {
        info!("commit {}", dotfile.display());
        let mut index = self.repository.index()?;
        index.add_path(dotfile)?;
        index.write()?;
        self.commit_index(message)
    }

    fn commit_index(&self, message: impl AsRef<str>) -> Result<()> {
        // INVARIANT: Always use new tree produced by index after staging.
        let mut index = self.repository.index()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repository.find_tree(tree_oid)?;

        // INVARIANT: Always determine latest parent commits to append to.
        let signature = self.repository.signature()?;
        let mut parents = Vec::new();
        if let Some(parent) = self.repository.head().ok().and_then(|head| head.target()) {
            parents.push(self.repository.find_commit(parent)?);
        }
        let parents = parents.iter().collect::<Vec<_>>();

        self.repository.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message.as_ref(),
            &tree,
            &parents,
        )?;

        Ok(())
    }
}

fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<()> {
    let status = Command::new(cmd.as_ref()).args(args).spawn()?.wait()?;
    if !status.success() {
        return Err(RepositoryError::Syscall(std::io::Error::other(format!(
            "command {:?} failed",
            cmd.as_ref()
        ))));
    }

    Ok(())
}

/// Dotfile repository error types.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Path is not a Git repository.
    #[error(
        "{:?} is not a git repository, run `dotmgr init` to initialize it",
        path.display()
    )]
    NotARepository {
        #[source]
        source: git2::Error,
        path: PathBuf,
    },

    /// Repository has no working tree.
    #[error("repository {:?} has no working tree", path.display())]
    Bare { path: PathBuf },

    /// Tag configuration cannot be written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Git binary fails.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;
