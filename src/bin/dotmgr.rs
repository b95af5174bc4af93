// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotmgr::{
    path::TAG_CONFIG_PATH, tags::local_hostname, DotfileRepository, Layout, Manager, Outcome,
    TagConfig,
};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::{ffi::OsString, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about = "Generalize and specialize dotfiles across machines",
    override_usage = "\n  dotmgr [options] <dotmgr-command>\n  dotmgr [options] <git-command>",
    subcommand_help_heading = "Commands",
    after_help = "General dotfiles are read from and written to ~/repositories/dotfiles, \
                  set $DOTMGR_REPO to change this. The default stage is \
                  $XDG_DATA_HOME/dotmgr/stage, set $DOTMGR_STAGE to change this. Tags are \
                  read from ~/.config/dotmgr/tags.conf, set $DOTMGR_TAG_CONF to change this.",
    version
)]
struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let global = self.global;
        match self.command {
            Command::Init => run_init(&global),
            Command::Clone(opts) => run_clone(&global, opts),
            Command::Add(opts) => run_add(&global, opts),
            Command::Remove(opts) => run_remove(&global, opts),
            Command::Specialize(opts) => run_specialize(&global, opts),
            Command::Generalize(opts) => run_generalize(&global, opts),
            Command::Link => run_link(&global),
            Command::Clean => run_clean(&global),
            Command::Sync => run_sync(&global),
            Command::Push => run_push(&global),
            Command::Git(args) => run_git(&global, args),
        }
    }
}

#[derive(Args, Clone, Debug)]
struct GlobalOptions {
    /// Read tag configuration from repository instead of home.
    #[arg(short, long, global = true)]
    pub bootstrap: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Initialize dotfile repository with initial tag configuration.
    #[command(override_usage = "dotmgr init [options]")]
    Init,

    /// Clone existing dotfile repository from remote.
    #[command(override_usage = "dotmgr clone [options] <url>")]
    Clone(CloneOptions),

    /// Put dotfiles from home directory under management.
    #[command(override_usage = "dotmgr add [options] <file>...")]
    Add(AddOptions),

    /// Remove dotfiles from stage and delete their symlinks.
    #[command(override_usage = "dotmgr remove [options] <file>...")]
    Remove(RemoveOptions),

    /// Specialize dotfiles from repository onto stage.
    #[command(override_usage = "dotmgr specialize [options] [<file>...]")]
    Specialize(SpecializeOptions),

    /// Generalize dotfiles from stage into repository.
    #[command(override_usage = "dotmgr generalize [options] [<file>...]")]
    Generalize(GeneralizeOptions),

    /// Create missing symlinks for all dotfiles on stage.
    #[command(override_usage = "dotmgr link [options]")]
    Link,

    /// Remove all symlinks and clear stage.
    #[command(override_usage = "dotmgr clean [options]")]
    Clean,

    /// Pull from upstream, then specialize and link all dotfiles.
    #[command(override_usage = "dotmgr sync [options]")]
    Sync,

    /// Push dotfile repository to upstream.
    #[command(override_usage = "dotmgr push [options]")]
    Push,

    /// Run Git binary directly on dotfile repository.
    #[command(external_subcommand)]
    Git(Vec<OsString>),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CloneOptions {
    /// URL of remote to clone from.
    #[arg(required = true, value_name = "url")]
    pub url: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AddOptions {
    /// Dotfiles relative to home directory.
    #[arg(required = true, value_name = "file")]
    pub files: Vec<PathBuf>,

    /// Do not commit added dotfiles.
    #[arg(short, long)]
    pub no_commit: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RemoveOptions {
    /// Dotfiles relative to home directory.
    #[arg(required = true, value_name = "file")]
    pub files: Vec<PathBuf>,

    /// Commit removal of dotfiles from repository.
    #[arg(short, long)]
    pub commit: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SpecializeOptions {
    /// Dotfiles relative to repository.
    #[arg(group = "target", value_name = "file")]
    pub files: Vec<PathBuf>,

    /// Specialize all dotfiles in repository.
    #[arg(short, long, group = "target")]
    pub all: bool,

    /// Link specialized dotfiles into home directory.
    #[arg(short, long)]
    pub link: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct GeneralizeOptions {
    /// Dotfiles relative to stage.
    #[arg(group = "target", value_name = "file")]
    pub files: Vec<PathBuf>,

    /// Generalize all dotfiles on stage.
    #[arg(short, long, group = "target")]
    pub all: bool,

    /// Commit generalized dotfiles that changed.
    #[arg(short, long)]
    pub commit: bool,

    /// Commit message to use instead of the default one.
    #[arg(short, long, value_name = "message", requires = "commit")]
    pub message: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = if cli.global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn open_manager(global: &GlobalOptions) -> Result<Manager> {
    let layout = Layout::load(global.bootstrap)?;
    layout.ensure_repository()?;
    layout.ensure_stage()?;

    let tags = TagConfig::load(&layout.tag_config)?.resolve(local_hostname()?);
    Ok(Manager::new(&layout, tags))
}

fn open_repository(global: &GlobalOptions) -> Result<DotfileRepository> {
    let layout = Layout::load(global.bootstrap)?;
    layout.ensure_repository()?;
    Ok(DotfileRepository::open(&layout.repository)?)
}

fn run_init(global: &GlobalOptions) -> Result<()> {
    let layout = Layout::load(global.bootstrap)?;
    DotfileRepository::init(&layout.repository, TAG_CONFIG_PATH, local_hostname()?)?;

    Ok(())
}

fn run_clone(global: &GlobalOptions, opts: CloneOptions) -> Result<()> {
    let layout = Layout::load(global.bootstrap)?;
    DotfileRepository::clone(opts.url, &layout.repository)?;

    Ok(())
}

fn run_add(global: &GlobalOptions, opts: AddOptions) -> Result<()> {
    let manager = open_manager(global)?;
    let repository = if opts.no_commit {
        None
    } else {
        Some(DotfileRepository::open(manager.repository().root())?)
    };

    for file in opts.files {
        let dotfile = manager.dotfile_path(file);
        if !manager.add(&dotfile)? {
            continue;
        }

        if let Some(repository) = &repository {
            repository.add(&dotfile)?;
        }
    }

    Ok(())
}

fn run_remove(global: &GlobalOptions, opts: RemoveOptions) -> Result<()> {
    let manager = open_manager(global)?;
    let repository = if opts.commit {
        Some(DotfileRepository::open(manager.repository().root())?)
    } else {
        None
    };

    for file in opts.files {
        let dotfile = manager.dotfile_path(file);
        manager.remove(&dotfile)?;

        if let Some(repository) = &repository {
            repository.remove(&dotfile)?;
        }
    }

    Ok(())
}

fn run_specialize(global: &GlobalOptions, opts: SpecializeOptions) -> Result<()> {
    let manager = open_manager(global)?;
    if opts.all {
        manager.specialize_all()?;
        if opts.link {
            manager.link_all()?;
        }

        return Ok(());
    }

    for file in opts.files {
        let dotfile = manager.dotfile_path(file);
        let outcome = manager.specialize(&dotfile)?;
        if opts.link && outcome == Outcome::Written {
            manager.link(&dotfile)?;
        }
    }

    Ok(())
}

fn run_generalize(global: &GlobalOptions, opts: GeneralizeOptions) -> Result<()> {
    let manager = open_manager(global)?;
    let written = if opts.all {
        manager.generalize_all()?
    } else {
        let mut written = Vec::new();
        for file in opts.files {
            let dotfile = manager.dotfile_path(file);
            if manager.generalize(&dotfile)? == Outcome::Written {
                written.push(dotfile);
            }
        }
        written
    };

    if opts.commit {
        let repository = DotfileRepository::open(manager.repository().root())?;
        for dotfile in written {
            repository.update(&dotfile, opts.message.as_deref())?;
        }
    }

    Ok(())
}

fn run_link(global: &GlobalOptions) -> Result<()> {
    let manager = open_manager(global)?;
    let linked = manager.link_all()?;
    info!("created {} symlinks", linked.len());

    Ok(())
}

fn run_clean(global: &GlobalOptions) -> Result<()> {
    open_manager(global)?.clean()?;

    Ok(())
}

fn run_sync(global: &GlobalOptions) -> Result<()> {
    open_repository(global)?.pull()?;

    let manager = open_manager(global)?;
    manager.specialize_all()?;
    manager.link_all()?;

    Ok(())
}

fn run_push(global: &GlobalOptions) -> Result<()> {
    open_repository(global)?.push()?;

    Ok(())
}

fn run_git(global: &GlobalOptions, args: Vec<OsString>) -> Result<()> {
    open_repository(global)?.execute(args)?;

    Ok(())
}
