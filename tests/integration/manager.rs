// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{RepoFixture, Workspace};

use anyhow::Result;
use dotmgr::{manager::ManagerError, DotfileRepository, Outcome};
use indoc::indoc;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{fs::read_link, path::PathBuf};

const GENERIC_BASHRC: &str = indoc! {"
    # -*- mode: sh -*-
    export EDITOR=vim
    ##only laptop
    export BATTERY_SAVER=1
    ##end
    ##not work
    alias vpn='wg-quick up home'
    ##end
"};

const WORK_BASHRC: &str = indoc! {"
    # -*- mode: sh -*-
    export EDITOR=vim
    ##only laptop
    #export BATTERY_SAVER=1
    ##end
    ##not work
    #alias vpn='wg-quick up home'
    ##end
"};

#[sealed_test]
fn specialize_writes_stage() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write(ws.repo_path(".bashrc"), GENERIC_BASHRC)?;

    let manager = ws.manager(&["desktop", "work"]);
    assert_eq!(manager.specialize(".bashrc")?, Outcome::Written);
    assert_eq!(ws.read(ws.stage_path(".bashrc"))?, WORK_BASHRC);

    Ok(())
}

#[sealed_test]
fn specialize_missing_source() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.manager(&[]);

    let result = manager.specialize(".missing");
    assert!(matches!(result, Err(ManagerError::SourceMissing { .. })));

    Ok(())
}

#[sealed_test]
fn specialize_empty_dotfile_writes_nothing() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write(ws.repo_path(".empty"), "")?;

    let manager = ws.manager(&[]);
    assert_eq!(manager.specialize(".empty")?, Outcome::Empty);
    assert!(!ws.stage_path(".empty").exists());

    Ok(())
}

#[sealed_test]
fn specialize_all_skips_git_stage_and_tag_config() -> Result<()> {
    let mut ws = Workspace::new()?;
    ws.layout.stage = ws.repo_path("stage");
    ws.layout.tag_config = ws.repo_path(".config/dotmgr/tags.conf");

    ws.write(ws.repo_path(".bashrc"), GENERIC_BASHRC)?;
    ws.write(ws.repo_path(".config/nvim/init.lua"), "-- nvim\n")?;
    ws.write(ws.repo_path(".config/dotmgr/tags.conf"), "host: work\n")?;
    ws.write(ws.repo_path(".git/config"), "[core]\n")?;
    ws.write(ws.repo_path("stage/.old"), "# old\n")?;

    let manager = ws.manager(&["work"]);
    let result = manager.specialize_all()?;
    let expect: Vec<PathBuf> = vec![".bashrc".into(), ".config/nvim/init.lua".into()];
    assert_eq!(result, expect);
    assert_eq!(ws.read(ws.stage_path(".bashrc"))?, indoc! {"
        # -*- mode: sh -*-
        export EDITOR=vim
        ##only laptop
        #export BATTERY_SAVER=1
        ##end
        ##not work
        #alias vpn='wg-quick up home'
        ##end
    "});
    assert!(!ws.repo_path("stage/.config/dotmgr/tags.conf").exists());
    assert!(!ws.repo_path("stage/.git").exists());

    Ok(())
}

#[sealed_test]
fn specialize_all_aborts_on_unresolvable_marker() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write(ws.repo_path(".a"), "\nno marker\n")?;
    ws.write(ws.repo_path(".b"), "# fine\n")?;

    let manager = ws.manager(&[]);
    let result = manager.specialize_all();
    assert!(matches!(result, Err(ManagerError::Section { .. })));
    assert!(!ws.stage_path(".b").exists());

    Ok(())
}

#[sealed_test]
fn generalize_writes_repository() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write(ws.stage_path(".bashrc"), WORK_BASHRC)?;

    let manager = ws.manager(&["work"]);
    assert_eq!(manager.generalize(".bashrc")?, Outcome::Written);
    assert_eq!(ws.read(ws.repo_path(".bashrc"))?, GENERIC_BASHRC);

    Ok(())
}

#[sealed_test]
fn generalize_not_on_stage_is_skipped() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.manager(&[]);

    assert_eq!(manager.generalize(".untracked")?, Outcome::NotOnStage);
    assert!(!ws.repo_path(".untracked").exists());

    Ok(())
}

#[sealed_test]
fn generalize_all_round_trips_specialize_all() -> Result<()> {
    let ws = Workspace::new()?;
    let vimrc = indoc! {r#"
        " vimrc
        set number
        ""only mac
        set clipboard=unnamed
        ""end
    "#};
    ws.write(ws.repo_path(".bashrc"), GENERIC_BASHRC)?;
    ws.write(ws.repo_path(".vim/vimrc"), vimrc)?;

    let manager = ws.manager(&["laptop", "linux"]);
    manager.specialize_all()?;
    assert_eq!(
        ws.read(ws.stage_path(".vim/vimrc"))?,
        "\" vimrc\nset number\n\"\"only mac\n\"set clipboard=unnamed\n\"\"end\n"
    );

    // Start from a clean repository to make sure content comes from stage.
    std::fs::remove_dir_all(&ws.layout.repository)?;
    let result = manager.generalize_all()?;
    let expect: Vec<PathBuf> = vec![".bashrc".into(), ".vim/vimrc".into()];
    assert_eq!(result, expect);
    assert_eq!(ws.read(ws.repo_path(".bashrc"))?, GENERIC_BASHRC);
    assert_eq!(ws.read(ws.repo_path(".vim/vimrc"))?, vimrc);

    Ok(())
}

#[sealed_test]
fn link_all_creates_missing_symlinks() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write(ws.stage_path(".bashrc"), "# bash\n")?;
    ws.write(ws.stage_path(".config/app/conf"), "# conf\n")?;
    ws.write(ws.home_path(".bashrc"), "# mine\n")?;

    let manager = ws.manager(&[]);
    let result = manager.link_all()?;
    let expect: Vec<PathBuf> = vec![".config/app/conf".into()];
    assert_eq!(result, expect);
    assert_eq!(
        read_link(ws.home_path(".config/app/conf"))?,
        ws.stage_path(".config/app/conf")
    );
    assert_eq!(ws.read(ws.home_path(".bashrc"))?, "# mine\n");

    Ok(())
}

#[sealed_test]
fn add_moves_links_and_generalizes() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write(ws.home_path(".bashrc"), WORK_BASHRC)?;

    let manager = ws.manager(&["work"]);
    let dotfile = manager.dotfile_path(ws.home_path(".bashrc"));
    assert_eq!(dotfile, PathBuf::from(".bashrc"));
    assert!(manager.add(&dotfile)?);

    assert_eq!(read_link(ws.home_path(".bashrc"))?, ws.stage_path(".bashrc"));
    assert_eq!(ws.read(ws.stage_path(".bashrc"))?, WORK_BASHRC);
    assert_eq!(ws.read(ws.repo_path(".bashrc"))?, GENERIC_BASHRC);

    // Already linked dotfiles are left alone.
    assert!(!manager.add(&dotfile)?);

    Ok(())
}

#[sealed_test]
fn add_empty_dotfile_writes_nothing_to_commit() -> Result<()> {
    let ws = Workspace::new()?;
    let fixture = RepoFixture::new(&ws.layout.repository)?;
    ws.write(ws.home_path(".hushlogin"), "")?;

    let manager = ws.manager(&[]);
    let repository = DotfileRepository::open(&ws.layout.repository)?;
    if manager.add(".hushlogin")? {
        repository.add(".hushlogin")?;
    }

    assert_eq!(read_link(ws.home_path(".hushlogin"))?, ws.stage_path(".hushlogin"));
    assert_eq!(ws.read(ws.stage_path(".hushlogin"))?, "");
    assert!(!ws.repo_path(".hushlogin").exists());
    assert!(!repository.is_tracked(".hushlogin")?);
    assert_eq!(fixture.commit_count()?, 0);

    Ok(())
}

#[sealed_test]
fn add_missing_dotfile() -> Result<()> {
    let ws = Workspace::new()?;
    let manager = ws.manager(&[]);

    let result = manager.add(".missing");
    assert!(matches!(result, Err(ManagerError::HomeMissing { .. })));

    Ok(())
}

#[sealed_test]
fn remove_and_clean() -> Result<()> {
    let ws = Workspace::new()?;
    ws.write(ws.stage_path(".bashrc"), "# bash\n")?;
    ws.write(ws.stage_path(".config/app/conf"), "# conf\n")?;

    let manager = ws.manager(&[]);
    manager.link_all()?;

    manager.remove(".bashrc")?;
    assert!(!ws.stage_path(".bashrc").exists());
    assert!(ws.home_path(".bashrc").symlink_metadata().is_err());

    // Missing pieces are only reported.
    manager.remove(".bashrc")?;

    manager.clean()?;
    assert!(!ws.layout.stage.exists());
    assert!(ws.home_path(".config/app/conf").symlink_metadata().is_err());

    Ok(())
}
