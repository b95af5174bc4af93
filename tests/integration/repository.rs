// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::RepoFixture;

use anyhow::Result;
use dotmgr::{repository::RepositoryError, DotfileRepository};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::fs::{create_dir_all, read_to_string, write};

#[sealed_test]
fn init_commits_initial_tag_config() -> Result<()> {
    let root = std::env::current_dir()?.join("dotfiles");
    let fixture = RepoFixture::new(&root)?;

    let repo = DotfileRepository::init(&root, ".config/dotmgr/tags.conf", "thinkpad")?;
    assert!(repo.is_tracked(".config/dotmgr/tags.conf")?);
    assert_eq!(
        read_to_string(root.join(".config/dotmgr/tags.conf"))?,
        "thinkpad: thinkpad\n"
    );
    assert_eq!(fixture.head_message()?, "Add .config/dotmgr/tags.conf");
    assert_eq!(fixture.commit_count()?, 1);

    // Existing tag configuration is never overwritten.
    DotfileRepository::init(&root, ".config/dotmgr/tags.conf", "other")?;
    assert_eq!(
        read_to_string(root.join(".config/dotmgr/tags.conf"))?,
        "thinkpad: thinkpad\n"
    );
    assert_eq!(fixture.commit_count()?, 1);

    Ok(())
}

#[sealed_test]
fn open_rejects_plain_directory() -> Result<()> {
    let root = std::env::current_dir()?.join("plain");
    create_dir_all(&root)?;

    let result = DotfileRepository::open(&root);
    assert!(matches!(result, Err(RepositoryError::NotARepository { .. })));

    Ok(())
}

#[sealed_test]
fn add_skips_tracked_dotfiles() -> Result<()> {
    let root = std::env::current_dir()?.join("dotfiles");
    let fixture = RepoFixture::new(&root)?;
    let repo = DotfileRepository::open(&root)?;

    write(root.join(".bashrc"), "# bash\n")?;
    assert!(repo.add(".bashrc")?);
    assert_eq!(fixture.head_message()?, "Add .bashrc");

    assert!(!repo.add(".bashrc")?);
    assert_eq!(fixture.commit_count()?, 1);

    Ok(())
}

#[sealed_test]
fn update_commits_changed_dotfiles() -> Result<()> {
    let root = std::env::current_dir()?.join("dotfiles");
    let fixture = RepoFixture::new(&root)?;
    let repo = DotfileRepository::open(&root)?;

    write(root.join(".bashrc"), "# bash\n")?;
    repo.add(".bashrc")?;
    assert!(!repo.update(".bashrc", None)?);
    assert_eq!(fixture.commit_count()?, 1);

    write(root.join(".bashrc"), "# bash\nexport EDITOR=vim\n")?;
    assert!(repo.update(".bashrc", None)?);
    assert_eq!(fixture.head_message()?, "Update .bashrc");

    write(root.join(".bashrc"), "# bash\nexport EDITOR=nvim\n")?;
    assert!(repo.update(".bashrc", Some("Switch editor"))?);
    assert_eq!(fixture.head_message()?, "Switch editor");
    assert_eq!(fixture.commit_count()?, 3);

    Ok(())
}

#[sealed_test]
fn remove_commits_removal() -> Result<()> {
    let root = std::env::current_dir()?.join("dotfiles");
    let fixture = RepoFixture::new(&root)?;
    let repo = DotfileRepository::open(&root)?;

    write(root.join(".bashrc"), "# bash\n")?;
    repo.add(".bashrc")?;
    assert!(repo.remove(".bashrc")?);
    assert!(!repo.is_tracked(".bashrc")?);
    assert_eq!(fixture.head_message()?, "Remove .bashrc");
    assert!(root.join(".bashrc").exists());

    assert!(!repo.remove(".bashrc")?);
    assert_eq!(fixture.commit_count()?, 2);

    Ok(())
}
