// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Manage dotfiles across several machines.
//!
//! Dotmgr keeps every dotfile in two forms. The __generic__ form lives in a
//! shared Git repository and contains host-specific sections for every
//! machine. The __specific__ form lives on the __stage__ of one machine, and
//! has every section that does not apply to that machine commented out. The
//! user's home directory only holds symlinks into the stage.
//!
//! Which sections apply is decided by the __tags__ assigned to the current
//! host in the tag configuration. See [`section`] for the directive syntax.

pub mod config;
pub mod link;
pub mod manager;
pub mod path;
pub mod repository;
pub mod section;
pub mod store;
pub mod tags;

pub use config::Layout;
pub use manager::{Manager, Outcome};
pub use repository::DotfileRepository;
pub use tags::{TagConfig, TagSet};
