// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Host tag resolution.
//!
//! Every machine is described by a set of free-form __tags__. Tags are read
//! from the __tag configuration__ file, which lists one host per line:
//!
//! ```text
//! workstation: linux desktop work
//! thinkpad: linux laptop
//! macbook: mac laptop
//! ```
//!
//! The first line whose host name matches the current machine wins. Tags end
//! at a second colon, so `host: a b: c` tags `host` with `a` and `b` only.

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument, warn};

/// Set of tags describing a host.
///
/// An empty tag set is valid, and simply never matches any section.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    /// Construct new tag set.
    pub fn new(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(tags.into_iter().map(Into::into).collect())
    }

    /// Check if any of the given tags belongs to this set.
    pub fn matches_any(&self, tags: impl IntoIterator<Item = impl AsRef<str>>) -> bool {
        tags.into_iter().any(|tag| self.0.contains(tag.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S> FromIterator<S> for TagSet
where
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl Display for TagSet {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.iter().collect::<Vec<_>>().join(", ").as_str())
    }
}

/// Host entry of tag configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub hostname: String,
    pub tags: Vec<String>,
}

/// Parsed tag configuration.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct TagConfig {
    entries: Vec<HostEntry>,
}

impl TagConfig {
    /// Load tag configuration file.
    ///
    /// # Errors
    ///
    /// - Return [`TagError::TagConfigMissing`] if file does not exist.
    /// - Return [`TagError::ReadTagConfig`] if file cannot be read.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TagError::TagConfigMissing {
                path: path.to_path_buf(),
            });
        }

        debug!("using tag configuration at {}", path.display());
        let content = read_to_string(path).map_err(|err| TagError::ReadTagConfig {
            source: err,
            path: path.to_path_buf(),
        })?;

        Ok(content.parse().unwrap_or_default())
    }

    /// Initial tag configuration for a host that tags the host with its own
    /// name.
    pub fn initial(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        Self {
            entries: vec![HostEntry {
                tags: vec![hostname.clone()],
                hostname,
            }],
        }
    }

    /// Tags of first entry that matches target host name.
    pub fn tags_for(&self, hostname: impl AsRef<str>) -> Option<TagSet> {
        self.entries
            .iter()
            .find(|entry| entry.hostname == hostname.as_ref())
            .map(|entry| entry.tags.iter().cloned().collect())
    }

    /// Resolve tags for target host name.
    ///
    /// Falls back to an empty tag set if the host has no entry.
    pub fn resolve(&self, hostname: impl AsRef<str>) -> TagSet {
        match self.tags_for(hostname.as_ref()) {
            Some(tags) => {
                debug!("found tags: {tags}");
                tags
            }
            None => {
                warn!("no tags found for host {:?}", hostname.as_ref());
                TagSet::default()
            }
        }
    }

    pub fn entries(&self) -> &[HostEntry] {
        self.entries.as_slice()
    }
}

impl FromStr for TagConfig {
    type Err = std::convert::Infallible;

    fn from_str(data: &str) -> std::result::Result<Self, Self::Err> {
        let entries = data
            .lines()
            .filter_map(|line| {
                let mut fields = line.split(':');
                let hostname = fields.next()?;
                // INVARIANT: Anything after a second colon is ignored.
                let tags = fields.next()?;
                Some(HostEntry {
                    hostname: hostname.to_string(),
                    tags: tags.split_whitespace().map(str::to_owned).collect(),
                })
            })
            .collect();

        Ok(Self { entries })
    }
}

impl Display for TagConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for entry in &self.entries {
            writeln!(fmt, "{}: {}", entry.hostname, entry.tags.join(" "))?;
        }

        Ok(())
    }
}

/// Determine host name of current machine.
///
/// # Errors
///
/// - Return [`TagError::Hostname`] if host name cannot be queried.
/// - Return [`TagError::HostnameEncoding`] if host name is not valid UTF-8.
pub fn local_hostname() -> Result<String> {
    nix::unistd::gethostname()?
        .into_string()
        .map_err(|_| TagError::HostnameEncoding)
}

/// Tag resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// Tag configuration file does not exist.
    #[error(
        "tag configuration {:?} not found, use --bootstrap to read it from the repository, \
         or set $DOTMGR_TAG_CONF to override its path",
        path.display()
    )]
    TagConfigMissing { path: PathBuf },

    /// Tag configuration file cannot be read.
    #[error("failed to read tag configuration at {:?}", path.display())]
    ReadTagConfig {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Host name of current machine cannot be queried.
    #[error(transparent)]
    Hostname(#[from] nix::Error),

    /// Host name of current machine is not valid UTF-8.
    #[error("host name is not valid UTF-8")]
    HostnameEncoding,
}

/// Friendly result alias :3
pub type Result<T, E = TagError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    const CONFIG: &str = indoc! {"
        workstation: linux desktop work
        thinkpad: linux laptop
        not a host entry
        thinkpad: mac
        bare:
        workstation-2: windows
        multi:linux: ignored
    "};

    #[test_case("workstation", Some(&["desktop", "linux", "work"]); "exact host")]
    #[test_case("thinkpad", Some(&["laptop", "linux"]); "first entry wins")]
    #[test_case("bare", Some(&[]); "host without tags")]
    #[test_case("multi", Some(&["linux"]); "second colon ends tags")]
    #[test_case("workstation-", None; "prefix of longer host")]
    #[test_case("macbook", None; "unknown host")]
    #[test]
    fn tags_for_host(hostname: &str, expect: Option<&[&str]>) {
        let config: TagConfig = CONFIG.parse().unwrap();
        let expect = expect.map(|tags| tags.iter().copied().collect::<TagSet>());
        assert_eq!(config.tags_for(hostname), expect);
    }

    #[test]
    fn resolve_unknown_host_is_empty() {
        let config: TagConfig = CONFIG.parse().unwrap();
        assert_eq!(config.resolve("macbook"), TagSet::default());
    }

    #[test]
    fn tag_set_matching() {
        let host = TagSet::new(["linux", "laptop"]);
        assert!(host.matches_any(["mac", "laptop"]));
        assert!(!host.matches_any(["mac", "windows"]));
        assert!(!host.matches_any(Vec::<String>::new()));
        assert!(!TagSet::default().matches_any(["linux"]));
    }

    #[test]
    fn initial_tag_config() {
        let result = TagConfig::initial("thinkpad").to_string();
        assert_eq!(result, "thinkpad: thinkpad\n");
    }

    #[sealed_test]
    fn load_tag_config() -> anyhow::Result<()> {
        std::fs::write("tags.conf", CONFIG)?;
        let config = TagConfig::load("tags.conf")?;
        assert_eq!(config.entries().len(), 6);

        let result = TagConfig::load("missing.conf");
        assert!(matches!(result, Err(TagError::TagConfigMissing { .. })));

        Ok(())
    }
}
