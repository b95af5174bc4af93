// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Host-specific section toggling.
//!
//! Every dotfile in the repository is kept in its __generic__ form. Parts of
//! it that only make sense on some machines are wrapped in __sections__,
//! which are delimited by directive lines written in the dotfile's own
//! comment syntax. The comment marker is never configured. It is identified
//! from the first token of the first line of the dotfile, so every managed
//! dotfile must start with a comment.
//!
//! # Directive Syntax
//!
//! A directive is the comment marker written twice, immediately followed by
//! one of three keywords. For a shell script that would be:
//!
//! ```text
//! # -*- mode: sh -*-
//! ##only laptop desktop
//! export BROWSER=firefox
//! ##end
//! ##not work
//! alias vpn='wg-quick up home'
//! ##end
//! ```
//!
//! - `only` sections apply when at least one host tag appears in the
//!   section's tag list.
//! - `not` sections apply unless at least one host tag appears in the
//!   section's tag list.
//! - `end` closes whatever section is currently open.
//!
//! # Specialize and Generalize
//!
//! Specializing a generic dotfile comments out every line of a section that
//! does not apply to the current host by prefixing it with one comment
//! marker. Generalizing a specific dotfile strips exactly that one marker
//! again. Directive lines are never touched by either direction, so
//! generalizing a freshly specialized dotfile with the same tag set yields
//! the original content.
//!
//! Sections do not nest. Suppression is a single flag: any `only` or `not`
//! directive re-evaluates it, and any `end` directive clears it.

use crate::tags::TagSet;

use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{debug, instrument};

/// Character sequence that starts a single-line comment in a dotfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentMarker(String);

impl CommentMarker {
    /// Identify comment marker from first line of a dotfile.
    ///
    /// The marker is the first whitespace-delimited token of the line.
    ///
    /// # Errors
    ///
    /// - Return [`SectionError::CommentMarkerUnresolvable`] if line is empty
    ///   or only contains whitespace.
    pub fn identify(first_line: impl AsRef<str>) -> Result<Self> {
        let marker = first_line
            .as_ref()
            .split_whitespace()
            .next()
            .map(|token| Self(token.to_string()))
            .ok_or(SectionError::CommentMarkerUnresolvable)?;
        debug!("identified comment marker {:?}", marker.as_str());

        Ok(marker)
    }

    /// Treat comment marker as string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Full directive token for given keyword, e.g., `##only` for `#`.
    fn directive(&self, keyword: Keyword) -> String {
        format!("{0}{0}{1}", self.0, keyword)
    }
}

impl Display for CommentMarker {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Keyword following a doubled comment marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// Section applies only to hosts with a matching tag.
    Only,

    /// Section applies to every host without a matching tag.
    Not,

    /// Close current section.
    End,
}

impl Keyword {
    /// Order in which directives are checked on a single line.
    pub const ALL: [Keyword; 3] = [Keyword::Only, Keyword::Not, Keyword::End];
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Only => fmt.write_str("only"),
            Self::Not => fmt.write_str("not"),
            Self::End => fmt.write_str("end"),
        }
    }
}

/// Directive found on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub keyword: Keyword,
    pub tags: Vec<String>,
}

impl Directive {
    /// Find directive with target keyword on line.
    ///
    /// The directive token may appear anywhere on the line. Section tags are
    /// the whitespace-separated tokens that follow the token holding the
    /// directive.
    pub fn find(line: &str, marker: &CommentMarker, keyword: Keyword) -> Option<Self> {
        let token = marker.directive(keyword);
        if !line.contains(token.as_str()) {
            return None;
        }

        let tags = line
            .split_whitespace()
            .skip_while(|word| !word.contains(token.as_str()))
            .skip(1)
            .map(str::to_owned)
            .collect();

        Some(Self { keyword, tags })
    }

    /// Check if section opened by this directive must be suppressed on host.
    ///
    /// Always false for `end` directives.
    pub fn is_inactive_for(&self, host: &TagSet) -> bool {
        let matched = host.matches_any(&self.tags);
        match self.keyword {
            Keyword::Only => !matched,
            Keyword::Not => matched,
            Keyword::End => false,
        }
    }
}

/// Direction of a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Generic to host-specific form.
    Specialize,

    /// Host-specific to generic form.
    Generalize,
}

/// Single pass transformation context for one dotfile.
///
/// Construct a fresh context for every dotfile and direction. The only state
/// carried from line to line is whether the current section is suppressed.
#[derive(Debug)]
pub struct Transform<'a> {
    marker: &'a CommentMarker,
    tags: &'a TagSet,
    suppressed: bool,
}

impl<'a> Transform<'a> {
    /// Construct new transformation context.
    pub fn new(marker: &'a CommentMarker, tags: &'a TagSet) -> Self {
        Self {
            marker,
            tags,
            suppressed: false,
        }
    }

    /// Comment out lines of sections that do not apply to host.
    pub fn specialize<'l>(self, lines: impl IntoIterator<Item = &'l str>) -> String {
        self.run(Direction::Specialize, lines)
    }

    /// Uncomment lines of sections that do not apply to host.
    ///
    /// Suppressed lines without any comment marker, e.g., lines added by hand
    /// on the stage, are kept unchanged instead of being dropped.
    pub fn generalize<'l>(self, lines: impl IntoIterator<Item = &'l str>) -> String {
        self.run(Direction::Generalize, lines)
    }

    fn run<'l>(mut self, direction: Direction, lines: impl IntoIterator<Item = &'l str>) -> String {
        let mut output = String::new();
        for line in lines {
            if self.observe(line) {
                output.push_str(line);
                continue;
            }

            if !self.suppressed {
                output.push_str(line);
                continue;
            }

            match direction {
                Direction::Specialize => {
                    output.push_str(self.marker.as_str());
                    output.push_str(line);
                }
                Direction::Generalize => match line.split_once(self.marker.as_str()) {
                    Some((_, rest)) => output.push_str(rest),
                    None => {
                        debug!("suppressed line carries no comment marker: {line:?}");
                        output.push_str(line);
                    }
                },
            }
        }

        output
    }

    /// Update suppression state from directives on line.
    ///
    /// Returns true if line holds any directive, i.e., it must be emitted
    /// verbatim.
    fn observe(&mut self, line: &str) -> bool {
        let mut is_directive = false;
        for keyword in Keyword::ALL {
            let Some(directive) = Directive::find(line, self.marker, keyword) else {
                continue;
            };
            is_directive = true;

            if keyword == Keyword::End {
                self.suppressed = false;
                continue;
            }

            debug!(
                "found section {keyword} for {}",
                directive.tags.join(", ")
            );

            // INVARIANT: An inactive section stops any further directive checks on this line.
            self.suppressed = directive.is_inactive_for(self.tags);
            if self.suppressed {
                break;
            }
        }

        is_directive
    }
}

/// Specialize generic dotfile content for host.
///
/// Returns `None` for empty content, because there is no first line to
/// identify a comment marker from.
///
/// # Errors
///
/// - Return [`SectionError::CommentMarkerUnresolvable`] if first line has no
///   token.
#[instrument(skip(content, tags), level = "debug")]
pub fn specialize(content: &str, tags: &TagSet) -> Result<Option<String>> {
    transform(content, tags, Direction::Specialize)
}

/// Generalize host-specific dotfile content.
///
/// Returns `None` for empty content.
///
/// # Errors
///
/// - Return [`SectionError::CommentMarkerUnresolvable`] if first line has no
///   token.
#[instrument(skip(content, tags), level = "debug")]
pub fn generalize(content: &str, tags: &TagSet) -> Result<Option<String>> {
    transform(content, tags, Direction::Generalize)
}

fn transform(content: &str, tags: &TagSet, direction: Direction) -> Result<Option<String>> {
    let Some(first_line) = content.split_inclusive('\n').next() else {
        return Ok(None);
    };

    let marker = CommentMarker::identify(first_line)?;
    let lines = content.split_inclusive('\n');
    let output = match direction {
        Direction::Specialize => Transform::new(&marker, tags).specialize(lines),
        Direction::Generalize => Transform::new(&marker, tags).generalize(lines),
    };

    Ok(Some(output))
}

/// Section transformation error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SectionError {
    /// First line of dotfile does not contain any token.
    #[error("could not identify a comment marker from first line")]
    CommentMarkerUnresolvable,
}

/// Friendly result alias :3
pub type Result<T, E = SectionError> = std::result::Result<T, E>;
