// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Story selection.
//!
//! Finding story files and parsing them is the job of the external runner. It hands over a list
//! of [`DiscoveredStory`] values, and a [`StoryFilter`] decides which of them are run.

use crate::errors::StoryFilterError;
use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobBuilder, GlobMatcher};
use std::fmt;
use storyline_report::{ModelError, ScenarioId};

/// Whether a story is implemented or marked pending as a whole.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StoryStatus {
    /// The story's steps are implemented and run normally.
    Implemented,

    /// The story is marked pending; every scenario in it is reported as at least pending.
    Pending,
}

impl StoryStatus {
    /// Returns true if the story is marked pending.
    pub fn is_pending(self) -> bool {
        matches!(self, StoryStatus::Pending)
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryStatus::Implemented => write!(f, "implemented"),
            StoryStatus::Pending => write!(f, "pending"),
        }
    }
}

/// A story found by the external runner.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveredStory {
    /// The path of the story, relative to the story root.
    pub path: Utf8PathBuf,

    /// Whether the story is implemented or pending.
    pub status: StoryStatus,

    /// The names of the scenarios in the story, in file order.
    pub scenarios: Vec<String>,
}

impl DiscoveredStory {
    /// Creates a new `DiscoveredStory`.
    pub fn new(
        path: impl Into<Utf8PathBuf>,
        status: StoryStatus,
        scenarios: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            path: path.into(),
            status,
            scenarios: scenarios.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the file name of the story, or the whole path if there is none.
    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or(self.path.as_str())
    }
}

/// Selects stories by directory and by file name.
///
/// With neither criterion set, every story is selected. With both set, a story must satisfy both.
#[derive(Clone, Debug, Default)]
pub struct StoryFilter {
    in_dir: Option<Utf8PathBuf>,
    called: Option<NamePattern>,
}

#[derive(Clone, Debug)]
struct NamePattern {
    pattern: String,
    matcher: GlobMatcher,
}

impl StoryFilter {
    /// Creates a new filter.
    ///
    /// `in_dir` selects stories whose path starts with the given components, so `stories/subset`
    /// selects `stories/subset/a.story` but not `stories/subsetOther/a.story`. `called` is a glob
    /// matched against the story's file name, such as `*PassingStory.story`.
    pub fn new(in_dir: Option<&Utf8Path>, called: Option<&str>) -> Result<Self, StoryFilterError> {
        let called = called
            .map(|pattern| {
                let glob = GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()
                    .map_err(|error| StoryFilterError::InvalidGlob {
                        pattern: pattern.to_owned(),
                        error,
                    })?;
                Ok::<_, StoryFilterError>(NamePattern {
                    pattern: pattern.to_owned(),
                    matcher: glob.compile_matcher(),
                })
            })
            .transpose()?;

        Ok(Self {
            in_dir: in_dir.map(normalize_dir),
            called,
        })
    }

    /// Returns a filter that selects every story.
    pub fn all() -> Self {
        Self::default()
    }

    /// Returns true if this filter selects every story.
    pub fn is_unrestricted(&self) -> bool {
        self.in_dir.is_none() && self.called.is_none()
    }

    /// Returns the directory criterion, if any.
    pub fn in_dir(&self) -> Option<&Utf8Path> {
        self.in_dir.as_deref()
    }

    /// Returns the file name pattern, if any.
    pub fn called(&self) -> Option<&str> {
        self.called.as_ref().map(|called| called.pattern.as_str())
    }

    /// Returns true if the story at `path` is selected.
    pub fn is_match(&self, path: &Utf8Path) -> bool {
        if let Some(in_dir) = &self.in_dir {
            if !normalize_dir(path).starts_with(in_dir) {
                return false;
            }
        }
        if let Some(called) = &self.called {
            let file_name = path.file_name().unwrap_or(path.as_str());
            if !called.matcher.is_match(file_name) {
                return false;
            }
        }
        true
    }

    /// Returns the selected stories, in input order.
    pub fn select<'a>(
        &'a self,
        stories: impl IntoIterator<Item = &'a DiscoveredStory>,
    ) -> impl Iterator<Item = &'a DiscoveredStory> {
        stories
            .into_iter()
            .filter(move |story| self.is_match(&story.path))
    }

    /// Returns the identities of every scenario in the selected stories, in input order.
    ///
    /// Fails if a story contains a scenario with an empty name.
    pub fn scenario_ids<'a>(
        &'a self,
        stories: impl IntoIterator<Item = &'a DiscoveredStory>,
    ) -> Result<Vec<ScenarioId>, ModelError> {
        let mut ids = Vec::new();
        for story in self.select(stories) {
            for scenario in &story.scenarios {
                ids.push(ScenarioId::new(story.path.as_str(), scenario.as_str())?);
            }
        }
        Ok(ids)
    }
}

impl fmt::Display for StoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.in_dir, &self.called) {
            (None, None) => write!(f, "all stories"),
            (Some(in_dir), None) => write!(f, "stories in {in_dir}"),
            (None, Some(called)) => write!(f, "stories called {}", called.pattern),
            (Some(in_dir), Some(called)) => {
                write!(f, "stories in {in_dir} called {}", called.pattern)
            }
        }
    }
}

// Strips `.` components so that `./stories/a.story` and `stories/a.story` compare the same.
fn normalize_dir(path: &Utf8Path) -> Utf8PathBuf {
    path.components()
        .filter(|component| !matches!(component, camino::Utf8Component::CurDir))
        .collect()
}
