// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{PendingOverridePolicy, StorylineConfigDeserialize};
use crate::{
    discovery::StoryFilter,
    errors::{ConfigParseError, ConfigParseErrorKind},
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use std::collections::BTreeSet;
use tracing::warn;

/// Overall configuration for storyline.
///
/// This is the root data structure for storyline configuration. It is read from the defaults
/// embedded in storyline, an optional `.config/storyline.toml` file in the workspace root, and
/// any overrides supplied by the caller, in increasing order of priority.
#[derive(Clone, Debug)]
pub struct StorylineConfig {
    workspace_root: Utf8PathBuf,
    store_dir: Utf8PathBuf,
    pretty: bool,
    pending_policy: PendingOverridePolicy,
    story_filter: StoryFilter,
}

impl StorylineConfig {
    /// The default location of the config within the workspace: `.config/storyline.toml`.
    pub const CONFIG_PATH: &'static str = ".config/storyline.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Reads the storyline config from the given file, or if not specified from
    /// `.config/storyline.toml` in the workspace root.
    ///
    /// `overrides` are `(key, value)` pairs such as `("pending.policy", "latest-run")`. They take
    /// priority over every file.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
        overrides: &[(&str, &str)],
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_impl(workspace_root, config_file, overrides, |config_file, unknown| {
            warn!(
                "ignoring unknown configuration keys in config file {config_file}: {}",
                unknown.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        })
    }

    /// Returns the default storyline config, rooted at `workspace_root`.
    pub fn default_config(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        let builder = Self::make_default_config();
        let (deserialized, _) = Self::build_and_deserialize_config(&builder)
            .expect("default config is always deserializable");
        Self::from_deserialized(workspace_root, deserialized)
            .expect("default config has no story filter")
    }

    // A custom unknown_callback can be passed in while testing.
    fn from_sources_impl(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
        overrides: &[(&str, &str)],
        mut unknown_callback: impl FnMut(&Utf8Path, &BTreeSet<String>),
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let mut builder = Self::make_default_config().add_source(source);
        for &(key, value) in overrides {
            builder = builder
                .set_override(key, value)
                .map_err(|error| {
                    ConfigParseError::new(
                        &config_file,
                        ConfigParseErrorKind::BuildError(Box::new(error)),
                    )
                })?;
        }

        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        if !unknown.is_empty() {
            unknown_callback(&config_file, &unknown);
        }

        Self::from_deserialized(workspace_root, deserialized)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))
    }

    fn from_deserialized(
        workspace_root: Utf8PathBuf,
        deserialized: StorylineConfigDeserialize,
    ) -> Result<Self, ConfigParseErrorKind> {
        let story_filter = StoryFilter::new(
            deserialized.stories.in_dir.as_deref(),
            deserialized.stories.called.as_deref(),
        )
        .map_err(ConfigParseErrorKind::StoryFilter)?;

        Ok(Self {
            workspace_root,
            store_dir: deserialized.store.dir,
            pretty: deserialized.report.pretty,
            pending_policy: deserialized.pending.policy,
            story_filter,
        })
    }

    /// Returns the workspace root the config was read relative to.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the report directory, resolved against the workspace root.
    pub fn store_dir(&self) -> Utf8PathBuf {
        self.workspace_root.join(&self.store_dir)
    }

    /// Returns true if reports should be pretty-printed.
    pub fn pretty(&self) -> bool {
        self.pretty
    }

    /// Returns the policy for pending overrides persisted by earlier runs.
    pub fn pending_policy(&self) -> PendingOverridePolicy {
        self.pending_policy
    }

    /// Returns the configured story filter.
    pub fn story_filter(&self) -> &StoryFilter {
        &self.story_filter
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(StorylineConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: StorylineConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // The config crate also reports the key; drop it so the path is only shown once.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;

    fn temp_workspace(config_contents: &str) -> Utf8TempDir {
        let dir = camino_tempfile::tempdir().expect("created temp dir");
        let config_path = dir.path().join(StorylineConfig::CONFIG_PATH);
        std::fs::create_dir_all(config_path.parent().unwrap()).expect("created .config");
        std::fs::write(&config_path, config_contents).expect("wrote config");
        dir
    }

    #[test]
    fn default_config_is_valid() {
        let config = StorylineConfig::default_config("/workspace");
        assert_eq!(config.store_dir(), "/workspace/target/storyline");
        assert!(config.pretty());
        assert_eq!(config.pending_policy(), PendingOverridePolicy::Sticky);
        assert!(config.story_filter().is_unrestricted());
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = camino_tempfile::tempdir().expect("created temp dir");
        let config =
            StorylineConfig::from_sources(dir.path(), None, &[]).expect("config is valid");
        assert_eq!(config.pending_policy(), PendingOverridePolicy::Sticky);
        assert_eq!(config.store_dir(), dir.path().join("target/storyline"));
    }

    #[test]
    fn config_file_is_layered_on_defaults() {
        let dir = temp_workspace(indoc! {r#"
            [store]
            dir = "reports"

            [pending]
            policy = "latest-run"

            [stories]
            in = "stories/subset"
            called = "*PassingStory.story"
        "#});

        let config =
            StorylineConfig::from_sources(dir.path(), None, &[]).expect("config is valid");
        assert_eq!(config.store_dir(), dir.path().join("reports"));
        // Not set in the file, so taken from the defaults.
        assert!(config.pretty());
        assert_eq!(config.pending_policy(), PendingOverridePolicy::LatestRun);
        assert!(!config.story_filter().is_unrestricted());
    }

    #[test]
    fn overrides_take_priority() {
        let dir = temp_workspace(indoc! {r#"
            [report]
            pretty = true
        "#});

        let config = StorylineConfig::from_sources(
            dir.path(),
            None,
            &[("report.pretty", "false"), ("pending.policy", "latest-run")],
        )
        .expect("config is valid");
        assert!(!config.pretty());
        assert_eq!(config.pending_policy(), PendingOverridePolicy::LatestRun);
    }

    #[test]
    fn unknown_keys_are_reported() {
        let dir = temp_workspace(indoc! {r#"
            [store]
            dir = "reports"
            retention = 5

            [colors]
            enabled = true
        "#});

        let mut reported = BTreeSet::new();
        StorylineConfig::from_sources_impl(dir.path(), None, &[], |_, unknown| {
            reported.extend(unknown.iter().cloned());
        })
        .expect("config is valid");

        assert_eq!(
            reported,
            ["colors", "store.retention"]
                .into_iter()
                .map(String::from)
                .collect::<BTreeSet<_>>(),
        );
    }

    #[test]
    fn invalid_policy_is_an_error() {
        let dir = temp_workspace(indoc! {r#"
            [pending]
            policy = "forever"
        "#});

        let error = StorylineConfig::from_sources(dir.path(), None, &[])
            .expect_err("policy is invalid");
        match error.kind() {
            ConfigParseErrorKind::DeserializeError(error) => {
                assert_eq!(error.path().to_string(), "pending.policy");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn invalid_glob_is_an_error() {
        let dir = temp_workspace(indoc! {r#"
            [stories]
            called = "[unterminated"
        "#});

        let error = StorylineConfig::from_sources(dir.path(), None, &[])
            .expect_err("glob is invalid");
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::StoryFilter(_)),
            "unexpected error kind: {:?}",
            error.kind()
        );
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = camino_tempfile::tempdir().expect("created temp dir");
        let missing = dir.path().join("missing.toml");
        let error = StorylineConfig::from_sources(dir.path(), Some(&missing), &[])
            .expect_err("file is missing");
        assert_eq!(error.config_file(), &missing);
        assert!(matches!(error.kind(), ConfigParseErrorKind::BuildError(_)));
    }
}
