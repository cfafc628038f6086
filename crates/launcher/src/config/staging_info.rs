//! Staging metadata written by the staging phase
//!
//! The file is YAML (in practice usually JSON, which YAML accepts):
//!
//! ```yaml
//! detected_buildpack: ruby
//! start_command: bundle exec rails server
//! ```

use serde::Deserialize;
use std::path::Path;

/// File name of the staging metadata, relative to the launcher's working directory
pub const STAGING_INFO_FILE: &str = "staging_info.yml";

/// Staging metadata. Only the start command is consumed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StagingInfo {
    /// Default start command detected during staging
    #[serde(default)]
    pub start_command: Option<String>,
}

impl StagingInfo {
    /// Load staging info from a file.
    ///
    /// A missing file is not an error and yields `Ok(None)`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Option<Self>, StagingInfoError> {
        let contents = match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StagingInfoError::Read(e)),
        };
        Self::parse(&contents).map(Some)
    }

    /// Parse staging info from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, StagingInfoError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(StagingInfoError::Yaml)
    }

    /// The start command, or an empty string when none was recorded
    pub fn start_command(&self) -> &str {
        self.start_command.as_deref().unwrap_or_default()
    }
}

/// Staging info errors
#[derive(Debug, thiserror::Error)]
pub enum StagingInfoError {
    #[error("unable to read staging info: {0}")]
    Read(#[source] std::io::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[source] serde_yaml::Error),
}
