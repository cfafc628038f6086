//! Start command resolution

use std::ffi::{OsStr, OsString};
use std::path::Path;

use crate::config::{StagingInfo, StagingInfoError};

/// Resolve the command to launch.
///
/// A non-empty explicit command wins and the staging file is never opened.
/// Otherwise the start command recorded in `staging_info` is used; a missing
/// file resolves to an empty command. Callers decide what an empty result means.
pub fn resolve_start_command(
    explicit: &OsStr,
    staging_info: &Path,
) -> Result<OsString, StagingInfoError> {
    if !explicit.is_empty() {
        return Ok(explicit.to_os_string());
    }

    match StagingInfo::from_file(staging_info)? {
        Some(info) => {
            log::debug!("Using start command from {}", staging_info.display());
            Ok(OsString::from(info.start_command()))
        }
        None => {
            log::debug!("No staging info at {}", staging_info.display());
            Ok(OsString::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STAGING_INFO_FILE;

    #[test]
    fn test_explicit_command_skips_staging_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STAGING_INFO_FILE);
        std::fs::write(&path, "start_command: [not valid").unwrap();

        let command = resolve_start_command(OsStr::new("./run.sh"), &path).unwrap();
        assert_eq!(command, OsString::from("./run.sh"));
    }

    #[test]
    fn test_staging_info_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STAGING_INFO_FILE);
        std::fs::write(&path, "start_command: \"bundle exec rails server\"\n").unwrap();

        let command = resolve_start_command(OsStr::new(""), &path).unwrap();
        assert_eq!(command, OsString::from("bundle exec rails server"));
    }

    #[test]
    fn test_missing_staging_info_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STAGING_INFO_FILE);
        let command = resolve_start_command(OsStr::new(""), &path).unwrap();
        assert!(command.is_empty());
    }

    #[test]
    fn test_invalid_staging_info_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STAGING_INFO_FILE);
        std::fs::write(&path, "start_command: [not valid").unwrap();

        assert!(resolve_start_command(OsStr::new(""), &path).is_err());
    }
}
