//! Top-level launch errors and their exit statuses

use crate::config::{PlatformOptionsError, StagingInfoError};
use crate::runtime::{EnvError, ProcessError, SecretError};

/// Exit statuses, one per fatal condition
pub mod exit_code {
    pub const INSUFFICIENT_ARGUMENTS: i32 = 1;
    pub const NO_START_COMMAND: i32 = 2;
    pub const INVALID_PLATFORM_OPTIONS: i32 = 3;
    pub const SECRET_CLIENT_INIT_FAILED: i32 = 4;
    pub const SECRET_INTERPOLATION_FAILED: i32 = 5;
    pub const MISSING_CLIENT_CREDENTIALS: i32 = 6;
    pub const STAGING_INFO_INVALID: i32 = 7;
    pub const EXEC_FAILED: i32 = 8;
    pub const ENVIRONMENT_FAILED: i32 = 9;
}

/// Errors that abort a launch
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(
        "received only {received} arguments\n\
         Usage: {program} <app-directory> <start-command> <metadata> [<platform-options>]"
    )]
    InsufficientArguments { program: String, received: usize },

    #[error("Invalid staging info - {0}")]
    StagingInfoInvalid(#[from] StagingInfoError),

    #[error("no start command specified or detected in droplet")]
    NoStartCommand,

    #[error("Invalid platform options: {0}")]
    InvalidPlatformOptions(#[from] PlatformOptionsError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    /// Environment steps are fail-open; this only surfaces if a caller
    /// chooses to treat one as fatal.
    #[error("Environment error: {0}")]
    Environment(#[from] EnvError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

pub type Result<T> = std::result::Result<T, LaunchError>;

impl LaunchError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::InsufficientArguments { .. } => exit_code::INSUFFICIENT_ARGUMENTS,
            LaunchError::StagingInfoInvalid(_) => exit_code::STAGING_INFO_INVALID,
            LaunchError::NoStartCommand => exit_code::NO_START_COMMAND,
            LaunchError::InvalidPlatformOptions(_) => exit_code::INVALID_PLATFORM_OPTIONS,
            LaunchError::Secret(SecretError::MissingCredentials(_)) => {
                exit_code::MISSING_CLIENT_CREDENTIALS
            }
            LaunchError::Secret(SecretError::ClientInit(_)) => exit_code::SECRET_CLIENT_INIT_FAILED,
            LaunchError::Secret(SecretError::Interpolation(_)) => {
                exit_code::SECRET_INTERPOLATION_FAILED
            }
            LaunchError::Environment(_) => exit_code::ENVIRONMENT_FAILED,
            LaunchError::Process(_) => exit_code::EXEC_FAILED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fatal_conditions_have_distinct_codes() {
        let errors = vec![
            LaunchError::InsufficientArguments {
                program: "launcher".to_string(),
                received: 1,
            },
            LaunchError::StagingInfoInvalid(StagingInfoError::Read(std::io::Error::other("x"))),
            LaunchError::NoStartCommand,
            LaunchError::InvalidPlatformOptions(PlatformOptionsError::Base64(
                base64::DecodeError::InvalidLength(3),
            )),
            LaunchError::Secret(SecretError::MissingCredentials("CF_INSTANCE_CERT")),
            LaunchError::Secret(SecretError::ClientInit("bad".to_string())),
            LaunchError::Secret(SecretError::Interpolation("bad".to_string())),
            LaunchError::Environment(EnvError::DescriptorMissing),
            LaunchError::Process(ProcessError::Exec {
                shell: "/bin/bash".to_string(),
                source: std::io::Error::other("x"),
            }),
        ];

        let codes: HashSet<i32> = errors.iter().map(LaunchError::exit_code).collect();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_usage_message_names_program() {
        let err = LaunchError::InsufficientArguments {
            program: "/tmp/lifecycle/launcher".to_string(),
            received: 2,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("received only 2 arguments"));
        assert!(msg.contains("Usage: /tmp/lifecycle/launcher <app-directory>"));
    }
}
