//! Command-line interface for the launcher

use argh::FromArgs;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::{LaunchError, Result};

/// Number of positional arguments that must be present
pub const REQUIRED_ARGS: usize = 3;

/// Positional arguments accepted; anything after these is ignored
pub const MAX_ARGS: usize = 4;

/// Prepare a staged application's environment and exec its start command
#[derive(FromArgs, Debug, Clone, PartialEq)]
pub struct LauncherArgs {
    /// application directory
    #[argh(positional)]
    pub app_dir: PathBuf,

    /// start command; empty to use the one recorded in staging_info.yml
    #[argh(positional)]
    pub start_command: OsString,

    /// instance metadata (accepted but not consumed)
    #[argh(positional)]
    pub metadata: String,

    /// base64-encoded JSON platform options
    #[argh(positional)]
    pub platform_options: Option<String>,
}

impl LauncherArgs {
    /// Parse a full argv (program name first).
    ///
    /// Every argument is positional, even one starting with `-`. The app
    /// directory and start command keep their raw bytes; argh only sees a
    /// lossy view of them.
    pub fn from_argv(argv: &[OsString]) -> Result<Self> {
        let (program, rest) = match argv.split_first() {
            Some((program, rest)) => (program.to_string_lossy().into_owned(), rest),
            None => (env!("CARGO_PKG_NAME").to_string(), &[][..]),
        };

        if rest.len() < REQUIRED_ARGS {
            return Err(LaunchError::InsufficientArguments {
                program,
                received: rest.len(),
            });
        }
        if rest.len() > MAX_ARGS {
            log::debug!("Ignoring {} extra arguments", rest.len() - MAX_ARGS);
        }

        let lossy: Vec<String> = rest
            .iter()
            .take(MAX_ARGS)
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        let positionals = std::iter::once("--")
            .chain(lossy.iter().map(String::as_str))
            .collect::<Vec<_>>();

        let mut args = Self::from_args(&[program.as_str()], &positionals).map_err(|early_exit| {
            log::error!("{}", early_exit.output);
            LaunchError::InsufficientArguments {
                program: program.clone(),
                received: rest.len(),
            }
        })?;
        args.app_dir = PathBuf::from(&rest[0]);
        args.start_command = rest[1].clone();
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<OsString> {
        std::iter::once("launcher")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_three_arguments() {
        let args = LauncherArgs::from_argv(&argv(&["app", "./start", "{}"])).unwrap();
        assert_eq!(args.app_dir, PathBuf::from("app"));
        assert_eq!(args.start_command, OsString::from("./start"));
        assert_eq!(args.metadata, "{}");
        assert_eq!(args.platform_options, None);
    }

    #[test]
    fn test_empty_start_command() {
        let args = LauncherArgs::from_argv(&argv(&["app", "", ""])).unwrap();
        assert!(args.start_command.is_empty());
    }

    #[test]
    fn test_platform_options() {
        let args = LauncherArgs::from_argv(&argv(&["app", "", "{}", "e30="])).unwrap();
        assert_eq!(args.platform_options.as_deref(), Some("e30="));
    }

    #[test]
    fn test_dash_prefixed_start_command_is_positional() {
        let args = LauncherArgs::from_argv(&argv(&["app", "--help", "{}"])).unwrap();
        assert_eq!(args.start_command, OsString::from("--help"));
    }

    #[test]
    fn test_extra_arguments_ignored() {
        let args = LauncherArgs::from_argv(&argv(&["app", "cmd", "{}", "", "extra"])).unwrap();
        assert_eq!(args.platform_options.as_deref(), Some(""));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_arguments_keep_raw_bytes() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let argv = vec![
            OsString::from("launcher"),
            OsString::from_vec(b"app\xff".to_vec()),
            OsString::from_vec(b"echo \xfe".to_vec()),
            OsString::from("{}"),
        ];
        let args = LauncherArgs::from_argv(&argv).unwrap();
        assert_eq!(args.app_dir.as_os_str().as_bytes(), b"app\xff");
        assert_eq!(args.start_command.as_bytes(), b"echo \xfe");
    }

    #[test]
    fn test_insufficient_arguments() {
        for count in 0..REQUIRED_ARGS {
            let args: Vec<&str> = ["app", "cmd", "{}"][..count].to_vec();
            let err = LauncherArgs::from_argv(&argv(&args)).unwrap_err();
            assert!(matches!(
                err,
                LaunchError::InsufficientArguments { received, .. } if received == count
            ));
        }
    }

    #[test]
    fn test_empty_argv() {
        let err = LauncherArgs::from_argv(&[]).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_code::INSUFFICIENT_ARGUMENTS);
    }
}
