//! Final handoff: replace the launcher with the application's start command

use std::convert::Infallible;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use super::environment::Environment;

/// Shell that runs the prelude and the start command
pub const SHELL: &str = "/bin/bash";

/// Prelude run by [`SHELL`] before the start command.
///
/// `$1` is the app directory and `$2` the start command. Platform
/// `../profile.d` scripts are sourced before the app's own `.profile.d`
/// scripts and `.profile`.
pub const PRELUDE: &str = r#"
cd "$1" || exit 1

for script in ../profile.d/*; do
  [ -f "$script" ] && source "$script"
done

for script in .profile.d/*; do
  [ -f "$script" ] && source "$script"
done

if [ -f .profile ]; then
  source ./.profile
fi

shift
exec bash -c "$@"
"#;

/// Everything needed to become the application. Consuming it with
/// [`Handoff::exec`] is the terminal transition of a launch.
#[derive(Debug, Clone, PartialEq)]
pub struct Handoff {
    /// Name reported as `$0` inside the prelude
    pub program: OsString,
    /// Absolute application directory
    pub app_dir: PathBuf,
    /// Start command, run by `bash -c`
    pub command: OsString,
    /// Complete environment of the application
    pub env: Environment,
}

impl Handoff {
    /// The command this handoff will exec. The inherited environment is
    /// replaced by [`Handoff::env`]; stdio is inherited.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(SHELL);
        cmd.arg("-c")
            .arg(PRELUDE)
            .arg(&self.program)
            .arg(&self.app_dir)
            .arg(&self.command)
            .env_clear()
            .envs(self.env.iter());
        cmd
    }

    /// Replace the current process image. Only returns on failure.
    #[cfg(unix)]
    pub fn exec(self) -> Result<Infallible, ProcessError> {
        use std::os::unix::process::CommandExt;

        log::info!(
            "Launching '{}' in {}",
            self.command.to_string_lossy(),
            self.app_dir.display()
        );
        let source = self.to_command().exec();
        Err(ProcessError::Exec {
            shell: SHELL.to_string(),
            source,
        })
    }

    /// Without exec, run the command to completion and exit with its status.
    #[cfg(not(unix))]
    pub fn exec(self) -> Result<Infallible, ProcessError> {
        log::info!(
            "Launching '{}' in {}",
            self.command.to_string_lossy(),
            self.app_dir.display()
        );
        let status = self
            .to_command()
            .status()
            .map_err(|source| ProcessError::Exec {
                shell: SHELL.to_string(),
                source,
            })?;
        std::process::exit(status.code().unwrap_or(1))
    }
}

/// Handoff errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to exec {shell}: {source}")]
    Exec {
        shell: String,
        #[source]
        source: std::io::Error,
    },

    /// The handoff returned control instead of replacing the launcher
    #[error("{} returned without replacing the launcher", SHELL)]
    Returned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn handoff() -> Handoff {
        Handoff {
            program: OsString::from("launcher"),
            app_dir: PathBuf::from("/home/vcap/app"),
            command: OsString::from("bundle exec rails server"),
            env: Environment::new()
                .with("HOME", "/home/vcap/app")
                .with("PORT", "8080"),
        }
    }

    #[test]
    fn test_command_line() {
        let cmd = handoff().to_command();
        assert_eq!(cmd.get_program(), OsStr::new(SHELL));

        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(
            args,
            vec![
                OsStr::new("-c"),
                OsStr::new(PRELUDE),
                OsStr::new("launcher"),
                OsStr::new("/home/vcap/app"),
                OsStr::new("bundle exec rails server"),
            ]
        );
    }

    #[test]
    fn test_command_env_is_exactly_handoff_env() {
        let cmd = handoff().to_command();
        let envs: Vec<(&OsStr, Option<&OsStr>)> = cmd.get_envs().collect();
        assert_eq!(
            envs,
            vec![
                (OsStr::new("HOME"), Some(OsStr::new("/home/vcap/app"))),
                (OsStr::new("PORT"), Some(OsStr::new("8080"))),
            ]
        );
    }

    #[test]
    fn test_prelude_sources_profiles_in_order() {
        let platform = PRELUDE.find("in ../profile.d/*").unwrap();
        let app = PRELUDE.find("in .profile.d/*").unwrap();
        let profile = PRELUDE.find("source ./.profile").unwrap();
        assert!(platform < app);
        assert!(app < profile);
        assert!(PRELUDE.trim_end().ends_with("exec bash -c \"$@\""));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_line_keeps_raw_bytes() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let handoff = Handoff {
            app_dir: PathBuf::from(OsString::from_vec(b"/home/vcap/app\xff".to_vec())),
            command: OsString::from_vec(b"echo \xfe".to_vec()),
            ..handoff()
        };
        let cmd = handoff.to_command();
        let args: Vec<&[u8]> = cmd.get_args().map(OsStr::as_bytes).collect();
        assert_eq!(args[3], b"/home/vcap/app\xff");
        assert_eq!(args[4], b"echo \xfe");
    }
}
