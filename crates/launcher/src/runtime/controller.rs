//! Launch sequencing
//!
//! A [`Launcher`] runs every step up to the handoff in order, applying each
//! step's [`Policy`](super::Policy), and yields a [`Handoff`]. Nothing here
//! touches the real process environment.

use std::convert::Infallible;
use std::ffi::OsString;
use std::path::PathBuf;

use super::command::resolve_start_command;
use super::environment::{self, Environment, DEPS_DIR, TMPDIR};
use super::policy::Step;
use super::process::{Handoff, ProcessError};
use super::secrets::{self, ClientCredentials, CredhubClient, SecretError, SecretResolver};
use crate::cli::LauncherArgs;
use crate::config::{PlatformOptions, STAGING_INFO_FILE};
use crate::error::{LaunchError, Result};

/// Prepares one application instance launch
#[derive(Debug)]
pub struct Launcher {
    program: OsString,
    args: LauncherArgs,
    env: Environment,
    cwd: Option<PathBuf>,
    staging_info: PathBuf,
}

impl Launcher {
    /// Create a launcher over an explicit environment and working directory
    pub fn new(args: LauncherArgs, env: Environment, cwd: Option<PathBuf>) -> Self {
        Self {
            program: OsString::from(env!("CARGO_PKG_NAME")),
            args,
            env,
            cwd,
            staging_info: PathBuf::from(STAGING_INFO_FILE),
        }
    }

    /// Create a launcher over the current process environment and directory
    pub fn from_process(args: LauncherArgs) -> Self {
        let cwd = match std::env::current_dir() {
            Ok(cwd) => Some(cwd),
            Err(e) => {
                log::warn!("Cannot determine working directory: {}", e);
                None
            }
        };
        Self::new(args, Environment::from_process(), cwd)
    }

    /// Name the launcher reports as its own `$0`
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Override where staging info is read from
    pub fn with_staging_info(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_info = path.into();
        self
    }

    /// Run every step and hand off to the start command. Only returns on failure.
    pub fn run(self) -> Result<Infallible> {
        let handoff = self.prepare(CredhubClient::connect)?;
        finish(handoff.exec())
    }

    /// Run every step before the handoff.
    ///
    /// `connect` builds the secret resolver; it is only called when the
    /// platform options name a secret service and credentials are present.
    pub fn prepare<R, F>(mut self, connect: F) -> Result<Handoff>
    where
        R: SecretResolver,
        F: FnOnce(&str, &ClientCredentials) -> std::result::Result<R, SecretError>,
    {
        let cwd = self.cwd.as_deref();
        log::debug!(
            "Instance metadata: {} bytes (not consumed)",
            self.args.metadata.len()
        );

        let raw_dir = self.args.app_dir.as_path();
        let app_dir = Step::ResolveAppDir
            .apply(environment::resolve_app_dir(raw_dir, cwd))?
            .unwrap_or_else(|| raw_dir.to_path_buf());
        environment::set_home(&mut self.env, &app_dir);

        Step::TmpDir.apply(environment::set_sibling_dir(
            &mut self.env,
            TMPDIR,
            &app_dir,
            "tmp",
            cwd,
        ))?;
        Step::DepsDir.apply(environment::set_sibling_dir(
            &mut self.env,
            DEPS_DIR,
            &app_dir,
            "deps",
            cwd,
        ))?;
        Step::AugmentAppDescriptor.apply(environment::augment_app_descriptor(&mut self.env))?;

        let command = Step::ResolveStartCommand
            .apply(resolve_start_command(
                &self.args.start_command,
                &self.staging_info,
            ))?
            .unwrap_or_default();
        if command.is_empty() {
            return Err(LaunchError::NoStartCommand);
        }

        let options = Step::DecodePlatformOptions
            .apply(PlatformOptions::decode(
                self.args.platform_options.as_deref(),
            ))?
            .flatten();

        // The resolver is dropped inside interpolate_services, so no client
        // threads outlive this step.
        let interpolated = Step::InterpolateSecrets.apply(secrets::interpolate_services(
            &mut self.env,
            options.as_ref(),
            connect,
        ))?;
        if interpolated == Some(true) {
            log::info!("Resolved credential references in VCAP_SERVICES");
        }

        Ok(Handoff {
            program: self.program,
            app_dir,
            command,
            env: self.env,
        })
    }
}

/// Apply the handoff policy to the outcome of [`Handoff::exec`]
fn finish(exec: std::result::Result<Infallible, ProcessError>) -> Result<Infallible> {
    match Step::Handoff.apply(exec)? {
        Some(never) => match never {},
        None => Err(ProcessError::Returned.into()),
    }
}
