//! Application instance launcher
//!
//! Runs as the first process of an application instance container. It
//! prepares the environment for a staged application and then replaces
//! itself with the application's start command.
//!
//! # Overview
//!
//! A launch runs these steps in order:
//! - resolve the application directory and set `HOME`, `TMPDIR`, `DEPS_DIR`
//! - add runtime fields (`host`, `port`, ...) to `VCAP_APPLICATION`
//! - pick the start command from the arguments or `staging_info.yml`
//! - decode platform options and, if they name a CredHub endpoint,
//!   interpolate credential references in `VCAP_SERVICES`
//! - exec `/bin/bash`, which sources the profile scripts and execs the command
//!
//! Environment steps fail open; everything else aborts the launch with a
//! distinct exit status (see [`error::exit_code`]).
//!
//! # Usage
//!
//! ```text
//! launcher <app-directory> <start-command> <metadata> [<platform-options>]
//! launcher app "bundle exec rails server" '{}'
//! launcher app "" '{}' eyJjcmVkaHViX3VyaSI6Imh0dHBzOi8vY3JlZGh1Yjo4ODQ0In0=
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod runtime;

pub use cli::LauncherArgs;
pub use config::{PlatformOptions, PlatformOptionsError, StagingInfo, StagingInfoError};
pub use error::{LaunchError, Result};
pub use runtime::{
    ClientCredentials, CredhubClient, EnvError, Environment, Handoff, Launcher, Policy,
    ProcessError, SecretError, SecretResolver, Step,
};
