//! Launch runtime: environment, start command, secrets and handoff

pub mod command;
pub mod controller;
pub mod environment;
pub mod policy;
pub mod process;
pub mod secrets;

pub use command::resolve_start_command;
pub use controller::Launcher;
pub use environment::{EnvError, Environment};
pub use policy::{Policy, Step};
pub use process::{Handoff, ProcessError};
pub use secrets::{ClientCredentials, CredhubClient, SecretError, SecretResolver};
