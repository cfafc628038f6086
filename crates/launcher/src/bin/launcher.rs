//! Launcher CLI
//!
//! Usage:
//!   launcher <app-directory> <start-command> <metadata> [<platform-options>]
//!
//! Logging goes to stderr and is controlled by `LAUNCHER_LOG` (default: warn).

use std::ffi::OsString;

use launcher::{Launcher, LauncherArgs};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("LAUNCHER_LOG", "warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let argv: Vec<OsString> = std::env::args_os().collect();
    let program = argv
        .first()
        .cloned()
        .unwrap_or_else(|| OsString::from(env!("CARGO_PKG_NAME")));

    let result = LauncherArgs::from_argv(&argv)
        .and_then(|args| Launcher::from_process(args).with_program(&program).run());

    match result {
        Ok(never) => match never {},
        Err(e) => {
            eprintln!("{}: {}", program.to_string_lossy(), e);
            std::process::exit(e.exit_code());
        }
    }
}
