//! Which launch steps may fail without aborting the launch

use std::fmt;

/// What the launcher does when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Log the failure and carry on
    FailOpen,
    /// Abort the launch with the step's exit status
    FailClosed,
}

/// Steps of a launch, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveAppDir,
    TmpDir,
    DepsDir,
    AugmentAppDescriptor,
    ResolveStartCommand,
    DecodePlatformOptions,
    InterpolateSecrets,
    Handoff,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::ResolveAppDir,
        Step::TmpDir,
        Step::DepsDir,
        Step::AugmentAppDescriptor,
        Step::ResolveStartCommand,
        Step::DecodePlatformOptions,
        Step::InterpolateSecrets,
        Step::Handoff,
    ];

    /// Environment conveniences fail open; anything that would launch the
    /// wrong thing fails closed.
    pub const fn policy(self) -> Policy {
        match self {
            Step::ResolveAppDir
            | Step::TmpDir
            | Step::DepsDir
            | Step::AugmentAppDescriptor => Policy::FailOpen,
            Step::ResolveStartCommand
            | Step::DecodePlatformOptions
            | Step::InterpolateSecrets
            | Step::Handoff => Policy::FailClosed,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Step::ResolveAppDir => "resolve-app-dir",
            Step::TmpDir => "tmpdir",
            Step::DepsDir => "deps-dir",
            Step::AugmentAppDescriptor => "augment-vcap-application",
            Step::ResolveStartCommand => "resolve-start-command",
            Step::DecodePlatformOptions => "decode-platform-options",
            Step::InterpolateSecrets => "interpolate-secrets",
            Step::Handoff => "handoff",
        }
    }

    /// Apply this step's policy to its outcome.
    ///
    /// `Ok(None)` means the step failed open and the launch continues.
    /// Fail-closed errors are only logged at debug level; reporting them is
    /// left to whoever handles the returned error.
    pub fn apply<T, E>(self, result: Result<T, E>) -> Result<Option<T>, E>
    where
        E: fmt::Display,
    {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) => match self.policy() {
                Policy::FailOpen => {
                    log::warn!("[{}] {} (continuing)", self, e);
                    Ok(None)
                }
                Policy::FailClosed => {
                    log::debug!("[{}] {} (aborting)", self, e);
                    Err(e)
                }
            },
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        let open: Vec<Step> = Step::ALL
            .into_iter()
            .filter(|s| s.policy() == Policy::FailOpen)
            .collect();
        assert_eq!(
            open,
            vec![
                Step::ResolveAppDir,
                Step::TmpDir,
                Step::DepsDir,
                Step::AugmentAppDescriptor
            ]
        );
    }

    #[test]
    fn test_fail_open_swallows_error() {
        let result: Result<u8, String> = Err("boom".to_string());
        assert_eq!(Step::TmpDir.apply(result), Ok(None));
    }

    #[test]
    fn test_fail_closed_propagates_error() {
        let result: Result<u8, String> = Err("boom".to_string());
        assert_eq!(
            Step::ResolveStartCommand.apply(result),
            Err("boom".to_string())
        );
    }

    #[test]
    fn test_every_fail_closed_step_propagates() {
        for step in Step::ALL {
            let result: Result<u8, String> = Err(step.name().to_string());
            match step.policy() {
                Policy::FailOpen => assert_eq!(step.apply(result), Ok(None)),
                Policy::FailClosed => assert_eq!(step.apply(result), Err(step.name().to_string())),
            }
        }
    }

    #[test]
    fn test_success_passes_through() {
        assert_eq!(Step::Handoff.apply(Ok::<_, String>(7)), Ok(Some(7)));
    }
}
