//! Process environment construction
//!
//! The environment is held as an explicit [`Environment`] value rather than
//! mutated in place, and only handed to the operating system at exec time.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

pub const VCAP_APPLICATION: &str = "VCAP_APPLICATION";
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";
pub const INSTANCE_GUID: &str = "INSTANCE_GUID";
pub const INSTANCE_INDEX: &str = "INSTANCE_INDEX";
pub const PORT: &str = "PORT";
pub const HOME: &str = "HOME";
pub const TMPDIR: &str = "TMPDIR";
pub const DEPS_DIR: &str = "DEPS_DIR";

/// Address an application should bind to
pub const LISTEN_ALL_INTERFACES: &str = "0.0.0.0";

/// A process environment: variable name to value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment
    pub fn from_process() -> Self {
        std::env::vars_os().collect()
    }

    /// Get a variable as UTF-8. Absent and non-UTF-8 values both yield `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(OsStr::new(name)).and_then(|v| v.to_str())
    }

    /// Set a variable, replacing any existing value
    pub fn set(&mut self, name: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Builder-style [`Environment::set`]
    pub fn with(mut self, name: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.set(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsString, &OsString)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<OsString>, V: Into<OsString>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Errors from environment construction steps. All of them are tolerated
/// by the launcher.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("cannot resolve relative path {} without a working directory", .0.display())]
    NoWorkingDir(PathBuf),

    #[error("VCAP_APPLICATION is not set")]
    DescriptorMissing,

    #[error("VCAP_APPLICATION is not valid JSON: {0}")]
    DescriptorDecode(#[source] serde_json::Error),

    #[error("VCAP_APPLICATION is not a JSON object")]
    DescriptorNotObject,

    #[error("failed to encode VCAP_APPLICATION: {0}")]
    DescriptorEncode(#[source] serde_json::Error),
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent.
/// Symlinks are not consulted.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Absolute, cleaned form of `path`, joined onto `cwd` if relative
pub fn absolute_path(path: &Path, cwd: Option<&Path>) -> Result<PathBuf, EnvError> {
    if path.is_absolute() {
        return Ok(clean_path(path));
    }
    let cwd = cwd.ok_or_else(|| EnvError::NoWorkingDir(path.to_path_buf()))?;
    Ok(clean_path(&cwd.join(path)))
}

/// Resolve the application directory to an absolute path
pub fn resolve_app_dir(dir: &Path, cwd: Option<&Path>) -> Result<PathBuf, EnvError> {
    absolute_path(dir, cwd)
}

/// Set `HOME` to the application directory
pub fn set_home(env: &mut Environment, app_dir: &Path) {
    env.set(HOME, app_dir.as_os_str());
}

/// Set `name` to the absolute path of `<parent-of-app-dir>/<sibling>`
pub fn set_sibling_dir(
    env: &mut Environment,
    name: &str,
    app_dir: &Path,
    sibling: &str,
    cwd: Option<&Path>,
) -> Result<PathBuf, EnvError> {
    let path = absolute_path(&app_dir.join("..").join(sibling), cwd)?;
    env.set(name, path.as_os_str());
    Ok(path)
}

/// Add runtime-assigned fields to the `VCAP_APPLICATION` JSON object.
///
/// Existing keys are preserved; `host`, `instance_id`, `port` and
/// `instance_index` are overwritten. `port` and `instance_index` are only
/// set when their source variables parse as integers.
pub fn augment_app_descriptor(env: &mut Environment) -> Result<(), EnvError> {
    let raw = env.get(VCAP_APPLICATION).ok_or(EnvError::DescriptorMissing)?;
    let decoded: Value = serde_json::from_str(raw).map_err(EnvError::DescriptorDecode)?;
    let mut descriptor: Map<String, Value> = match decoded {
        Value::Object(map) => map,
        _ => return Err(EnvError::DescriptorNotObject),
    };

    descriptor.insert("host".to_string(), Value::from(LISTEN_ALL_INTERFACES));
    descriptor.insert(
        "instance_id".to_string(),
        Value::from(env.get(INSTANCE_GUID).unwrap_or_default()),
    );

    match env.get(PORT).map(str::parse::<i64>) {
        Some(Ok(port)) => {
            descriptor.insert("port".to_string(), Value::from(port));
        }
        _ => log::debug!("{PORT} is unset or not an integer, leaving port untouched"),
    }

    match env.get(INSTANCE_INDEX).map(str::parse::<i64>) {
        Some(Ok(index)) => {
            descriptor.insert("instance_index".to_string(), Value::from(index));
        }
        _ => log::debug!(
            "{INSTANCE_INDEX} is unset or not an integer, leaving instance_index untouched"
        ),
    }

    let encoded = serde_json::to_string(&descriptor).map_err(EnvError::DescriptorEncode)?;
    env.set(VCAP_APPLICATION, encoded);
    Ok(())
}
