//! CredHub interpolation of `VCAP_SERVICES`
//!
//! When the platform options name a CredHub endpoint, credential references
//! inside `VCAP_SERVICES` are resolved by `POST /api/v1/interpolate`, using the
//! instance identity certificate for mutual TLS. The response body replaces
//! `VCAP_SERVICES` verbatim.

use reqwest::header::CONTENT_TYPE;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::environment::{Environment, VCAP_SERVICES};
use crate::config::PlatformOptions;

pub const CF_INSTANCE_CERT: &str = "CF_INSTANCE_CERT";
pub const CF_INSTANCE_KEY: &str = "CF_INSTANCE_KEY";
pub const CF_SYSTEM_CERT_PATH: &str = "CF_SYSTEM_CERT_PATH";

const INTERPOLATE_PATH: &str = "api/v1/interpolate";

/// Secret interpolation errors
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Missing CF_INSTANCE_CERT and/or CF_INSTANCE_KEY ({0} is not set)")]
    MissingCredentials(&'static str),

    #[error("Unable to set up credhub client: {0}")]
    ClientInit(String),

    #[error("Unable to interpolate credhub references: {0}")]
    Interpolation(String),
}

/// Anything that can resolve credential references in a services descriptor
pub trait SecretResolver {
    /// Return `services` with every credential reference resolved
    fn interpolate(&self, services: &str) -> Result<String, SecretError>;
}

/// Client TLS material taken from the instance environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// PEM certificate chain identifying this instance
    pub cert_path: PathBuf,
    /// PEM private key for `cert_path`
    pub key_path: PathBuf,
    /// Optional directory of additional trusted CA certificates
    pub trusted_certs_dir: Option<PathBuf>,
}

impl ClientCredentials {
    /// Read credential paths from the environment. Both the certificate and
    /// the key must be present and non-empty.
    pub fn from_env(env: &Environment) -> Result<Self, SecretError> {
        let cert_path = non_empty(env, CF_INSTANCE_CERT)
            .ok_or(SecretError::MissingCredentials(CF_INSTANCE_CERT))?;
        let key_path = non_empty(env, CF_INSTANCE_KEY)
            .ok_or(SecretError::MissingCredentials(CF_INSTANCE_KEY))?;

        Ok(Self {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
            trusted_certs_dir: non_empty(env, CF_SYSTEM_CERT_PATH).map(PathBuf::from),
        })
    }
}

fn non_empty<'a>(env: &'a Environment, name: &str) -> Option<&'a str> {
    env.get(name).filter(|v| !v.is_empty())
}

/// Blocking CredHub client authenticated with the instance identity
pub struct CredhubClient {
    http: reqwest::blocking::Client,
    interpolate_url: reqwest::Url,
}

impl CredhubClient {
    /// Build a client for `endpoint`.
    ///
    /// No request timeout is set: an unresponsive CredHub blocks the launch.
    pub fn connect(endpoint: &str, credentials: &ClientCredentials) -> Result<Self, SecretError> {
        let interpolate_url = interpolate_url(endpoint)?;

        let mut pem = read_file(&credentials.cert_path)?;
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend(read_file(&credentials.key_path)?);
        let identity = reqwest::Identity::from_pem(&pem)
            .map_err(|e| SecretError::ClientInit(format!("invalid client certificate: {}", e)))?;

        let mut builder = reqwest::blocking::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .timeout(None::<Duration>);

        if let Some(dir) = &credentials.trusted_certs_dir {
            for cert in trusted_certificates(dir)? {
                builder = builder.add_root_certificate(cert);
            }
        }

        let http = builder
            .build()
            .map_err(|e| SecretError::ClientInit(e.to_string()))?;

        log::debug!("CredHub client ready for {}", interpolate_url);
        Ok(Self {
            http,
            interpolate_url,
        })
    }
}

/// Error body returned by CredHub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl SecretResolver for CredhubClient {
    fn interpolate(&self, services: &str) -> Result<String, SecretError> {
        // Any JSON value is posted unchanged, not only objects.
        serde_json::from_str::<IgnoredAny>(services).map_err(|e| {
            SecretError::Interpolation(format!("{} is not valid JSON: {}", VCAP_SERVICES, e))
        })?;

        log::info!("Interpolating credential references via {}", self.interpolate_url);
        let response = self
            .http
            .post(self.interpolate_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(services.to_string())
            .send()
            .map_err(|e| SecretError::Interpolation(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| SecretError::Interpolation(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(SecretError::Interpolation(format!(
                "status {}: {}",
                status.as_u16(),
                message
            )));
        }

        Ok(text)
    }
}

fn interpolate_url(endpoint: &str) -> Result<reqwest::Url, SecretError> {
    let base = format!("{}/", endpoint.trim_end_matches('/'));
    reqwest::Url::parse(&base)
        .and_then(|url| url.join(INTERPOLATE_PATH))
        .map_err(|e| SecretError::ClientInit(format!("invalid credhub URI '{}': {}", endpoint, e)))
}

fn read_file(path: &Path) -> Result<Vec<u8>, SecretError> {
    std::fs::read(path)
        .map_err(|e| SecretError::ClientInit(format!("cannot read {}: {}", path.display(), e)))
}

/// Load every `.crt`/`.pem` file in `dir` as a trusted root
fn trusted_certificates(dir: &Path) -> Result<Vec<reqwest::Certificate>, SecretError> {
    certificate_paths(dir)
        .iter()
        .map(|path| {
            let pem = read_file(path)?;
            reqwest::Certificate::from_pem(&pem).map_err(|e| {
                SecretError::ClientInit(format!("invalid CA certificate {}: {}", path.display(), e))
            })
        })
        .collect()
}

fn certificate_paths(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Ignoring {} ({}): {}", CF_SYSTEM_CERT_PATH, dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("crt") | Some("pem")
                )
        })
        .collect();
    paths.sort();
    paths
}

/// Interpolate `VCAP_SERVICES` in `env` if the platform options ask for it.
///
/// Returns whether the variable was rewritten. `connect` is only invoked
/// after both client credentials are known to be present, and the resolver
/// it returns is dropped before this function returns.
pub fn interpolate_services<R, F>(
    env: &mut Environment,
    options: Option<&PlatformOptions>,
    connect: F,
) -> Result<bool, SecretError>
where
    R: SecretResolver,
    F: FnOnce(&str, &ClientCredentials) -> Result<R, SecretError>,
{
    let Some(endpoint) = options.and_then(PlatformOptions::secret_endpoint) else {
        return Ok(false);
    };

    let credentials = ClientCredentials::from_env(env)?;
    let resolver = connect(endpoint, &credentials)?;
    let interpolated = resolver.interpolate(env.get(VCAP_SERVICES).unwrap_or_default())?;
    drop(resolver);

    env.set(VCAP_SERVICES, interpolated);
    Ok(true)
}
