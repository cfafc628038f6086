//! Launch-time platform options
//!
//! Passed as the fourth argument: a base64-encoded JSON object such as
//! `{"credhub_uri":"https://credhub.service.cf.internal:8844"}`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

/// Decoded platform options. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlatformOptions {
    /// Secret-service endpoint used to interpolate `VCAP_SERVICES`
    #[serde(default)]
    pub credhub_uri: Option<String>,
}

impl PlatformOptions {
    /// Decode the encoded platform-options argument.
    ///
    /// An absent or empty argument yields `Ok(None)`.
    pub fn decode(encoded: Option<&str>) -> Result<Option<Self>, PlatformOptionsError> {
        let encoded = match encoded {
            Some(s) if !s.is_empty() => s,
            _ => return Ok(None),
        };

        let json = STANDARD.decode(encoded)?;
        let options = serde_json::from_slice(&json)?;
        Ok(Some(options))
    }

    /// Secret-service endpoint, if one is configured
    pub fn secret_endpoint(&self) -> Option<&str> {
        self.credhub_uri.as_deref().filter(|uri| !uri.is_empty())
    }
}

/// Platform options errors
#[derive(Debug, thiserror::Error)]
pub enum PlatformOptionsError {
    #[error("illegal base64 data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
