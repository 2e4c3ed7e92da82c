//! Media Host Authentication - SHA-256 Request Signing
//!
//! Signs media host requests the way the host verifies them: parameters
//! sorted by key, empty values dropped, joined as `k=v` with `&`, the
//! API secret appended, then SHA-256 hex (lowercase). The secret is
//! never sent, only the computed signature.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::MediaCredentials;

/// Value sent as `signature_algorithm` alongside every signature.
pub const SIGNATURE_ALGORITHM: &str = "sha256";

/// Parameters a browser needs to upload straight to the media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignature {
    /// Unix seconds the signature was issued at.
    pub timestamp: i64,
    pub folder: String,
    pub signature: String,
    pub signature_algorithm: String,
    pub cloud_name: String,
    pub api_key: String,
}

/// The canonical string that gets hashed (without the secret).
pub fn string_to_sign(params: &[(&str, &str)]) -> String {
    let mut params: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    params.sort_by_key(|(k, _)| *k);
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Sign `params` with `secret`.
pub fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut payload = string_to_sign(params);
    payload.push_str(secret);
    hex::encode(hmac_sha256::Hash::hash(payload.as_bytes()))
}

/// Current Unix timestamp in seconds (for signing).
pub fn unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Signs requests with one set of media host credentials.
#[derive(Debug, Clone)]
pub struct MediaSigner {
    credentials: MediaCredentials,
}

impl MediaSigner {
    pub fn new(credentials: MediaCredentials) -> Self {
        Self { credentials }
    }

    pub fn cloud_name(&self) -> &str {
        &self.credentials.cloud_name
    }

    pub fn api_key(&self) -> &str {
        &self.credentials.api_key
    }

    /// Sign arbitrary request parameters.
    pub fn sign(&self, params: &[(&str, &str)]) -> String {
        sign_params(params, &self.credentials.api_secret)
    }

    /// Issue an upload signature for `folder` at `timestamp`.
    pub fn upload_signature(&self, folder: &str, timestamp: i64) -> UploadSignature {
        let ts = timestamp.to_string();
        UploadSignature {
            timestamp,
            folder: folder.to_string(),
            signature: self.sign(&[("folder", folder), ("timestamp", ts.as_str())]),
            signature_algorithm: SIGNATURE_ALGORITHM.to_string(),
            cloud_name: self.credentials.cloud_name.clone(),
            api_key: self.credentials.api_key.clone(),
        }
    }
}
