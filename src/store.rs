//! JSON persistence for account and certificate state.
//!
//! Reads are forgiving: a missing or unreadable file is treated as absent, so a corrupted state
//! directory leads to a fresh registration rather than a hard failure.

use std::{fs, io, path::Path};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Account key and where the authority keeps its registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub private_key_pem: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_location: Option<String>,
}

/// An issued certificate with its private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    pub domain: String,
    pub private_key_pem: String,
    pub certificate_pem: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Reads `path` as JSON. Missing files and malformed content yield `None`.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Option<T> {
    let path = path.as_ref();

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            log::warn!("Failed to read {}: {err}", path.display());
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("Ignoring malformed {}: {err}", path.display());
            None
        }
    }
}

/// Writes `value` to `path` as pretty JSON, creating parent directories as needed.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> io::Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(value)?;
    fs::write(path, json)?;

    log::debug!("Wrote {}", path.display());

    Ok(())
}
