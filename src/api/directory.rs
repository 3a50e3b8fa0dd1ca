use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Capabilities an authority may advertise in its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    NewRegistration,
    NewAuthorization,
    NewCertificate,
    RevokeCertificate,
    KeyChange,
}

impl Resource {
    /// Directory key, which is also the `resource` tag of the matching request payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::NewRegistration => "new-reg",
            Resource::NewAuthorization => "new-authz",
            Resource::NewCertificate => "new-cert",
            Resource::RevokeCertificate => "revoke-cert",
            Resource::KeyChange => "key-change",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory object for client self-configuration.
///
/// # Example JSON
///
/// ```json
/// {
///   "new-reg": "https://example.com/acme/new-reg",
///   "new-authz": "https://example.com/acme/new-authz",
///   "new-cert": "https://example.com/acme/new-cert",
///   "revoke-cert": "https://example.com/acme/revoke-cert",
///   "key-change": "https://example.com/acme/key-change",
///   "meta": {
///     "terms-of-service": "https://example.com/acme/terms"
///   }
/// }
/// ```
///
/// Keys are kept as-is, so authorities advertising extra resources don't break parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<DirectoryMeta>,

    #[serde(flatten)]
    resources: BTreeMap<String, serde_json::Value>,
}

impl Directory {
    /// Looks up an endpoint by its raw directory key.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.resources.get(name).and_then(|url| url.as_str())
    }

    /// Looks up the endpoint for `resource`, failing if the authority doesn't offer it.
    pub fn endpoint(&self, resource: Resource) -> Result<&str> {
        self.get(resource.as_str())
            .ok_or_else(|| ProtocolError::MissingEndpoint(resource.as_str().to_owned()).into())
    }

    /// URL of the current terms of service, if advertised.
    pub fn terms_of_service(&self) -> Option<&str> {
        self.meta.as_ref()?.terms_of_service.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DirectoryMeta {
    /// URL identifying the current terms of service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,

    /// URL locating a website providing more information about the authority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// The hostnames that the authority recognizes as referring to itself for CAA record
    /// validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caa_identities: Option<Vec<String>>,
}
