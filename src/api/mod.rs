//! JSON API payloads.
//!
//! Response objects are public so callers can inspect what the authority returned. Request
//! payloads are built by [`Client`](crate::Client) and are not exposed.

use std::fmt;

use serde::{Deserialize, Serialize};

mod authorization;
mod certificate;
mod challenge;
mod directory;
mod identifier;
mod registration;

pub(crate) use self::{
    authorization::NewAuthorization,
    certificate::{NewCertificate, Revocation},
    challenge::ChallengeResponse,
    registration::NewRegistration,
};
pub use self::{
    authorization::{Authorization, AuthorizationStatus},
    challenge::{Challenge, ChallengeStatus},
    directory::{Directory, DirectoryMeta, Resource},
    identifier::Identifier,
    registration::Registration,
};

/// Problem document returned by the authority on failure.
///
/// See [RFC 7807].
///
/// # Example JSON
///
/// ```json
/// {
///   "type": "urn:acme:error:malformed",
///   "detail": "Error parsing certificate request",
///   "status": 400
/// }
/// ```
///
/// [RFC 7807]: https://datatracker.ietf.org/doc/html/rfc7807
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub _type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subproblems: Option<Vec<Subproblem>>,
}

impl Problem {
    /// Returns true if problem type is "badNonce".
    pub fn is_bad_nonce(&self) -> bool {
        self._type.ends_with(":badNonce") || self._type == "badNonce"
    }

    /// Returns true if the authority wants the terms of service agreed to first.
    pub fn is_unauthorized(&self) -> bool {
        self._type.ends_with(":unauthorized")
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self._type),
            _ => write!(f, "{}", self._type),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subproblem {
    #[serde(rename = "type")]
    pub _type: String,
    pub detail: Option<String>,
    pub identifier: Option<Identifier>,
}
