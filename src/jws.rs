//! Signed request envelopes.
//!
//! The client never looks inside an envelope. It hands a nonce and a serialized payload to a
//! [`Signer`] and transmits whatever comes back.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Produces signed envelopes for an account key.
///
/// [`AcmeKey`](crate::AcmeKey) is the built-in implementation.
pub trait Signer: Send + Sync {
    /// Signs `payload` (serialized JSON) for a request carrying `nonce`.
    fn sign(&self, nonce: &str, payload: &[u8]) -> Result<FlattenedJsonJws>;

    /// Stable thumbprint of the public key, as used in key authorizations.
    fn thumbprint(&self) -> Result<String>;
}

/// JWS Protected Header.
///
/// The draft protocol carries the full `jwk` on every request and binds the anti-replay nonce
/// here.
#[derive(Debug, Serialize, Deserialize, Default)]
pub(crate) struct JwsProtectedHeader {
    /// Algorithm.
    ///
    /// This field MUST NOT contain "none" or a Message Authentication Code (MAC) algorithm.
    alg: String,

    /// Public key matching the signing key.
    jwk: Option<Jwk>,

    /// A unique value that enables the verifier of a JWS to recognize when replay has occurred.
    nonce: String,
}

impl JwsProtectedHeader {
    pub(crate) fn new(jwk: Jwk, nonce: &str) -> Self {
        JwsProtectedHeader {
            alg: "ES256".to_owned(),
            jwk: Some(jwk),
            nonce: nonce.to_owned(),
        }
    }
}

/// Unprotected header repeating the algorithm and key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwsHeader {
    alg: String,
    jwk: Jwk,
}

impl JwsHeader {
    pub(crate) fn new(jwk: Jwk) -> Self {
        JwsHeader {
            alg: "ES256".to_owned(),
            jwk,
        }
    }
}

/// Public part of the account key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Jwk {
    pub(crate) alg: String,
    pub(crate) crv: String,
    pub(crate) kty: String,
    #[serde(rename = "use")]
    pub(crate) _use: String,
    pub(crate) x: String,
    pub(crate) y: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
// LEXICAL ORDER OF FIELDS MATTER!
pub(crate) struct JwkThumb {
    crv: String,
    kty: String,
    x: String,
    y: String,
}

impl From<&Jwk> for JwkThumb {
    fn from(a: &Jwk) -> Self {
        JwkThumb {
            crv: a.crv.clone(),
            kty: a.kty.clone(),
            x: a.x.clone(),
            y: a.y.clone(),
        }
    }
}

/// Flattened JSON serialization of a JWS.
///
/// <https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.2>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenedJsonJws {
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<JwsHeader>,
    protected: String,
    payload: String,
    signature: String,
}

impl FlattenedJsonJws {
    /// Assembles an envelope from already base64url-encoded parts.
    pub fn new(protected: String, payload: String, signature: String) -> Self {
        FlattenedJsonJws {
            header: None,
            protected,
            payload,
            signature,
        }
    }

    pub fn with_header(mut self, header: JwsHeader) -> Self {
        self.header = Some(header);
        self
    }

    /// base64url-encoded protected header.
    pub fn protected(&self) -> &str {
        &self.protected
    }

    /// base64url-encoded payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }
}
