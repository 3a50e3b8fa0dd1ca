//! Provisioning certificates from ACME (Automatic Certificate Management Environment) providers
//! speaking the early draft protocol, such as the original Let's Encrypt `acme-v01` API.
//!
//! # Usage
//!
//! A [`Client`] wraps one account key and one authority. Each protocol step is one call; the
//! caller decides when to move on.
//!
//! ```no_run
//! # async fn run() -> acme::Result<()> {
//! use acme::{AcmeKey, Client, DirectoryUrl};
//!
//! let client = Client::new(DirectoryUrl::LetsEncryptStaging, AcmeKey::generate());
//!
//! let reg = client
//!     .new_registration(&["mailto:cert-admin@example.org".to_owned()], None)
//!     .await?;
//!
//! // agree to the terms of service the authority pointed at
//! if let (Some(location), Some(tos)) = (reg.location.as_deref(), reg.link("terms-of-service")) {
//!     let mut registration = reg.body.clone();
//!     registration.agreement = Some(tos.to_owned());
//!     client.update_registration(location, &registration).await?;
//! }
//!
//! let authz = client.new_authorization("example.org").await?;
//! let challenge = authz.body.http_challenge().expect("http-01 offered");
//!
//! // serve `key_authorization` at /.well-known/acme-challenge/<token>, then:
//! let _proof = client.key_authorization(&challenge.token)?;
//! client.respond_to_challenge(challenge).await?;
//! # Ok(())
//! # }
//! ```
//!
//! The `acme-draft` binary runs the whole flow, including the `http-01` responder (see
//! [`responder`]).
//!
//! # Domain Ownership
//!
//! Most website TLS certificates tries to prove ownership/control over the domain they are issued
//! for. For ACME, this means proving you control either:
//!
//! - a server answering HTTP requests for that domain;
//! - the DNS server answering name lookups against the domain.
//!
//! # Rate Limits
//!
//! The ACME API provider Let's Encrypt uses [rate limits] to ensure the API is not being abused.
//! Take care when polling [`Client::check_authorization_status`].
//!
//! ## Use Staging For Development!
//!
//! Especially take care to use the Let's Encrypt staging environment for development where the rate
//! limits are more relaxed. See [`DirectoryUrl::LetsEncryptStaging`].
//!
//! [rate limits]: https://letsencrypt.org/docs/rate-limits

#![deny(rust_2018_idioms, nonstandard_style, future_incompatible)]

mod cert;
mod client;
mod dir;
mod error;
mod jws;
mod key;
mod req;
mod trans;

pub mod api;
pub mod config;
pub mod link;
pub mod responder;
pub mod store;
pub mod util;

#[cfg(test)]
mod test;

pub use crate::{
    cert::{create_csr, create_p256_key, Certificate},
    client::{Client, RevocationReason},
    dir::DirectoryUrl,
    error::{Error, NetworkError, ProtocolError, Result},
    jws::{FlattenedJsonJws, Jwk, JwsHeader, Signer},
    key::AcmeKey,
    trans::ApiResponse,
};
