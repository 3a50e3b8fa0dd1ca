//! Stateless key and object helpers.

use base64::prelude::*;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Encodes bytes as unpadded base64url.
pub fn base64url<T: ?Sized + AsRef<[u8]>>(input: &T) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(input)
}

/// Decodes base64url, with or without trailing padding.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>> {
    BASE64_URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|err| Error::validation(format!("invalid base64url: {err}")))
}

/// Converts base64url into padded standard base64.
///
/// Existing `=` characters are stripped before padding is derived from the length, so
/// converting an already converted string is a no-op.
pub fn to_standard_b64(input: &str) -> String {
    let mut out = input
        .trim_end_matches('=')
        .replace('-', "+")
        .replace('_', "/");

    match out.len() % 4 {
        2 => out.push_str("=="),
        3 => out.push('='),
        _ => {}
    }

    out
}

fn is_base64url(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| !s.is_empty() && base64url_decode(s).is_ok())
}

/// Returns true if `value` is an object carrying every one of `fields`.
///
/// Field values may be anything, including `null`.
pub fn fields_present(value: &Value, fields: &[&str]) -> bool {
    value
        .as_object()
        .is_some_and(|obj| fields.iter().all(|field| obj.contains_key(*field)))
}

/// Structural check of a public JSON Web Key.
///
/// Keys carrying the private exponent `d` are always rejected.
pub fn valid_jwk(jwk: &Value) -> bool {
    if !jwk.is_object() || fields_present(jwk, &["d"]) {
        return false;
    }

    match jwk["kty"].as_str() {
        Some("RSA") => is_base64url(&jwk["n"]) && is_base64url(&jwk["e"]),
        Some("EC") => jwk["crv"].is_string() && is_base64url(&jwk["x"]) && is_base64url(&jwk["y"]),
        _ => false,
    }
}

/// Structural check of a flattened JWS envelope.
pub fn valid_jws(jws: &Value) -> bool {
    if !fields_present(jws, &["protected", "payload", "signature"]) {
        return false;
    }

    if let Some(header) = jws.get("header") {
        if !header["alg"].is_string() || !valid_jwk(&header["jwk"]) {
            return false;
        }
    }

    // payload may legitimately be empty
    is_base64url(&jws["protected"])
        && jws["payload"]
            .as_str()
            .is_some_and(|p| base64url_decode(p).is_ok())
        && is_base64url(&jws["signature"])
}

/// Non-cryptographic identity of a public key, for local de-duplication only.
///
/// RSA keys are identified by their modulus, EC keys by `crv:x:y`.
pub fn key_fingerprint(jwk: &Value) -> Option<String> {
    match jwk["kty"].as_str()? {
        "RSA" => jwk["n"].as_str().map(str::to_owned),
        "EC" => Some(format!(
            "{}:{}:{}",
            jwk["crv"].as_str()?,
            jwk["x"].as_str()?,
            jwk["y"].as_str()?
        )),
        _ => None,
    }
}

/// Copies every entry of `source` into `target`, overwriting existing keys.
pub fn extend(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

/// Picks `keys` out of `source`, skipping absent and `null` entries.
pub fn extract(source: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| match source.get(*key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(((*key).to_owned(), value.clone())),
        })
        .collect()
}

/// Drops `null` entries.
pub fn filter_present(source: Map<String, Value>) -> Map<String, Value> {
    source.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

/// Syntax check for a DNS name as accepted in an authorization request.
pub(crate) fn is_valid_domain(domain: &str) -> bool {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let labels = domain.split('.').collect::<Vec<_>>();

    // a bare label is not something an authority will issue for
    if labels.len() < 2 {
        return false;
    }

    let tld_is_numeric = labels
        .last()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()));

    !tld_is_numeric
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
