use p256::ecdsa::signature::Signer as _;
use pkcs8::{DecodePrivateKey as _, EncodePrivateKey as _};
use sha2::{Digest as _, Sha256};
use zeroize::Zeroizing;

use crate::{
    error::{Error, Result},
    jws::{FlattenedJsonJws, Jwk, JwkThumb, JwsHeader, JwsProtectedHeader, Signer},
    util::{base64url, key_fingerprint},
};

/// Account key used to sign every request to the authority.
///
/// This library uses elliptic curve P-256 (ES256). The signed requests are small and the
/// public key can be derived from the private key.
#[derive(Clone, Debug)]
pub struct AcmeKey {
    signing_key: p256::ecdsa::SigningKey,
}

impl AcmeKey {
    /// Generates a fresh key.
    pub fn generate() -> AcmeKey {
        Self::from_key(crate::create_p256_key())
    }

    /// Reads a PKCS#8 PEM private key.
    pub fn from_pem(pem: &str) -> Result<AcmeKey> {
        let signing_key = p256::ecdsa::SigningKey::from_pkcs8_pem(pem)
            .map_err(|err| Error::validation(format!("failed to read PEM: {err}")))?;
        Ok(Self::from_key(signing_key))
    }

    pub fn from_key(signing_key: p256::ecdsa::SigningKey) -> AcmeKey {
        AcmeKey { signing_key }
    }

    /// Private key as PKCS#8 PEM.
    pub fn to_pem(&self) -> Result<Zeroizing<String>> {
        self.signing_key
            .to_pkcs8_pem(pem::LineEnding::LF)
            .map_err(|err| Error::validation(format!("private_key_to_pem: {err}")))
    }

    pub(crate) fn signing_key(&self) -> &p256::ecdsa::SigningKey {
        &self.signing_key
    }

    /// Public key as a JSON Web Key.
    pub fn jwk(&self) -> Result<Jwk> {
        let point = self.signing_key.verifying_key().to_encoded_point(false);

        let (Some(x), Some(y)) = (point.x(), point.y()) else {
            return Err(Error::validation("public key has no affine coordinates"));
        };

        Ok(Jwk {
            alg: "ES256".to_owned(),
            kty: "EC".to_owned(),
            crv: "P-256".to_owned(),
            _use: "sig".to_owned(),
            x: base64url(x),
            y: base64url(y),
        })
    }

    /// Local identity of the public key. See [`key_fingerprint`].
    pub fn fingerprint(&self) -> Result<String> {
        let jwk = serde_json::to_value(self.jwk()?)?;
        key_fingerprint(&jwk).ok_or_else(|| Error::validation("unsupported key type"))
    }
}

impl Signer for AcmeKey {
    fn sign(&self, nonce: &str, payload: &[u8]) -> Result<FlattenedJsonJws> {
        let jwk = self.jwk()?;

        let protected = {
            let pro_json = serde_json::to_string(&JwsProtectedHeader::new(jwk.clone(), nonce))?;
            base64url(&pro_json)
        };

        let payload = base64url(payload);

        let to_sign = format!("{protected}.{payload}");
        let signature: p256::ecdsa::Signature = self
            .signing_key
            .try_sign(to_sign.as_bytes())
            .map_err(|err| Error::validation(format!("signing failed: {err}")))?;

        let signature = base64url(&signature.to_bytes());

        Ok(FlattenedJsonJws::new(protected, payload, signature).with_header(JwsHeader::new(jwk)))
    }

    /// RFC 7638 thumbprint: base64url SHA-256 of the lexically ordered required members.
    fn thumbprint(&self) -> Result<String> {
        let jwk = self.jwk()?;
        let jwk_json = serde_json::to_string(&JwkThumb::from(&jwk))?;
        Ok(base64url(&Sha256::digest(jwk_json)))
    }
}
