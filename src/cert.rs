use std::{str::FromStr as _, time::SystemTime};

use der::{asn1::Ia5String, Decode as _, Encode as _};
use pkcs8::{DecodePrivateKey as _, EncodePrivateKey as _};
use x509_cert::{
    builder::{Builder, RequestBuilder as CsrBuilder},
    ext::pkix::{name::GeneralName, SubjectAltName},
    name::Name,
};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Make a P-256 private key (from which we can derive a public key).
pub fn create_p256_key() -> p256::ecdsa::SigningKey {
    let csprng = &mut rand::thread_rng();
    ecdsa::SigningKey::from(p256::SecretKey::random(csprng))
}

/// Creates a DER-encoded CSR for `domains`, signed with `signer`.
///
/// The first item of `domains` is picked for the CSR's Common Name (CN). All domains are added to a
/// Subject Alternative Name (SAN) extension.
pub fn create_csr(signer: &p256::ecdsa::SigningKey, domains: &[&str]) -> Result<Vec<u8>> {
    let primary_domain = domains
        .first()
        .ok_or_else(|| Error::validation("at least one domain is required"))?;

    let subject = Name::from_str(&format!("CN={primary_domain}"))
        .map_err(|err| Error::validation(format!("invalid subject: {err}")))?;

    let mut csr = CsrBuilder::new(subject, signer)
        .map_err(|err| Error::validation(format!("create csr: {err}")))?;

    let names = domains
        .iter()
        .map(|domain| {
            Ia5String::new(domain)
                .map(GeneralName::DnsName)
                .map_err(|err| Error::validation(format!("invalid domain {domain}: {err}")))
        })
        .collect::<Result<Vec<_>>>()?;

    csr.add_extension(&SubjectAltName(names))
        .map_err(|err| Error::validation(format!("add SAN extension: {err}")))?;

    let csr = csr
        .build::<p256::ecdsa::DerSignature>()
        .map_err(|err| Error::validation(format!("build csr: {err}")))?;

    csr.to_der()
        .map_err(|err| Error::validation(format!("encode csr: {err}")))
}

/// Encapsulated certificate and private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    private_key_pem: Zeroizing<String>,
    certificate_der: Vec<u8>,
}

impl Certificate {
    pub fn new(private_key_pem: Zeroizing<String>, certificate_der: Vec<u8>) -> Self {
        Certificate {
            private_key_pem,
            certificate_der,
        }
    }

    /// Reads a certificate from its PEM form, checking both halves.
    pub fn parse(private_key_pem: Zeroizing<String>, certificate_pem: &str) -> Result<Self> {
        let (label, certificate_der) = pem::decode_vec(certificate_pem.as_bytes())
            .map_err(|err| Error::validation(format!("certificate PEM: {err}")))?;

        if label != "CERTIFICATE" {
            return Err(Error::validation(format!(
                "expected a CERTIFICATE, found {label}"
            )));
        }

        // validate private key
        p256::ecdsa::SigningKey::from_pkcs8_pem(&private_key_pem)
            .map_err(|err| Error::validation(format!("private key PEM: {err}")))?;

        Ok(Certificate {
            private_key_pem,
            certificate_der,
        })
    }

    /// The private key in PEM format.
    pub fn private_key(&self) -> &str {
        &self.private_key_pem
    }

    /// The private key in DER encoding.
    pub fn private_key_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let private_key = p256::ecdsa::SigningKey::from_pkcs8_pem(&self.private_key_pem)
            .map_err(|err| Error::validation(format!("private key PEM: {err}")))?;
        let der = private_key
            .to_pkcs8_der()
            .map_err(|err| Error::validation(format!("private key DER: {err}")))?;
        Ok(Zeroizing::new(der.as_bytes().to_vec()))
    }

    /// The issued certificate in DER encoding, as the authority sent it.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The issued certificate in PEM format.
    pub fn certificate_pem(&self) -> Result<String> {
        pem::encode_string("CERTIFICATE", pem::LineEnding::LF, &self.certificate_der)
            .map_err(|err| Error::validation(format!("certificate PEM: {err}")))
    }

    /// Inspect the certificate to count the number of (whole) valid days left.
    ///
    /// It's up to the authority to decide how long an issued certificate is valid. Let's
    /// Encrypt sets the validity to 90 days. This function reports 89 days for a newly issued
    /// cert, since it counts _whole_ days.
    ///
    /// It is possible to get negative days for an expired certificate.
    pub fn valid_days_left(&self) -> Result<i64> {
        let cert = x509_cert::Certificate::from_der(&self.certificate_der)
            .map_err(|err| Error::validation(format!("certificate DER: {err}")))?;

        let not_after = cert
            .tbs_certificate
            .validity
            .not_after
            .to_unix_duration()
            .as_secs() as i64;

        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|dur| dur.as_secs() as i64)
            .unwrap_or_default();

        Ok((not_after - now).div_euclid(24 * 60 * 60))
    }
}

#[cfg(test)]
mod tests {
    use x509_cert::request::CertReq;

    use super::*;

    #[test]
    fn test_create_csr() {
        let key = create_p256_key();
        let der = create_csr(&key, &["example.org", "www.example.org"]).unwrap();

        let csr = CertReq::from_der(&der).unwrap();
        assert_eq!(csr.info.subject.to_string(), "CN=example.org");

        // the SAN extension rides in the extension request attribute
        assert_eq!(csr.info.attributes.len(), 1);
    }

    #[test]
    fn test_create_csr_needs_domain() {
        let key = create_p256_key();
        assert!(matches!(create_csr(&key, &[]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_certificate_pem_round_trip() {
        let key = crate::AcmeKey::generate();
        let cert = Certificate::new(key.to_pem().unwrap(), vec![0x30, 0x03, 0x02, 0x01, 0x00]);

        let pem = cert.certificate_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));

        let parsed = Certificate::parse(key.to_pem().unwrap(), &pem).unwrap();
        assert_eq!(parsed, cert);
        assert_eq!(parsed.certificate_der(), [0x30, 0x03, 0x02, 0x01, 0x00]);
        assert!(!parsed.private_key_der().unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_label() {
        let key = crate::AcmeKey::generate();
        let pem = key.to_pem().unwrap();

        let err = Certificate::parse(key.to_pem().unwrap(), &pem).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_valid_days_left_needs_certificate() {
        let key = crate::AcmeKey::generate();
        let cert = Certificate::new(key.to_pem().unwrap(), b"not a certificate".to_vec());
        assert!(cert.valid_days_left().is_err());
    }
}
