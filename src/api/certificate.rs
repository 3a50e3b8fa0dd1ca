use serde::Serialize;

/// Payload requesting issuance for a signing request.
#[derive(Debug, Serialize)]
pub(crate) struct NewCertificate {
    resource: &'static str,

    /// Certificate Signing Request (CSR) in base64url-encoded DER.
    ///
    /// Note: not PEM, since headers are omitted.
    csr: String,
}

impl NewCertificate {
    pub(crate) fn new(csr: String) -> Self {
        Self {
            resource: "new-cert",
            csr,
        }
    }
}

/// Certificate revocation request.
#[derive(Debug, Serialize)]
pub(crate) struct Revocation {
    resource: &'static str,

    /// The certificate to be revoked, in the base64url-encoded version of the DER format.
    certificate: String,

    /// One of the revocation reasonCodes defined in [RFC 5280 §5.3.1].
    ///
    /// [RFC 5280 §5.3.1]: https://datatracker.ietf.org/doc/html/rfc5280#section-5.3.1
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<usize>,
}

impl Revocation {
    pub(crate) fn new(certificate: String, reason: Option<usize>) -> Self {
        Self {
            resource: "revoke-cert",
            certificate,
            reason,
        }
    }
}
