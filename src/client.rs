use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    api::{self, Resource},
    dir::{DirectoryResolver, DirectoryUrl},
    error::{Error, Result},
    jws::Signer,
    req::Http,
    trans::{ApiResponse, NoncePool, Transport},
    util::{base64url, extend, extract, is_valid_domain},
};

/// Registration fields a client may change.
const UPDATABLE_REGISTRATION_FIELDS: &[&str] = &["contact", "agreement"];

struct ClientInner {
    transport: Transport,
    directory: DirectoryResolver,
}

/// Client for one account key against one authority.
///
/// Each method is one protocol step; nothing advances on its own. The usual order is:
///
/// 1. [`new_registration`] (and [`update_registration`] to agree to the terms of service)
/// 2. [`new_authorization`] for the domain
/// 3. [`respond_to_challenge`] once the challenge proof is in place
/// 4. [`check_authorization_status`] until the status is terminal
/// 5. [`new_certificate`]
///
/// Cloning is cheap. Clones share the nonce pool and the directory.
///
/// [`new_registration`]: Client::new_registration
/// [`update_registration`]: Client::update_registration
/// [`new_authorization`]: Client::new_authorization
/// [`respond_to_challenge`]: Client::respond_to_challenge
/// [`check_authorization_status`]: Client::check_authorization_status
/// [`new_certificate`]: Client::new_certificate
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client. No request is made until the first operation.
    pub fn new(url: DirectoryUrl<'_>, signer: impl Signer + 'static) -> Self {
        Self::with_http(url, Arc::new(signer), Http::default())
    }

    /// Creates a client on a preconfigured HTTP client, e.g. one with timeouts set.
    pub fn with_http_client(
        url: DirectoryUrl<'_>,
        signer: impl Signer + 'static,
        http: reqwest::Client,
    ) -> Self {
        Self::with_http(url, Arc::new(signer), Http::new(http))
    }

    fn with_http(url: DirectoryUrl<'_>, signer: Arc<dyn Signer>, http: Http) -> Self {
        let transport = Transport::new(http, Arc::new(NoncePool::new()), signer);

        Client {
            inner: Arc::new(ClientInner {
                transport,
                directory: DirectoryResolver::new(url.to_url()),
            }),
        }
    }

    /// The authority's directory, fetched on first use.
    pub async fn directory(&self) -> Result<&api::Directory> {
        let transport = &self.inner.transport;
        self.inner
            .directory
            .resolve(transport.http(), transport.nonce_pool())
            .await
    }

    async fn endpoint(&self, resource: Resource) -> Result<&str> {
        self.directory().await?.endpoint(resource)
    }

    /// Registers the account key with `contacts`.
    ///
    /// The `terms-of-service` link of the response points at the agreement the authority
    /// expects; pass it to [`update_registration`](Client::update_registration) to agree.
    pub async fn new_registration(
        &self,
        contacts: &[String],
        agreement: Option<&str>,
    ) -> Result<ApiResponse<api::Registration>> {
        if contacts.is_empty() {
            return Err(Error::validation("at least one contact is required"));
        }

        if let Some(bad) = contacts.iter().find(|c| reqwest::Url::parse(c).is_err()) {
            return Err(Error::validation(format!("contact is not a URI: {bad}")));
        }

        let url = self.endpoint(Resource::NewRegistration).await?;
        let payload = api::NewRegistration::new(contacts, agreement);

        let res = self.inner.transport.post(url, &payload).await?;

        if let Some(location) = &res.location {
            log::debug!("Registration is at: {location}");
        }

        res.deserialize()
    }

    /// Updates the registration at `location` with the contact and agreement of
    /// `registration`.
    pub async fn update_registration(
        &self,
        location: &str,
        registration: &api::Registration,
    ) -> Result<ApiResponse<api::Registration>> {
        if location.is_empty() {
            return Err(Error::validation("registration location is required"));
        }

        self.directory().await?;

        let Value::Object(fields) = serde_json::to_value(registration)? else {
            return Err(Error::validation("registration is not an object"));
        };

        let mut payload = extract(&fields, UPDATABLE_REGISTRATION_FIELDS);
        extend(&mut payload, &resource_tag("reg"));

        let res = self.inner.transport.post(location, &payload).await?;
        res.deserialize()
    }

    /// Requests authorization for `domain`.
    pub async fn new_authorization(&self, domain: &str) -> Result<ApiResponse<api::Authorization>> {
        if !is_valid_domain(domain) {
            return Err(Error::validation(format!("not a valid domain name: {domain}")));
        }

        let url = self.endpoint(Resource::NewAuthorization).await?;
        let payload = api::NewAuthorization::dns(domain);

        let res = self.inner.transport.post(url, &payload).await?;
        res.deserialize()
    }

    /// Key authorization for a challenge token: `token.thumbprint`.
    ///
    /// For `http-01` this is the exact body to serve at
    /// `/.well-known/acme-challenge/<token>`.
    pub fn key_authorization(&self, token: &str) -> Result<String> {
        let thumbprint = self.inner.transport.signer().thumbprint()?;
        Ok(format!("{token}.{thumbprint}"))
    }

    /// Tells the authority to validate `challenge`.
    ///
    /// The proof must be in place before this is called.
    pub async fn respond_to_challenge(
        &self,
        challenge: &api::Challenge,
    ) -> Result<ApiResponse<api::Challenge>> {
        if challenge.uri.is_empty() || challenge.token.is_empty() {
            return Err(Error::validation("challenge needs a token and a uri"));
        }

        let key_authorization = self.key_authorization(&challenge.token)?;

        self.directory().await?;

        let payload = api::ChallengeResponse::new(&challenge._type, key_authorization);

        let res = self.inner.transport.post(&challenge.uri, &payload).await?;
        res.deserialize()
    }

    /// Fetches the authorization at `uri` and returns its status.
    ///
    /// Only `status` is read; the rest of the document may take any shape.
    pub async fn check_authorization_status(&self, uri: &str) -> Result<api::AuthorizationStatus> {
        let auth = self.get(uri).await?.deserialize::<StatusOnly>()?;
        Ok(auth.body.status)
    }

    /// Requests issuance for a DER-encoded certificate signing request.
    ///
    /// The body of the response is the DER-encoded certificate. Its `up` link, if any, points
    /// at the issuer certificate.
    pub async fn new_certificate(&self, csr_der: &[u8]) -> Result<ApiResponse<Vec<u8>>> {
        if csr_der.is_empty() {
            return Err(Error::validation("certificate signing request is empty"));
        }

        let url = self.endpoint(Resource::NewCertificate).await?;
        let payload = api::NewCertificate::new(base64url(csr_der));

        self.inner.transport.post_binary(url, &payload).await
    }

    /// Revokes a DER-encoded certificate issued to this account.
    pub async fn revoke_certificate(
        &self,
        certificate_der: &[u8],
        reason: RevocationReason,
    ) -> Result<()> {
        let reason = match reason {
            // > the reason code CRL entry extension SHOULD be absent instead of
            // > using the unspecified (0) reasonCode value
            // see <https://datatracker.ietf.org/doc/html/rfc5280#section-5.3.1>
            RevocationReason::Unspecified => None,

            reason => Some(reason as usize),
        };

        let url = self.endpoint(Resource::RevokeCertificate).await?;
        let payload = api::Revocation::new(base64url(certificate_der), reason);

        self.inner.transport.post(url, &payload).await?;
        Ok(())
    }

    /// Unsigned GET of any resource.
    pub async fn get(&self, uri: &str) -> Result<ApiResponse<Value>> {
        if uri.is_empty() {
            return Err(Error::validation("resource uri is required"));
        }

        self.directory().await?;
        self.inner.transport.get(uri).await
    }
}

#[derive(Deserialize)]
struct StatusOnly {
    status: api::AuthorizationStatus,
}

fn resource_tag(resource: &str) -> Map<String, Value> {
    let mut tag = Map::new();
    tag.insert("resource".to_owned(), Value::from(resource));
    tag
}

/// Enumeration of reasons for revocation.
///
/// The reason codes are taken from [RFC 5280 §5.3.1].
///
/// [RFC 5280 §5.3.1]: https://tools.ietf.org/html/rfc5280#section-5.3.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    Unspecified = 0,
    KeyCompromise = 1,
    CACompromise = 2,
    AffiliationChanged = 3,
    Superseded = 4,
    CessationOfOperation = 5,
    CertificateHold = 6,
    // value 7 is not used
    RemoveFromCRL = 8,
    PrivilegeWithdrawn = 9,
    AACompromise = 10,
}
