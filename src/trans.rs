use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{ProtocolError, Result},
    jws::Signer,
    link::{extract_location, parse_links, Links},
    req::{req_handle_error, req_header, req_header_joined, Http},
};

const REPLAY_NONCE: &str = "replay-nonce";

/// Older nonces are dropped once the pool grows past this.
const MAX_POOLED_NONCES: usize = 10;

/// A response body together with the metadata the authority sent alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub body: T,

    /// `Link` relations, keyed by `rel`.
    pub links: Links,

    /// `Location` of the created or updated resource.
    pub location: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links.get(rel).map(String::as_str)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            body: f(self.body),
            links: self.links,
            location: self.location,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Deserializes the JSON body into a typed API object, keeping the metadata.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<ApiResponse<T>> {
        let body = serde_json::from_value(self.body)?;
        Ok(ApiResponse {
            body,
            links: self.links,
            location: self.location,
        })
    }
}

/// Signed request dispatch.
///
/// Every call takes one nonce from the pool (probing the target URL when the pool is empty),
/// signs the payload with it and puts whatever nonce the authority returns back into the pool.
#[derive(Clone)]
pub(crate) struct Transport {
    http: Http,
    nonce_pool: Arc<NoncePool>,
    signer: Arc<dyn Signer>,
}

impl Transport {
    pub(crate) fn new(http: Http, nonce_pool: Arc<NoncePool>, signer: Arc<dyn Signer>) -> Self {
        Transport {
            http,
            nonce_pool,
            signer,
        }
    }

    pub(crate) fn http(&self) -> &Http {
        &self.http
    }

    pub(crate) fn nonce_pool(&self) -> &NoncePool {
        &self.nonce_pool
    }

    pub(crate) fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }

    /// Signed POST, JSON response.
    pub(crate) async fn post<T>(&self, url: &str, payload: &T) -> Result<ApiResponse<serde_json::Value>>
    where
        T: Serialize + ?Sized,
    {
        let res = self.send_signed(url, payload, HeaderMap::new()).await?;
        read_json(res).await
    }

    /// Signed POST, raw byte response.
    pub(crate) async fn post_binary<T>(&self, url: &str, payload: &T) -> Result<ApiResponse<Vec<u8>>>
    where
        T: Serialize + ?Sized,
    {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/pkix-cert"),
        );

        let res = self.send_signed(url, payload, headers).await?;
        let (links, location) = metadata(&res);
        let body = res.bytes().await?.to_vec();

        Ok(ApiResponse {
            body,
            links,
            location,
        })
    }

    /// Unsigned GET, JSON response.
    pub(crate) async fn get(&self, url: &str) -> Result<ApiResponse<serde_json::Value>> {
        log::debug!("Get resource: {url}");

        let res = self.http.get(url).await?;
        self.nonce_pool.extract_nonce(res.headers());

        let res = req_handle_error(res).await?;
        read_json(res).await
    }

    async fn send_signed<T>(
        &self,
        url: &str,
        payload: &T,
        extra_headers: HeaderMap,
    ) -> Result<reqwest::Response>
    where
        T: Serialize + ?Sized,
    {
        let nonce = self.nonce_pool.take(&self.http, url).await?;

        let payload = serde_json::to_vec(payload)?;
        let jws = self.signer.sign(&nonce, &payload)?;
        let body = serde_json::to_string(&jws)?;

        log::debug!("Call endpoint: {url}");

        let res = self.http.post(url, body, extra_headers).await?;

        // Regardless of the request being a success or not, there might be a nonce in the
        // response.
        self.nonce_pool.extract_nonce(res.headers());

        req_handle_error(res).await
    }
}

fn metadata(res: &reqwest::Response) -> (Links, Option<String>) {
    let links = parse_links(req_header_joined(res, header::LINK.as_str()).as_deref());
    let location = extract_location(req_header(res, header::LOCATION.as_str()).as_deref());
    (links, location)
}

async fn read_json(res: reqwest::Response) -> Result<ApiResponse<serde_json::Value>> {
    let (links, location) = metadata(&res);

    let bytes = res.bytes().await?;
    log::trace!("{}", String::from_utf8_lossy(&bytes));

    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };

    Ok(ApiResponse {
        body,
        links,
        location,
    })
}

/// Shared pool of nonces.
#[derive(Default, Debug)]
pub(crate) struct NoncePool {
    pool: Mutex<VecDeque<String>>,
}

impl NoncePool {
    pub(crate) fn new() -> Self {
        NoncePool::default()
    }

    /// Adds a freshly received nonce.
    pub(crate) fn deposit(&self, nonce: String) {
        log::trace!("Storing new nonce");

        let mut pool = self.pool.lock();
        pool.push_back(nonce);

        if pool.len() > MAX_POOLED_NONCES {
            pool.pop_front();
        }
    }

    pub(crate) fn extract_nonce(&self, headers: &HeaderMap) {
        // unreadable values are not valid base64url either, so they can't be used
        if let Some(nonce) = headers
            .get(REPLAY_NONCE)
            .and_then(|nonce| nonce.to_str().ok())
        {
            self.deposit(nonce.to_owned());
        }
    }

    /// Takes a pooled nonce, or fetches a fresh one from `probe_url` when the pool is empty.
    pub(crate) async fn take(&self, http: &Http, probe_url: &str) -> Result<String> {
        {
            let mut pool = self.pool.lock();

            if let Some(nonce) = pool.pop_front() {
                log::trace!("Use previous nonce");
                return Ok(nonce);
            }
        }

        log::debug!("Request new nonce");
        let res = http.head(probe_url).await?;

        req_header(&res, REPLAY_NONCE)
            .ok_or_else(|| ProtocolError::NoNonce(probe_url.to_owned()).into())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pool.lock().len()
    }
}
