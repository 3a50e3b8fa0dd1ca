use tokio::sync::OnceCell;

use crate::{
    api,
    error::Result,
    req::{req_handle_error, Http},
    trans::NoncePool,
};

const LETSENCRYPT_URL: &str = "https://acme-v01.api.letsencrypt.org/directory";
const LETSENCRYPT_STAGING_URL: &str = "https://acme-staging.api.letsencrypt.org/directory";

/// Enumeration of known directories.
#[derive(Debug, Clone, Default)]
pub enum DirectoryUrl<'a> {
    /// The main Let's Encrypt directory.
    ///
    /// Not appropriate for testing / development.
    LetsEncrypt,

    /// The staging Let's Encrypt directory.
    ///
    /// Use for testing and development. Doesn't issue "valid" certificates. The root signing
    /// certificate is not supposed to be in any trust chains.
    #[default]
    LetsEncryptStaging,

    /// Provide an arbitrary directory URL to connect to.
    Other(&'a str),
}

impl<'a> DirectoryUrl<'a> {
    pub fn to_url(&self) -> &str {
        match self {
            DirectoryUrl::LetsEncrypt => LETSENCRYPT_URL,
            DirectoryUrl::LetsEncryptStaging => LETSENCRYPT_STAGING_URL,
            DirectoryUrl::Other(url) => url,
        }
    }
}

/// Fetches the directory once and hands out the same copy afterwards.
///
/// Callers arriving while the first fetch is in flight wait for it instead of starting their
/// own. A failed fetch leaves nothing behind, so the next call tries again.
#[derive(Debug)]
pub(crate) struct DirectoryResolver {
    url: String,
    directory: OnceCell<api::Directory>,
}

impl DirectoryResolver {
    pub(crate) fn new(url: &str) -> Self {
        DirectoryResolver {
            url: url.to_owned(),
            directory: OnceCell::new(),
        }
    }

    pub(crate) async fn resolve(&self, http: &Http, nonce_pool: &NoncePool) -> Result<&api::Directory> {
        self.directory
            .get_or_try_init(|| self.fetch(http, nonce_pool))
            .await
    }

    async fn fetch(&self, http: &Http, nonce_pool: &NoncePool) -> Result<api::Directory> {
        log::debug!("Fetch directory: {}", self.url);

        let res = http.get(&self.url).await?;
        nonce_pool.extract_nonce(res.headers());

        let res = req_handle_error(res).await?;
        let bytes = res.bytes().await?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}
