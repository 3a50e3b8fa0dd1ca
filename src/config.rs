use std::{env, path::PathBuf};

use crate::{
    dir::DirectoryUrl,
    error::{Error, Result},
};

pub const DIRECTORY_URL_VAR: &str = "ACME_DIRECTORY_URL";
pub const RESPONDER_PORT_VAR: &str = "ACME_RESPONDER_PORT";
pub const DOMAIN_VAR: &str = "ACME_DOMAIN";
pub const CONTACT_VAR: &str = "ACME_CONTACT";
pub const STATE_DIR_VAR: &str = "ACME_STATE_DIR";

const DEFAULT_RESPONDER_PORT: u16 = 80;
const DEFAULT_STATE_DIR: &str = ".acme";

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub directory_url: String,

    /// Port the `http-01` responder listens on.
    pub responder_port: u16,

    pub domain: Option<String>,

    pub contacts: Vec<String>,

    /// Where account and certificate state is kept.
    pub state_dir: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Reads the configuration through `var`, which returns the value of a variable if set.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // empty values count as unset
        let var = |name: &str| var(name).filter(|value| !value.trim().is_empty());

        let directory_url = var(DIRECTORY_URL_VAR)
            .unwrap_or_else(|| DirectoryUrl::LetsEncryptStaging.to_url().to_owned());

        let responder_port = match var(RESPONDER_PORT_VAR) {
            Some(port) => port.trim().parse().map_err(|err| {
                Error::validation(format!("{RESPONDER_PORT_VAR} is not a port ({port}): {err}"))
            })?,
            None => DEFAULT_RESPONDER_PORT,
        };

        let contacts = var(CONTACT_VAR)
            .map(|contacts| {
                contacts
                    .split(',')
                    .map(str::trim)
                    .filter(|contact| !contact.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            directory_url,
            responder_port,
            domain: var(DOMAIN_VAR).map(|domain| domain.trim().to_owned()),
            contacts,
            state_dir: var(STATE_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
        })
    }

    pub fn directory(&self) -> DirectoryUrl<'_> {
        DirectoryUrl::Other(&self.directory_url)
    }

    pub fn account_path(&self) -> PathBuf {
        self.state_dir.join("account.json")
    }

    pub fn certificate_path(&self, domain: &str) -> PathBuf {
        self.state_dir.join(format!("{domain}.json"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(
            config.directory_url,
            "https://acme-staging.api.letsencrypt.org/directory"
        );
        assert_eq!(config.responder_port, 80);
        assert_eq!(config.domain, None);
        assert!(config.contacts.is_empty());
        assert_eq!(config.account_path(), PathBuf::from(".acme/account.json"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            (DIRECTORY_URL_VAR, "http://127.0.0.1:4000/directory"),
            (RESPONDER_PORT_VAR, "5002"),
            (DOMAIN_VAR, "example.org"),
            (CONTACT_VAR, "mailto:a@example.org, mailto:b@example.org,"),
            (STATE_DIR_VAR, "/var/lib/acme"),
        ])
        .unwrap();

        assert_eq!(config.directory().to_url(), "http://127.0.0.1:4000/directory");
        assert_eq!(config.responder_port, 5002);
        assert_eq!(config.domain.as_deref(), Some("example.org"));
        assert_eq!(
            config.contacts,
            ["mailto:a@example.org", "mailto:b@example.org"]
        );
        assert_eq!(
            config.certificate_path("example.org"),
            PathBuf::from("/var/lib/acme/example.org.json")
        );
    }

    #[test]
    fn test_bad_port() {
        for port in ["http", "-1", "65536"] {
            let err = config(&[(RESPONDER_PORT_VAR, port)]).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{port}");
        }
    }
}
