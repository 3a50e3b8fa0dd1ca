use crate::api::Problem;

/// Result type used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of a client operation.
///
/// Every operation fails with exactly one of three kinds:
///
/// - [`Error::Validation`]: the caller passed something unusable. Detected before any network
///   access takes place.
/// - [`Error::Protocol`]: the authority, or the protocol state, did not cooperate.
/// - [`Error::Network`]: the exchange itself failed.
///
/// Nothing in this crate retries on any of them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Returns the authority's problem document if the request was rejected.
    pub fn problem(&self) -> Option<&Problem> {
        match self {
            Error::Protocol(ProtocolError::Rejected { problem, .. }) => Some(problem),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The directory does not advertise the capability an operation needs.
    #[error("directory has no `{0}` endpoint")]
    MissingEndpoint(String),

    /// A nonce probe came back without a `Replay-Nonce` header.
    #[error("no nonce available from {0}")]
    NoNonce(String),

    /// The authority answered with a non-2xx status.
    #[error("authority rejected request ({status}): {problem}")]
    Rejected { status: u16, problem: Problem },
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::Network(NetworkError::Transport(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Network(NetworkError::Malformed(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_accessor() {
        let err = Error::from(ProtocolError::Rejected {
            status: 400,
            problem: Problem {
                _type: "urn:acme:error:malformed".to_owned(),
                detail: Some("bad csr".to_owned()),
                ..Default::default()
            },
        });

        assert_eq!(err.problem().unwrap()._type, "urn:acme:error:malformed");
        assert_eq!(
            err.to_string(),
            "authority rejected request (400): urn:acme:error:malformed: bad csr"
        );

        assert!(Error::validation("nope").problem().is_none());
    }
}
