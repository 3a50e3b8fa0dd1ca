use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api;

/// The status of an [`api::Authorization`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Pending,
    Processing,
    Valid,
    Invalid,
    Deactivated,
    Expired,
    Revoked,
}

impl AuthorizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::Pending => "pending",
            AuthorizationStatus::Processing => "processing",
            AuthorizationStatus::Valid => "valid",
            AuthorizationStatus::Invalid => "invalid",
            AuthorizationStatus::Deactivated => "deactivated",
            AuthorizationStatus::Expired => "expired",
            AuthorizationStatus::Revoked => "revoked",
        }
    }

    /// Returns true once the authority has stopped working on the authorization.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            AuthorizationStatus::Pending | AuthorizationStatus::Processing
        )
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// {
//   "identifier": {
//     "type": "dns",
//     "value": "acmetest.algesten.se"
//   },
//   "status": "pending",
//   "expires": "2019-01-09T08:26:43Z",
//   "challenges": [
//     {
//       "type": "http-01",
//       "status": "pending",
//       "uri": "https://example.com/acme/challenge/YTqpYUthlVfwBncUufE8IRA2TkzZkN4eYWWLMSRqcSs/216789597",
//       "token": "MUi-gqeOJdRkSb_YR2eaMxQBqf6al8dgt_dOttSWb0w"
//     },
//     {
//       "type": "dns-01",
//       "status": "pending",
//       "uri": "https://example.com/acme/challenge/YTqpYUthlVfwBncUufE8IRA2TkzZkN4eYWWLMSRqcSs/216789599",
//       "token": "RRo2ZcXAEqxKvMH8RGcATjSK1KknLEUmauwfQ5i3gG8"
//     }
//   ],
//   "combinations": [[0], [1]]
// }
/// An authorization object.
///
/// Represents the authority's authorization for an account to represent an identifier. Created
/// by the authority; the client only reads and polls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub identifier: api::Identifier,

    pub status: AuthorizationStatus,

    /// Uses RFC 3339 format.
    pub expires: Option<String>,

    /// Challenges the client can fulfill to prove possession of the identifier.
    #[serde(default)]
    pub challenges: Vec<api::Challenge>,

    /// Sets of challenge indices, any one of which is sufficient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combinations: Option<Vec<Vec<usize>>>,
}

impl Authorization {
    /// Returns an `http-01` challenge, if one is present.
    pub fn http_challenge(&self) -> Option<&api::Challenge> {
        self.challenge("http-01")
    }

    /// Returns a `dns-01` challenge, if one is present.
    pub fn dns_challenge(&self) -> Option<&api::Challenge> {
        self.challenge("dns-01")
    }

    pub fn challenge(&self, _type: &str) -> Option<&api::Challenge> {
        self.challenges.iter().find(|c| c._type == _type)
    }
}

/// Payload requesting authorization for a domain.
#[derive(Debug, Serialize)]
pub(crate) struct NewAuthorization {
    resource: &'static str,
    identifier: api::Identifier,
}

impl NewAuthorization {
    pub(crate) fn dns(domain: &str) -> Self {
        Self {
            resource: "new-authz",
            identifier: api::Identifier::dns(domain),
        }
    }
}
