use serde::{Deserialize, Serialize};

use crate::api;

/// The status of an [`api::Challenge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    #[default]
    Pending,
    Processing,
    Valid,
    Invalid,
}

/// A challenge object.
///
/// Represents the authority's offer to validate possession of an identifier in a specific way.
///
/// # Example JSON
///
/// ```json
/// {
///   "type": "http-01",
///   "status": "pending",
///   "uri": "https://acme-staging.api.letsencrypt.org/acme/challenge/YTqpYUthlVfwBncUufE8IRA2TkzZkN4eYWWLMSRqcSs/216789597",
///   "token": "MUi-gqeOJdRkSb_YR2eaMxQBqf6al8dgt_dOttSWb0w"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    #[serde(rename = "type")]
    pub _type: String,

    /// URI to which a response is posted.
    #[serde(default)]
    pub uri: String,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub status: ChallengeStatus,

    /// Echoed back by the authority once a response was posted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_authorization: Option<String>,

    /// Uses RFC 3339 format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<api::Problem>,
}

impl Challenge {
    /// Returns true if this challenge still needs a response.
    pub fn need_validate(&self) -> bool {
        matches!(self.status, ChallengeStatus::Pending)
    }
}

/// Payload answering a challenge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChallengeResponse<'a> {
    resource: &'static str,
    #[serde(rename = "type")]
    _type: &'a str,
    key_authorization: String,
}

impl<'a> ChallengeResponse<'a> {
    pub(crate) fn new(_type: &'a str, key_authorization: String) -> Self {
        Self {
            resource: "challenge",
            _type,
            key_authorization,
        }
    }
}
