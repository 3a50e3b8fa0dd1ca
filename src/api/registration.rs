use serde::{Deserialize, Serialize};

/// A registration (account) resource.
///
/// # Example JSON
///
/// ```json
/// {
///   "id": 7728515,
///   "key": { "kty": "EC", "crv": "P-256", "x": "...", "y": "..." },
///   "contact": ["mailto:cert-admin@example.com"],
///   "agreement": "https://example.com/acme/terms",
///   "initialIp": "90.171.37.12",
///   "createdAt": "2018-12-31T17:15:40.399104457Z",
///   "status": "valid"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub contact: Vec<String>,

    /// Terms of service the account holder has agreed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_ip: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Registration {
    pub fn is_status_valid(&self) -> bool {
        self.status.as_deref() == Some("valid")
    }

    pub fn has_agreement(&self) -> bool {
        self.agreement.is_some()
    }
}

/// Payload creating a registration.
#[derive(Debug, Serialize)]
pub(crate) struct NewRegistration<'a> {
    resource: &'static str,
    contact: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    agreement: Option<&'a str>,
}

impl<'a> NewRegistration<'a> {
    pub(crate) fn new(contact: &'a [String], agreement: Option<&'a str>) -> Self {
        Self {
            resource: "new-reg",
            contact,
            agreement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registration_omits_missing_agreement() {
        let contact = vec!["mailto:a@example.com".to_owned()];

        let json = serde_json::to_value(NewRegistration::new(&contact, None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "resource": "new-reg", "contact": ["mailto:a@example.com"] })
        );

        let json =
            serde_json::to_value(NewRegistration::new(&contact, Some("https://ca.test/tos")))
                .unwrap();
        assert_eq!(json["agreement"], "https://ca.test/tos");
    }
}
