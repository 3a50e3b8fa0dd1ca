use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::{
    api::Problem,
    error::{ProtocolError, Result},
};

/// Identifies this client on every outbound request.
pub(crate) const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client plus the immutable set of headers every request starts from.
///
/// Requests needing extra headers extend a clone of the base set, never the base set itself.
#[derive(Debug, Clone)]
pub(crate) struct Http {
    client: reqwest::Client,
    base_headers: HeaderMap,
}

impl Http {
    pub(crate) fn new(client: reqwest::Client) -> Self {
        let mut base_headers = HeaderMap::new();
        base_headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

        Http {
            client,
            base_headers,
        }
    }

    pub(crate) async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let req = self.client.get(url).headers(self.base_headers.clone());
        log::trace!("{req:?}");
        Ok(req.send().await?)
    }

    pub(crate) async fn head(&self, url: &str) -> Result<reqwest::Response> {
        let req = self.client.head(url).headers(self.base_headers.clone());
        log::trace!("{req:?}");
        Ok(req.send().await?)
    }

    pub(crate) async fn post(
        &self,
        url: &str,
        body: String,
        extra_headers: HeaderMap,
    ) -> Result<reqwest::Response> {
        let mut headers = self.base_headers.clone();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/jose+json"),
        );
        headers.extend(extra_headers);

        let req = self.client.post(url).headers(headers);
        log::trace!("{req:?} {body}");
        Ok(req.body(body).send().await?)
    }
}

impl Default for Http {
    fn default() -> Self {
        Http::new(reqwest::Client::new())
    }
}

/// Passes 2xx responses through; turns anything else into a rejection carrying the authority's
/// problem document.
pub(crate) async fn req_handle_error(res: reqwest::Response) -> Result<reqwest::Response> {
    // ok responses pass through
    if res.status().is_success() {
        return Ok(res);
    }

    let status = res.status();
    let is_problem = req_header(&res, header::CONTENT_TYPE.as_str())
        .is_some_and(|ct| ct.starts_with("application/problem+json"));

    let problem = if is_problem {
        // if we were sent a problem+json, deserialize it
        let body = req_safe_read_body(res).await;
        serde_json::from_str(&body).unwrap_or_else(|err| Problem {
            _type: "problemJsonFail".to_owned(),
            detail: Some(format!(
                "Failed to deserialize application/problem+json ({err}) body: {body}"
            )),
            status: Some(status.as_u16()),
            subproblems: None,
        })
    } else {
        // some other problem
        let body = req_safe_read_body(res).await;
        Problem {
            _type: "httpReqError".to_owned(),
            detail: Some(format!("{status} body: {body}")),
            status: Some(status.as_u16()),
            subproblems: None,
        }
    };

    log::debug!("Request failed: {problem}");

    Err(ProtocolError::Rejected {
        status: status.as_u16(),
        problem,
    }
    .into())
}

pub(crate) fn req_header(res: &reqwest::Response, name: &str) -> Option<String> {
    res.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Joins every occurrence of a header, for headers that may be split across lines.
pub(crate) fn req_header_joined(res: &reqwest::Response, name: &str) -> Option<String> {
    let values = res
        .headers()
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>();

    (!values.is_empty()).then(|| values.join(", "))
}

pub(crate) async fn req_safe_read_body(res: reqwest::Response) -> String {
    // the authority sometimes closes the connection abruptly even though the body was captured
    res.text().await.unwrap_or_default()
}
