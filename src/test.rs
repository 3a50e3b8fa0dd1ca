use std::{
    net::TcpListener,
    sync::atomic::{AtomicUsize, Ordering},
};

use actix_web::{
    dev::ServerHandle,
    http::{header, Method, StatusCode},
    web, App, HttpRequest, HttpResponse, HttpServer,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::{
    error::Result,
    jws::{FlattenedJsonJws, Signer},
    util::{base64url, base64url_decode},
};

/// Bytes served as the issued certificate.
pub const CERT_DER: &[u8] = &[0x30, 0x82, 0x01, 0x0a, 0x02, 0x82, 0x01, 0x01];

const TOKEN: &str = "T";

struct Recorded {
    method: Method,
    path: String,
    body: web::Bytes,
}

struct MockState {
    url: String,
    requests: Mutex<Vec<Recorded>>,
    nonces: AtomicUsize,
    directory_failures: AtomicUsize,
    dropped_entries: Mutex<Vec<String>>,
}

impl MockState {
    fn next_nonce(&self) -> String {
        format!("nonce-{}", self.nonces.fetch_add(1, Ordering::SeqCst))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }
}

pub struct TestServer {
    pub dir_url: String,
    state: web::Data<MockState>,
    handle: ServerHandle,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        self.state.url(path)
    }

    /// Number of requests seen with `method` on `path`.
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|req| req.method.as_str() == method && req.path == path)
            .count()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().len()
    }

    /// Makes the next `n` directory fetches fail with a server error.
    pub fn fail_directory_fetches(&self, n: usize) {
        self.state.directory_failures.store(n, Ordering::SeqCst);
    }

    /// Removes a resource from the served directory.
    pub fn drop_directory_entry(&self, name: &str) {
        self.state.dropped_entries.lock().push(name.to_owned());
    }

    /// Decoded payloads of the signed requests posted to `path`, oldest first.
    pub fn signed_payloads(&self, path: &str) -> Vec<Value> {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|req| req.method == Method::POST && req.path == path)
            .filter_map(|req| envelope_part(&req.body, "payload"))
            .collect()
    }

    /// Nonces carried by every signed request, oldest first.
    pub fn signed_nonces(&self) -> Vec<String> {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|req| req.method == Method::POST)
            .filter_map(|req| envelope_part(&req.body, "protected"))
            .filter_map(|protected| protected["nonce"].as_str().map(str::to_owned))
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        drop(self.handle.stop(false));
    }
}

fn envelope_part(body: &[u8], part: &str) -> Option<Value> {
    let jws: Value = serde_json::from_slice(body).ok()?;
    let bytes = base64url_decode(jws[part].as_str()?).ok()?;

    if bytes.is_empty() {
        return Some(Value::Null);
    }

    serde_json::from_slice(&bytes).ok()
}

/// Signer producing recognizable but unverifiable envelopes.
pub struct FakeSigner {
    thumbprint: String,
}

impl FakeSigner {
    pub fn with_thumbprint(thumbprint: &str) -> Self {
        FakeSigner {
            thumbprint: thumbprint.to_owned(),
        }
    }
}

impl Default for FakeSigner {
    fn default() -> Self {
        Self::with_thumbprint("K")
    }
}

impl Signer for FakeSigner {
    fn sign(&self, nonce: &str, payload: &[u8]) -> Result<FlattenedJsonJws> {
        let protected = base64url(&serde_json::to_vec(&json!({ "nonce": nonce }))?);
        Ok(FlattenedJsonJws::new(
            protected,
            base64url(payload),
            "c2ln".to_owned(),
        ))
    }

    fn thumbprint(&self) -> Result<String> {
        Ok(self.thumbprint.clone())
    }
}

fn get_directory(state: &MockState) -> HttpResponse {
    if state
        .directory_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
    {
        return HttpResponse::InternalServerError()
            .insert_header(("Replay-Nonce", state.next_nonce()))
            .content_type("application/problem+json")
            .body(r#"{"type":"urn:acme:error:serverInternal","detail":"try again"}"#);
    }

    let mut body = json!({
        "new-reg": state.url("/acme/new-reg"),
        "new-authz": state.url("/acme/new-authz"),
        "new-cert": state.url("/acme/new-cert"),
        "revoke-cert": state.url("/acme/revoke-cert"),
        "key-change": state.url("/acme/key-change"),
        "meta": {
            "terms-of-service": state.url("/terms"),
            "website": "https://ca.test"
        }
    });

    if let Some(dir) = body.as_object_mut() {
        for name in state.dropped_entries.lock().iter() {
            dir.remove(name);
        }
    }

    HttpResponse::Ok()
        .insert_header(("Replay-Nonce", state.next_nonce()))
        .json(body)
}

fn post_new_reg(state: &MockState, payload: &Value) -> HttpResponse {
    let links = format!(
        r#"<{}>;rel="next", <{}>;rel="terms-of-service""#,
        state.url("/acme/new-authz"),
        state.url("/terms"),
    );

    HttpResponse::Created()
        .insert_header(("Replay-Nonce", state.next_nonce()))
        .insert_header((header::LOCATION, state.url("/acme/reg/1")))
        .insert_header((header::LINK, links))
        .json(json!({
            "id": 1,
            "contact": payload["contact"],
            "status": "valid",
            "initialIp": "127.0.0.1",
            "createdAt": "2016-03-01T12:00:00Z"
        }))
}

fn post_reg(state: &MockState, payload: &Value) -> HttpResponse {
    HttpResponse::Accepted()
        .insert_header(("Replay-Nonce", state.next_nonce()))
        .json(json!({
            "id": 1,
            "contact": payload["contact"],
            "agreement": payload["agreement"],
            "status": "valid"
        }))
}

fn authorization(state: &MockState, domain: &Value, status: &str) -> Value {
    json!({
        "identifier": { "type": "dns", "value": domain },
        "status": status,
        "expires": "2016-03-08T12:00:00Z",
        "challenges": [
            {
                "type": "http-01",
                "status": "pending",
                "uri": state.url("/acme/challenge/1/1"),
                "token": TOKEN
            },
            {
                "type": "dns-01",
                "status": "pending",
                "uri": state.url("/acme/challenge/1/2"),
                "token": "D"
            }
        ],
        "combinations": [[0], [1]]
    })
}

fn post_new_authz(state: &MockState, payload: &Value) -> HttpResponse {
    HttpResponse::Created()
        .insert_header(("Replay-Nonce", state.next_nonce()))
        .insert_header((header::LOCATION, state.url("/acme/authz/1")))
        .insert_header((
            header::LINK,
            format!(r#"<{}>;rel="next""#, state.url("/acme/new-cert")),
        ))
        .json(authorization(state, &payload["identifier"]["value"], "pending"))
}

fn post_challenge(state: &MockState, payload: &Value) -> HttpResponse {
    HttpResponse::Accepted()
        .insert_header(("Replay-Nonce", state.next_nonce()))
        .json(json!({
            "type": payload["type"],
            "status": "pending",
            "uri": state.url("/acme/challenge/1/1"),
            "token": TOKEN,
            "keyAuthorization": payload["keyAuthorization"]
        }))
}

fn get_authz(state: &MockState) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(("Replay-Nonce", state.next_nonce()))
        .json(authorization(state, &json!("example.org"), "valid"))
}

fn get_split_links(state: &MockState) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(("Replay-Nonce", state.next_nonce()))
        .insert_header((
            header::LINK,
            format!(r#"<{}>;rel="next""#, state.url("/acme/new-authz")),
        ))
        .append_header((
            header::LINK,
            format!(r#"<{}>;rel="terms-of-service""#, state.url("/terms")),
        ))
        .json(json!({}))
}

fn post_new_cert(state: &MockState) -> HttpResponse {
    HttpResponse::Created()
        .insert_header(("Replay-Nonce", state.next_nonce()))
        .insert_header((header::LOCATION, state.url("/acme/cert/1")))
        .insert_header((
            header::LINK,
            format!(r#"<{}>;rel="up""#, state.url("/acme/issuer-cert")),
        ))
        .content_type("application/pkix-cert")
        .body(CERT_DER)
}

fn post_reject(state: &MockState) -> HttpResponse {
    HttpResponse::BadRequest()
        .insert_header(("Replay-Nonce", state.next_nonce()))
        .content_type("application/problem+json")
        .body(
            r#"{"type":"urn:acme:error:malformed","detail":"Request payload did not parse as JSON","status":400}"#,
        )
}

async fn route_request(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<MockState>,
) -> HttpResponse {
    let method = req.method().clone();
    let path = req.path().to_owned();

    let payload = envelope_part(&body, "payload").unwrap_or(Value::Null);

    state.requests.lock().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        body,
    });

    match (method, path.as_str()) {
        (Method::GET, "/directory") => get_directory(&state),

        (Method::HEAD, "/no-nonce") => HttpResponse::Ok().finish(),
        (Method::HEAD, _) => HttpResponse::NoContent()
            .insert_header(("Replay-Nonce", state.next_nonce()))
            .finish(),

        (Method::POST, "/acme/new-reg") => post_new_reg(&state, &payload),
        (Method::POST, "/acme/reg/1") => post_reg(&state, &payload),
        (Method::POST, "/acme/new-authz") => post_new_authz(&state, &payload),
        (Method::POST, "/acme/challenge/1/1") => post_challenge(&state, &payload),
        (Method::GET, "/acme/authz/1") => get_authz(&state),
        (Method::GET, "/acme/authz/sparse") => HttpResponse::Ok()
            .insert_header(("Replay-Nonce", state.next_nonce()))
            .json(json!({ "status": "valid", "expires": "2016-03-08T12:00:00Z" })),
        (Method::GET, "/acme/split-links") => get_split_links(&state),
        (Method::POST, "/acme/new-cert") => post_new_cert(&state),

        (Method::POST, "/acme/revoke-cert") => HttpResponse::Ok()
            .insert_header(("Replay-Nonce", state.next_nonce()))
            .finish(),

        (Method::POST, "/acme/reject") => post_reject(&state),

        (_, _) => HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Replay-Nonce", state.next_nonce()))
            .finish(),
    }
}

pub fn with_directory_server() -> TestServer {
    let lst = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = lst.local_addr().unwrap().port();

    let url = format!("http://127.0.0.1:{port}");
    let dir_url = format!("{url}/directory");

    let state = web::Data::new(MockState {
        url,
        requests: Mutex::new(Vec::new()),
        nonces: AtomicUsize::new(0),
        directory_failures: AtomicUsize::new(0),
        dropped_entries: Mutex::new(Vec::new()),
    });

    let app_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .default_service(web::to(route_request))
    })
    .listen(lst)
    .unwrap()
    .workers(1)
    .run();

    let handle = server.handle();

    tokio::spawn(server);

    TestServer {
        dir_url,
        state,
        handle,
    }
}

#[tokio::test]
async fn test_make_directory() {
    let server = with_directory_server();
    let res = reqwest::get(&server.dir_url).await.unwrap();
    assert!(res.status().is_success());
    assert!(res.headers().contains_key("replay-nonce"));
}
