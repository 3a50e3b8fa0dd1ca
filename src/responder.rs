//! Domain-control responder for `http-01` challenges.
//!
//! The authority proves control of a domain by fetching
//! `http://<domain>/.well-known/acme-challenge/<token>` and comparing the body with the key
//! authorization for that token.

use std::{collections::HashMap, io, net::TcpListener, sync::Arc};

use actix_web::{dev::ServerHandle, http::header::ContentType, web, App, HttpRequest, HttpResponse, HttpServer};
use parking_lot::RwLock;
use tokio::task::JoinHandle;

/// Path prefix the authority fetches proofs from.
pub const CHALLENGE_PATH: &str = "/.well-known/acme-challenge";

/// Key authorizations to serve, keyed by host and token.
#[derive(Debug, Clone, Default)]
pub struct ChallengeResponder {
    proofs: Arc<RwLock<HashMap<(String, String), String>>>,
}

impl ChallengeResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `key_authorization` for `token` on requests addressed to `host`.
    pub fn insert(&self, host: &str, token: &str, key_authorization: impl Into<String>) {
        self.proofs.write().insert(
            (normalize_host(host), token.to_owned()),
            key_authorization.into(),
        );
    }

    pub fn remove(&self, host: &str, token: &str) -> Option<String> {
        self.proofs
            .write()
            .remove(&(normalize_host(host), token.to_owned()))
    }

    /// Key authorization registered for `token` on `host`. The host may carry a port.
    pub fn lookup(&self, host: &str, token: &str) -> Option<String> {
        self.proofs
            .read()
            .get(&(normalize_host(host), token.to_owned()))
            .cloned()
    }

    /// Starts serving on all interfaces at `port`.
    pub fn bind(&self, port: u16) -> io::Result<ResponderHandle> {
        self.serve(TcpListener::bind(("0.0.0.0", port))?)
    }

    /// Starts serving on an already bound listener. Must be called within a tokio runtime.
    pub fn serve(&self, listener: TcpListener) -> io::Result<ResponderHandle> {
        let addr = listener.local_addr()?;
        let responder = web::Data::new(self.clone());

        let srv = HttpServer::new(move || {
            App::new().app_data(responder.clone()).service(
                web::resource(format!("{CHALLENGE_PATH}/{{token}}"))
                    .route(web::get().to(serve_proof)),
            )
        })
        .listen(listener)?
        .workers(1)
        .shutdown_timeout(0)
        .run();

        log::info!("Challenge responder listening on {addr}");

        let handle = srv.handle();
        let task = tokio::spawn(srv);

        Ok(ResponderHandle {
            addr,
            handle,
            task,
        })
    }
}

/// A running responder.
pub struct ResponderHandle {
    addr: std::net::SocketAddr,
    handle: ServerHandle,
    task: JoinHandle<io::Result<()>>,
}

impl ResponderHandle {
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.addr
    }

    /// Stops the server and waits for it to shut down.
    pub async fn stop(self) -> io::Result<()> {
        self.handle.stop(true).await;
        self.task.await.map_err(io::Error::other)?
    }
}

async fn serve_proof(
    req: HttpRequest,
    token: web::Path<String>,
    responder: web::Data<ChallengeResponder>,
) -> HttpResponse {
    let host = req.connection_info().host().to_owned();

    match responder.lookup(&host, &token) {
        Some(key_authorization) => {
            log::info!("Serving challenge proof for {host}");
            HttpResponse::Ok()
                .content_type(ContentType::plaintext())
                .body(key_authorization)
        }
        None => {
            log::debug!("No challenge proof for {host} token {token}");
            HttpResponse::NotFound().finish()
        }
    }
}

/// Lowercases `host` and strips any port.
fn normalize_host(host: &str) -> String {
    let host = match host.rsplit_once(':') {
        // `[::1]:80` or `example.org:80`, but not a bare IPv6 address
        Some((name, port))
            if !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (!name.contains(':') || name.ends_with(']')) =>
        {
            name
        }
        _ => host,
    };

    host.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Example.ORG"), "example.org");
        assert_eq!(normalize_host("example.org:8080"), "example.org");
        assert_eq!(normalize_host("[::1]:80"), "[::1]");
        assert_eq!(normalize_host("::1"), "::1");
    }

    #[test]
    fn test_lookup() {
        let responder = ChallengeResponder::new();
        responder.insert("Example.org", "T", "T.K");

        assert_eq!(responder.lookup("example.org:80", "T").as_deref(), Some("T.K"));
        assert_eq!(responder.lookup("example.net", "T"), None);
        assert_eq!(responder.lookup("example.org", "U"), None);

        assert_eq!(responder.remove("EXAMPLE.org", "T").as_deref(), Some("T.K"));
        assert_eq!(responder.lookup("example.org", "T"), None);
    }

    #[tokio::test]
    async fn test_serves_proof() {
        let responder = ChallengeResponder::new();
        responder.insert("127.0.0.1", "T", "T.K");
        responder.insert("example.org", "E", "E.K");

        let handle = responder
            .serve(TcpListener::bind("127.0.0.1:0").unwrap())
            .unwrap();
        let base = format!("http://{}{CHALLENGE_PATH}", handle.local_addr());

        let res = reqwest::get(format!("{base}/T")).await.unwrap();
        assert_eq!(res.status(), 200);
        assert!(res.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(res.text().await.unwrap(), "T.K");

        let res = reqwest::get(format!("{base}/missing")).await.unwrap();
        assert_eq!(res.status(), 404);

        // registered, but for another host
        let res = reqwest::get(format!("{base}/E")).await.unwrap();
        assert_eq!(res.status(), 404);

        let res = reqwest::Client::new()
            .get(format!("{base}/E"))
            .header("host", "Example.ORG:8080")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), "E.K");

        handle.stop().await.unwrap();
    }
}
