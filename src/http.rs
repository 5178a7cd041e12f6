//! REST client for a HugeGraph server, built on `reqwest` + `rustls`.

use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::PemObject;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::driver::{ClientConfig, GraphConnector, TrustStore};
use crate::error::ClientFailure;

/// Oldest server REST API this client talks to.
pub const MIN_API_VERSION: &str = "0.38";

#[derive(Debug, Error)]
#[error("failed to load trust store {path}: {message}")]
pub struct TrustStoreError {
    pub path: String,
    pub message: String,
}

#[derive(Clone)]
enum Credentials {
    Token(String),
    Basic { username: String, password: String },
    Anonymous,
}

/// A connected HugeGraph client.
#[derive(Clone)]
pub struct HugeClient {
    http: Client,
    address: String,
    graph_space: Option<String>,
    graph: String,
    api_version: String,
    credentials: Credentials,
    permits: Arc<Semaphore>,
}

impl HugeClient {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn graph_space(&self) -> Option<&str> {
        self.graph_space.as_deref()
    }

    pub fn graph(&self) -> &str {
        &self.graph
    }

    /// REST API version reported by the server during the handshake.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Start an authenticated request to `path`, relative to the server root.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!(
            "{}/{}",
            self.address.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let builder = self.http.request(method, url);
        match &self.credentials {
            Credentials::Token(token) => builder.bearer_auth(token),
            Credentials::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
            Credentials::Anonymous => builder,
        }
    }

    /// Send a request built by [`HugeClient::request`].
    ///
    /// At most `max_connections` requests are in flight at once, counted
    /// until their response headers arrive.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, ClientFailure> {
        let _permit = self.permits.acquire().await.map_err(ClientFailure::other)?;
        request.send().await.map_err(transport_failure)
    }

    /// Requests that can start right now without waiting for a permit.
    pub fn available_connections(&self) -> usize {
        self.permits.available_permits()
    }

    /// Path of the target graph.
    pub fn graph_path(&self) -> String {
        match &self.graph_space {
            Some(space) => format!("graphspaces/{space}/graphs/{}", self.graph),
            None => format!("graphs/{}", self.graph),
        }
    }

    async fn check_version(&self) -> Result<String, ClientFailure> {
        let response = self.execute(self.request(Method::GET, "versions")).await?;
        let body: VersionsResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(ClientFailure::other)?;
        let api = body.versions.api;
        if !version_at_least(&api, MIN_API_VERSION) {
            return Err(ClientFailure::state(format!(
                "The version {api} of hugegraph-server api is lower than {MIN_API_VERSION} required by the client"
            )));
        }
        Ok(api)
    }

    async fn check_graph(&self) -> Result<(), ClientFailure> {
        let response = self
            .execute(self.request(Method::GET, &self.graph_path()))
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// [`GraphConnector`] producing [`HugeClient`]s.
///
/// Building performs a version handshake and one authenticated request
/// against the target graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

#[async_trait]
impl GraphConnector for HttpConnector {
    type Client = HugeClient;

    async fn build(&self, config: ClientConfig) -> Result<HugeClient, ClientFailure> {
        let has_host = Url::parse(&config.address)
            .ok()
            .and_then(|url| url.host_str().map(|h| !h.is_empty()))
            .unwrap_or(false);
        if !has_host {
            return Err(ClientFailure::transport(
                format!("invalid address {}", config.address),
                Some("Host name may not be null".to_string()),
            ));
        }

        // no whole-request deadline: it races the connect timer and turns
        // connect timeouts into plain request timeouts
        let mut builder = Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .pool_max_idle_per_host(config.max_connections_per_route);
        if let Some(store) = &config.trust_store {
            builder = builder.use_preconfigured_tls(tls_config(store)?);
        }
        let http = builder.build().map_err(transport_failure)?;

        let credentials = match (config.token, config.password) {
            (Some(token), _) => Credentials::Token(token),
            (None, Some(password)) => Credentials::Basic {
                username: config.username,
                password,
            },
            (None, None) => Credentials::Anonymous,
        };
        let mut client = HugeClient {
            http,
            address: config.address,
            graph_space: config.graph_space,
            graph: config.graph,
            api_version: String::new(),
            credentials,
            permits: Arc::new(Semaphore::new(config.max_connections.max(1))),
        };
        client.api_version = client.check_version().await?;
        client.check_graph().await?;
        Ok(client)
    }
}

#[derive(Deserialize)]
struct VersionsResponse {
    versions: Versions,
}

#[derive(Deserialize)]
struct Versions {
    api: String,
}

#[derive(Deserialize)]
struct ServerErrorBody {
    message: Option<String>,
}

async fn ensure_success(response: Response) -> Result<Response, ClientFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientFailure::server(
        status.as_u16(),
        server_message(&body, status.as_str()),
    ))
}

/// The `message` field of a server error body, falling back to the raw
/// body, then to the status.
fn server_message(body: &str, status: &str) -> String {
    let parsed = serde_json::from_str::<ServerErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty());
    match parsed {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => format!("status {status}"),
    }
}

fn transport_failure(err: reqwest::Error) -> ClientFailure {
    let chain = source_chain(&err);
    let cause = if err.is_connect() && err.is_timeout() {
        Some(format!("connect timed out: {chain}"))
    } else if chain.contains("dns error") {
        Some(format!("UnknownHostException: {chain}"))
    } else if chain.is_empty() {
        None
    } else {
        Some(chain)
    };
    ClientFailure::transport(err.to_string(), cause)
}

fn source_chain(err: &dyn StdError) -> String {
    let mut parts = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

/// Numeric comparison of dotted version strings; missing or non-numeric
/// segments count as zero.
fn version_at_least(version: &str, minimum: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.trim().parse().unwrap_or(0))
            .collect()
    };
    let (mut have, mut want) = (parse(version), parse(minimum));
    let len = have.len().max(want.len());
    have.resize(len, 0);
    want.resize(len, 0);
    have >= want
}

/// The trust store is a PEM bundle; its certificates become the only roots.
fn tls_config(store: &TrustStore) -> Result<rustls::ClientConfig, ClientFailure> {
    let fail = |message: String| {
        ClientFailure::other(TrustStoreError {
            path: store.file.clone(),
            message,
        })
    };
    let certs = CertificateDer::pem_file_iter(&store.file)
        .map_err(|e| fail(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| fail(e.to_string()))?;
    let mut roots = RootCertStore::empty();
    let (added, _ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(fail("no usable certificates".to_string()));
    }
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(ClientFailure::other)?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(address: &str) -> ClientConfig {
        ClientConfig {
            address: address.to_string(),
            graph_space: None,
            graph: "hugegraph".into(),
            username: "hugegraph".into(),
            password: None,
            token: None,
            timeout: Duration::from_secs(1),
            max_connections: 4,
            max_connections_per_route: 2,
            trust_store: None,
        }
    }

    #[test]
    fn compares_versions_numerically() {
        assert!(version_at_least("0.69.0.0", MIN_API_VERSION));
        assert!(version_at_least("0.38", MIN_API_VERSION));
        assert!(version_at_least("1.0", "0.38"));
        assert!(!version_at_least("0.9", "0.38"));
        assert!(!version_at_least("0.37.9", "0.38"));
    }

    #[test]
    fn server_message_prefers_json_field() {
        let body = r#"{"exception":"class NotAuthorizedException","message":"Authentication failed","cause":""}"#;
        assert_eq!(server_message(body, "401"), "Authentication failed");
        assert_eq!(server_message("plain text", "500"), "plain text");
        assert_eq!(server_message("", "503"), "status 503");
    }

    #[tokio::test]
    async fn empty_host_is_reported_as_null_host() {
        let err = HttpConnector.build(config("http://:8080")).await.err().unwrap();
        match err {
            ClientFailure::Transport { cause, .. } => {
                assert_eq!(cause.as_deref(), Some("Host name may not be null"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_trust_store_file_fails_before_connecting() {
        let mut cfg = config("https://127.0.0.1:1");
        cfg.trust_store = Some(TrustStore {
            file: "/nonexistent/conf/hugegraph.truststore".into(),
            token: "hugegraph".into(),
        });
        let err = HttpConnector.build(cfg).await.err().unwrap();
        assert!(matches!(err, ClientFailure::Other(_)));
        assert!(err.to_string().contains("/nonexistent/conf/hugegraph.truststore"));
    }
}
