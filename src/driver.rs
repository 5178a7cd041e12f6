//! Seams between connection bootstrap and the libraries it drives.
//!
//! [`GraphConnector`] builds a client from a fixed address. [`MetaConnector`]
//! opens a discovery driver which looks the service up in a metadata store
//! and hands back an authenticated client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::MetaDriverType;
use crate::error::ClientFailure;

/// TLS trust material for the graph service.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustStore {
    pub file: String,
    pub token: String,
}

impl fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustStore")
            .field("file", &self.file)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Everything a [`GraphConnector`] needs to build a client in direct mode.
#[derive(Clone)]
pub struct ClientConfig {
    /// Fully qualified address, scheme included.
    pub address: String,
    pub graph_space: Option<String>,
    pub graph: String,
    pub username: String,
    pub password: Option<String>,
    pub token: Option<String>,
    /// Bounds connecting and each read, not the request as a whole.
    pub timeout: Duration,
    /// Cap on requests in flight across all routes.
    pub max_connections: usize,
    /// Idle connections kept per host.
    pub max_connections_per_route: usize,
    pub trust_store: Option<TrustStore>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("address", &self.address)
            .field("graph_space", &self.graph_space)
            .field("graph", &self.graph)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .field("max_connections", &self.max_connections)
            .field("max_connections_per_route", &self.max_connections_per_route)
            .field("trust_store", &self.trust_store)
            .finish_non_exhaustive()
    }
}

/// Builds a client against a known address.
///
/// Construction may perform a handshake with the server, so any network
/// failure surfaces here.
#[async_trait]
pub trait GraphConnector: Send + Sync {
    type Client: Send;

    async fn build(&self, config: ClientConfig) -> Result<Self::Client, ClientFailure>;
}

/// Mutual TLS material for the discovery connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTls {
    pub ca: String,
    pub client_ca: Option<String>,
    pub client_key: Option<String>,
}

/// Parameters for [`MetaDriver::create_auth_client`].
#[derive(Clone, Copy)]
pub struct AuthClientRequest<'a> {
    pub cluster: &'a str,
    pub graph_space: Option<&'a str>,
    pub graph: &'a str,
    pub token: Option<&'a str>,
    pub username: &'a str,
    pub password: Option<&'a str>,
}

impl fmt::Debug for AuthClientRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClientRequest")
            .field("cluster", &self.cluster)
            .field("graph_space", &self.graph_space)
            .field("graph", &self.graph)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// A live connection to the metadata store.
#[async_trait]
pub trait MetaDriver: Send + Sync {
    type Client: Send;

    async fn create_auth_client(
        &self,
        request: AuthClientRequest<'_>,
    ) -> Result<Self::Client, ClientFailure>;

    /// Release the connection to the metadata store.
    fn close(&mut self);
}

/// Opens [`MetaDriver`]s.
#[async_trait]
pub trait MetaConnector: Send + Sync {
    type Driver: MetaDriver;

    async fn connect(
        &self,
        kind: MetaDriverType,
        endpoints: &[String],
        tls: Option<MetaTls>,
    ) -> Result<Self::Driver, ClientFailure>;
}

/// Owns a [`MetaDriver`] and closes it when dropped.
///
/// Dropping happens exactly once on every exit path, including panics and
/// cancelled futures.
pub struct DriverGuard<D: MetaDriver> {
    driver: D,
}

impl<D: MetaDriver> DriverGuard<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: MetaDriver> Drop for DriverGuard<D> {
    fn drop(&mut self) {
        self.driver.close();
        tracing::debug!("meta driver closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDriver {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MetaDriver for CountingDriver {
        type Client = ();

        async fn create_auth_client(
            &self,
            _request: AuthClientRequest<'_>,
        ) -> Result<(), ClientFailure> {
            Ok(())
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_closes_once_on_drop() {
        let closed = Arc::new(AtomicUsize::new(0));
        let guard = DriverGuard::new(CountingDriver {
            closed: closed.clone(),
        });
        assert_eq!(closed.load(Ordering::SeqCst), 0);
        drop(guard);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_closes_on_panic() {
        let closed = Arc::new(AtomicUsize::new(0));
        let c = closed.clone();
        let result: std::thread::Result<()> = std::panic::catch_unwind(move || {
            let _guard = DriverGuard::new(CountingDriver { closed: c });
            panic!("lookup blew up");
        });
        assert!(result.is_err());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_hides_credentials() {
        let config = ClientConfig {
            address: "https://db:8080".into(),
            graph_space: None,
            graph: "hugegraph".into(),
            username: "admin".into(),
            password: Some("pa55".into()),
            token: Some("t0ken".into()),
            timeout: Duration::from_secs(1),
            max_connections: 4,
            max_connections_per_route: 2,
            trust_store: Some(TrustStore {
                file: "/opt/loader/conf/hugegraph.truststore".into(),
                token: "hugegraph-secret".into(),
            }),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("pa55"));
        assert!(!rendered.contains("t0ken"));
        assert!(!rendered.contains("hugegraph-secret"));
    }
}
