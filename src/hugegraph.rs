use std::env;

use tracing::{debug, info, warn};

use crate::address::{effective_username, resolve_direct};
use crate::config::{HOME_PATH_VAR, LoadOptions, MetaDriverType};
use crate::driver::{
    AuthClientRequest, DriverGuard, GraphConnector, MetaConnector, MetaDriver, MetaTls,
};
use crate::error::{LoadError, classify};
use crate::http::{HttpConnector, HugeClient};

/// Create a [`HugeClient`] using the provided options.
///
/// Only direct mode is available here; discovery mode needs a
/// [`MetaConnector`], see [`create`].
pub async fn connect(options: &LoadOptions) -> Result<HugeClient, LoadError> {
    if options.uses_discovery() {
        return Err(LoadError::config(
            "meta_url is set but no meta driver is registered, use create() with a MetaConnector",
        ));
    }
    let home_path = env::var(HOME_PATH_VAR).ok();
    create_direct(options, &HttpConnector, home_path.as_deref()).await
}

/// Build a client, picking discovery mode when `meta_url` is non-empty and
/// direct mode otherwise.
pub async fn create<C, M>(
    options: &LoadOptions,
    connector: &C,
    meta: &M,
) -> Result<C::Client, LoadError>
where
    C: GraphConnector,
    M: MetaConnector,
    M::Driver: MetaDriver<Client = C::Client>,
{
    if options.uses_discovery() {
        create_from_meta(options, meta).await
    } else {
        let home_path = env::var(HOME_PATH_VAR).ok();
        create_direct(options, connector, home_path.as_deref()).await
    }
}

/// Direct mode: connect to `host:port`.
///
/// `home_path` locates the default trust store when HTTPS is used without
/// an explicit one.
pub async fn create_direct<C: GraphConnector>(
    options: &LoadOptions,
    connector: &C,
    home_path: Option<&str>,
) -> Result<C::Client, LoadError> {
    let config = resolve_direct(options, home_path)?;
    debug!(address = %config.address, graph = %config.graph, "connecting directly");
    let address = config.address.clone();
    match connector.build(config).await {
        Ok(client) => {
            info!(%address, "connected to hugegraph");
            Ok(client)
        }
        Err(failure) => Err(report(classify(failure, &options.host, options.port))),
    }
}

/// Discovery mode: look the service up through the metadata store.
///
/// The driver is closed before returning, whatever the outcome.
pub async fn create_from_meta<M: MetaConnector>(
    options: &LoadOptions,
    meta: &M,
) -> Result<<M::Driver as MetaDriver>::Client, LoadError> {
    let requested: MetaDriverType = options.meta_type.parse()?;
    let (kind, tls) = match &options.meta_ca {
        Some(ca) if !ca.is_empty() => (
            requested,
            Some(MetaTls {
                ca: ca.clone(),
                client_ca: options.meta_client_ca.clone(),
                client_key: options.meta_client_key.clone(),
            }),
        ),
        _ => {
            if requested != MetaDriverType::Etcd {
                warn!(
                    requested = %requested,
                    "no meta CA configured, falling back to ETCD meta driver"
                );
            }
            (MetaDriverType::Etcd, None)
        }
    };
    debug!(%kind, endpoints = ?options.meta_url, cluster = %options.cluster, "connecting through meta driver");

    let driver = meta
        .connect(kind, &options.meta_url, tls)
        .await
        .map_err(|failure| report(classify(failure, &options.host, options.port)))?;
    let guard = DriverGuard::new(driver);

    let request = AuthClientRequest {
        cluster: &options.cluster,
        graph_space: options.graph_space.as_deref(),
        graph: &options.graph,
        token: options.token.as_deref(),
        username: effective_username(options),
        password: options.password.as_deref(),
    };
    let result = guard.driver().create_auth_client(request).await;
    drop(guard);

    match result {
        Ok(client) => {
            info!(cluster = %options.cluster, graph = %options.graph, "connected to hugegraph through meta driver");
            Ok(client)
        }
        Err(failure) => Err(report(classify(failure, &options.host, options.port))),
    }
}

fn report(err: LoadError) -> LoadError {
    warn!(error = %err, "failed to create hugegraph client");
    err
}
