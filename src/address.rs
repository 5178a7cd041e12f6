//! Direct-mode address resolution. Pure computation, no I/O.

use std::path::Path;

use crate::config::{
    DEFAULT_TRUST_STORE_TOKEN, HOME_PATH_VAR, HTTP_PREFIX, HTTPS_PREFIX, LoadOptions, Protocol,
    TRUST_STORE_FILE,
};
use crate::driver::{ClientConfig, TrustStore};
use crate::error::LoadError;

/// `host:port` with a scheme, inferred from `protocol` unless `host`
/// already carries one.
pub fn resolve_address(host: &str, port: u16, protocol: Option<Protocol>) -> String {
    let address = format!("{host}:{port}");
    if host.starts_with(HTTP_PREFIX) || host.starts_with(HTTPS_PREFIX) {
        return address;
    }
    match protocol {
        Some(Protocol::Https) => format!("{HTTPS_PREFIX}{address}"),
        _ => format!("{HTTP_PREFIX}{address}"),
    }
}

/// The configured username, or the graph name when none is given.
pub fn effective_username(options: &LoadOptions) -> &str {
    options.username.as_deref().unwrap_or(&options.graph)
}

/// Trust material for HTTPS.
///
/// Without an explicit file the store is looked up under `home_path`,
/// which must then be set and non-empty.
pub fn resolve_trust_store(
    options: &LoadOptions,
    home_path: Option<&str>,
) -> Result<TrustStore, LoadError> {
    let file = match &options.trust_store_file {
        Some(file) => file.clone(),
        None => {
            let home = home_path.filter(|p| !p.is_empty()).ok_or_else(|| {
                LoadError::config(format!(
                    "The setting '{HOME_PATH_VAR}' can't be null or empty when enable https protocol"
                ))
            })?;
            Path::new(home).join(TRUST_STORE_FILE).to_string_lossy().into_owned()
        }
    };
    let token = options
        .trust_store_token
        .clone()
        .unwrap_or_else(|| DEFAULT_TRUST_STORE_TOKEN.to_string());
    Ok(TrustStore { file, token })
}

/// Build the direct-mode client configuration.
pub fn resolve_direct(
    options: &LoadOptions,
    home_path: Option<&str>,
) -> Result<ClientConfig, LoadError> {
    let use_https = options.protocol == Some(Protocol::Https);
    let trust_store = if use_https {
        Some(resolve_trust_store(options, home_path)?)
    } else {
        None
    };
    Ok(ClientConfig {
        address: resolve_address(&options.host, options.port, options.protocol),
        graph_space: options.graph_space.clone(),
        graph: options.graph.clone(),
        username: effective_username(options).to_string(),
        password: options.password.clone(),
        token: options.token.clone(),
        timeout: options.timeout,
        max_connections: options.max_connections,
        max_connections_per_route: options.max_connections_per_route,
        trust_store,
    })
}
