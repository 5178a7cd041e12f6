use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LoadError;

pub const HTTP_PREFIX: &str = "http://";
pub const HTTPS_PREFIX: &str = "https://";

/// Environment variable pointing at the loader installation directory.
pub const HOME_PATH_VAR: &str = "LOADER_HOME_PATH";
/// Trust store location relative to the loader home path.
pub const TRUST_STORE_FILE: &str = "conf/hugegraph.truststore";
/// Trust store token used when none is configured.
pub const DEFAULT_TRUST_STORE_TOKEN: &str = "hugegraph";

/// Scheme used to reach the graph service in direct mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl FromStr for Protocol {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(LoadError::config(format!(
                "unsupported protocol '{other}', expected 'http' or 'https'"
            ))),
        }
    }
}

/// Kind of metadata store used for service discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaDriverType {
    Etcd,
    Pd,
}

impl FromStr for MetaDriverType {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ETCD" => Ok(MetaDriverType::Etcd),
            "PD" => Ok(MetaDriverType::Pd),
            other => Err(LoadError::config(format!("unknown meta driver type '{other}'"))),
        }
    }
}

impl fmt::Display for MetaDriverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaDriverType::Etcd => f.write_str("ETCD"),
            MetaDriverType::Pd => f.write_str("PD"),
        }
    }
}

/// Options describing how to reach a HugeGraph server.
///
/// A non-empty `meta_url` selects discovery mode; otherwise `host` and
/// `port` are used directly.
#[derive(Clone)]
pub struct LoadOptions {
    pub host: String,
    pub port: u16,
    pub protocol: Option<Protocol>,
    pub graph_space: Option<String>,
    pub graph: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub timeout: Duration,
    pub max_connections: usize,
    pub max_connections_per_route: usize,
    pub trust_store_file: Option<String>,
    pub trust_store_token: Option<String>,
    pub meta_url: Vec<String>,
    /// Driver kind as given by the user, matched case-insensitively.
    pub meta_type: String,
    pub meta_ca: Option<String>,
    pub meta_client_ca: Option<String>,
    pub meta_client_key: Option<String>,
    pub cluster: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            host: "localhost".to_string(),
            port: 8080,
            protocol: None,
            graph_space: Some("DEFAULT".to_string()),
            graph: "hugegraph".to_string(),
            username: None,
            password: None,
            token: None,
            timeout: Duration::from_secs(60),
            max_connections: cpus * 4,
            max_connections_per_route: cpus * 2,
            trust_store_file: None,
            trust_store_token: None,
            meta_url: Vec::new(),
            meta_type: "etcd".to_string(),
            meta_ca: None,
            meta_client_ca: None,
            meta_client_key: None,
            cluster: "hg".to_string(),
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("LoadOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("graph_space", &self.graph_space)
            .field("graph", &self.graph)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("token", &redact(&self.token))
            .field("timeout", &self.timeout)
            .field("max_connections", &self.max_connections)
            .field("max_connections_per_route", &self.max_connections_per_route)
            .field("trust_store_file", &self.trust_store_file)
            .field("trust_store_token", &redact(&self.trust_store_token))
            .field("meta_url", &self.meta_url)
            .field("meta_type", &self.meta_type)
            .field("meta_ca", &self.meta_ca)
            .field("meta_client_ca", &self.meta_client_ca)
            .field("meta_client_key", &self.meta_client_key)
            .field("cluster", &self.cluster)
            .finish()
    }
}

impl LoadOptions {
    /// Load options from `HUGEGRAPH_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, LoadError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LoadOptions::from_env`] but reading from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut opts = Self::default();

        if let Some(host) = get("HUGEGRAPH_HOST") {
            opts.host = host;
        }
        if let Some(port) = get("HUGEGRAPH_PORT") {
            opts.port = parse_number("HUGEGRAPH_PORT", &port)?;
        }
        if let Some(protocol) = get("HUGEGRAPH_PROTOCOL") {
            opts.protocol = Some(protocol.parse()?);
        }
        if let Some(space) = get("HUGEGRAPH_GRAPHSPACE") {
            opts.graph_space = Some(space);
        }
        if let Some(graph) = get("HUGEGRAPH_GRAPH") {
            opts.graph = graph;
        }
        opts.username = get("HUGEGRAPH_USERNAME");
        opts.password = get("HUGEGRAPH_PASSWORD");
        opts.token = get("HUGEGRAPH_TOKEN");
        if let Some(secs) = get("HUGEGRAPH_TIMEOUT") {
            opts.timeout = Duration::from_secs(parse_number("HUGEGRAPH_TIMEOUT", &secs)?);
        }
        if let Some(n) = get("HUGEGRAPH_MAX_CONNECTIONS") {
            opts.max_connections = parse_number("HUGEGRAPH_MAX_CONNECTIONS", &n)?;
        }
        if let Some(n) = get("HUGEGRAPH_MAX_CONNECTIONS_PER_ROUTE") {
            opts.max_connections_per_route =
                parse_number("HUGEGRAPH_MAX_CONNECTIONS_PER_ROUTE", &n)?;
        }
        opts.trust_store_file = get("HUGEGRAPH_TRUST_STORE_FILE");
        opts.trust_store_token = get("HUGEGRAPH_TRUST_STORE_TOKEN");
        if let Some(urls) = get("HUGEGRAPH_META_URL") {
            opts.meta_url = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(kind) = get("HUGEGRAPH_META_TYPE") {
            // validated here so a typo fails before any connection attempt
            kind.parse::<MetaDriverType>()?;
            opts.meta_type = kind;
        }
        opts.meta_ca = get("HUGEGRAPH_META_CA");
        opts.meta_client_ca = get("HUGEGRAPH_META_CLIENT_CA");
        opts.meta_client_key = get("HUGEGRAPH_META_CLIENT_KEY");
        if let Some(cluster) = get("HUGEGRAPH_CLUSTER") {
            opts.cluster = cluster;
        }
        Ok(opts)
    }

    /// Whether discovery mode applies to these options.
    pub fn uses_discovery(&self) -> bool {
        !self.meta_url.is_empty()
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, LoadError> {
    value
        .trim()
        .parse()
        .map_err(|_| LoadError::config(format!("invalid value '{value}' for {key}")))
}
