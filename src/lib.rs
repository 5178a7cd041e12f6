pub mod address;
pub mod config;
pub mod driver;
pub mod error;
pub mod http;
pub mod hugegraph;

pub use config::{LoadOptions, MetaDriverType, Protocol};
pub use driver::{
    AuthClientRequest, ClientConfig, GraphConnector, MetaConnector, MetaDriver, MetaTls,
    TrustStore,
};
pub use error::{ClientFailure, LoadError, classify};
pub use http::{HttpConnector, HugeClient};
pub use hugegraph::{connect, create, create_direct, create_from_meta};

/// Serialises tests that write or read process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
