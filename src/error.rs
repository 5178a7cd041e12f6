//! Failures raised while building a client and their classification into
//! user-facing errors.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

pub const STATUS_UNAUTHORIZED: u16 = 401;

/// A failure reported by the wrapped client library or discovery driver.
#[derive(Debug, Clone, Error)]
pub enum ClientFailure {
    /// Client or server in an unexpected state, e.g. incompatible versions.
    #[error("{message}")]
    State { message: String },

    /// The server answered with an error status.
    #[error("server returned status {status}: {message}")]
    Server { status: u16, message: String },

    /// The request never completed; `cause` describes the lower-level reason.
    #[error("{message}")]
    Transport {
        message: String,
        cause: Option<String>,
    },

    /// Anything else.
    #[error("{0}")]
    Other(Arc<dyn StdError + Send + Sync>),
}

impl ClientFailure {
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>, cause: Option<String>) -> Self {
        Self::Transport {
            message: message.into(),
            cause,
        }
    }

    pub fn other<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Other(Arc::new(err))
    }
}

/// Errors produced while connecting to HugeGraph.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Invalid or missing local configuration; raised before any network I/O.
    #[error("{0}")]
    Config(String),

    #[error("The version of hugegraph-client and hugegraph-server don't match")]
    VersionMismatch(#[source] ClientFailure),

    #[error("Incorrect username or password")]
    AuthenticationFailure(#[source] ClientFailure),

    #[error("The service {host}:{port} is unavailable")]
    ServiceUnavailable {
        host: String,
        port: u16,
        #[source]
        source: ClientFailure,
    },

    #[error("The host {host} is unknown")]
    UnknownHost {
        host: String,
        #[source]
        source: ClientFailure,
    },

    #[error(
        "Connect service {host}:{port} timeout, please check service is available and network is unobstructed"
    )]
    ConnectTimeout {
        host: String,
        port: u16,
        #[source]
        source: ClientFailure,
    },

    /// A failure none of the rules recognise, passed through untouched.
    #[error(transparent)]
    Unclassified(ClientFailure),
}

impl LoadError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for the network-level categories a caller may choose to retry.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable { .. } | Self::UnknownHost { .. } | Self::ConnectTimeout { .. }
        )
    }
}

/// Translate a client construction failure into a [`LoadError`].
///
/// `host` and `port` are the configured target and only appear in the
/// messages of network failures.
pub fn classify(failure: ClientFailure, host: &str, port: u16) -> LoadError {
    match &failure {
        ClientFailure::State { message } if message.starts_with("The version") => {
            LoadError::VersionMismatch(failure)
        }
        ClientFailure::Server { status, message }
            if *status == STATUS_UNAUTHORIZED || message.starts_with("Authentication") =>
        {
            LoadError::AuthenticationFailure(failure)
        }
        ClientFailure::Transport {
            cause: Some(cause), ..
        } if !cause.is_empty() => {
            if cause.contains("Connection refused") {
                LoadError::ServiceUnavailable {
                    host: host.to_string(),
                    port,
                    source: failure,
                }
            } else if cause.contains("UnknownHostException")
                || cause.contains("Host name may not be null")
            {
                LoadError::UnknownHost {
                    host: host.to_string(),
                    source: failure,
                }
            } else if cause.contains("connect timed out") {
                LoadError::ConnectTimeout {
                    host: host.to_string(),
                    port,
                    source: failure,
                }
            } else {
                LoadError::Unclassified(failure)
            }
        }
        _ => LoadError::Unclassified(failure),
    }
}
