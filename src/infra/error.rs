//! Process-level failures: startup wiring and the world outside a request.
//!
//! Request-scoped errors live in `application::error`; everything here is
//! something the operator has to act on.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("database unavailable: {message}")]
    Database { message: String },
    #[error("migration run failed: {message}")]
    Migration { message: String },
    #[error("telemetry setup failed: {message}")]
    Telemetry { message: String },
    #[error("invalid configuration: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind { addr, source }
    }

    pub fn database(source: impl std::fmt::Display) -> Self {
        Self::Database {
            message: source.to_string(),
        }
    }

    pub fn migration(source: impl std::fmt::Display) -> Self {
        Self::Migration {
            message: source.to_string(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_concern() {
        let err = InfraError::configuration("database url is not configured");
        assert_eq!(
            err.to_string(),
            "invalid configuration: database url is not configured"
        );

        let addr: SocketAddr = "127.0.0.1:3000".parse().unwrap();
        let err = InfraError::bind(
            addr,
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        );
        assert!(err.to_string().starts_with("could not bind 127.0.0.1:3000"));
    }
}
