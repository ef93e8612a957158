use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling the resource graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate resource id: {0}")]
    DuplicateNode(String),

    #[error("Unknown resource id: {0}")]
    UnknownNode(String),

    #[error("Dependency cycle detected through: {0}")]
    CycleDetected(String),

    #[error("Invalid CIDR block: {0}")]
    InvalidCidr(String),

    #[error("Subnet /{prefix} #{index} does not fit in {network}")]
    SubnetExhausted {
        network: String,
        prefix: u8,
        index: u32,
    },

    #[error("Invalid key pair name: {0}")]
    InvalidKeyPair(String),

    #[error("Invalid network layout: {0}")]
    InvalidNetwork(String),
}

/// Errors raised while reading stack settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
