#![forbid(unsafe_code)]

use std::path::PathBuf;

/// Errors produced by the firma signing engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not well-formed XML.
    #[error("malformed XML: {0}")]
    XmlParse(String),

    /// Well-formed XML the engine cannot work with.
    #[error("unsupported document layout: {0}")]
    XmlStructure(String),

    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    /// Digest or RSA primitive failure.
    #[error("cryptographic failure: {0}")]
    Crypto(String),

    /// Unusable private key material.
    #[error("private key: {0}")]
    Key(String),

    #[error("certificate: {0}")]
    Certificate(String),

    /// Corrupt bundle, unsupported encryption or wrong passphrase.
    #[error("PKCS#12 bundle: {0}")]
    Pkcs12(String),

    #[error("invalid base64: {0}")]
    Base64(String),

    /// Reading an input file failed.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
