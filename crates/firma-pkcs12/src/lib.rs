#![forbid(unsafe_code)]

//! PKCS#12 (.p12/.pfx) parser for the firma signing engine.
//!
//! Certificate bundles issued for electronic invoicing come in two
//! flavours: the legacy `pbeWithSHAAnd3-KeyTripleDES-CBC` format with a
//! SHA-1 MAC, and PBES2 (PBKDF2 + AES-CBC) with a SHA-256 MAC as written by
//! OpenSSL 3.x. Both are accepted.

mod kdf;
mod parse;

/// Contents extracted from a PKCS#12 file.
#[derive(Debug, Default)]
pub struct Pkcs12Contents {
    /// PKCS#8 DER-encoded private keys.
    pub private_keys: Vec<Vec<u8>>,
    /// DER-encoded X.509 certificates, in bag order.
    pub certificates: Vec<Vec<u8>>,
}

/// Parse a PKCS#12 file, verifying its MAC and decrypting with `password`.
pub fn parse_pkcs12(data: &[u8], password: &str) -> Result<Pkcs12Contents, firma_core::Error> {
    parse::parse_pfx(data, password)
}
