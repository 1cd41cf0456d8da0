#![forbid(unsafe_code)]

//! Certificate and key material for the firma signing engine.
//!
//! A [`KeyBundle`] pairs an X.509 signing certificate with its RSA private
//! key, loaded from a PKCS#12 bundle or from separate parts, and exposes
//! the values a XAdES signature embeds: certificate bytes, RSA key
//! parameters, issuer name and serial number.

pub mod bundle;
pub mod x509;

pub use bundle::KeyBundle;
