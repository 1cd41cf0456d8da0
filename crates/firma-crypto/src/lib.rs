#![forbid(unsafe_code)]

//! Cryptographic primitives for the firma signing engine: digests selected
//! by algorithm URI and RSA PKCS#1 v1.5 signatures.

pub mod digest;
pub mod sign;

pub use digest::{digest, digest_base64, DigestAlgorithm, HashAlgorithm};
pub use sign::{sign_pkcs1v15, verify_pkcs1v15};
