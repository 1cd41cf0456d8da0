#![forbid(unsafe_code)]

//! RSA PKCS#1 v1.5 signatures.

use crate::digest::HashAlgorithm;
use firma_core::Error;
use rsa::signature::{SignatureEncoding, Signer, Verifier};

/// Sign `data` with `key`, hashing with `hash`.
///
/// Returns the raw signature bytes (modulus length).
pub fn sign_pkcs1v15(
    key: &rsa::RsaPrivateKey,
    hash: HashAlgorithm,
    data: &[u8],
) -> Result<Vec<u8>, Error> {
    macro_rules! do_sign {
        ($hasher:ty) => {{
            let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(key.clone());
            sk.try_sign(data)
                .map(|sig| sig.to_vec())
                .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))
        }};
    }
    match hash {
        HashAlgorithm::Sha1 => do_sign!(sha1::Sha1),
        HashAlgorithm::Sha256 => do_sign!(sha2::Sha256),
        HashAlgorithm::Sha384 => do_sign!(sha2::Sha384),
        HashAlgorithm::Sha512 => do_sign!(sha2::Sha512),
    }
}

/// Verify a PKCS#1 v1.5 signature over `data`.
///
/// A well-formed signature that does not match yields `Ok(false)`.
pub fn verify_pkcs1v15(
    key: &rsa::RsaPublicKey,
    hash: HashAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> Result<bool, Error> {
    let sig = rsa::pkcs1v15::Signature::try_from(signature)
        .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
    macro_rules! do_verify {
        ($hasher:ty) => {{
            let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(key.clone());
            Ok(vk.verify(data, &sig).is_ok())
        }};
    }
    match hash {
        HashAlgorithm::Sha1 => do_verify!(sha1::Sha1),
        HashAlgorithm::Sha256 => do_verify!(sha2::Sha256),
        HashAlgorithm::Sha384 => do_verify!(sha2::Sha384),
        HashAlgorithm::Sha512 => do_verify!(sha2::Sha512),
    }
}
