#![forbid(unsafe_code)]

//! The signing certificate and its RSA private key.

use base64::Engine;
use chrono::{DateTime, Utc};
use der::{DecodePem, Encode};
use firma_core::Error;
use firma_crypto::HashAlgorithm;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use x509_cert::Certificate;

use crate::x509;

/// A signing certificate paired with its RSA private key.
///
/// Immutable once loaded, so a single bundle can be shared across threads
/// behind an `Arc` while several documents are signed in parallel.
pub struct KeyBundle {
    certificate: Certificate,
    certificate_der: Vec<u8>,
    private_key: rsa::RsaPrivateKey,
    public_key: rsa::RsaPublicKey,
    /// Every certificate found alongside the key, signer included.
    chain: Vec<Vec<u8>>,
}

impl KeyBundle {
    /// Load a bundle from PKCS#12 bytes.
    ///
    /// The signing certificate is the one whose public key matches a
    /// private key in the bundle; the remaining certificates are kept as
    /// the chain.
    #[tracing::instrument(level = "debug", skip_all, fields(len = data.len()))]
    pub fn from_pkcs12(data: &[u8], password: &str) -> Result<Self, Error> {
        let contents = firma_pkcs12::parse_pkcs12(data, password)?;
        if contents.private_keys.is_empty() {
            return Err(Error::Key("PKCS#12 bundle contains no private key".into()));
        }

        for key_der in &contents.private_keys {
            let private_key = rsa::RsaPrivateKey::from_pkcs8_der(key_der)
                .map_err(|e| Error::Key(format!("private key is not a PKCS#8 RSA key: {e}")))?;
            let public_key = private_key.to_public_key();

            for cert_der in &contents.certificates {
                let certificate = x509::parse_certificate(cert_der)?;
                if x509::rsa_public_key(&certificate)?.as_ref() == Some(&public_key) {
                    tracing::debug!(
                        subject = %x509::render_name(&certificate.tbs_certificate.subject),
                        "matched signing certificate"
                    );
                    return Ok(Self {
                        certificate,
                        certificate_der: cert_der.clone(),
                        private_key,
                        public_key,
                        chain: contents.certificates.clone(),
                    });
                }
            }
        }

        Err(Error::Certificate(
            "PKCS#12 bundle has no certificate matching its private key".into(),
        ))
    }

    /// Build a bundle from a DER certificate and its private key.
    pub fn from_parts(certificate_der: Vec<u8>, private_key: rsa::RsaPrivateKey) -> Result<Self, Error> {
        let certificate = x509::parse_certificate(&certificate_der)?;
        let public_key = private_key.to_public_key();
        if x509::rsa_public_key(&certificate)?.as_ref() != Some(&public_key) {
            return Err(Error::Certificate(
                "certificate does not match the private key".into(),
            ));
        }
        Ok(Self {
            certificate,
            chain: vec![certificate_der.clone()],
            certificate_der,
            private_key,
            public_key,
        })
    }

    /// Build a bundle from a PEM certificate and a PEM PKCS#8 private key.
    pub fn from_pem(certificate_pem: &str, private_key_pem: &str) -> Result<Self, Error> {
        let certificate = Certificate::from_pem(certificate_pem)
            .map_err(|e| Error::Certificate(format!("failed to parse PEM certificate: {e}")))?;
        let certificate_der = certificate
            .to_der()
            .map_err(|e| Error::Certificate(format!("failed to encode certificate: {e}")))?;
        let private_key = rsa::RsaPrivateKey::from_pkcs8_pem(private_key_pem)
            .map_err(|e| Error::Key(format!("failed to parse PEM private key: {e}")))?;
        Self::from_parts(certificate_der, private_key)
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// DER encoding of the signing certificate.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The certificate as single-line base64: the PEM body with armor and
    /// line breaks removed.
    pub fn certificate_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.certificate_der)
    }

    /// RSA modulus as unsigned big-endian bytes, base64-encoded.
    pub fn modulus_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.public_key.n().to_bytes_be())
    }

    /// RSA public exponent as unsigned big-endian bytes, base64-encoded.
    pub fn exponent_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.public_key.e().to_bytes_be())
    }

    /// Issuer distinguished name, most specific attribute first.
    pub fn issuer_name(&self) -> String {
        x509::render_name(&self.certificate.tbs_certificate.issuer)
    }

    /// Subject distinguished name, most specific attribute first.
    pub fn subject_name(&self) -> String {
        x509::render_name(&self.certificate.tbs_certificate.subject)
    }

    /// Certificate serial number in decimal.
    pub fn serial_number(&self) -> String {
        x509::integer_to_decimal(self.certificate.tbs_certificate.serial_number.as_bytes())
    }

    /// Validity window of the signing certificate.
    pub fn validity(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let validity = &self.certificate.tbs_certificate.validity;
        let to_utc = |t: &x509_cert::time::Time| {
            let secs = i64::try_from(t.to_unix_duration().as_secs()).ok()?;
            DateTime::from_timestamp(secs, 0)
        };
        Some((to_utc(&validity.not_before)?, to_utc(&validity.not_after)?))
    }

    /// All certificates shipped with the key, DER-encoded.
    pub fn chain(&self) -> &[Vec<u8>] {
        &self.chain
    }

    pub fn public_key(&self) -> &rsa::RsaPublicKey {
        &self.public_key
    }

    /// RSA PKCS#1 v1.5 signature over `data`.
    pub fn sign(&self, hash: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, Error> {
        firma_crypto::sign_pkcs1v15(&self.private_key, hash, data)
    }
}

impl std::fmt::Debug for KeyBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBundle")
            .field("subject", &self.subject_name())
            .field("issuer", &self.issuer_name())
            .field("serial", &self.serial_number())
            .field("chain", &self.chain.len())
            .finish_non_exhaustive()
    }
}
