#![forbid(unsafe_code)]

//! Digest (hash) algorithms selected from algorithm URIs.

use base64::Engine;
use digest::Digest;
use firma_core::algorithm;

/// Hash functions reachable from digest-method and signature-method URIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Resolve a digest-method or signature-method URI.
    ///
    /// The first case-insensitive `sha` in the URI is located and the
    /// digits right after it are read as a number: 256, 384 and 512 select
    /// the SHA-2 function of that size; anything else, including a URI with
    /// no `sha` at all, selects SHA-1. Never fails.
    pub fn resolve(uri: &str) -> Self {
        let lower = uri.to_ascii_lowercase();
        let Some(pos) = lower.find("sha") else {
            return Self::Sha1;
        };
        match leading_number(&uri[pos + 3..]) {
            Some(256) => Self::Sha256,
            Some(384) => Self::Sha384,
            Some(512) => Self::Sha512,
            _ => Self::Sha1,
        }
    }

    /// Digest-method URI of this hash.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Sha1 => algorithm::SHA1,
            Self::Sha256 => algorithm::SHA256,
            Self::Sha384 => algorithm::SHA384,
            Self::Sha512 => algorithm::SHA512,
        }
    }

    /// RSA PKCS#1 v1.5 signature-method URI using this hash.
    pub fn rsa_uri(&self) -> &'static str {
        match self {
            Self::Sha1 => algorithm::RSA_SHA1,
            Self::Sha256 => algorithm::RSA_SHA256,
            Self::Sha384 => algorithm::RSA_SHA384,
            Self::Sha512 => algorithm::RSA_SHA512,
        }
    }

    /// Output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Create a streaming hasher.
    pub fn hasher(&self) -> Box<dyn DigestAlgorithm> {
        match self {
            Self::Sha1 => Box::new(Sha1Digest::new()),
            Self::Sha256 => Box::new(Sha256Digest::new()),
            Self::Sha384 => Box::new(Sha384Digest::new()),
            Self::Sha512 => Box::new(Sha512Digest::new()),
        }
    }
}

/// Integer value of the leading digits of `s`, after optional whitespace
/// and a `+` sign.
fn leading_number(s: &str) -> Option<u64> {
    let s = s.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

/// Trait for streaming digest algorithms.
pub trait DigestAlgorithm: Send {
    /// Feed data into the hash.
    fn update(&mut self, data: &[u8]);
    /// Finalize and return the hash value.
    fn finalize(self: Box<Self>) -> Vec<u8>;
    /// Algorithm URI.
    fn uri(&self) -> &'static str;
}

/// Compute a digest in one shot.
pub fn digest(hash: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut hasher = hash.hasher();
    hasher.update(data);
    hasher.finalize()
}

/// Hash `data` with the algorithm named by `algorithm_uri` and return the
/// standard base64 encoding, without line breaks.
pub fn digest_base64(data: &[u8], algorithm_uri: &str) -> String {
    let hash = HashAlgorithm::resolve(algorithm_uri);
    base64::engine::general_purpose::STANDARD.encode(digest(hash, data))
}

// ── Concrete implementations ─────────────────────────────────────────

macro_rules! impl_digest {
    ($name:ident, $hasher:ty, $uri:expr) => {
        struct $name {
            inner: $hasher,
        }

        impl $name {
            fn new() -> Self {
                Self {
                    inner: <$hasher>::new(),
                }
            }
        }

        impl DigestAlgorithm for $name {
            fn update(&mut self, data: &[u8]) {
                Digest::update(&mut self.inner, data);
            }

            fn finalize(self: Box<Self>) -> Vec<u8> {
                Digest::finalize(self.inner).to_vec()
            }

            fn uri(&self) -> &'static str {
                $uri
            }
        }
    };
}

impl_digest!(Sha1Digest, sha1::Sha1, algorithm::SHA1);
impl_digest!(Sha256Digest, sha2::Sha256, algorithm::SHA256);
impl_digest!(Sha384Digest, sha2::Sha384, algorithm::SHA384);
impl_digest!(Sha512Digest, sha2::Sha512, algorithm::SHA512);
