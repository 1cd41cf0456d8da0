#![forbid(unsafe_code)]

//! Protocol choices for a signature.

use firma_c14n::{parse_prefix_list, C14nMode};
use firma_core::algorithm;

/// Algorithms and canonicalization settings used when signing.
///
/// `Default` is the electronic-invoice profile: C14N 1.0, RSA-SHA256 and
/// SHA-256 digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureOptions {
    pub canonicalization: C14nMode,
    pub signature_method: String,
    pub digest_method: String,
    /// `PrefixList` for exclusive canonicalization.
    pub inclusive_prefixes: Vec<String>,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            canonicalization: C14nMode::Inclusive,
            signature_method: algorithm::RSA_SHA256.to_owned(),
            digest_method: algorithm::SHA256.to_owned(),
            inclusive_prefixes: parse_prefix_list(algorithm::DEFAULT_INCLUSIVE_PREFIXES),
        }
    }
}

impl SignatureOptions {
    pub fn with_canonicalization(mut self, mode: C14nMode) -> Self {
        self.canonicalization = mode;
        self
    }

    /// Select the canonicalization method by URI. Unknown URIs select
    /// exclusive canonicalization.
    pub fn with_canonicalization_uri(self, uri: &str) -> Self {
        self.with_canonicalization(C14nMode::from_uri(uri))
    }

    pub fn with_signature_method(mut self, uri: impl Into<String>) -> Self {
        self.signature_method = uri.into();
        self
    }

    pub fn with_digest_method(mut self, uri: impl Into<String>) -> Self {
        self.digest_method = uri.into();
        self
    }

    pub fn with_inclusive_prefixes(mut self, list: &str) -> Self {
        self.inclusive_prefixes = parse_prefix_list(list);
        self
    }

    /// Prefixes handed to the canonicalizer; empty unless exclusive.
    pub(crate) fn prefixes(&self) -> &[String] {
        if self.canonicalization.is_exclusive() {
            &self.inclusive_prefixes
        } else {
            &[]
        }
    }

    /// Whether the canonicalization method must be declared as an explicit
    /// Reference transform. C14N 1.0 is the implied default.
    pub(crate) fn needs_c14n_transform(&self) -> bool {
        self.canonicalization != C14nMode::Inclusive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile() {
        let o = SignatureOptions::default();
        assert_eq!(o.canonicalization.uri(), algorithm::C14N);
        assert_eq!(o.signature_method, algorithm::RSA_SHA256);
        assert_eq!(o.digest_method, algorithm::SHA256);
        assert_eq!(o.inclusive_prefixes, ["#default", "ds", "xs", "xsi", "xades", "xsd"]);
        assert!(o.prefixes().is_empty());
        assert!(!o.needs_c14n_transform());
    }

    #[test]
    fn unknown_method_selects_exclusive() {
        let o = SignatureOptions::default().with_canonicalization_uri("urn:whatever");
        assert_eq!(o.canonicalization, C14nMode::Exclusive);
        assert_eq!(o.prefixes().len(), 6);
        assert!(o.needs_c14n_transform());
    }
}
