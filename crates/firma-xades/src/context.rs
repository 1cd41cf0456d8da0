#![forbid(unsafe_code)]

//! Signing context: key material plus the per-operation identifier.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local};
use firma_core::Error;
use firma_keys::KeyBundle;

/// Source of per-operation identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Always hands out the same identifier. Useful for reproducible output.
#[derive(Debug, Clone)]
pub struct FixedId(pub String);

impl FixedId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl IdGenerator for FixedId {
    fn next_id(&self) -> String {
        self.0.clone()
    }
}

/// State for one signing operation.
///
/// The identifier is drawn once at construction and is used for every
/// cross-reference inside the signature. [`Signer::sign`] consumes the
/// context, so each operation needs a fresh one.
///
/// [`Signer::sign`]: crate::Signer::sign
#[derive(Debug)]
pub struct SigningContext {
    bundle: Arc<KeyBundle>,
    id: String,
    signing_time: DateTime<FixedOffset>,
}

impl SigningContext {
    /// Create a context over shared key material.
    pub fn new(bundle: Arc<KeyBundle>, ids: &dyn IdGenerator) -> Self {
        Self {
            bundle,
            id: ids.next_id(),
            signing_time: Local::now().fixed_offset(),
        }
    }

    /// Load key material from PKCS#12 bytes and create a context over it.
    pub fn from_pkcs12(data: &[u8], password: &str, ids: &dyn IdGenerator) -> Result<Self, Error> {
        let bundle = KeyBundle::from_pkcs12(data, password)?;
        Ok(Self::new(Arc::new(bundle), ids))
    }

    /// Override the signing time recorded in the qualifying properties.
    pub fn with_signing_time(mut self, time: DateTime<FixedOffset>) -> Self {
        self.signing_time = time;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bundle(&self) -> &KeyBundle {
        &self.bundle
    }

    pub fn signing_time(&self) -> DateTime<FixedOffset> {
        self.signing_time
    }

    /// `xmldsig-<id>`, the Signature element id.
    pub fn signature_id(&self) -> String {
        format!("xmldsig-{}", self.id)
    }

    /// Id of a signature part, `xmldsig-<id>-<suffix>`.
    pub fn part_id(&self, suffix: &str) -> String {
        format!("xmldsig-{}-{suffix}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        let ids = UuidGenerator;
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn part_ids_follow_layout() {
        let data = std::fs::read(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-data/keys/signer.p12"),
        )
        .unwrap();
        let ctx = SigningContext::from_pkcs12(&data, "8753", &FixedId::new("abc123")).unwrap();
        assert_eq!(ctx.signature_id(), "xmldsig-abc123");
        assert_eq!(ctx.part_id("keyinfo"), "xmldsig-abc123-keyinfo");
    }
}
