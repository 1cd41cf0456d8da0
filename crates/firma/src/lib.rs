#![forbid(unsafe_code)]

//! firma: XAdES-BES signatures for Costa Rican electronic tax documents.
//!
//! The engine crates are re-exported here; this crate adds the document
//! source seam that hands unsigned documents to the signer.

pub use firma_c14n as c14n;
pub use firma_core as core;
pub use firma_crypto as crypto;
pub use firma_keys as keys;
pub use firma_pkcs12 as pkcs12;
pub use firma_xades as xades;
pub use firma_xml as xml;

use std::path::{Path, PathBuf};

use firma_core::Error;
use firma_xades::{SignError, SignedDocument, Signer, SigningContext, TargetDocument};
use firma_xml::XmlDocument;

/// An unsigned document handed over by a document source.
///
/// `key` (the 50-digit document key) and `consecutive` (the document
/// number) are already embedded in `xml`; the signer does not use them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedDocument {
    pub xml: String,
    pub key: String,
    pub consecutive: String,
    pub output_path: Option<PathBuf>,
}

/// Producer of unsigned documents.
pub trait DocumentSource {
    fn unsigned_document(&self) -> Result<UnsignedDocument, Error>;
}

/// A document already serialized to a file.
///
/// The key is read from `Clave` and the consecutive number from
/// `NumeroConsecutivo` (or `NumeroConsecutivoReceptor` for receiver
/// messages).
#[derive(Debug, Clone)]
pub struct XmlFileSource {
    path: PathBuf,
    output: Option<PathBuf>,
}

impl XmlFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentSource for XmlFileSource {
    fn unsigned_document(&self) -> Result<UnsignedDocument, Error> {
        let data = std::fs::read(&self.path).map_err(|e| Error::read(&self.path, e))?;
        let document = XmlDocument::parse_bytes(&data)?;
        let (key, consecutive) = {
            let doc = document.parse_doc()?;
            (
                element_text(&doc, &["Clave"]),
                element_text(&doc, &["NumeroConsecutivo", "NumeroConsecutivoReceptor"]),
            )
        };
        Ok(UnsignedDocument {
            xml: document.into_text(),
            key,
            consecutive,
            output_path: self.output.clone(),
        })
    }
}

/// Text of the first root child named by any of `names`, or empty.
fn element_text(doc: &roxmltree::Document<'_>, names: &[&str]) -> String {
    doc.root_element()
        .children()
        .find(|n| n.is_element() && names.contains(&n.tag_name().name()))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_owned())
        .unwrap_or_default()
}

/// Fetch a document from `source` and sign it.
#[tracing::instrument(skip_all)]
pub fn sign_document(
    signer: &Signer,
    ctx: SigningContext,
    source: &dyn DocumentSource,
) -> Result<SignedDocument, SignError> {
    let unsigned = source.unsigned_document().map_err(SignError::Input)?;
    tracing::debug!(key = %unsigned.key, consecutive = %unsigned.consecutive, "signing document");

    let document = XmlDocument::parse(unsigned.xml).map_err(SignError::Input)?;
    let mut target = TargetDocument::new(document);
    if let Some(path) = unsigned.output_path {
        target = target.with_output(path);
    }
    signer.sign(ctx, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use firma_xades::FixedId;
    use std::sync::Arc;

    fn test_data(rel: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../test-data").join(rel)
    }

    fn bundle() -> Arc<firma_keys::KeyBundle> {
        let p12 = std::fs::read(test_data("keys/signer.p12")).unwrap();
        Arc::new(firma_keys::KeyBundle::from_pkcs12(&p12, "8753").unwrap())
    }

    fn context(key: Arc<firma_keys::KeyBundle>) -> SigningContext {
        SigningContext::new(key, &FixedId::new("abc123"))
    }

    struct InMemory(UnsignedDocument);

    impl DocumentSource for InMemory {
        fn unsigned_document(&self) -> Result<UnsignedDocument, Error> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn file_source_reads_key_and_consecutive() {
        let doc = XmlFileSource::new(test_data("documents/tiquete.xml"))
            .unsigned_document()
            .unwrap();
        assert_eq!(doc.key, "50601011900310112345600100001040000000001123456789");
        assert_eq!(doc.consecutive, "00100001040000000001");
        assert!(doc.output_path.is_none());

        let msg = XmlFileSource::new(test_data("documents/mensaje-receptor.xml"))
            .unsigned_document()
            .unwrap();
        assert_eq!(msg.consecutive, "00100001050000000001");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = XmlFileSource::new(test_data("documents/nope.xml"))
            .unsigned_document()
            .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn signs_and_writes_source_document() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("signed.xml");
        let source = XmlFileSource::new(test_data("documents/tiquete.xml")).with_output(&out);
        let key = bundle();
        let signed = sign_document(&Signer::default(), context(key.clone()), &source).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), signed.as_str());
        assert!(signed.verify_signature_value(key.public_key()).unwrap());
    }

    #[test]
    fn malformed_source_is_input_error() {
        let source = InMemory(UnsignedDocument {
            xml: "<a>".into(),
            key: String::new(),
            consecutive: String::new(),
            output_path: None,
        });
        let err = sign_document(&Signer::default(), context(bundle()), &source).unwrap_err();
        assert_eq!(err.kind(), firma_xades::ErrorKind::Input);
    }
}
